use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    response::Html,
    routing::{get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, Session, SessionManagerLayer};

use crate::config::Config;
use crate::db::Store;
use crate::resources::{
    GameResource, GenreResource, PlatformResource, PublisherResource, Resource,
};
use crate::services::{AccessGate, ImageService};
use crate::templates::Templates;

mod assets;
pub mod auth;
pub mod crud;
mod error;
mod extract;
mod home;
mod observability;

pub use error::{AppError, ErrorReport};

pub struct AppState {
    pub config: Config,

    pub store: Store,

    pub images: ImageService,

    pub gate: AccessGate,

    pub templates: Templates,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    /// Template context every page starts from.
    pub async fn page(&self, session: &Session, title: &str) -> tera::Context {
        let mut ctx = tera::Context::new();
        ctx.insert("title", title);
        ctx.insert("gate_required", &!self.gate.is_open());
        ctx.insert("signed_in", &self.gate.session_authorized(session).await);
        ctx
    }

    pub fn render(&self, template: &str, ctx: &tera::Context) -> Result<Html<String>, AppError> {
        Ok(Html(self.templates.render(template, ctx)?))
    }
}

pub async fn create_app_state(
    config: Config,
    store: Store,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let images = ImageService::new(&config.general.images_path, config.server.max_upload_bytes);
    let gate = AccessGate::from_config(&config.security).await?;
    let templates = Templates::load()?;

    if gate.is_open() {
        tracing::warn!("No admin password configured; every submission is accepted");
    }

    Ok(Arc::new(AppState {
        config,
        store,
        images,
        gate,
        templates,
        prometheus_handle,
    }))
}

pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_url,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;
    create_app_state(config, store, prometheus_handle).await
}

/// Room for the text fields and multipart framing sent alongside an image.
/// The image itself is capped by `ImageService::check`.
const FORM_FIELDS_HEADROOM: usize = 64 * 1024;

fn resource<R: Resource>(router: Router<Arc<AppState>>) -> Router<Arc<AppState>> {
    router.nest(&format!("/{}", R::SLUG), crud::routes::<R>())
}

pub fn router(state: Arc<AppState>) -> Router {
    let server = state.config.server.clone();
    let images_path = state.config.general.images_path.clone();

    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(server.secure_cookies)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            server.session_minutes,
        )));

    let mut pages = Router::new()
        .route("/", get(home::index))
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout));
    pages = resource::<GameResource>(pages);
    pages = resource::<PublisherResource>(pages);
    pages = resource::<GenreResource>(pages);
    pages = resource::<PlatformResource>(pages);

    Router::new()
        .merge(pages.layer(session_layer))
        .route("/metrics", get(observability::get_metrics))
        .route("/static/{*path}", get(assets::serve_static))
        .nest_service("/images", ServeDir::new(images_path))
        .fallback(error::not_found_page)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            error::render_error_pages,
        ))
        .layer(DefaultBodyLimit::max(
            server.max_upload_bytes.saturating_add(FORM_FIELDS_HEADROOM),
        ))
        .layer(middleware::from_fn(observability::security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(observability::logging_middleware))
        .with_state(state)
}
