use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use tera::Context;

use super::AppState;
use crate::resources::CrudError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    /// The request itself was unusable (bad body, oversized upload).
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn rejected(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            message: message.into(),
        }
    }
}

impl From<CrudError> for AppError {
    fn from(err: CrudError) -> Self {
        match err {
            CrudError::NotFound(label) => Self::NotFound(format!("{label} not found")),
            CrudError::Storage(err) => Self::Internal(err),
        }
    }
}

/// Attached to error responses; [`render_error_pages`] turns it into HTML.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub status: StatusCode,
    pub message: String,
    pub detail: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let report = match self {
            Self::NotFound(message) => ErrorReport {
                status: StatusCode::NOT_FOUND,
                message,
                detail: None,
            },
            Self::Rejected { status, message } => ErrorReport {
                status,
                message,
                detail: None,
            },
            Self::Internal(err) => {
                tracing::error!(error = ?err, "Request failed");
                ErrorReport {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    message: "An internal error occurred".to_string(),
                    detail: Some(format!("{err:?}")),
                }
            }
        };

        let mut response = (report.status, report.message.clone()).into_response();
        response.extensions_mut().insert(report);
        response
    }
}

pub async fn not_found_page() -> AppError {
    AppError::NotFound("Page not found".to_string())
}

pub async fn render_error_pages(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let mut response = next.run(req).await;
    let Some(report) = response.extensions_mut().remove::<ErrorReport>() else {
        return response;
    };

    let detail = report.detail.filter(|_| !state.config.is_production());

    let mut ctx = Context::new();
    ctx.insert("title", report.status.canonical_reason().unwrap_or("Error"));
    ctx.insert("status", &report.status.as_u16());
    ctx.insert("message", &report.message);
    ctx.insert("detail", &detail);
    ctx.insert("signed_in", &false);
    ctx.insert("gate_required", &!state.gate.is_open());

    match state.templates.render("error.html", &ctx) {
        Ok(html) => (report.status, Html(html)).into_response(),
        Err(err) => {
            tracing::error!(error = ?err, "Failed to render error page");
            response
        }
    }
}
