pub mod api;
pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod entities;
pub mod forms;
pub mod models;
pub mod resources;
pub mod scheduler;
pub mod services;
pub mod templates;

use anyhow::Context;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
pub use config::Config;
use scheduler::Scheduler;

pub async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    config.validate()?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            let prometheus_handle = install_metrics(&config)?;
            init_tracing(&config)?;
            serve(config, prometheus_handle).await
        }
        Commands::SweepImages { grace_minutes } => {
            init_tracing(&config)?;
            cli::cmd_sweep_images(&config, grace_minutes).await
        }
        Commands::InitConfig { path, force } => cli::cmd_init_config(path, force),
        Commands::HashPassword { password } => cli::cmd_hash_password(&password),
    }
}

fn install_metrics(config: &Config) -> anyhow::Result<Option<PrometheusHandle>> {
    if !config.observability.metrics_enabled {
        return Ok(None);
    }

    let handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;
    Ok(Some(handle))
}

fn init_tracing(config: &Config) -> anyhow::Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer());

    if config.observability.loki_enabled {
        let url = url::Url::parse(&config.observability.loki_url).context("Invalid Loki URL")?;
        let environment = if config.is_production() {
            "production"
        } else {
            "development"
        };

        let (layer, task) = tracing_loki::builder()
            .label("app", "game-store")?
            .extra_field("env", environment)?
            .build_url(url)?;

        tokio::spawn(task);
        registry.with(layer).init();
        info!("Loki logging initialized at {}", config.observability.loki_url);
    } else {
        registry.init();
    }

    Ok(())
}

async fn serve(config: Config, prometheus_handle: Option<PrometheusHandle>) -> anyhow::Result<()> {
    info!("Game store v{} starting...", env!("CARGO_PKG_VERSION"));

    let state = api::create_app_state_from_config(config.clone(), prometheus_handle).await?;

    let mut scheduler = Scheduler::new(
        state.store.clone(),
        state.images.clone(),
        config.maintenance.clone(),
    )
    .start()
    .await?;

    let addr = format!("{}:{}", config.server.bind_address, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!("Web server running at http://{addr}");
    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server error")?;

    if let Some(sched) = scheduler.as_mut()
        && let Err(e) = sched.shutdown().await
    {
        error!("Failed to stop scheduler: {e}");
    }
    info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => error!("Error listening for shutdown: {}", e),
    }
}
