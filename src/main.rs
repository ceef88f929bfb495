use anyhow::Context;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{fmt, EnvFilter};

use uispec_pipeline::{
    config::Settings,
    demo::DemoOracle,
    events::TracingSink,
    gemini::GeminiOracle,
    oracle::Oracle,
    pipeline::Pipeline,
    priors::DesignPriors,
    routes::{router, AppState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    // Init tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let settings = Settings::from_env();
    let priors = Arc::new(DesignPriors::builtin());
    let oracle: Arc<dyn Oracle> = if settings.demo_mode() {
        tracing::info!("Using demo mode - answers come from the offline demo oracle");
        Arc::new(DemoOracle::new(priors.clone()))
    } else {
        tracing::info!(
            "Using API key: {}... with model {}",
            settings.api_key.chars().take(6).collect::<String>(),
            settings.model
        );
        Arc::new(GeminiOracle::new(
            settings.api_key.clone(),
            settings.api_base.clone(),
            settings.model.clone(),
        ))
    };

    let pipeline = Pipeline::new(oracle, priors, settings.pipeline.clone(), Arc::new(TracingSink));
    let app = router(AppState::new(Arc::new(pipeline)));

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("👋 Shutting down");
    }
}
