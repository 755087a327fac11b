use std::sync::Arc;

use anyhow::Context;
use blogforge::config::{AppConfig, AppState};
use blogforge::server::build_router;
use blogforge::util::init_tracing;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env()?;

    // The system instruction is loaded once and never reloaded; it is
    // immutable process-wide state for the lifetime of the server.
    let system_prompt = std::fs::read_to_string(&config.prompt_path)
        .with_context(|| format!("failed to read prompt file: {}", config.prompt_path.display()))?;

    tracing::info!(
        host = %config.ollama_host,
        default_model = %config.default_model,
        upload_format = ?config.upload_format,
        "configuration loaded"
    );
    if let Some(dir) = &config.static_dir {
        tracing::info!("serving static assets from {}", dir.display());
    }

    let state: Arc<AppState> = AppState::new(config, system_prompt);
    let addr = state.config.bind_addr.clone();
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Blogforge listening on http://{addr}");

    axum::serve(listener, router).await?;
    Ok(())
}
