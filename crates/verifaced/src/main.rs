use anyhow::Result;
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod http;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("verifaced starting");

    let config = config::Config::from_env();
    tracing::info!(
        model_dir = %config.model_dir.display(),
        port = config.port,
        similarity_threshold = config.similarity_threshold,
        "configuration loaded"
    );

    // Fail fast: all models load before the listener binds.
    let engine = engine::spawn_engine(&config.model_paths(), config.similarity_threshold)?;

    let app = http::router(engine);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "verifaced listening");

    axum::serve(listener, app).await?;

    Ok(())
}
