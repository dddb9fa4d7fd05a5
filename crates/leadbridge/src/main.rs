use leadbridge::config::Config;
use leadbridge::pipeline::{self, Pipeline, PipelineDeps};
use leadbridge::webhook::server;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A missing .env file is fine; real deployments set the environment
    // directly.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Arc::new(Config::from_env()?);
    let deps = Arc::new(PipelineDeps::new(config.clone()));
    let pipeline = Arc::new(Pipeline::new(deps)?);

    let (trigger, runs) = mpsc::channel(64);
    pipeline::spawn_dispatcher(pipeline, runs);

    let app = server::router(trigger);
    let listener = tokio::net::TcpListener::bind(&config.server.listen_addr).await?;
    info!(addr = %config.server.listen_addr, "leadbridge listening");
    axum::serve(listener, app).await?;
    Ok(())
}
