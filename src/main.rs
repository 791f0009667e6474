mod config;
mod errors;
mod extract;
mod index;
mod llm;
mod logging;
mod rag;
mod server;
mod state;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use crate::config::Settings;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::from_env()?;
    logging::init(&settings.log_dir);

    let bind_addr = format!("127.0.0.1:{}", settings.port);
    let state = AppState::initialize(settings)?;

    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on {}", addr);

    let app: Router = server::router::router(state);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
