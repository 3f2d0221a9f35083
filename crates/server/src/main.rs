use std::{net::SocketAddr, sync::Arc};

use shared::vehicle::default_state;
use storage::{ControlSource, StateStore};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod api;
mod app_state;
mod config;

use api::build_router;
use app_state::AppState;
use config::load_settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings();
    let state = AppState::load(
        ControlSource::new(&settings.controls_path),
        StateStore::new(&settings.state_path),
        default_state(),
    )
    .map_err(|error| {
        let message = format!("{error:#}");
        error!(
            state_path = %settings.state_path.display(),
            error = %message,
            "failed to load state document; verify the directory is writable"
        );
        error
    })?;
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, controls_path = %settings.controls_path.display(), "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
