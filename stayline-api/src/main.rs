use std::net::SocketAddr;
use std::sync::Arc;

use stayline_api::{app, AppState};
use stayline_core::SystemClock;
use stayline_sweeps::spawn_sweeps;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "stayline=debug,stayline_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = stayline_store::Config::load()?;
    tracing::info!("Starting Stayline API on port {}", config.server.port);

    let schedule = config.sweeps.clone();
    let (state, sweeps) = AppState::build(config.clone(), Arc::new(SystemClock));

    // Reconciliation runs on its own timers from here on
    let handles = spawn_sweeps(sweeps, &schedule);
    tracing::info!("{} reconciliation sweeps scheduled", handles.len());

    let app = app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
