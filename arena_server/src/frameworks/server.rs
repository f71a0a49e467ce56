// Framework bootstrap for the arena server runtime.

use crate::domain::tuning::ArenaTuning;
use crate::frameworks::config;
use crate::interface_adapters::net::{world_update_serializer, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::SystemClock;
use crate::use_cases::{GameEvent, GameServer, RosterEvent, WorldSettings, WorldUpdate, world_task};

use axum::{Router, extract::ws::Utf8Bytes, routing::get};
use std::future::Future;
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::{Notify, broadcast, mpsc, watch};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

/// Serves the arena on `listener` until the process exits.
pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    serve(listener, std::future::pending()).await
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from((config::http_host(), config::http_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    serve(listener, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        tracing::info!("shutdown signal received");
    })
    .await
}

async fn serve<F>(listener: tokio::net::TcpListener, shutdown_signal: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = listener.local_addr()?;
    let world_shutdown = Arc::new(Notify::new());
    let state = build_state(world_shutdown.clone());

    let app = Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, "server error");
        });

    world_shutdown.notify_one();
    served
}

fn build_state(world_shutdown: Arc<Notify>) -> Arc<AppState> {
    // input_tx/rx: joins, leaves and inputs all go to the single world task.
    let (input_tx, input_rx) = mpsc::channel::<GameEvent>(config::INPUT_CHANNEL_CAPACITY);

    // world_tx/rx: snapshots from the world task, consumed by the serializer.
    let (world_tx, world_rx) =
        broadcast::channel::<WorldUpdate>(config::WORLD_BROADCAST_CAPACITY);

    // roster_tx: join/leave/destruction notices fanned out to every connection.
    let (roster_tx, _roster_rx) =
        broadcast::channel::<RosterEvent>(config::ROSTER_BROADCAST_CAPACITY);

    let (world_bytes_tx, _world_bytes_rx) =
        broadcast::channel::<Utf8Bytes>(config::WORLD_BROADCAST_CAPACITY);
    let (world_latest_tx, _world_latest_rx) = watch::channel::<Utf8Bytes>(Utf8Bytes::from(""));

    let timestep = config::timestep();
    tracing::debug!(?timestep, "simulation timestep configured");
    let game = GameServer::new(ArenaTuning::default(), timestep, SystemClock);

    tokio::spawn(world_task(
        game,
        input_rx,
        world_tx,
        roster_tx.clone(),
        WorldSettings {
            tick_interval: config::TICK_INTERVAL,
            broadcast_interval: config::BROADCAST_INTERVAL,
        },
        world_shutdown,
    ));

    tokio::spawn(world_update_serializer(
        world_rx,
        world_bytes_tx.clone(),
        world_latest_tx.clone(),
    ));

    Arc::new(AppState {
        input_tx,
        roster_tx,
        world_bytes_tx,
        world_latest_tx,
    })
}
