use crate::use_cases::{GameEvent, RosterEvent};
use axum::extract::ws::Utf8Bytes;
use tokio::sync::{broadcast, mpsc, watch};

#[derive(Clone)]
pub struct AppState {
    // Joins, leaves and inputs flowing from the network into the world task.
    pub input_tx: mpsc::Sender<GameEvent>,
    // Join/leave/destruction notifications from the world task.
    pub roster_tx: broadcast::Sender<RosterEvent>,
    // Serialized snapshots, shared across all connections.
    pub world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    // Latest serialized snapshot for lag recovery.
    pub world_latest_tx: watch::Sender<Utf8Bytes>,
}
