// Use-case level inputs/outputs for the arena world task.

use crate::domain::{GameStateSnapshot, PlayerId, PlayerInput, Ship};
use tokio::sync::oneshot;

#[derive(Debug)]
pub enum GameEvent {
    Join {
        player_id: PlayerId,
        player_name: String,
        // Receives the spawned ship once the world task has added it.
        respond_to: oneshot::Sender<Ship>,
    },
    Leave {
        player_id: PlayerId,
    },
    Input {
        player_id: PlayerId,
        input: PlayerInput,
    },
}

/// Roster changes fanned out to every connection.
#[derive(Debug, Clone)]
pub enum RosterEvent {
    Joined {
        player_id: PlayerId,
        player_name: String,
        ship: Ship,
    },
    Left {
        player_id: PlayerId,
    },
    ShipDestroyed {
        ship_id: PlayerId,
        destroyed_by: PlayerId,
    },
}

/// Periodic snapshot published at the broadcast rate.
pub type WorldUpdate = GameStateSnapshot;
