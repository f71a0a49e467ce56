// Use cases layer: application workflows for the arena server.

pub mod game;
pub mod game_server;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use game::{WorldSettings, world_task};
pub use game_server::{GameServer, TickOutcome, TimeStep};
pub use types::{GameEvent, RosterEvent, WorldUpdate};
