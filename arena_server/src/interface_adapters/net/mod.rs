// WebSocket adapter for game clients.

pub mod client;

pub use client::{world_update_serializer, ws_handler};
