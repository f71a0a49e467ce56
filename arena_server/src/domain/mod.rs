// Domain layer: core simulation types and rules.

pub mod ports;
pub mod state;
pub mod systems;
pub mod tuning;

pub use ports::Clock;
pub use state::{
    GameStateSnapshot, PlayerId, PlayerInput, Projectile, ProjectileId, Ship, ShipDestroyed,
    Vector2D,
};
