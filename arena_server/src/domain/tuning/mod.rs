// Gameplay tuning, kept apart from runtime/server configuration.

pub mod projectile;
pub mod ship;
pub mod world;

pub use projectile::ProjectileTuning;
pub use ship::ShipTuning;
pub use world::WorldTuning;

/// Every gameplay constant the arena simulation reads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArenaTuning {
    pub world: WorldTuning,
    pub ship: ShipTuning,
    pub projectile: ProjectileTuning,
}
