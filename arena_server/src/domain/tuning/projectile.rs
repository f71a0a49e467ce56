/// Gameplay tuning for projectiles.

#[derive(Debug, Clone, Copy)]
pub struct ProjectileTuning {
    /// Muzzle speed in pixels per second, added to the firing ship's velocity.
    pub speed: f32,

    /// Health removed from a ship on hit.
    pub damage: i32,

    /// Lifetime in milliseconds before the projectile is despawned.
    pub lifetime_ms: f32,

    /// World-space collision radius in pixels.
    pub radius: f32,

    /// Gap between the ship's hull and the spawn point, in pixels.
    pub muzzle_margin: f32,
}

impl Default for ProjectileTuning {
    fn default() -> Self {
        Self {
            speed: 500.0,
            damage: 10,
            lifetime_ms: 2000.0,
            radius: 3.0,
            muzzle_margin: 5.0,
        }
    }
}
