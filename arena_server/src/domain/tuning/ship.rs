/// Gameplay tuning for player-controlled ships.

#[derive(Debug, Clone, Copy)]
pub struct ShipTuning {
    /// Rotation speed in radians per second.
    pub rotation_speed: f32,

    /// Acceleration applied while thrusting, in pixels per second squared.
    pub thrust_power: f32,

    /// Velocity multiplier applied once per simulation step.
    pub drag_factor: f32,

    /// Maximum speed in pixels per second.
    pub max_speed: f32,

    /// World-space collision radius in pixels.
    pub radius: f32,

    pub max_health: i32,

    /// Minimum time between two shots, in milliseconds.
    pub fire_cooldown_ms: u64,
}

impl Default for ShipTuning {
    fn default() -> Self {
        Self {
            rotation_speed: 4.0,
            thrust_power: 300.0,
            drag_factor: 0.98,
            max_speed: 400.0,
            radius: 20.0,
            max_health: 100,
            fire_cooldown_ms: 250,
        }
    }
}
