// Domain-level simulation entities, input and snapshot types.

use std::fmt;

/// Identifier of a connected player; also the id of the ship it controls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u64);

/// Identifier of a projectile, unique for the lifetime of a `GameServer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectileId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for ProjectileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector2D {
    pub x: f32,
    pub y: f32,
}

impl Vector2D {
    pub const ZERO: Vector2D = Vector2D { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Unit vector pointing along `angle` (radians, 0 = +X).
    pub fn from_angle(angle: f32) -> Self {
        Self {
            x: angle.cos(),
            y: angle.sin(),
        }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    pub fn scale(&self, scalar: f32) -> Vector2D {
        Vector2D {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    pub fn add(&self, other: &Vector2D) -> Vector2D {
        Vector2D {
            x: self.x + other.x,
            y: self.y + other.y,
        }
    }

    pub fn distance(&self, other: &Vector2D) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A player-controlled ship. One per connected player.
#[derive(Debug, Clone, PartialEq)]
pub struct Ship {
    pub id: PlayerId,
    pub position: Vector2D,
    pub velocity: Vector2D,
    // Radians; never normalized.
    pub rotation: f32,

    // Combat state. `health` stays within 0..=max_health.
    pub health: i32,
    pub max_health: i32,

    // Display metadata, fixed at spawn.
    pub color: &'static str,
    pub player_name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projectile {
    pub id: ProjectileId,
    pub owner_id: PlayerId,
    pub position: Vector2D,
    pub velocity: Vector2D,
    pub damage: i32,
    // Remaining time to live in milliseconds.
    pub lifetime_ms: f32,
}

/// Latest intent received from a player. Only the newest one is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlayerInput {
    pub thrust: bool,
    pub rotate_left: bool,
    pub rotate_right: bool,
    pub fire: bool,
    // Client-supplied; informational only.
    pub timestamp: u64,
}

/// Owned copy of the world at one instant, safe to hand to slower consumers.
#[derive(Debug, Clone, PartialEq)]
pub struct GameStateSnapshot {
    pub tick: u64,
    pub timestamp: u64,
    pub ships: Vec<Ship>,
    pub projectiles: Vec<Projectile>,
}

/// A ship whose health reached zero and was respawned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShipDestroyed {
    pub ship_id: PlayerId,
    pub destroyed_by: PlayerId,
}
