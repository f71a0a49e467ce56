// Pure simulation systems operating on individual entities.

pub mod physics;

pub use physics::PhysicsEngine;
