use crate::domain::state::{PlayerInput, Projectile, ProjectileId, Ship, Vector2D};
use crate::domain::tuning::{ArenaTuning, ProjectileTuning, ShipTuning, WorldTuning};

/// Stateless kinematics for ships and projectiles.
///
/// Only carries immutable tuning; every method touches nothing but the entity
/// passed in, so it can be called freely from the tick loop.
#[derive(Debug, Clone, Copy)]
pub struct PhysicsEngine {
    world: WorldTuning,
    ship: ShipTuning,
    projectile: ProjectileTuning,
}

impl PhysicsEngine {
    pub fn new(tuning: ArenaTuning) -> Self {
        Self {
            world: tuning.world,
            ship: tuning.ship,
            projectile: tuning.projectile,
        }
    }

    /// Advances one ship by `dt` seconds under `input`.
    ///
    /// Order is fixed: rotation, thrust (along the new heading), drag, speed
    /// clamp, integration, wrap.
    pub fn update_ship(&self, ship: &mut Ship, input: &PlayerInput, dt: f32) {
        let cfg = &self.ship;

        // rotation
        if input.rotate_left {
            ship.rotation -= cfg.rotation_speed * dt;
        }
        if input.rotate_right {
            ship.rotation += cfg.rotation_speed * dt;
        }

        // thrust
        if input.thrust {
            let push = Vector2D::from_angle(ship.rotation).scale(cfg.thrust_power * dt);
            ship.velocity = ship.velocity.add(&push);
        }

        // Drag is per step, not scaled by dt.
        ship.velocity = ship.velocity.scale(cfg.drag_factor);

        let speed = ship.velocity.length();
        if speed > cfg.max_speed {
            ship.velocity = ship.velocity.scale(cfg.max_speed / speed);
        }

        ship.position = ship.position.add(&ship.velocity.scale(dt));
        self.wrap_position(&mut ship.position);
    }

    /// Integrates a projectile and burns `dt` worth of lifetime.
    pub fn update_projectile(&self, projectile: &mut Projectile, dt: f32) {
        projectile.position = projectile.position.add(&projectile.velocity.scale(dt));
        projectile.lifetime_ms -= dt * 1000.0;

        self.wrap_position(&mut projectile.position);
    }

    /// Toroidal wrap by exactly one world dimension.
    ///
    /// Assumes a single step never moves an entity further than one world
    /// length past an edge.
    pub fn wrap_position(&self, pos: &mut Vector2D) {
        let (width, height) = (self.world.width, self.world.height);

        if pos.x < 0.0 {
            pos.x += width;
        } else if pos.x >= width {
            pos.x -= width;
        }

        if pos.y < 0.0 {
            pos.y += height;
        } else if pos.y >= height {
            pos.y -= height;
        }

        // A tiny negative coordinate plus the dimension can round up to it.
        if pos.x >= width {
            pos.x = 0.0;
        }
        if pos.y >= height {
            pos.y = 0.0;
        }
    }

    /// Circle-circle overlap; touching circles do not collide.
    pub fn check_collision(pos1: &Vector2D, radius1: f32, pos2: &Vector2D, radius2: f32) -> bool {
        pos1.distance(pos2) < radius1 + radius2
    }

    /// Whether `projectile` overlaps `ship` using the tuned radii.
    pub fn projectile_hits(&self, projectile: &Projectile, ship: &Ship) -> bool {
        Self::check_collision(
            &projectile.position,
            self.projectile.radius,
            &ship.position,
            self.ship.radius,
        )
    }

    /// Spawns a projectile at the ship's nose, inheriting the ship's momentum.
    pub fn create_projectile(&self, ship: &Ship, id: ProjectileId) -> Projectile {
        let dir = Vector2D::from_angle(ship.rotation);
        let spawn_distance = self.ship.radius + self.projectile.muzzle_margin;

        let mut position = ship.position.add(&dir.scale(spawn_distance));
        self.wrap_position(&mut position);

        Projectile {
            id,
            owner_id: ship.id,
            position,
            velocity: ship.velocity.add(&dir.scale(self.projectile.speed)),
            damage: self.projectile.damage,
            lifetime_ms: self.projectile.lifetime_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::state::PlayerId;

    fn engine() -> PhysicsEngine {
        PhysicsEngine::new(ArenaTuning::default())
    }

    fn ship_at(x: f32, y: f32) -> Ship {
        Ship {
            id: PlayerId(1),
            position: Vector2D::new(x, y),
            velocity: Vector2D::ZERO,
            rotation: 0.0,
            health: 100,
            max_health: 100,
            color: "#ffffff",
            player_name: "Pilot".to_string(),
        }
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 1e-3,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn when_both_rotations_pressed_then_they_cancel() {
        let physics = engine();
        let mut ship = ship_at(500.0, 500.0);
        ship.rotation = 1.0;
        let input = PlayerInput {
            rotate_left: true,
            rotate_right: true,
            ..PlayerInput::default()
        };

        physics.update_ship(&mut ship, &input, 0.05);

        assert_close(ship.rotation, 1.0);
    }

    #[test]
    fn when_rotating_and_thrusting_then_thrust_uses_new_heading() {
        let physics = engine();
        let tuning = ShipTuning::default();
        let mut ship = ship_at(500.0, 500.0);
        let dt = 0.25;
        let input = PlayerInput {
            thrust: true,
            rotate_right: true,
            ..PlayerInput::default()
        };

        physics.update_ship(&mut ship, &input, dt);

        let heading = tuning.rotation_speed * dt;
        assert_close(ship.rotation, heading);
        let expected = tuning.thrust_power * dt * tuning.drag_factor;
        assert_close(ship.velocity.x, heading.cos() * expected);
        assert_close(ship.velocity.y, heading.sin() * expected);
    }

    #[test]
    fn when_idle_then_drag_applies_once_per_step() {
        let physics = engine();
        let mut ship = ship_at(500.0, 500.0);
        ship.velocity = Vector2D::new(100.0, -50.0);

        physics.update_ship(&mut ship, &PlayerInput::default(), 0.016);

        assert_close(ship.velocity.x, 98.0);
        assert_close(ship.velocity.y, -49.0);
    }

    #[test]
    fn when_faster_than_max_speed_then_velocity_is_rescaled_before_integration() {
        let physics = engine();
        let tuning = ShipTuning::default();
        let mut ship = ship_at(500.0, 500.0);
        ship.velocity = Vector2D::new(0.0, 1000.0);

        physics.update_ship(&mut ship, &PlayerInput::default(), 0.1);

        assert_close(ship.velocity.length(), tuning.max_speed);
        assert_close(ship.velocity.x, 0.0);
        assert_close(ship.position.y, 500.0 + tuning.max_speed * 0.1);
    }

    #[test]
    fn when_ship_crosses_right_edge_then_it_wraps_to_small_positive_x() {
        let physics = engine();
        let width = WorldTuning::default().width;
        let mut ship = ship_at(width - 1.0, 300.0);
        ship.velocity = Vector2D::new(200.0, 0.0);

        physics.update_ship(&mut ship, &PlayerInput::default(), 0.01);

        assert!(ship.position.x >= 0.0 && ship.position.x < 5.0, "x = {}", ship.position.x);
        assert_close(ship.position.y, 300.0);
    }

    #[test]
    fn when_position_is_exactly_on_the_far_edge_then_it_wraps_to_zero() {
        let physics = engine();
        let world = WorldTuning::default();
        let mut pos = Vector2D::new(world.width, world.height);

        physics.wrap_position(&mut pos);

        assert_eq!(pos, Vector2D::ZERO);
    }

    #[test]
    fn when_position_is_negative_then_it_wraps_from_the_far_side() {
        let physics = engine();
        let world = WorldTuning::default();
        let mut pos = Vector2D::new(-2.0, -3.0);

        physics.wrap_position(&mut pos);

        assert_close(pos.x, world.width - 2.0);
        assert_close(pos.y, world.height - 3.0);
    }

    #[test]
    fn when_position_is_barely_negative_then_it_stays_inside_the_world() {
        let physics = engine();
        let world = WorldTuning::default();
        let mut pos = Vector2D::new(-1e-5, -1e-5);

        physics.wrap_position(&mut pos);

        assert!(pos.x >= 0.0 && pos.x < world.width, "x = {}", pos.x);
        assert!(pos.y >= 0.0 && pos.y < world.height, "y = {}", pos.y);
    }

    #[test]
    fn when_ship_drifts_slowly_past_left_edge_then_x_stays_below_width() {
        let physics = engine();
        let width = WorldTuning::default().width;
        let mut ship = ship_at(0.0001, 300.0);
        ship.velocity = Vector2D::new(-0.01, 0.0);

        physics.update_ship(&mut ship, &PlayerInput::default(), 0.016);

        assert!(ship.position.x >= 0.0 && ship.position.x < width, "x = {}", ship.position.x);
    }

    #[test]
    fn when_firing_at_the_edge_then_projectile_spawns_wrapped() {
        let physics = engine();
        let world = WorldTuning::default();
        let ship = ship_at(world.width - 2.0, 100.0);

        let projectile = physics.create_projectile(&ship, ProjectileId(1));

        let offset = ShipTuning::default().radius + ProjectileTuning::default().muzzle_margin;
        assert_close(projectile.position.x, offset - 2.0);
        assert_close(projectile.position.y, 100.0);
    }

    #[test]
    fn when_circles_only_touch_then_no_collision() {
        let a = Vector2D::new(0.0, 0.0);

        assert!(!PhysicsEngine::check_collision(&a, 3.0, &Vector2D::new(23.0, 0.0), 20.0));
        assert!(PhysicsEngine::check_collision(&a, 3.0, &Vector2D::new(22.9, 0.0), 20.0));
    }

    #[test]
    fn when_firing_then_projectile_spawns_at_nose_with_inherited_momentum() {
        let physics = engine();
        let ship_tuning = ShipTuning::default();
        let projectile_tuning = ProjectileTuning::default();
        let mut ship = ship_at(100.0, 100.0);
        ship.velocity = Vector2D::new(10.0, 0.0);

        let projectile = physics.create_projectile(&ship, ProjectileId(7));

        assert_eq!(projectile.id, ProjectileId(7));
        assert_eq!(projectile.owner_id, ship.id);
        let offset = ship_tuning.radius + projectile_tuning.muzzle_margin;
        assert_close(projectile.position.x, 100.0 + offset);
        assert_close(projectile.position.y, 100.0);
        assert_close(projectile.velocity.x, 10.0 + projectile_tuning.speed);
        assert_eq!(projectile.damage, projectile_tuning.damage);
        assert_close(projectile.lifetime_ms, projectile_tuning.lifetime_ms);
    }

    #[test]
    fn when_projectile_advances_then_lifetime_burns_in_milliseconds() {
        let physics = engine();
        let ship = ship_at(100.0, 100.0);
        let mut projectile = physics.create_projectile(&ship, ProjectileId(1));
        let start = projectile.lifetime_ms;
        let start_x = projectile.position.x;

        physics.update_projectile(&mut projectile, 0.1);

        assert_close(projectile.lifetime_ms, start - 100.0);
        assert_close(projectile.position.x, start_x + ProjectileTuning::default().speed * 0.1);
    }
}
