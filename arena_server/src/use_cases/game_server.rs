// Authoritative roster and per-tick orchestration for the arena.

use crate::domain::systems::PhysicsEngine;
use crate::domain::tuning::ArenaTuning;
use crate::domain::{
    Clock, GameStateSnapshot, PlayerId, PlayerInput, Projectile, ProjectileId, Ship,
    ShipDestroyed, Vector2D,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::f32::consts::TAU;
use std::time::Duration;
use tracing::{debug, info};

/// How `GameServer::update` turns elapsed wall-clock time into simulation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeStep {
    /// One step per call, sized by the measured gap since the previous call.
    /// The gap is capped at `max_delta`.
    Variable { max_delta: Duration },
    /// Zero or more steps of exactly `step`; leftover time carries over.
    /// Backlog beyond `max_steps` per call is dropped.
    Fixed { step: Duration, max_steps: u32 },
}

/// Result of one `GameServer::update` call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub steps: u32,
    pub destroyed: Vec<ShipDestroyed>,
}

/// Owns every ship, projectile and per-player bookkeeping entry.
///
/// All reads and writes go through these methods; callers never hold
/// references into the roster across calls.
pub struct GameServer<C> {
    tuning: ArenaTuning,
    physics: PhysicsEngine,
    timestep: TimeStep,
    clock: C,
    rng: StdRng,

    // Insertion order doubles as collision tie-break order.
    ships: Vec<Ship>,
    projectiles: Vec<Projectile>,
    inputs: HashMap<PlayerId, PlayerInput>,
    last_fire: HashMap<PlayerId, u64>,

    next_projectile_id: u64,
    tick: u64,
    last_update_ms: u64,
    // Unsimulated time carried between calls in fixed-step mode, in microseconds.
    accumulator_us: u64,
}

impl<C: Clock> GameServer<C> {
    pub fn new(tuning: ArenaTuning, timestep: TimeStep, clock: C) -> Self {
        let last_update_ms = clock.now_millis();
        Self {
            tuning,
            physics: PhysicsEngine::new(tuning),
            timestep,
            clock,
            rng: StdRng::from_entropy(),
            ships: Vec::new(),
            projectiles: Vec::new(),
            inputs: HashMap::new(),
            last_fire: HashMap::new(),
            next_projectile_id: 1,
            tick: 0,
            last_update_ms,
            accumulator_us: 0,
        }
    }

    /// Replaces the spawn RNG with a seeded one for reproducible spawns.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn player_count(&self) -> usize {
        self.ships.len()
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    pub fn ship(&self, player_id: PlayerId) -> Option<&Ship> {
        self.ships.iter().find(|s| s.id == player_id)
    }

    /// Spawns a ship for `player_id` and returns a copy for the joining client.
    ///
    /// Joining twice with a live id keeps the existing ship.
    pub fn add_player(&mut self, player_id: PlayerId, player_name: String) -> Ship {
        if let Some(existing) = self.ship(player_id) {
            return existing.clone();
        }

        let world = self.tuning.world;
        let max_health = self.tuning.ship.max_health;
        let ship = Ship {
            id: player_id,
            position: random_position(&mut self.rng, &self.tuning),
            velocity: Vector2D::ZERO,
            rotation: self.rng.gen_range(0.0..TAU),
            health: max_health,
            max_health,
            color: world.color_for(self.ships.len()),
            player_name,
        };

        info!(
            %player_id,
            player_name = %ship.player_name,
            color = ship.color,
            x = ship.position.x,
            y = ship.position.y,
            "ship spawned"
        );
        self.ships.push(ship.clone());
        self.inputs.insert(player_id, PlayerInput::default());
        ship
    }

    /// Drops the player's ship and bookkeeping. Unknown ids are ignored.
    ///
    /// Returns whether a ship was removed.
    pub fn remove_player(&mut self, player_id: PlayerId) -> bool {
        let before = self.ships.len();
        self.ships.retain(|s| s.id != player_id);
        self.inputs.remove(&player_id);
        self.last_fire.remove(&player_id);
        before != self.ships.len()
    }

    /// Stores `input` as the player's latest intent and applies the fire policy.
    ///
    /// A shot inside the cooldown window is dropped, not queued.
    pub fn update_player_input(&mut self, player_id: PlayerId, input: PlayerInput) {
        let Some(ship) = self.ships.iter().find(|s| s.id == player_id) else {
            return;
        };

        if input.fire {
            let now = self.clock.now_millis();
            let cooled_down = match self.last_fire.get(&player_id) {
                Some(last) => now.saturating_sub(*last) >= self.tuning.ship.fire_cooldown_ms,
                None => true,
            };

            if cooled_down {
                let id = ProjectileId(self.next_projectile_id);
                self.next_projectile_id = self.next_projectile_id.wrapping_add(1);
                let projectile = self.physics.create_projectile(ship, id);
                self.projectiles.push(projectile);
                self.last_fire.insert(player_id, now);
            }
        }

        self.inputs.insert(player_id, input);
    }

    /// Advances the world by the time elapsed since the previous call.
    pub fn update(&mut self) -> TickOutcome {
        let now = self.clock.now_millis();
        let elapsed_ms = now.saturating_sub(self.last_update_ms);
        self.last_update_ms = now;

        let mut outcome = TickOutcome::default();
        match self.timestep {
            TimeStep::Variable { max_delta } => {
                let capped_ms = elapsed_ms.min(max_delta.as_millis() as u64);
                self.step(capped_ms as f32 / 1000.0, &mut outcome.destroyed);
                outcome.steps = 1;
            }
            TimeStep::Fixed { step, max_steps } => {
                let step_us = (step.as_micros() as u64).max(1);
                self.accumulator_us += elapsed_ms * 1_000;
                while self.accumulator_us >= step_us {
                    if outcome.steps >= max_steps {
                        debug!(
                            dropped_us = self.accumulator_us,
                            "simulation backlog dropped"
                        );
                        self.accumulator_us = 0;
                        break;
                    }
                    self.step(step.as_secs_f32(), &mut outcome.destroyed);
                    self.accumulator_us -= step_us;
                    outcome.steps += 1;
                }
            }
        }

        outcome
    }

    /// Owned copy of the current world; never aliases the live roster.
    pub fn game_state(&self) -> GameStateSnapshot {
        GameStateSnapshot {
            tick: self.tick,
            timestamp: self.clock.now_millis(),
            ships: self.ships.clone(),
            projectiles: self.projectiles.clone(),
        }
    }

    // One simulation step of `dt` seconds.
    fn step(&mut self, dt: f32, destroyed: &mut Vec<ShipDestroyed>) {
        let Self {
            tuning,
            physics,
            rng,
            ships,
            projectiles,
            inputs,
            tick,
            ..
        } = self;

        // Ship movement; a ship without stored input does not move.
        for ship in ships.iter_mut() {
            if let Some(input) = inputs.get(&ship.id) {
                physics.update_ship(ship, input, dt);
            }
        }

        // Projectile movement, lifetimes and first-hit collision resolution.
        let mut spent: Vec<ProjectileId> = Vec::new();
        for projectile in projectiles.iter_mut() {
            physics.update_projectile(projectile, dt);

            if projectile.lifetime_ms <= 0.0 {
                spent.push(projectile.id);
                continue;
            }

            let target = ships
                .iter_mut()
                .filter(|s| s.id != projectile.owner_id)
                .find(|s| physics.projectile_hits(projectile, s));

            if let Some(ship) = target {
                ship.health = (ship.health - projectile.damage).max(0);
                spent.push(projectile.id);
                debug!(
                    victim_id = %ship.id,
                    shooter_id = %projectile.owner_id,
                    projectile_id = %projectile.id,
                    victim_hp = ship.health,
                    "ship hit"
                );

                if ship.health == 0 {
                    respawn_ship(ship, rng, tuning);
                    info!(
                        victim_id = %ship.id,
                        shooter_id = %projectile.owner_id,
                        "ship destroyed"
                    );
                    destroyed.push(ShipDestroyed {
                        ship_id: ship.id,
                        destroyed_by: projectile.owner_id,
                    });
                }
            }
        }

        if !spent.is_empty() {
            projectiles.retain(|p| !spent.contains(&p.id));
        }

        *tick += 1;
    }
}

fn random_position(rng: &mut StdRng, tuning: &ArenaTuning) -> Vector2D {
    Vector2D::new(
        rng.gen_range(0.0..tuning.world.width),
        rng.gen_range(0.0..tuning.world.height),
    )
}

// Destruction is a same-step reset, never a roster removal.
fn respawn_ship(ship: &mut Ship, rng: &mut StdRng, tuning: &ArenaTuning) {
    ship.position = random_position(rng, tuning);
    ship.velocity = Vector2D::ZERO;
    ship.rotation = rng.gen_range(0.0..TAU);
    ship.health = ship.max_health;
}

#[cfg(test)]
impl<C: Clock> GameServer<C> {
    pub(crate) fn ship_mut(&mut self, player_id: PlayerId) -> Option<&mut Ship> {
        self.ships.iter_mut().find(|s| s.id == player_id)
    }

    pub(crate) fn projectiles(&self) -> &[Projectile] {
        &self.projectiles
    }
}
