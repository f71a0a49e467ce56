use super::game_server::GameServer;
use super::types::{GameEvent, RosterEvent, WorldUpdate};
use crate::domain::Clock;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, broadcast, mpsc};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

/// Cadence of the two periodic actions driven by the world task.
#[derive(Debug, Clone, Copy)]
pub struct WorldSettings {
    /// Interval between simulation ticks.
    pub tick_interval: Duration,
    /// Interval between published snapshots.
    pub broadcast_interval: Duration,
}

/// Single owner of the arena state.
///
/// Connection events, simulation ticks and snapshot production are all
/// serialized on this task, so the roster needs no locking and a snapshot can
/// never observe a half-finished tick.
pub async fn world_task<C: Clock + 'static>(
    mut game: GameServer<C>,
    mut input_rx: mpsc::Receiver<GameEvent>,
    world_tx: broadcast::Sender<WorldUpdate>,
    roster_tx: broadcast::Sender<RosterEvent>,
    settings: WorldSettings,
    shutdown: Arc<Notify>,
) {
    let mut tick_timer = interval(settings.tick_interval);
    tick_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut broadcast_timer = interval(settings.broadcast_interval);
    broadcast_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(
        tick_ms = settings.tick_interval.as_millis() as u64,
        broadcast_ms = settings.broadcast_interval.as_millis() as u64,
        "world task started"
    );

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                info!("world task shutting down");
                break;
            }
            event = input_rx.recv() => {
                let Some(event) = event else {
                    info!("event channel closed; world task exiting");
                    break;
                };
                apply_event(&mut game, event, &roster_tx);
            }
            _ = tick_timer.tick() => {
                run_tick(&mut game, &mut input_rx, &roster_tx);
            }
            _ = broadcast_timer.tick() => {
                // No receivers just means nobody is connected yet.
                let _ = world_tx.send(game.game_state());
            }
        }
    }
}

// Drains anything already queued so a pending leave lands before the step.
fn run_tick<C: Clock>(
    game: &mut GameServer<C>,
    input_rx: &mut mpsc::Receiver<GameEvent>,
    roster_tx: &broadcast::Sender<RosterEvent>,
) {
    while let Ok(event) = input_rx.try_recv() {
        apply_event(game, event, roster_tx);
    }

    let outcome = game.update();
    for destroyed in outcome.destroyed {
        let _ = roster_tx.send(RosterEvent::ShipDestroyed {
            ship_id: destroyed.ship_id,
            destroyed_by: destroyed.destroyed_by,
        });
    }
}

fn apply_event<C: Clock>(
    game: &mut GameServer<C>,
    event: GameEvent,
    roster_tx: &broadcast::Sender<RosterEvent>,
) {
    match event {
        GameEvent::Join {
            player_id,
            player_name,
            respond_to,
        } => {
            let ship = game.add_player(player_id, player_name.clone());
            if respond_to.send(ship.clone()).is_err() {
                // The connection gave up waiting; don't leave an orphaned ship behind.
                game.remove_player(player_id);
                debug!(%player_id, "join abandoned before spawn was delivered");
                return;
            }

            info!(%player_id, %player_name, players = game.player_count(), "player joined");
            let _ = roster_tx.send(RosterEvent::Joined {
                player_id,
                player_name,
                ship,
            });
        }
        GameEvent::Leave { player_id } => {
            if game.remove_player(player_id) {
                info!(%player_id, players = game.player_count(), "player left");
                let _ = roster_tx.send(RosterEvent::Left { player_id });
            }
        }
        GameEvent::Input { player_id, input } => {
            game.update_player_input(player_id, input);
        }
    }
}
