use crate::domain::{PlayerId, PlayerInput, Ship};
use crate::interface_adapters::protocol::{ClientMessage, GameStateDto, ServerMessage};
use crate::interface_adapters::state::AppState;
use crate::interface_adapters::utils::rand_id;
use crate::use_cases::{GameEvent, RosterEvent, WorldUpdate};

use axum::{
    Error,
    extract::{
        Query, State,
        ws::{CloseFrame, Message, Utf8Bytes, WebSocket, WebSocketUpgrade, close_code},
    },
    response::IntoResponse,
};
use futures::SinkExt;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::timeout;
use tracing::{Instrument, debug, error, info, info_span, warn};

#[derive(Debug)]
enum NetError {
    // Categorizes connection lifecycle failures so callers can decide policy.
    #[allow(dead_code)]
    Ws(axum::Error),
    #[allow(dead_code)]
    Serialization(serde_json::Error),
    InputClosed,
    WorldUpdatesClosed,
    RosterClosed,
    JoinTimeout,
}

impl From<axum::Error> for NetError {
    fn from(e: axum::Error) -> Self {
        NetError::Ws(e)
    }
}

#[derive(Debug, serde::Deserialize)]
pub struct JoinQuery {
    // Display name requested by the client.
    #[serde(default)]
    name: Option<String>,
}

const LOG_THROTTLE: Duration = Duration::from_secs(2);
const MAX_INVALID_JSON: u32 = 10;
const MAX_NAME_CHARS: usize = 24;
const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

pub async fn world_update_serializer(
    mut world_rx: broadcast::Receiver<WorldUpdate>,
    world_bytes_tx: broadcast::Sender<Utf8Bytes>,
    world_latest_tx: watch::Sender<Utf8Bytes>,
) {
    // Serialize each snapshot once and broadcast the shared bytes.
    loop {
        match world_rx.recv().await {
            Ok(update) => {
                let msg = ServerMessage::GameState(GameStateDto::from(&update));
                let txt = match serde_json::to_string(&msg) {
                    Ok(txt) => txt,
                    Err(e) => {
                        error!(error = ?e, "failed to serialize game state");
                        continue;
                    }
                };

                let bytes = Utf8Bytes::from(txt);
                let _ = world_latest_tx.send(bytes.clone());
                let _ = world_bytes_tx.send(bytes);
            }
            Err(broadcast::error::RecvError::Lagged(n)) => {
                warn!(
                    missed = n,
                    "world serializer lagged; skipping to latest update"
                );
            }
            Err(broadcast::error::RecvError::Closed) => {
                warn!("world updates channel closed; serializer exiting");
                break;
            }
        }
    }
}

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<JoinQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query.name))
}

/// Resolves the name shown to other players: trimmed and capped, or a
/// generated `Player<NNN>` when nothing usable was sent.
fn display_name(requested: Option<&str>, player_id: PlayerId) -> String {
    let trimmed = requested.map(str::trim).unwrap_or_default();
    if trimmed.is_empty() {
        return format!("Player{:03}", player_id.0 % 1000);
    }
    trimmed.chars().take(MAX_NAME_CHARS).collect()
}

async fn handle_socket(mut socket: WebSocket, state: Arc<AppState>, requested_name: Option<String>) {
    // Separate connection id for correlating logs with transport-level events.
    let conn_id = rand_id();
    let player_id = PlayerId(rand_id());
    let span = info_span!("conn", conn_id, player_id = player_id.0);

    async move {
        let player_name = display_name(requested_name.as_deref(), player_id);

        let mut ctx = match bootstrap_connection(&mut socket, &state, player_id, player_name).await
        {
            Ok(ctx) => ctx,
            Err(e) => {
                error!(error = ?e, "failed to bootstrap connection");
                let _ = socket
                    .send(Message::Close(Some(CloseFrame {
                        code: close_code::ERROR,
                        reason: "join failed".into(),
                    })))
                    .await;
                let _ = socket.close().await;
                return;
            }
        };

        info!(player_name = %ctx.player_name, "client connected");

        if let Err(e) = run_client_loop(&mut socket, &mut ctx).await {
            warn!(error = ?e, "client loop exited with error");
        }
    }
    .instrument(span)
    .await
}

async fn send_message(socket: &mut WebSocket, msg: &ServerMessage) -> Result<usize, NetError> {
    let txt = serde_json::to_string(msg).map_err(NetError::Serialization)?;
    let bytes = txt.len();
    socket
        .send(Message::Text(txt.into()))
        .await
        .map_err(NetError::Ws)?;
    Ok(bytes)
}

struct ConnCtx {
    pub player_id: PlayerId,
    pub player_name: String,
    pub input_tx: mpsc::Sender<GameEvent>,
    pub world_bytes_rx: broadcast::Receiver<Utf8Bytes>,
    pub world_latest_rx: watch::Receiver<Utf8Bytes>,
    pub roster_rx: broadcast::Receiver<RosterEvent>,
    // Count lag recovery snapshots sent to this client.
    pub lag_recovery_count: u64,

    pub msgs_in: u64,
    pub msgs_out: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,

    pub invalid_json: u32,

    pub last_input_full_log: Instant,
    pub last_world_lag_log: Instant,
    pub last_roster_lag_log: Instant,
    pub last_invalid_input_log: Instant,

    pub close_frame: Option<CloseFrame>,
}

async fn bootstrap_connection(
    socket: &mut WebSocket,
    state: &AppState,
    player_id: PlayerId,
    player_name: String,
) -> Result<ConnCtx, NetError> {
    // Subscribe before joining so neither our own spawn nor the next snapshot is missed.
    let world_bytes_rx = state.world_bytes_tx.subscribe();
    let world_latest_rx = state.world_latest_tx.subscribe();
    let roster_rx = state.roster_tx.subscribe();

    let ship = request_join(&state.input_tx, player_id, player_name.clone()).await?;

    // If anything after Join fails, compensate with Leave to avoid a ship nobody controls.
    let bytes_out = match send_message(socket, &ServerMessage::player_spawn(&ship)).await {
        Ok(bytes) => bytes as u64,
        Err(e) => {
            let _ = state.input_tx.send(GameEvent::Leave { player_id }).await;
            return Err(e);
        }
    };

    let now = Instant::now() - LOG_THROTTLE;
    Ok(ConnCtx {
        player_id,
        player_name,
        input_tx: state.input_tx.clone(),
        world_bytes_rx,
        world_latest_rx,
        roster_rx,
        lag_recovery_count: 0,

        msgs_in: 0,
        msgs_out: 1,
        bytes_in: 0,
        bytes_out,

        invalid_json: 0,

        last_input_full_log: now,
        last_world_lag_log: now,
        last_roster_lag_log: now,
        last_invalid_input_log: now,

        close_frame: None,
    })
}

async fn request_join(
    input_tx: &mpsc::Sender<GameEvent>,
    player_id: PlayerId,
    player_name: String,
) -> Result<Ship, NetError> {
    let (respond_to, reply) = oneshot::channel();
    input_tx
        .send(GameEvent::Join {
            player_id,
            player_name,
            respond_to,
        })
        .await
        .map_err(|_| NetError::InputClosed)?;

    match timeout(JOIN_TIMEOUT, reply).await {
        Ok(Ok(ship)) => Ok(ship),
        // The world task dropped the reply without answering; it is gone.
        Ok(Err(_)) => Err(NetError::InputClosed),
        Err(_) => {
            // The spawn may still land after we stop waiting; make sure it is undone.
            let _ = input_tx.send(GameEvent::Leave { player_id }).await;
            Err(NetError::JoinTimeout)
        }
    }
}

enum LoopControl {
    Continue,
    Disconnect,
}

fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}

/// Maps a roster notification to what this connection should see. A player's
/// own join is already covered by `player_spawn`.
fn roster_message(event: &RosterEvent, me: PlayerId) -> Option<ServerMessage> {
    match event {
        RosterEvent::Joined { player_id, .. } if *player_id == me => None,
        RosterEvent::Joined {
            player_id,
            player_name,
            ship,
        } => Some(ServerMessage::player_joined(*player_id, player_name, ship)),
        RosterEvent::Left { player_id } => Some(ServerMessage::player_left(*player_id)),
        RosterEvent::ShipDestroyed {
            ship_id,
            destroyed_by,
        } => Some(ServerMessage::ship_destroyed(*ship_id, *destroyed_by)),
    }
}

fn process_input_message(ctx: &mut ConnCtx, input: PlayerInput) -> Result<LoopControl, NetError> {
    let player_id = ctx.player_id;
    match ctx.input_tx.try_send(GameEvent::Input { player_id, input }) {
        Ok(()) => Ok(LoopControl::Continue),
        Err(mpsc::error::TrySendError::Full(_evt)) => {
            if should_log(&mut ctx.last_input_full_log) {
                warn!(%player_id, "input channel full; dropping input");
            }
            Ok(LoopControl::Continue)
        }
        Err(mpsc::error::TrySendError::Closed(_evt)) => Err(NetError::InputClosed),
    }
}

async fn run_client_loop(socket: &mut WebSocket, ctx: &mut ConnCtx) -> Result<(), NetError> {
    let mut fatal: Option<NetError> = None;

    loop {
        // disconnect becomes true on error
        let disconnect: bool = tokio::select! {
            incoming = socket.recv() => {
                match handle_incoming_ws(incoming, ctx) {
                    Ok(LoopControl::Continue) => false,
                    Ok(LoopControl::Disconnect) => true,
                    Err(e) => {
                        fatal = Some(e);
                        true
                    }
                }
            }

            world_msg = ctx.world_bytes_rx.recv() => {
                match world_msg {
                    Ok(bytes) => matches!(
                        forward_world_bytes(bytes, socket, ctx).await,
                        LoopControl::Disconnect
                    ),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        if should_log(&mut ctx.last_world_lag_log) {
                            warn!(missed = n, "world updates lagged; sending snapshot");
                        }

                        // Resync strategy: send the latest snapshot instead of the backlog.
                        let latest = ctx.world_latest_rx.borrow().clone();
                        if latest.is_empty() {
                            false
                        } else {
                            ctx.lag_recovery_count += 1;
                            debug!(
                                bytes = latest.len(),
                                count = ctx.lag_recovery_count,
                                "sending lag recovery snapshot"
                            );
                            matches!(
                                forward_world_bytes(latest, socket, ctx).await,
                                LoopControl::Disconnect
                            )
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::WorldUpdatesClosed);
                        true
                    }
                }
            }

            roster = ctx.roster_rx.recv() => {
                match roster {
                    Ok(event) => match roster_message(&event, ctx.player_id) {
                        Some(msg) => matches!(
                            forward_message(&msg, socket, ctx).await,
                            LoopControl::Disconnect
                        ),
                        None => false,
                    },
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        // Roster notices are informational; snapshots carry the truth.
                        if should_log(&mut ctx.last_roster_lag_log) {
                            warn!(missed = n, "roster events lagged; skipping");
                        }
                        false
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        fatal = Some(NetError::RosterClosed);
                        true
                    }
                }
            }
        };

        if disconnect {
            if let Some(frame) = ctx.close_frame.take() {
                let _ = socket.send(Message::Close(Some(frame))).await;
            }
            if let Err(err) = socket.close().await.map_err(NetError::Ws) {
                debug!(error = ?err, "socket close error");
            }
            break;
        }
    }

    if let Err(e) = disconnect_cleanup(ctx).await {
        warn!(error = ?e, "error during disconnect cleanup");
        if fatal.is_none() {
            fatal = Some(e);
        }
    }

    match fatal {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn handle_incoming_ws(
    incoming: Option<Result<Message, Error>>,
    ctx: &mut ConnCtx,
) -> Result<LoopControl, NetError> {
    let player_id = ctx.player_id;
    match incoming {
        Some(Ok(msg)) => match msg {
            Message::Text(text) => {
                ctx.msgs_in += 1;
                ctx.bytes_in += text.len() as u64;

                match ClientMessage::parse(&text) {
                    Ok(ClientMessage::PlayerInput(input)) => {
                        process_input_message(ctx, input.into())
                    }
                    Err(parse_err) => {
                        ctx.invalid_json += 1;
                        if should_log(&mut ctx.last_invalid_input_log) {
                            warn!(
                                %player_id,
                                bytes = text.len(),
                                error = %parse_err,
                                "failed to parse client message"
                            );
                        }

                        if ctx.invalid_json > MAX_INVALID_JSON {
                            ctx.close_frame = Some(CloseFrame {
                                code: close_code::POLICY,
                                reason: "too many invalid messages".into(),
                            });
                            return Ok(LoopControl::Disconnect);
                        }

                        Ok(LoopControl::Continue)
                    }
                }
            }
            Message::Binary(_) => {
                ctx.close_frame = Some(CloseFrame {
                    code: close_code::UNSUPPORTED,
                    reason: "binary messages not supported".into(),
                });
                Ok(LoopControl::Disconnect)
            }
            Message::Ping(_) | Message::Pong(_) => Ok(LoopControl::Continue),
            Message::Close(_) => Ok(LoopControl::Disconnect),
        },
        Some(Err(e)) => {
            warn!(%player_id, error = %e, "websocket recv error");
            Ok(LoopControl::Disconnect)
        }
        None => {
            info!(%player_id, "websocket closed");
            Ok(LoopControl::Disconnect)
        }
    }
}

async fn forward_world_bytes(
    world_msg: Utf8Bytes,
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
) -> LoopControl {
    let bytes_len = world_msg.len();
    match socket
        .send(Message::Text(world_msg))
        .await
        .map_err(NetError::Ws)
    {
        Ok(()) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes_len as u64;
            LoopControl::Continue
        }
        Err(err) => {
            // Disconnect follows immediately.
            warn!(error = ?err, "failed to send game state");
            LoopControl::Disconnect
        }
    }
}

async fn forward_message(
    msg: &ServerMessage,
    socket: &mut WebSocket,
    ctx: &mut ConnCtx,
) -> LoopControl {
    match send_message(socket, msg).await {
        Ok(bytes) => {
            ctx.msgs_out += 1;
            ctx.bytes_out += bytes as u64;
            LoopControl::Continue
        }
        Err(err) => {
            warn!(error = ?err, "failed to send roster message");
            LoopControl::Disconnect
        }
    }
}

async fn disconnect_cleanup(ctx: &ConnCtx) -> Result<(), NetError> {
    let player_id = ctx.player_id;
    ctx.input_tx
        .send(GameEvent::Leave { player_id })
        .await
        .map_err(|_| NetError::InputClosed)?;

    debug!(
        %player_id,
        msgs_in = ctx.msgs_in,
        msgs_out = ctx.msgs_out,
        bytes_in = ctx.bytes_in,
        bytes_out = ctx.bytes_out,
        invalid_json = ctx.invalid_json,
        lag_recovery_count = ctx.lag_recovery_count,
        "connection stats"
    );
    info!(%player_id, "client disconnected");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Vector2D;

    fn ship(id: u64) -> Ship {
        Ship {
            id: PlayerId(id),
            position: Vector2D::new(10.0, 10.0),
            velocity: Vector2D::ZERO,
            rotation: 0.0,
            health: 100,
            max_health: 100,
            color: "#4ecdc4",
            player_name: "Ace".to_string(),
        }
    }

    #[test]
    fn when_name_is_missing_or_blank_then_a_numbered_default_is_used() {
        assert_eq!(display_name(None, PlayerId(1_234_007)), "Player007");
        assert_eq!(display_name(Some("   "), PlayerId(42)), "Player042");
    }

    #[test]
    fn when_name_is_given_then_it_is_trimmed_and_capped() {
        assert_eq!(display_name(Some("  Maverick "), PlayerId(1)), "Maverick");

        let long = "ä".repeat(40);
        let name = display_name(Some(&long), PlayerId(1));
        assert_eq!(name.chars().count(), MAX_NAME_CHARS);
    }

    #[test]
    fn when_own_join_is_announced_then_it_is_not_echoed_back() {
        let me = PlayerId(5);
        let own = RosterEvent::Joined {
            player_id: me,
            player_name: "Ace".to_string(),
            ship: ship(5),
        };
        let other = RosterEvent::Joined {
            player_id: PlayerId(6),
            player_name: "Ace".to_string(),
            ship: ship(6),
        };

        assert!(roster_message(&own, me).is_none());
        assert!(matches!(
            roster_message(&other, me),
            Some(ServerMessage::PlayerJoined { player_id, .. }) if player_id == "6"
        ));
    }

    #[test]
    fn when_roster_changes_then_everyone_hears_about_leaves_and_destructions() {
        let me = PlayerId(5);

        assert!(matches!(
            roster_message(&RosterEvent::Left { player_id: PlayerId(6) }, me),
            Some(ServerMessage::PlayerLeft { player_id }) if player_id == "6"
        ));
        assert!(matches!(
            roster_message(
                &RosterEvent::ShipDestroyed {
                    ship_id: me,
                    destroyed_by: PlayerId(6),
                },
                me
            ),
            Some(ServerMessage::ShipDestroyed { ship_id, destroyed_by })
                if ship_id == "5" && destroyed_by == "6"
        ));
    }
}
