// Wire protocol DTOs and conversions for the arena WebSocket.
// Every message is `{"type": ..., "data": ...}` with camelCase payload fields.

use crate::domain::{GameStateSnapshot, PlayerId, PlayerInput, Projectile, Ship, Vector2D};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Messages the server sends to connected clients over the WebSocket.
#[derive(Debug, Clone, Serialize)]
#[serde(
    tag = "type",
    content = "data",
    rename_all = "snake_case",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    // Unicast to the joiner: the ship it controls.
    PlayerSpawn {
        ship: ShipDto,
    },
    PlayerJoined {
        player_id: String,
        player_name: String,
        ship: ShipDto,
    },
    PlayerLeft {
        player_id: String,
    },
    ShipDestroyed {
        ship_id: String,
        destroyed_by: String,
    },
    GameState(GameStateDto),
}

/// Messages the client sends to the server over the WebSocket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    PlayerInput(PlayerInputDto),
}

impl ClientMessage {
    /// Parses an enveloped message, falling back to a bare input object for
    /// older clients that send the payload without `type`/`data`.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let envelope_err = match serde_json::from_str::<ClientMessage>(text) {
            Ok(msg) => return Ok(msg),
            Err(e) => e,
        };

        match serde_json::from_str::<Value>(text) {
            Ok(value @ Value::Object(_)) => match value.get("type") {
                None => serde_json::from_value::<PlayerInputDto>(value)
                    .map(ClientMessage::PlayerInput),
                // A known type only gets here when `data` is missing or unreadable.
                Some(Value::String(kind)) if kind == "player_input" => {
                    Ok(ClientMessage::PlayerInput(PlayerInputDto::default()))
                }
                Some(_) => Err(envelope_err),
            },
            _ => Err(envelope_err),
        }
    }
}

/// Control intent sent by the client. Malformed fields degrade to defaults
/// instead of rejecting the whole message.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInputDto {
    #[serde(default, deserialize_with = "only_true")]
    pub thrust: bool,
    #[serde(default, deserialize_with = "only_true")]
    pub rotate_left: bool,
    #[serde(default, deserialize_with = "only_true")]
    pub rotate_right: bool,
    #[serde(default, deserialize_with = "only_true")]
    pub fire: bool,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: u64,
}

fn only_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(matches!(value, Value::Bool(true)))
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let millis = match value.as_f64() {
        Some(n) if n.is_finite() && n >= 0.0 => n as u64,
        _ => 0,
    };
    Ok(millis)
}

impl From<PlayerInputDto> for PlayerInput {
    fn from(input: PlayerInputDto) -> Self {
        Self {
            thrust: input.thrust,
            rotate_left: input.rotate_left,
            rotate_right: input.rotate_right,
            fire: input.fire,
            timestamp: input.timestamp,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct Vector2Dto {
    pub x: f32,
    pub y: f32,
}

impl From<Vector2D> for Vector2Dto {
    fn from(v: Vector2D) -> Self {
        Self { x: v.x, y: v.y }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipDto {
    pub id: String,
    pub position: Vector2Dto,
    pub velocity: Vector2Dto,
    pub rotation: f32,
    pub health: i32,
    pub max_health: i32,
    pub color: String,
    pub player_name: String,
}

impl From<&Ship> for ShipDto {
    fn from(ship: &Ship) -> Self {
        Self {
            id: ship.id.to_string(),
            position: ship.position.into(),
            velocity: ship.velocity.into(),
            rotation: ship.rotation,
            health: ship.health,
            max_health: ship.max_health,
            color: ship.color.to_string(),
            player_name: ship.player_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectileDto {
    pub id: String,
    pub owner_id: String,
    pub position: Vector2Dto,
    pub velocity: Vector2Dto,
    pub damage: i32,
    // Remaining milliseconds.
    pub lifetime: f32,
}

impl From<&Projectile> for ProjectileDto {
    fn from(projectile: &Projectile) -> Self {
        Self {
            id: projectile.id.to_string(),
            owner_id: projectile.owner_id.to_string(),
            position: projectile.position.into(),
            velocity: projectile.velocity.into(),
            damage: projectile.damage,
            lifetime: projectile.lifetime_ms,
        }
    }
}

/// Periodic world snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct GameStateDto {
    pub ships: Vec<ShipDto>,
    pub projectiles: Vec<ProjectileDto>,
    pub timestamp: u64,
    pub tick: u64,
}

impl From<&GameStateSnapshot> for GameStateDto {
    fn from(snapshot: &GameStateSnapshot) -> Self {
        Self {
            ships: snapshot.ships.iter().map(ShipDto::from).collect(),
            projectiles: snapshot.projectiles.iter().map(ProjectileDto::from).collect(),
            timestamp: snapshot.timestamp,
            tick: snapshot.tick,
        }
    }
}

impl ServerMessage {
    pub fn player_spawn(ship: &Ship) -> Self {
        ServerMessage::PlayerSpawn { ship: ship.into() }
    }

    pub fn player_joined(player_id: PlayerId, player_name: &str, ship: &Ship) -> Self {
        ServerMessage::PlayerJoined {
            player_id: player_id.to_string(),
            player_name: player_name.to_string(),
            ship: ship.into(),
        }
    }

    pub fn player_left(player_id: PlayerId) -> Self {
        ServerMessage::PlayerLeft {
            player_id: player_id.to_string(),
        }
    }

    pub fn ship_destroyed(ship_id: PlayerId, destroyed_by: PlayerId) -> Self {
        ServerMessage::ShipDestroyed {
            ship_id: ship_id.to_string(),
            destroyed_by: destroyed_by.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProjectileId;
    use serde_json::json;

    fn ship() -> Ship {
        Ship {
            id: PlayerId(42),
            position: Vector2D::new(1.5, 2.0),
            velocity: Vector2D::new(-3.0, 0.0),
            rotation: 0.5,
            health: 90,
            max_health: 100,
            color: "#ff6b6b",
            player_name: "Ace".to_string(),
        }
    }

    fn input_of(text: &str) -> PlayerInput {
        match ClientMessage::parse(text).expect("parses") {
            ClientMessage::PlayerInput(dto) => dto.into(),
        }
    }

    #[test]
    fn when_spawn_is_serialized_then_type_and_camel_case_fields_are_used() {
        let value = serde_json::to_value(ServerMessage::player_spawn(&ship())).unwrap();

        assert_eq!(value["type"], "player_spawn");
        let ship = &value["data"]["ship"];
        assert_eq!(ship["id"], "42");
        assert_eq!(ship["maxHealth"], 100);
        assert_eq!(ship["playerName"], "Ace");
        assert_eq!(ship["position"], json!({"x": 1.5, "y": 2.0}));
        assert_eq!(ship["color"], "#ff6b6b");
    }

    #[test]
    fn when_roster_messages_are_serialized_then_ids_are_strings() {
        let joined =
            serde_json::to_value(ServerMessage::player_joined(PlayerId(7), "Ace", &ship()))
                .unwrap();
        assert_eq!(joined["type"], "player_joined");
        assert_eq!(joined["data"]["playerId"], "7");
        assert_eq!(joined["data"]["playerName"], "Ace");

        let left = serde_json::to_value(ServerMessage::player_left(PlayerId(7))).unwrap();
        assert_eq!(left, json!({"type": "player_left", "data": {"playerId": "7"}}));

        let destroyed =
            serde_json::to_value(ServerMessage::ship_destroyed(PlayerId(1), PlayerId(2))).unwrap();
        assert_eq!(
            destroyed,
            json!({"type": "ship_destroyed", "data": {"shipId": "1", "destroyedBy": "2"}})
        );
    }

    #[test]
    fn when_game_state_is_serialized_then_projectiles_carry_owner_and_lifetime() {
        let snapshot = GameStateSnapshot {
            tick: 9,
            timestamp: 1_234,
            ships: vec![ship()],
            projectiles: vec![Projectile {
                id: ProjectileId(3),
                owner_id: PlayerId(42),
                position: Vector2D::new(5.0, 5.0),
                velocity: Vector2D::new(500.0, 0.0),
                damage: 10,
                lifetime_ms: 1_500.0,
            }],
        };

        let value =
            serde_json::to_value(ServerMessage::GameState(GameStateDto::from(&snapshot))).unwrap();

        assert_eq!(value["type"], "game_state");
        assert_eq!(value["data"]["tick"], 9);
        assert_eq!(value["data"]["timestamp"], 1_234);
        assert_eq!(value["data"]["ships"].as_array().map(Vec::len), Some(1));
        let projectile = &value["data"]["projectiles"][0];
        assert_eq!(projectile["id"], "3");
        assert_eq!(projectile["ownerId"], "42");
        assert_eq!(projectile["lifetime"], 1_500.0);
    }

    #[test]
    fn when_input_is_enveloped_then_all_fields_are_read() {
        let input = input_of(
            r#"{"type":"player_input","data":{"thrust":true,"rotateLeft":false,"rotateRight":true,"fire":true,"timestamp":99}}"#,
        );

        assert_eq!(
            input,
            PlayerInput {
                thrust: true,
                rotate_left: false,
                rotate_right: true,
                fire: true,
                timestamp: 99,
            }
        );
    }

    #[test]
    fn when_booleans_are_not_literally_true_then_they_read_as_false() {
        let input = input_of(
            r#"{"type":"player_input","data":{"thrust":1,"rotateLeft":"true","rotateRight":null,"fire":{}}}"#,
        );

        assert_eq!(input, PlayerInput::default());
    }

    #[test]
    fn when_timestamp_is_invalid_then_it_reads_as_zero() {
        for raw in [r#""soon""#, "-5", "null", "[]"] {
            let text = format!(r#"{{"type":"player_input","data":{{"timestamp":{raw}}}}}"#);
            assert_eq!(input_of(&text).timestamp, 0, "timestamp {raw}");
        }
        assert_eq!(
            input_of(r#"{"type":"player_input","data":{"timestamp":12.9}}"#).timestamp,
            12
        );
    }

    #[test]
    fn when_input_is_bare_then_it_is_accepted_as_legacy() {
        let input = input_of(r#"{"thrust":true,"fire":true}"#);

        assert!(input.thrust);
        assert!(input.fire);
        assert!(!input.rotate_left);
    }

    #[test]
    fn when_input_payload_is_missing_or_not_an_object_then_it_reads_as_idle() {
        for text in [
            r#"{"type":"player_input"}"#,
            r#"{"type":"player_input","data":null}"#,
            r#"{"type":"player_input","data":"fire"}"#,
        ] {
            assert_eq!(input_of(text), PlayerInput::default(), "{text}");
        }
    }

    #[test]
    fn when_message_type_is_unknown_or_text_is_garbage_then_parse_fails() {
        assert!(ClientMessage::parse(r#"{"type":"chat","data":{"text":"hi"}}"#).is_err());
        assert!(ClientMessage::parse("not json").is_err());
        assert!(ClientMessage::parse("[1,2,3]").is_err());
    }
}
