//! Wire protocol and simulation primitives shared between server and client.
//!
//! The server is authoritative: clients send control messages ([`ClientMessage`])
//! and render whatever state the server pushes back ([`ServerMessage`]). All
//! messages travel as single JSON text frames over the websocket.

use serde::{Deserialize, Serialize};

pub mod physics;

pub use physics::{advance, clamp_paddle, serve, step_paddle, Ball, Paddles, PongState};

pub const FIELD_WIDTH: f32 = 800.0;
pub const FIELD_HEIGHT: f32 = 600.0;
pub const PADDLE_WIDTH: f32 = 12.0;
pub const PADDLE_HEIGHT: f32 = 100.0;
pub const PADDLE_SPEED: f32 = 420.0;
pub const BALL_SIZE: f32 = 14.0;
pub const BALL_SPEED: f32 = 320.0;
pub const SPIN_MULTIPLIER: f32 = 0.9;
pub const SERVE_CONE: f32 = std::f32::consts::FRAC_PI_6;
pub const DEFAULT_WIN_THRESHOLD: u32 = 5;
pub const TICK_RATE: u32 = 60;

/// Fixed simulation parameters for one room, decided at room creation and
/// sent to both clients when they bind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    pub field_width: f32,
    pub field_height: f32,
    pub paddle_width: f32,
    pub paddle_height: f32,
    pub paddle_speed: f32,
    pub ball_size: f32,
    pub ball_speed: f32,
    pub spin_multiplier: f32,
    /// Maximum angle (radians) from horizontal for a fresh serve.
    pub serve_cone: f32,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig {
            field_width: FIELD_WIDTH,
            field_height: FIELD_HEIGHT,
            paddle_width: PADDLE_WIDTH,
            paddle_height: PADDLE_HEIGHT,
            paddle_speed: PADDLE_SPEED,
            ball_size: BALL_SIZE,
            ball_speed: BALL_SPEED,
            spin_multiplier: SPIN_MULTIPLIER,
            serve_cone: SERVE_CONE,
        }
    }
}

/// One of the two fixed player positions in a room. The creator always plays
/// left, the opponent right.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn opposite(&self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    pub left: u32,
    pub right: u32,
}

impl Scores {
    pub fn for_side(&self, side: Side) -> u32 {
        match side {
            Side::Left => self.left,
            Side::Right => self.right,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomPhase {
    Waiting,
    Playing,
    Finished,
}

/// Read-only projection of a room, safe to show to anyone. Never carries the
/// password or any connection handle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub id: String,
    pub name: String,
    pub has_password: bool,
    pub phase: RoomPhase,
    pub occupants: u8,
    pub creator_name: String,
    pub opponent_name: Option<String>,
    pub created_at_unix: u64,
}

/// Messages a client may send over its socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Auth { token: String },
    JoinRoom { room_id: String },
    Ready { ready: bool },
    PaddleMove { y: f32 },
    LeaveRoom,
}

/// Messages the server pushes to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    AuthSuccess {
        id: String,
        display_name: String,
    },
    AuthError {
        reason: String,
    },
    JoinedRoom {
        side: Side,
        config: GameConfig,
    },
    RoomUpdate {
        summary: RoomSummary,
    },
    PlayerReady {
        player_id: String,
        ready: bool,
    },
    GameStart,
    GameState {
        ball: Ball,
        paddles: Paddles,
        scores: Scores,
    },
    GameEnd {
        winner_side: Side,
        winner_id: String,
        winner_name: String,
        final_score: Scores,
    },
    OpponentLeft {
        player_id: String,
    },
    Error {
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Left.opposite(), Side::Right);
        assert_eq!(Side::Right.opposite(), Side::Left);
    }

    #[test]
    fn test_scores_for_side() {
        let scores = Scores { left: 3, right: 5 };
        assert_eq!(scores.for_side(Side::Left), 3);
        assert_eq!(scores.for_side(Side::Right), 5);
    }

    #[test]
    fn test_default_config_is_consistent() {
        let config = GameConfig::default();
        assert!(config.paddle_height < config.field_height);
        assert!(config.paddle_width < config.field_width / 2.0);
        assert!(config.ball_size < config.paddle_height);
        assert!(config.serve_cone > 0.0 && config.serve_cone < std::f32::consts::FRAC_PI_2);
    }

    #[test]
    fn test_client_message_roundtrip() {
        let messages = vec![
            ClientMessage::Auth {
                token: "42:alice".to_string(),
            },
            ClientMessage::JoinRoom {
                room_id: "room-1".to_string(),
            },
            ClientMessage::Ready { ready: true },
            ClientMessage::PaddleMove { y: 250.0 },
            ClientMessage::LeaveRoom,
        ];

        for message in messages {
            let json = serde_json::to_string(&message).unwrap();
            let back: ClientMessage = serde_json::from_str(&json).unwrap();
            assert_eq!(back, message);
        }
    }

    #[test]
    fn test_server_message_roundtrip() {
        let summary = RoomSummary {
            id: "room-1".to_string(),
            name: "duel".to_string(),
            has_password: true,
            phase: RoomPhase::Waiting,
            occupants: 1,
            creator_name: "alice".to_string(),
            opponent_name: None,
            created_at_unix: 1_700_000_000,
        };

        let messages = vec![
            ServerMessage::AuthSuccess {
                id: "42".to_string(),
                display_name: "alice".to_string(),
            },
            ServerMessage::JoinedRoom {
                side: Side::Left,
                config: GameConfig::default(),
            },
            ServerMessage::RoomUpdate { summary },
            ServerMessage::GameStart,
            ServerMessage::GameEnd {
                winner_side: Side::Left,
                winner_id: "42".to_string(),
                winner_name: "alice".to_string(),
                final_score: Scores { left: 5, right: 2 },
            },
            ServerMessage::Error {
                reason: "unknown_message".to_string(),
            },
        ];

        for message in messages {
            let json = serde_json::to_string(&message).unwrap();
            let back: ServerMessage = serde_json::from_str(&json).unwrap();
            assert_eq!(back, message);
        }
    }

    #[test]
    fn test_message_tagging_is_snake_case() {
        let json = serde_json::to_string(&ClientMessage::LeaveRoom).unwrap();
        assert_eq!(json, r#"{"type":"leave_room"}"#);

        let json = serde_json::to_string(&ServerMessage::GameStart).unwrap();
        assert_eq!(json, r#"{"type":"game_start"}"#);
    }

    #[test]
    fn test_unknown_message_fails_to_parse() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"type":"fire_laser"}"#);
        assert!(result.is_err());
    }
}
