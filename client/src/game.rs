//! Client-side view of the match: a small protocol state machine plus the
//! last snapshot the server sent. Frames are latest-wins; nothing here
//! extrapolates or predicts.

use log::{debug, warn};
use shared::{
    ClientMessage, GameConfig, PongState, RoomSummary, Scores, ServerMessage, Side,
};

#[derive(Debug, Clone, PartialEq)]
pub enum AppPhase {
    /// Auth sent, waiting for the verdict.
    Authenticating,
    /// Authenticated, waiting for the room to accept the connection.
    Joining,
    /// In the room, waiting for both players to ready up.
    Waiting { side: Side },
    Playing { side: Side },
    /// Terminal: the match ended or something unrecoverable happened.
    Ended { message: String },
    Disconnected,
}

pub struct ClientApp {
    pub phase: AppPhase,
    pub room_id: String,
    pub config: GameConfig,
    pub state: PongState,
    pub scores: Scores,
    pub summary: Option<RoomSummary>,
    pub last_error: Option<String>,
    pub ready: bool,
    pub player_id: Option<String>,
}

impl ClientApp {
    pub fn new(room_id: String) -> Self {
        let config = GameConfig::default();
        ClientApp {
            phase: AppPhase::Authenticating,
            room_id,
            state: PongState::new(&config),
            config,
            scores: Scores::default(),
            summary: None,
            last_error: None,
            ready: false,
            player_id: None,
        }
    }

    pub fn my_side(&self) -> Option<Side> {
        match self.phase {
            AppPhase::Waiting { side } | AppPhase::Playing { side } => Some(side),
            _ => None,
        }
    }

    /// Applies one server event. Returns a message to send back when the
    /// event calls for an automatic reply (joining the room after auth).
    pub fn apply(&mut self, event: ServerMessage) -> Option<ClientMessage> {
        match event {
            ServerMessage::AuthSuccess { id, display_name } => {
                debug!("authenticated as {} ({})", display_name, id);
                self.player_id = Some(id);
                self.phase = AppPhase::Joining;
                Some(ClientMessage::JoinRoom {
                    room_id: self.room_id.clone(),
                })
            }
            ServerMessage::AuthError { reason } => {
                self.phase = AppPhase::Ended {
                    message: format!("authentication failed: {}", reason),
                };
                None
            }
            ServerMessage::JoinedRoom { side, config } => {
                self.config = config;
                self.state = PongState::new(&config);
                self.phase = AppPhase::Waiting { side };
                None
            }
            ServerMessage::RoomUpdate { summary } => {
                self.summary = Some(summary);
                None
            }
            ServerMessage::PlayerReady { player_id, ready } => {
                if self.player_id.as_deref() == Some(&player_id) {
                    self.ready = ready;
                }
                None
            }
            ServerMessage::GameStart => {
                if let AppPhase::Waiting { side } = self.phase {
                    self.scores = Scores::default();
                    self.phase = AppPhase::Playing { side };
                }
                None
            }
            ServerMessage::GameState {
                ball,
                paddles,
                scores,
            } => {
                // A live frame while still waiting means the match is
                // already running and this connection came in mid-game
                // (reconnect); the server does not replay GameStart.
                if let AppPhase::Waiting { side } = self.phase {
                    self.phase = AppPhase::Playing { side };
                }
                self.state.ball = ball;
                self.state.paddles = paddles;
                self.scores = scores;
                None
            }
            ServerMessage::GameEnd {
                winner_name,
                final_score,
                ..
            } => {
                self.scores = final_score;
                self.phase = AppPhase::Ended {
                    message: format!(
                        "{} wins {} - {}",
                        winner_name, final_score.left, final_score.right
                    ),
                };
                None
            }
            ServerMessage::OpponentLeft { .. } => {
                match self.phase {
                    // The creator keeps the room; it reverts to waiting for
                    // a fresh opponent.
                    AppPhase::Waiting { side: Side::Left }
                    | AppPhase::Playing { side: Side::Left } => {
                        self.scores = Scores::default();
                        self.ready = false;
                        self.phase = AppPhase::Waiting { side: Side::Left };
                    }
                    // The room died with its creator.
                    AppPhase::Waiting { side: Side::Right }
                    | AppPhase::Playing { side: Side::Right } => {
                        self.phase = AppPhase::Ended {
                            message: "the room was closed".to_string(),
                        };
                    }
                    _ => {}
                }
                None
            }
            ServerMessage::Error { reason } => {
                warn!("server error: {}", reason);
                self.last_error = Some(reason);
                None
            }
        }
    }

    pub fn connection_lost(&mut self) {
        if !matches!(self.phase, AppPhase::Ended { .. }) {
            self.phase = AppPhase::Disconnected;
        }
    }

    /// One line of UI text describing what the player should do or see.
    pub fn status_line(&self) -> String {
        match &self.phase {
            AppPhase::Authenticating => "connecting...".to_string(),
            AppPhase::Joining => "joining room...".to_string(),
            AppPhase::Waiting { .. } => {
                let occupants = self.summary.as_ref().map_or(1, |s| s.occupants);
                if occupants < 2 {
                    "waiting for an opponent".to_string()
                } else if self.ready {
                    "waiting for the other player to ready up".to_string()
                } else {
                    "press SPACE when ready".to_string()
                }
            }
            AppPhase::Playing { .. } => {
                format!("{} - {}", self.scores.left, self.scores.right)
            }
            AppPhase::Ended { message } => message.clone(),
            AppPhase::Disconnected => "connection lost".to_string(),
        }
    }
}
