//! Per-connection protocol state machine.
//!
//! A session moves strictly forward through authenticate, then bind to a
//! room, then play. Every inbound frame is checked against the current
//! phase; out-of-order messages get an `Error` event and the connection
//! stays open, except a failed authentication which closes it.
//!
//! The session is transport-agnostic: the websocket handler feeds it text
//! frames and honors the returned [`SessionControl`].

use crate::auth::Authenticator;
use crate::auth::Identity;
use crate::outbox::Outbox;
use crate::registry::{BindError, RoomRegistry};
use log::{debug, info, warn};
use shared::{ClientMessage, ServerMessage, Side};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
enum SessionPhase {
    Unauthenticated,
    Authenticated(Identity),
    Bound {
        identity: Identity,
        room_id: String,
        side: Side,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionControl {
    Continue,
    Close,
}

pub struct Session {
    registry: Arc<RoomRegistry>,
    auth: Arc<dyn Authenticator>,
    outbox: Arc<dyn Outbox>,
    phase: SessionPhase,
}

impl Session {
    pub fn new(
        registry: Arc<RoomRegistry>,
        auth: Arc<dyn Authenticator>,
        outbox: Arc<dyn Outbox>,
    ) -> Self {
        Session {
            registry,
            auth,
            outbox,
            phase: SessionPhase::Unauthenticated,
        }
    }

    pub fn player_id(&self) -> Option<&str> {
        match &self.phase {
            SessionPhase::Unauthenticated => None,
            SessionPhase::Authenticated(identity) => Some(&identity.id),
            SessionPhase::Bound { identity, .. } => Some(&identity.id),
        }
    }

    /// Handles one raw text frame. A frame that does not parse as a client
    /// message is reported but never closes the connection.
    pub async fn handle_text(&mut self, text: &str) -> SessionControl {
        match serde_json::from_str::<ClientMessage>(text) {
            Ok(message) => self.handle_message(message).await,
            Err(err) => {
                debug!("unparseable frame ({}): {}", err, text);
                self.send_error("unknown_message");
                SessionControl::Continue
            }
        }
    }

    pub async fn handle_message(&mut self, message: ClientMessage) -> SessionControl {
        match message {
            ClientMessage::Auth { token } => self.on_auth(&token),
            ClientMessage::JoinRoom { room_id } => self.on_join(room_id).await,
            ClientMessage::Ready { ready } => self.on_ready(ready).await,
            ClientMessage::PaddleMove { y } => self.on_paddle_move(y).await,
            ClientMessage::LeaveRoom => self.on_leave().await,
        }
    }

    /// Called when the underlying connection goes away, for whatever reason.
    /// A bound session leaves its room as if the player had asked to.
    pub async fn on_close(&mut self) {
        if let SessionPhase::Bound {
            identity, room_id, ..
        } = &self.phase
        {
            info!("player {} disconnected while in room {}", identity.id, room_id);
            self.registry.leave_room(room_id, &identity.id).await;
        }
        self.phase = SessionPhase::Unauthenticated;
    }

    fn on_auth(&mut self, token: &str) -> SessionControl {
        if self.phase != SessionPhase::Unauthenticated {
            self.send_error("already_authenticated");
            return SessionControl::Continue;
        }
        match self.auth.authenticate(token) {
            Ok(identity) => {
                info!("player {} authenticated", identity.id);
                self.deliver(&ServerMessage::AuthSuccess {
                    id: identity.id.clone(),
                    display_name: identity.display_name.clone(),
                });
                self.phase = SessionPhase::Authenticated(identity);
                SessionControl::Continue
            }
            Err(_) => {
                warn!("authentication failed");
                self.deliver(&ServerMessage::AuthError {
                    reason: "invalid_credential".to_string(),
                });
                SessionControl::Close
            }
        }
    }

    async fn on_join(&mut self, room_id: String) -> SessionControl {
        let identity = match &self.phase {
            SessionPhase::Unauthenticated => {
                self.send_error("not_authenticated");
                return SessionControl::Continue;
            }
            SessionPhase::Bound { .. } => {
                self.send_error("already_in_room");
                return SessionControl::Continue;
            }
            SessionPhase::Authenticated(identity) => identity.clone(),
        };

        match self
            .registry
            .bind(&room_id, &identity.id, self.outbox.clone())
            .await
        {
            Ok((side, config)) => {
                self.deliver(&ServerMessage::JoinedRoom { side, config });
                self.phase = SessionPhase::Bound {
                    identity,
                    room_id,
                    side,
                };
            }
            Err(BindError::RoomNotFound) => self.send_error("room_not_found"),
            Err(BindError::NotAMember) => self.send_error("not_a_participant"),
        }
        SessionControl::Continue
    }

    async fn on_ready(&mut self, ready: bool) -> SessionControl {
        match &self.phase {
            SessionPhase::Bound {
                identity, room_id, ..
            } => {
                self.registry.set_ready(room_id, &identity.id, ready).await;
            }
            _ => self.send_error("not_in_room"),
        }
        SessionControl::Continue
    }

    async fn on_paddle_move(&mut self, y: f32) -> SessionControl {
        // Paddle frames arrive at input rate; a stale one after leaving a
        // room is dropped without a reply.
        if let SessionPhase::Bound {
            identity, room_id, ..
        } = &self.phase
        {
            self.registry.update_paddle(room_id, &identity.id, y).await;
        }
        SessionControl::Continue
    }

    async fn on_leave(&mut self) -> SessionControl {
        match std::mem::replace(&mut self.phase, SessionPhase::Unauthenticated) {
            SessionPhase::Bound {
                identity, room_id, ..
            } => {
                self.registry.leave_room(&room_id, &identity.id).await;
                self.phase = SessionPhase::Authenticated(identity);
            }
            other => {
                self.phase = other;
                self.send_error("not_in_room");
            }
        }
        SessionControl::Continue
    }

    fn send_error(&self, reason: &str) {
        self.deliver(&ServerMessage::Error {
            reason: reason.to_string(),
        });
    }

    fn deliver(&self, event: &ServerMessage) {
        if !self.outbox.deliver(event) {
            debug!("session outbox closed, event dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenAuth;
    use crate::outbox::RecordingOutbox;
    use crate::registry::{RegistryConfig, RoomRegistry};
    use crate::results::CollectingSink;
    use shared::{GameConfig, RoomPhase};

    fn setup() -> (Arc<RoomRegistry>, Arc<RecordingOutbox>, Session) {
        let registry = Arc::new(RoomRegistry::new(
            Arc::new(CollectingSink::new()),
            GameConfig::default(),
            RegistryConfig::default(),
        ));
        let outbox = Arc::new(RecordingOutbox::new());
        let session = Session::new(registry.clone(), Arc::new(TokenAuth), outbox.clone());
        (registry, outbox, session)
    }

    async fn joined_room(
        registry: &RoomRegistry,
        session: &mut Session,
        creator: bool,
    ) -> String {
        let alice = Identity::new("1", "alice");
        let bob = Identity::new("2", "bob");
        let room_id = registry
            .create_room(&alice, "duel".to_string(), None, None)
            .await;
        registry.join_room(&room_id, &bob, None).await.unwrap();

        let token = if creator { "1:alice" } else { "2:bob" };
        session
            .handle_message(ClientMessage::Auth {
                token: token.to_string(),
            })
            .await;
        session
            .handle_message(ClientMessage::JoinRoom {
                room_id: room_id.clone(),
            })
            .await;
        room_id
    }

    #[tokio::test]
    async fn test_auth_success_then_failure_is_rejected() {
        let (_, outbox, mut session) = setup();

        let control = session
            .handle_message(ClientMessage::Auth {
                token: "1:alice".to_string(),
            })
            .await;
        assert_eq!(control, SessionControl::Continue);
        assert_eq!(session.player_id(), Some("1"));
        assert!(matches!(
            outbox.events()[0],
            ServerMessage::AuthSuccess { .. }
        ));

        let control = session
            .handle_message(ClientMessage::Auth {
                token: "2:bob".to_string(),
            })
            .await;
        assert_eq!(control, SessionControl::Continue);
        assert!(outbox
            .events()
            .contains(&ServerMessage::Error {
                reason: "already_authenticated".to_string()
            }));
        assert_eq!(session.player_id(), Some("1"));
    }

    #[tokio::test]
    async fn test_bad_credential_closes_connection() {
        let (_, outbox, mut session) = setup();

        let control = session
            .handle_message(ClientMessage::Auth {
                token: "garbage".to_string(),
            })
            .await;

        assert_eq!(control, SessionControl::Close);
        assert!(matches!(
            outbox.events()[0],
            ServerMessage::AuthError { .. }
        ));
        assert_eq!(session.player_id(), None);
    }

    #[tokio::test]
    async fn test_everything_requires_auth_first() {
        let (_, outbox, mut session) = setup();

        session
            .handle_message(ClientMessage::JoinRoom {
                room_id: "x".to_string(),
            })
            .await;
        assert!(outbox.events().contains(&ServerMessage::Error {
            reason: "not_authenticated".to_string()
        }));

        session.handle_message(ClientMessage::Ready { ready: true }).await;
        session.handle_message(ClientMessage::LeaveRoom).await;
        let not_in_room = outbox
            .events()
            .iter()
            .filter(|e| {
                matches!(e, ServerMessage::Error { reason } if reason == "not_in_room")
            })
            .count();
        assert_eq!(not_in_room, 2);
    }

    #[tokio::test]
    async fn test_join_binds_and_reports_side() {
        let (registry, outbox, mut session) = setup();
        joined_room(&registry, &mut session, false).await;

        let joined = outbox.events().into_iter().find_map(|e| match e {
            ServerMessage::JoinedRoom { side, .. } => Some(side),
            _ => None,
        });
        assert_eq!(joined, Some(Side::Right));
    }

    #[tokio::test]
    async fn test_join_reports_the_rooms_own_config() {
        let mut game_config = GameConfig::default();
        game_config.field_width = 1024.0;
        let registry = Arc::new(RoomRegistry::new(
            Arc::new(CollectingSink::new()),
            game_config,
            RegistryConfig::default(),
        ));
        let outbox = Arc::new(RecordingOutbox::new());
        let mut session = Session::new(registry.clone(), Arc::new(TokenAuth), outbox.clone());

        let room_id = registry
            .create_room(&Identity::new("1", "alice"), "duel".to_string(), None, None)
            .await;
        session
            .handle_message(ClientMessage::Auth {
                token: "1:alice".to_string(),
            })
            .await;
        session
            .handle_message(ClientMessage::JoinRoom { room_id })
            .await;

        let joined = outbox.events().into_iter().find_map(|e| match e {
            ServerMessage::JoinedRoom { config, .. } => Some(config),
            _ => None,
        });
        assert_eq!(joined, Some(game_config));
    }

    #[tokio::test]
    async fn test_join_unknown_room_keeps_session_open() {
        let (_, outbox, mut session) = setup();
        session
            .handle_message(ClientMessage::Auth {
                token: "1:alice".to_string(),
            })
            .await;

        let control = session
            .handle_message(ClientMessage::JoinRoom {
                room_id: "no-such-room".to_string(),
            })
            .await;

        assert_eq!(control, SessionControl::Continue);
        assert!(outbox.events().contains(&ServerMessage::Error {
            reason: "room_not_found".to_string()
        }));
    }

    #[tokio::test]
    async fn test_join_requires_membership() {
        let (registry, outbox, mut session) = setup();
        let room_id = registry
            .create_room(&Identity::new("1", "alice"), "duel".to_string(), None, None)
            .await;

        session
            .handle_message(ClientMessage::Auth {
                token: "9:eve".to_string(),
            })
            .await;
        session
            .handle_message(ClientMessage::JoinRoom { room_id })
            .await;

        assert!(outbox.events().contains(&ServerMessage::Error {
            reason: "not_a_participant".to_string()
        }));
    }

    #[tokio::test]
    async fn test_double_join_is_rejected() {
        let (registry, outbox, mut session) = setup();
        let room_id = joined_room(&registry, &mut session, true).await;

        session
            .handle_message(ClientMessage::JoinRoom { room_id })
            .await;

        assert!(outbox.events().contains(&ServerMessage::Error {
            reason: "already_in_room".to_string()
        }));
    }

    #[tokio::test]
    async fn test_ready_reaches_the_room() {
        let (registry, _, mut session) = setup();
        let room_id = joined_room(&registry, &mut session, true).await;

        session.handle_message(ClientMessage::Ready { ready: true }).await;
        registry.set_ready(&room_id, "2", true).await;

        let room = registry.room(&room_id).await.unwrap();
        assert_eq!(room.lock().await.phase(), RoomPhase::Playing);
    }

    #[tokio::test]
    async fn test_paddle_move_reaches_the_room() {
        let (registry, _, mut session) = setup();
        let room_id = joined_room(&registry, &mut session, true).await;
        registry.set_ready(&room_id, "1", true).await;
        registry.set_ready(&room_id, "2", true).await;

        session.handle_message(ClientMessage::PaddleMove { y: 42.0 }).await;

        let room = registry.room(&room_id).await.unwrap();
        assert_eq!(room.lock().await.paddle_target(Side::Left), 42.0);
    }

    #[tokio::test]
    async fn test_leave_returns_to_authenticated() {
        let (registry, outbox, mut session) = setup();
        let room_id = joined_room(&registry, &mut session, false).await;

        session.handle_message(ClientMessage::LeaveRoom).await;

        let room = registry.room(&room_id).await.unwrap();
        assert_eq!(room.lock().await.public_summary().occupants, 1);

        // Still authenticated: a fresh join must be possible.
        registry
            .join_room(&room_id, &Identity::new("2", "bob"), None)
            .await
            .unwrap();
        session
            .handle_message(ClientMessage::JoinRoom {
                room_id: room_id.clone(),
            })
            .await;
        let rejoined = outbox
            .events()
            .iter()
            .filter(|e| matches!(e, ServerMessage::JoinedRoom { .. }))
            .count();
        assert_eq!(rejoined, 2);
    }

    #[tokio::test]
    async fn test_disconnect_leaves_room_implicitly() {
        let (registry, _, mut session) = setup();
        let room_id = joined_room(&registry, &mut session, true).await;

        session.on_close().await;

        // The creator dropping tears the room down.
        assert!(registry.room(&room_id).await.is_none());
        assert_eq!(session.player_id(), None);
    }

    #[tokio::test]
    async fn test_garbage_frame_reports_and_continues() {
        let (_, outbox, mut session) = setup();

        assert_eq!(session.handle_text("{not json").await, SessionControl::Continue);
        assert_eq!(
            session.handle_text(r#"{"type":"warp_ball"}"#).await,
            SessionControl::Continue
        );

        let unknown = outbox
            .events()
            .iter()
            .filter(|e| {
                matches!(e, ServerMessage::Error { reason } if reason == "unknown_message")
            })
            .count();
        assert_eq!(unknown, 2);
    }
}
