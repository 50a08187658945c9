//! One authoritative match instance: two player slots, the live simulation
//! state and the fixed-rate tick loop that owns it.
//!
//! All game-state transitions go through the operations here. While a match
//! is running, the tick loop task is the single writer of ball, score and
//! winner state; inbound paddle messages only ever write the target
//! positions that the next tick consumes.

use crate::auth::Identity;
use crate::outbox::Outbox;
use crate::results::{MatchResult, MatchResultSink};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::{
    advance, clamp_paddle, serve, step_paddle, GameConfig, PongState, RoomPhase, RoomSummary,
    Scores, ServerMessage, Side,
};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

pub const TICK_INTERVAL: Duration = Duration::from_millis(1000 / shared::TICK_RATE as u64);

/// Cap on one step's wall-clock delta so a stalled process does not produce
/// one giant, tunneling-prone physics step when it wakes up.
const MAX_TICK_DELTA: f32 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
enum RoomStatus {
    Waiting,
    Playing { started_at: Instant },
    Finished { winner: Side, at: Instant },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinError {
    NotFound,
    Finished,
    AlreadyPlaying,
    Full,
    BadPassword,
}

impl JoinError {
    pub fn reason(&self) -> &'static str {
        match self {
            JoinError::NotFound => "not_found",
            JoinError::Finished => "finished",
            JoinError::AlreadyPlaying => "already_playing",
            JoinError::Full => "full",
            JoinError::BadPassword => "bad_password",
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum ReadyOutcome {
    /// The flag changed but the room is still waiting.
    Updated,
    /// Both slots are occupied and ready: the match just started.
    Started,
    /// Not waiting, or the caller is not a member. No effect.
    Unchanged,
}

#[derive(Debug)]
pub enum TickOutcome {
    Continue,
    /// Win threshold reached this tick; the loop must stop.
    Finished(MatchResult),
    /// The room is no longer playing; the loop must stop.
    Idle,
}

#[derive(Debug)]
pub enum LeaveOutcome {
    /// The creator left: the room has no meaning without it and must be
    /// removed from the registry index.
    TornDown { forfeit: Option<MatchResult> },
    /// The opponent left: the slot was cleared and the room reverted to
    /// waiting with readiness and live state reset.
    OpponentCleared { forfeit: Option<MatchResult> },
    NotAMember,
}

struct PlayerSlot {
    id: String,
    name: String,
    ready: bool,
    outbox: Option<Arc<dyn Outbox>>,
}

impl PlayerSlot {
    fn new(identity: &Identity) -> Self {
        PlayerSlot {
            id: identity.id.clone(),
            name: identity.display_name.clone(),
            ready: false,
            outbox: None,
        }
    }
}

pub struct Room {
    pub id: String,
    pub name: String,
    pub win_threshold: u32,
    pub config: GameConfig,
    password: Option<String>,
    creator: PlayerSlot,
    opponent: Option<PlayerSlot>,
    state: PongState,
    target_left: f32,
    target_right: f32,
    scores: Scores,
    status: RoomStatus,
    waiting_since: Instant,
    created_at_unix: u64,
    rng: StdRng,
    tick_task: Option<JoinHandle<()>>,
}

impl Room {
    pub fn new(
        id: String,
        creator: &Identity,
        name: String,
        password: Option<String>,
        win_threshold: u32,
        config: GameConfig,
    ) -> Self {
        let state = PongState::new(&config);
        let created_at_unix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::from_secs(0))
            .as_secs();

        Room {
            id,
            name,
            win_threshold,
            config,
            password,
            creator: PlayerSlot::new(creator),
            opponent: None,
            target_left: state.paddles.left,
            target_right: state.paddles.right,
            state,
            scores: Scores::default(),
            status: RoomStatus::Waiting,
            waiting_since: Instant::now(),
            created_at_unix,
            rng: StdRng::from_entropy(),
            tick_task: None,
        }
    }

    pub fn phase(&self) -> RoomPhase {
        match self.status {
            RoomStatus::Waiting => RoomPhase::Waiting,
            RoomStatus::Playing { .. } => RoomPhase::Playing,
            RoomStatus::Finished { .. } => RoomPhase::Finished,
        }
    }

    pub fn scores(&self) -> Scores {
        self.scores
    }

    pub fn is_member(&self, player_id: &str) -> bool {
        self.creator.id == player_id
            || self.opponent.as_ref().map_or(false, |o| o.id == player_id)
    }

    pub fn paddle_target(&self, side: Side) -> f32 {
        match side {
            Side::Left => self.target_left,
            Side::Right => self.target_right,
        }
    }

    /// Fills the opponent slot. The password gate applies regardless of room
    /// status and never partially mutates the room on rejection.
    pub fn join(&mut self, identity: &Identity, password: Option<&str>) -> Result<(), JoinError> {
        if let Some(expected) = &self.password {
            // Plaintext equality on purpose: room passwords are ephemeral,
            // room-scoped secrets, not account credentials.
            if password != Some(expected.as_str()) {
                return Err(JoinError::BadPassword);
            }
        }
        if self.is_member(&identity.id) {
            return Ok(());
        }
        match self.status {
            RoomStatus::Finished { .. } => Err(JoinError::Finished),
            RoomStatus::Playing { .. } => Err(JoinError::AlreadyPlaying),
            RoomStatus::Waiting => {
                if self.opponent.is_some() {
                    return Err(JoinError::Full);
                }
                info!("room {}: {} joined as opponent", self.id, identity.id);
                self.opponent = Some(PlayerSlot::new(identity));
                self.broadcast_summary();
                Ok(())
            }
        }
    }

    pub fn leave(&mut self, player_id: &str) -> LeaveOutcome {
        if self.creator.id == player_id {
            let forfeit = self.forfeit_result(Side::Right);
            if let Some(opponent) = &self.opponent {
                self.notify(
                    opponent,
                    &ServerMessage::OpponentLeft {
                        player_id: self.creator.id.clone(),
                    },
                );
            }
            if matches!(self.status, RoomStatus::Playing { .. }) {
                // Stops a racing tick from broadcasting after teardown.
                self.status = RoomStatus::Finished {
                    winner: Side::Right,
                    at: Instant::now(),
                };
            }
            info!("room {}: creator left, tearing down", self.id);
            return LeaveOutcome::TornDown { forfeit };
        }

        let is_opponent = self.opponent.as_ref().map_or(false, |o| o.id == player_id);
        if !is_opponent {
            return LeaveOutcome::NotAMember;
        }

        let forfeit = self.forfeit_result(Side::Left);
        let opponent_id = player_id.to_string();
        self.opponent = None;
        self.creator.ready = false;
        self.scores = Scores::default();
        self.state = PongState::new(&self.config);
        self.target_left = self.state.paddles.left;
        self.target_right = self.state.paddles.right;
        self.status = RoomStatus::Waiting;
        self.waiting_since = Instant::now();

        info!("room {}: opponent {} left, back to waiting", self.id, opponent_id);
        self.notify(
            &self.creator,
            &ServerMessage::OpponentLeft {
                player_id: opponent_id,
            },
        );
        self.broadcast_summary();
        LeaveOutcome::OpponentCleared { forfeit }
    }

    /// Toggles a slot's readiness. When both slots are occupied and ready
    /// the match starts; calls while playing or finished have no effect.
    pub fn set_ready(&mut self, player_id: &str, ready: bool) -> ReadyOutcome {
        if self.status != RoomStatus::Waiting {
            return ReadyOutcome::Unchanged;
        }
        if self.creator.id == player_id {
            self.creator.ready = ready;
        } else if let Some(opponent) = self.opponent.as_mut().filter(|o| o.id == player_id) {
            opponent.ready = ready;
        } else {
            return ReadyOutcome::Unchanged;
        }

        self.broadcast(&ServerMessage::PlayerReady {
            player_id: player_id.to_string(),
            ready,
        });

        let both_ready =
            self.creator.ready && self.opponent.as_ref().map_or(false, |o| o.ready);
        if both_ready {
            self.start_game();
            ReadyOutcome::Started
        } else {
            ReadyOutcome::Updated
        }
    }

    fn start_game(&mut self) {
        self.scores = Scores::default();
        self.state = PongState::new(&self.config);
        self.target_left = self.state.paddles.left;
        self.target_right = self.state.paddles.right;
        self.state.ball = serve(&self.config, &mut self.rng);
        self.status = RoomStatus::Playing {
            started_at: Instant::now(),
        };
        info!("room {}: match started", self.id);
        self.broadcast(&ServerMessage::GameStart);
    }

    /// Accepted only while playing; a stale message from a just-ended game
    /// is dropped silently rather than treated as an error.
    pub fn update_paddle(&mut self, player_id: &str, y: f32) {
        if !matches!(self.status, RoomStatus::Playing { .. }) {
            return;
        }
        let clamped = clamp_paddle(y, &self.config);
        if self.creator.id == player_id {
            self.target_left = clamped;
        } else if self.opponent.as_ref().map_or(false, |o| o.id == player_id) {
            self.target_right = clamped;
        }
    }

    /// One simulation step: paddles toward their targets, ball advance,
    /// scoring and win check, then a state broadcast to both occupants.
    pub fn tick(&mut self, dt: f32) -> TickOutcome {
        let RoomStatus::Playing { started_at } = self.status else {
            return TickOutcome::Idle;
        };

        self.state.paddles.left =
            step_paddle(self.state.paddles.left, self.target_left, dt, &self.config);
        self.state.paddles.right =
            step_paddle(self.state.paddles.right, self.target_right, dt, &self.config);

        if let Some(side) = advance(&mut self.state, &self.config, dt) {
            match side {
                Side::Left => self.scores.left += 1,
                Side::Right => self.scores.right += 1,
            }
            debug!(
                "room {}: point for {:?} ({} - {})",
                self.id, side, self.scores.left, self.scores.right
            );
            if self.scores.for_side(side) >= self.win_threshold {
                return TickOutcome::Finished(self.finish(side, started_at));
            }
            self.state.ball = serve(&self.config, &mut self.rng);
        }

        self.broadcast(&ServerMessage::GameState {
            ball: self.state.ball,
            paddles: self.state.paddles,
            scores: self.scores,
        });
        TickOutcome::Continue
    }

    fn finish(&mut self, winner: Side, started_at: Instant) -> MatchResult {
        let (winner_id, winner_name) = match winner {
            Side::Left => (self.creator.id.clone(), self.creator.name.clone()),
            Side::Right => self
                .opponent
                .as_ref()
                .map(|o| (o.id.clone(), o.name.clone()))
                .unwrap_or_default(),
        };
        self.status = RoomStatus::Finished {
            winner,
            at: Instant::now(),
        };
        info!("room {}: match finished, winner {:?}", self.id, winner);
        self.broadcast(&ServerMessage::GameEnd {
            winner_side: winner,
            winner_id: winner_id.clone(),
            winner_name,
            final_score: self.scores,
        });
        MatchResult {
            player1_id: self.creator.id.clone(),
            player2_id: self
                .opponent
                .as_ref()
                .map(|o| o.id.clone())
                .unwrap_or_default(),
            scores: self.scores,
            winner_id,
            duration_seconds: started_at.elapsed().as_secs(),
        }
    }

    fn forfeit_result(&self, winner: Side) -> Option<MatchResult> {
        let RoomStatus::Playing { started_at } = self.status else {
            return None;
        };
        let opponent = self.opponent.as_ref()?;
        let winner_id = match winner {
            Side::Left => self.creator.id.clone(),
            Side::Right => opponent.id.clone(),
        };
        Some(MatchResult {
            player1_id: self.creator.id.clone(),
            player2_id: opponent.id.clone(),
            scores: self.scores,
            winner_id,
            duration_seconds: started_at.elapsed().as_secs(),
        })
    }

    /// Attaches (or re-attaches, on reconnect) a live connection to the slot
    /// registered for `player_id` and tells the room's occupants about it.
    pub fn bind(&mut self, player_id: &str, outbox: Arc<dyn Outbox>) -> Option<Side> {
        let side = if self.creator.id == player_id {
            self.creator.outbox = Some(outbox);
            Side::Left
        } else if let Some(opponent) = self.opponent.as_mut().filter(|o| o.id == player_id) {
            opponent.outbox = Some(outbox);
            Side::Right
        } else {
            return None;
        };
        self.broadcast_summary();
        Some(side)
    }

    pub fn public_summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            has_password: self.password.is_some(),
            phase: self.phase(),
            occupants: 1 + self.opponent.is_some() as u8,
            creator_name: self.creator.name.clone(),
            opponent_name: self.opponent.as_ref().map(|o| o.name.clone()),
            created_at_unix: self.created_at_unix,
        }
    }

    /// When the room finished, the instant it did. Sweep input.
    pub fn finished_since(&self) -> Option<Instant> {
        match self.status {
            RoomStatus::Finished { at, .. } => Some(at),
            _ => None,
        }
    }

    /// When the room last became empty-waiting, if it still is. Sweep input.
    pub fn idle_since(&self) -> Option<Instant> {
        (self.status == RoomStatus::Waiting && self.opponent.is_none())
            .then_some(self.waiting_since)
    }

    pub fn set_tick_task(&mut self, handle: JoinHandle<()>) {
        self.tick_task = Some(handle);
    }

    /// Detaches the tick task handle; the caller aborts it outside the room
    /// lock. Every teardown path goes through this.
    pub fn stop_ticking(&mut self) -> Option<JoinHandle<()>> {
        self.tick_task.take()
    }

    pub fn tick_task_active(&self) -> bool {
        self.tick_task.as_ref().map_or(false, |t| !t.is_finished())
    }

    fn notify(&self, slot: &PlayerSlot, event: &ServerMessage) {
        if let Some(outbox) = &slot.outbox {
            if !outbox.deliver(event) {
                warn!(
                    "room {}: dropping event for {}: connection closed",
                    self.id, slot.id
                );
            }
        }
    }

    fn broadcast(&self, event: &ServerMessage) {
        self.notify(&self.creator, event);
        if let Some(opponent) = &self.opponent {
            self.notify(opponent, event);
        }
    }

    fn broadcast_summary(&self) {
        self.broadcast(&ServerMessage::RoomUpdate {
            summary: self.public_summary(),
        });
    }
}

#[cfg(test)]
impl Room {
    pub(crate) fn place_ball(&mut self, ball: shared::Ball) {
        self.state.ball = ball;
    }

    pub(crate) fn ball(&self) -> shared::Ball {
        self.state.ball
    }

    pub(crate) fn force_finish(&mut self, winner: Side) {
        self.status = RoomStatus::Finished {
            winner,
            at: Instant::now(),
        };
    }

    pub(crate) fn seed_rng(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }
}

/// Runs one room's fixed-rate simulation until the match ends or the room
/// stops playing. Physics advances by the real elapsed time since the
/// previous tick, not a fixed dt.
pub fn spawn_tick_loop(
    room: Arc<Mutex<Room>>,
    results: Arc<dyn MatchResultSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = interval(TICK_INTERVAL);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last_tick = Instant::now();

        // The first tick completes immediately; skip it so dt stays sane.
        timer.tick().await;

        loop {
            timer.tick().await;

            let now = Instant::now();
            let dt = (now - last_tick).as_secs_f32().min(MAX_TICK_DELTA);
            last_tick = now;

            let mut room = room.lock().await;
            match room.tick(dt) {
                TickOutcome::Continue => {}
                TickOutcome::Finished(result) => {
                    room.stop_ticking();
                    results.record(&result);
                    break;
                }
                TickOutcome::Idle => {
                    room.stop_ticking();
                    break;
                }
            }
        }
    })
}
