//! Process-wide index of live rooms.
//!
//! The registry owns room lifecycle end to end: creation, membership
//! changes, tick-task spawning and teardown, and the periodic sweep that
//! reclaims finished and abandoned rooms. Callers never touch the map
//! directly; every mutation is an operation here so the teardown rules hold
//! on all paths.
//!
//! Lock order is always map first, then room. `leave_room` releases the room
//! lock before re-taking the map for removal.

use crate::auth::Identity;
use crate::outbox::Outbox;
use crate::results::MatchResultSink;
use crate::room::{spawn_tick_loop, JoinError, LeaveOutcome, ReadyOutcome, Room};
use log::{debug, info};
use shared::{GameConfig, RoomSummary, Side};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct RegistryConfig {
    /// How long a finished room stays visible to its occupants before the
    /// sweep removes it.
    pub finished_grace: Duration,
    /// How long an empty waiting room may sit unjoined before the sweep
    /// removes it.
    pub idle_window: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            finished_grace: Duration::from_secs(300),
            idle_window: Duration::from_secs(1800),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindError {
    RoomNotFound,
    NotAMember,
}

pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, Arc<Mutex<Room>>>>,
    results: Arc<dyn MatchResultSink>,
    game_config: GameConfig,
    config: RegistryConfig,
}

impl RoomRegistry {
    pub fn new(
        results: Arc<dyn MatchResultSink>,
        game_config: GameConfig,
        config: RegistryConfig,
    ) -> Self {
        RoomRegistry {
            rooms: RwLock::new(HashMap::new()),
            results,
            game_config,
            config,
        }
    }

    /// Creates a room with the caller in the creator slot and returns its id.
    pub async fn create_room(
        &self,
        creator: &Identity,
        name: String,
        password: Option<String>,
        win_threshold: Option<u32>,
    ) -> String {
        let id = Uuid::new_v4().to_string();
        let room = Room::new(
            id.clone(),
            creator,
            name,
            password,
            win_threshold.unwrap_or(shared::DEFAULT_WIN_THRESHOLD),
            self.game_config,
        );
        info!("room {}: created by {}", id, creator.id);
        self.rooms
            .write()
            .await
            .insert(id.clone(), Arc::new(Mutex::new(room)));
        id
    }

    pub async fn room(&self, room_id: &str) -> Option<Arc<Mutex<Room>>> {
        self.rooms.read().await.get(room_id).cloned()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Summaries of rooms a newcomer could still care about. Finished rooms
    /// are omitted; they linger only for their own occupants.
    pub async fn list_public(&self) -> Vec<RoomSummary> {
        let rooms = self.rooms.read().await;
        let mut summaries = Vec::with_capacity(rooms.len());
        for room in rooms.values() {
            let summary = room.lock().await.public_summary();
            if summary.phase != shared::RoomPhase::Finished {
                summaries.push(summary);
            }
        }
        summaries
    }

    pub async fn join_room(
        &self,
        room_id: &str,
        identity: &Identity,
        password: Option<&str>,
    ) -> Result<(), JoinError> {
        let room = self.room(room_id).await.ok_or(JoinError::NotFound)?;
        let mut room = room.lock().await;
        room.join(identity, password)
    }

    /// Removes a player from a room, applying the teardown rules. The
    /// creator leaving removes the room entirely; a forfeit in progress is
    /// recorded either way.
    pub async fn leave_room(&self, room_id: &str, player_id: &str) {
        let Some(room) = self.room(room_id).await else {
            return;
        };

        let (outcome, tick_task) = {
            let mut room = room.lock().await;
            let outcome = room.leave(player_id);
            let tick_task = match outcome {
                LeaveOutcome::NotAMember => None,
                _ => room.stop_ticking(),
            };
            (outcome, tick_task)
        };

        if let Some(task) = tick_task {
            task.abort();
        }

        match outcome {
            LeaveOutcome::TornDown { forfeit } => {
                self.rooms.write().await.remove(room_id);
                if let Some(result) = forfeit {
                    self.results.record(&result);
                }
            }
            LeaveOutcome::OpponentCleared { forfeit } => {
                if let Some(result) = forfeit {
                    self.results.record(&result);
                }
            }
            LeaveOutcome::NotAMember => {}
        }
    }

    /// Applies a readiness change; when it starts the match, the room's tick
    /// loop is spawned and its handle parked on the room for teardown.
    pub async fn set_ready(&self, room_id: &str, player_id: &str, ready: bool) {
        let Some(room) = self.room(room_id).await else {
            return;
        };
        let mut guard = room.lock().await;
        if guard.set_ready(player_id, ready) == ReadyOutcome::Started {
            let handle = spawn_tick_loop(room.clone(), self.results.clone());
            guard.set_tick_task(handle);
        }
    }

    pub async fn update_paddle(&self, room_id: &str, player_id: &str, y: f32) {
        if let Some(room) = self.room(room_id).await {
            room.lock().await.update_paddle(player_id, y);
        }
    }

    /// Attaches a connection's outbox to the caller's slot in a room. The
    /// room's config is read under the same lock so the caller can hand it
    /// to the client without a second lookup.
    pub async fn bind(
        &self,
        room_id: &str,
        player_id: &str,
        outbox: Arc<dyn Outbox>,
    ) -> Result<(Side, GameConfig), BindError> {
        let room = self.room(room_id).await.ok_or(BindError::RoomNotFound)?;
        let mut room = room.lock().await;
        let side = room.bind(player_id, outbox).ok_or(BindError::NotAMember)?;
        Ok((side, room.config))
    }

    /// One sweep pass: drops rooms finished longer than the grace period and
    /// empty waiting rooms idle past the window. Playing rooms and occupied
    /// waiting rooms are never touched.
    pub async fn sweep_once(&self) {
        let now = Instant::now();
        let mut rooms = self.rooms.write().await;
        let mut removed = Vec::new();

        for (id, room) in rooms.iter() {
            let mut room = room.lock().await;
            let expired = room
                .finished_since()
                .map_or(false, |at| now.duration_since(at) >= self.config.finished_grace)
                || room
                    .idle_since()
                    .map_or(false, |at| now.duration_since(at) >= self.config.idle_window);
            if expired {
                if let Some(task) = room.stop_ticking() {
                    task.abort();
                }
                removed.push(id.clone());
            }
        }

        for id in &removed {
            rooms.remove(id);
            debug!("room {}: swept", id);
        }
        if !removed.is_empty() {
            info!("sweep removed {} room(s), {} remain", removed.len(), rooms.len());
        }
    }

    pub fn spawn_sweeper(self: &Arc<Self>, every: Duration) -> JoinHandle<()> {
        let registry = self.clone();
        tokio::spawn(async move {
            let mut timer = tokio::time::interval(every);
            timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                timer.tick().await;
                registry.sweep_once().await;
            }
        })
    }
}
