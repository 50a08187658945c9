//! Persistence collaborator for finalized matches. Recording is
//! fire-and-forget: a failure here is logged and never affects the match
//! state already delivered to the players.

use log::info;
use shared::Scores;

#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub player1_id: String,
    pub player2_id: String,
    pub scores: Scores,
    pub winner_id: String,
    pub duration_seconds: u64,
}

pub trait MatchResultSink: Send + Sync {
    fn record(&self, result: &MatchResult);
}

/// Default sink for the binary: logs the result. A deployment wires a real
/// store (database, stats service) behind the same trait.
pub struct LogResultSink;

impl MatchResultSink for LogResultSink {
    fn record(&self, result: &MatchResult) {
        info!(
            "match finished: {} vs {} -> winner {} ({}-{} in {}s)",
            result.player1_id,
            result.player2_id,
            result.winner_id,
            result.scores.left,
            result.scores.right,
            result.duration_seconds
        );
    }
}

#[cfg(test)]
pub(crate) struct CollectingSink {
    pub results: std::sync::Mutex<Vec<MatchResult>>,
}

#[cfg(test)]
impl CollectingSink {
    pub fn new() -> Self {
        CollectingSink {
            results: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[cfg(test)]
impl MatchResultSink for CollectingSink {
    fn record(&self, result: &MatchResult) {
        if let Ok(mut results) = self.results.lock() {
            results.push(result.clone());
        }
    }
}
