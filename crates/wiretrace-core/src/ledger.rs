//! The score ledger: accumulated total plus a chronological record of
//! scored wiring events, durable across process restarts.

use crate::error::Result;
use crate::persist;
use crate::types::Terminal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One scored wiring result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WiringRecord {
    pub terminal_a: Terminal,
    pub terminal_b: Terminal,
    pub score: f64,
    pub timestamp: DateTime<Utc>,
}

/// A closed session archived by [`ScoreLedger::reset_session`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionRecord {
    pub score: f64,
    pub results: Vec<WiringRecord>,
    pub closed_at: DateTime<Utc>,
}

/// Explicitly owned score state. Mutated only through its operations,
/// read by reporting collaborators, and rolled back only by an explicit
/// session reset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreLedger {
    total: f64,
    session_score: f64,
    results: Vec<WiringRecord>,
    history: Vec<SessionRecord>,
}

impl ScoreLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated total score. Replaced wholesale by each full
    /// re-evaluation, see [`replace_total`](Self::replace_total).
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Score accumulated by [`record`](Self::record) since the last
    /// session reset.
    pub fn session_score(&self) -> f64 {
        self.session_score
    }

    pub fn results(&self) -> &[WiringRecord] {
        &self.results
    }

    pub fn history(&self) -> &[SessionRecord] {
        &self.history
    }

    /// Replace the running total with a fresh full-evaluation total and
    /// return the delta against the previous one.
    pub fn replace_total(&mut self, total: f64) -> f64 {
        let delta = total - self.total;
        self.total = total;
        delta
    }

    /// Append a scored wiring result, stamped now.
    pub fn record(&mut self, terminal_a: &str, terminal_b: &str, score: f64) {
        self.session_score += score;
        self.results.push(WiringRecord {
            terminal_a: terminal_a.to_string(),
            terminal_b: terminal_b.to_string(),
            score,
            timestamp: Utc::now(),
        });
    }

    /// Close the current session: archive its score and results to the
    /// history, then clear them. The running total is untouched.
    pub fn reset_session(&mut self) {
        if self.session_score != 0.0 || !self.results.is_empty() {
            self.history.push(SessionRecord {
                score: self.session_score,
                results: std::mem::take(&mut self.results),
                closed_at: Utc::now(),
            });
        }
        self.session_score = 0.0;
    }

    /// Wipe everything, history included.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        persist::write_json_atomic(path, self)
    }

    /// Load a ledger, bootstrapping an empty persisted one when the file
    /// does not exist yet. A malformed existing file is a hard failure.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            let ledger = Self::new();
            ledger.save_to_file(path)?;
            return Ok(ledger);
        }
        persist::read_json(path)
    }
}
