//! The per-cycle pipeline: diff → tracker update → persistence → match →
//! score.
//!
//! One detection cycle is processed to completion before the next one's
//! input is accepted; that sequencing is the correctness mechanism, since
//! the tracker is not designed for concurrent mutation. `Session` takes
//! `&mut self` for every cycle, so single-writer access is enforced by the
//! borrow checker; wrap it in a lock or an actor mailbox when exposing it
//! as a service.

use crate::connect::ConnectivityTracker;
use crate::diff::{diff_snapshots, DiffOutcome};
use crate::error::Result;
use crate::ledger::ScoreLedger;
use crate::matcher::{MatchReport, Matcher};
use crate::types::{Snapshot, Terminal, WiringEvent};
use std::path::PathBuf;

/// Where the session persists its durable state.
#[derive(Debug, Clone)]
pub struct SessionPaths {
    pub connectivity: PathBuf,
    pub ledger: PathBuf,
}

/// What one detection cycle did.
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub event: WiringEvent,
    pub deletions: Vec<Terminal>,
    /// An add event and deletion candidates landed in the same diff
    /// window; surfaced for manual review.
    pub needs_review: bool,
    /// The partition after this cycle's mutations.
    pub components: Vec<Vec<Terminal>>,
    /// `None` when the cycle mutated nothing (no-change or ambiguous).
    pub match_report: Option<MatchReport>,
    /// Change of the running total caused by this cycle.
    pub score_delta: f64,
}

pub struct Session {
    tracker: ConnectivityTracker,
    ledger: ScoreLedger,
    matcher: Box<dyn Matcher>,
    paths: SessionPaths,
}

impl Session {
    /// Load durable state from `paths` (bootstrapping missing files) and
    /// attach the configured matcher.
    pub fn open(paths: SessionPaths, matcher: Box<dyn Matcher>) -> Result<Self> {
        let tracker = ConnectivityTracker::load_from_file(&paths.connectivity)?;
        let ledger = ScoreLedger::load_from_file(&paths.ledger)?;
        Ok(Self {
            tracker,
            ledger,
            matcher,
            paths,
        })
    }

    pub fn tracker(&self) -> &ConnectivityTracker {
        &self.tracker
    }

    pub fn ledger(&self) -> &ScoreLedger {
        &self.ledger
    }

    /// Process one snapshot pair to completion.
    ///
    /// Mutations either fully apply and persist or the cycle aborts before
    /// any score is written; an ambiguous diff mutates nothing and is
    /// reported for the operator to act on.
    pub async fn process_cycle(&mut self, old: &Snapshot, new: &Snapshot) -> Result<CycleReport> {
        let outcome = diff_snapshots(old, new);
        if outcome.needs_review() {
            log::warn!(
                "add event with concurrent deletion candidates {:?}; flagged for review",
                outcome.deletions
            );
        }

        let mutated = self.apply(&outcome)?;
        if !mutated {
            return Ok(CycleReport {
                event: outcome.event,
                deletions: outcome.deletions,
                needs_review: false,
                components: self.tracker.all_components(),
                match_report: None,
                score_delta: 0.0,
            });
        }

        // Persist before scoring: a cycle whose state cannot be saved
        // must not award points.
        self.tracker.save_to_file(&self.paths.connectivity)?;

        let components = self.tracker.all_components();
        let report = self.matcher.evaluate(&components).await?;
        let delta = self.ledger.replace_total(report.total);
        if let WiringEvent::Add(a, b) = &outcome.event {
            // The pair is credited with what its own component earned;
            // the window delta may also absorb concurrent purges.
            let pair_score = report
                .matches
                .iter()
                .find(|m| m.nodes.contains(a) && m.nodes.contains(b))
                .map(|m| m.score)
                .unwrap_or(0.0);
            self.ledger.record(a, b, pair_score);
        }
        self.ledger.save_to_file(&self.paths.ledger)?;

        Ok(CycleReport {
            needs_review: outcome.needs_review(),
            event: outcome.event,
            deletions: outcome.deletions,
            components,
            match_report: Some(report),
            score_delta: delta,
        })
    }

    /// Apply the diff outcome to the tracker and matcher state. Returns
    /// whether anything changed.
    fn apply(&mut self, outcome: &DiffOutcome) -> Result<bool> {
        match &outcome.event {
            WiringEvent::NoChange => {
                log::debug!("no terminal changed state, skipping cycle");
                Ok(false)
            }
            WiringEvent::Ambiguous => {
                log::warn!("ambiguous wiring step, cycle skipped");
                Ok(false)
            }
            WiringEvent::Add(a, b) => {
                self.tracker.add(a.clone());
                self.tracker.add(b.clone());
                self.tracker.union(a, b)?;
                self.matcher.note_edge(a, b)?;
                for terminal in &outcome.deletions {
                    self.purge(terminal)?;
                }
                Ok(true)
            }
            WiringEvent::Remove(a, b) => {
                // A removed pair where one side went fully empty purges
                // only the emptied terminals; a `wired2 → wired` side
                // keeps its remaining connection.
                let targets: Vec<&Terminal> = if outcome.deletions.is_empty() {
                    vec![a, b]
                } else {
                    outcome.deletions.iter().collect()
                };
                for terminal in targets {
                    self.purge(terminal)?;
                }
                Ok(true)
            }
        }
    }

    fn purge(&mut self, terminal: &str) -> Result<()> {
        if !self.tracker.remove_node(terminal)? {
            log::warn!("terminal {terminal} not tracked, nothing to remove");
        }
        self.matcher.note_removed(terminal)
    }

    /// Close the current scoring session: archive it in the ledger, clear
    /// matcher-local state, and persist.
    pub fn reset_session(&mut self) -> Result<()> {
        self.ledger.reset_session();
        self.matcher.reset()?;
        self.ledger.save_to_file(&self.paths.ledger)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::{CatalogMatcher, StoreMatcher};
    use crate::rules::{RuleCatalog, RulePattern};
    use crate::store::MemoryGraphStore;
    use crate::types::TerminalState::{self, *};
    use tempfile::TempDir;

    fn snap(entries: &[(&str, TerminalState)]) -> Snapshot {
        entries.iter().map(|(n, s)| (n.to_string(), *s)).collect()
    }

    fn paths(dir: &TempDir) -> SessionPaths {
        SessionPaths {
            connectivity: dir.path().join("connectivity.json"),
            ledger: dir.path().join("ledger.json"),
        }
    }

    fn catalog_matcher() -> Box<dyn Matcher> {
        Box::new(CatalogMatcher::new(RuleCatalog::new(vec![RulePattern {
            id: 1,
            nodes: vec!["T1".into(), "T2".into()],
            score: 5.0,
        }])))
    }

    #[tokio::test]
    async fn add_cycle_builds_component_and_scores() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::open(paths(&dir), catalog_matcher()).unwrap();

        let old = snap(&[("T1", Empty), ("T2", Empty)]);
        let new = snap(&[("T1", Wired), ("T2", Wired)]);
        let report = session.process_cycle(&old, &new).await.unwrap();

        assert!(matches!(report.event, WiringEvent::Add(_, _)));
        assert_eq!(
            report.components,
            vec![vec!["T1".to_string(), "T2".to_string()]]
        );
        assert_eq!(report.score_delta, 5.0);
        assert_eq!(session.ledger().total(), 5.0);
        assert_eq!(session.ledger().results().len(), 1);
    }

    #[tokio::test]
    async fn no_change_cycle_is_a_no_op() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::open(paths(&dir), catalog_matcher()).unwrap();
        let s = snap(&[("T1", Empty), ("T2", Empty)]);
        let report = session.process_cycle(&s, &s.clone()).await.unwrap();
        assert_eq!(report.event, WiringEvent::NoChange);
        assert!(report.match_report.is_none());
        assert!(session.tracker().is_empty());
    }

    #[tokio::test]
    async fn ambiguous_cycle_mutates_nothing() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::open(paths(&dir), catalog_matcher()).unwrap();
        let old = snap(&[("T1", Empty), ("T2", Empty)]);
        let new = snap(&[("T1", Wired), ("T2", Empty)]);
        let report = session.process_cycle(&old, &new).await.unwrap();
        assert_eq!(report.event, WiringEvent::Ambiguous);
        assert!(session.tracker().is_empty());
        assert_eq!(session.ledger().total(), 0.0);
    }

    #[tokio::test]
    async fn remove_cycle_drops_score_back() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::open(paths(&dir), catalog_matcher()).unwrap();

        let empty = snap(&[("T1", Empty), ("T2", Empty)]);
        let wired = snap(&[("T1", Wired), ("T2", Wired)]);
        session.process_cycle(&empty, &wired).await.unwrap();
        assert_eq!(session.ledger().total(), 5.0);

        let report = session.process_cycle(&wired, &empty).await.unwrap();
        assert!(matches!(report.event, WiringEvent::Remove(_, _)));
        assert!(session.tracker().is_empty());
        assert_eq!(session.ledger().total(), 0.0);
        assert_eq!(report.score_delta, -5.0);
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let mut session = Session::open(paths(&dir), catalog_matcher()).unwrap();
            let old = snap(&[("T1", Empty), ("T2", Empty)]);
            let new = snap(&[("T1", Wired), ("T2", Wired)]);
            session.process_cycle(&old, &new).await.unwrap();
        }
        let session = Session::open(paths(&dir), catalog_matcher()).unwrap();
        assert!(session.tracker().connected("T1", "T2"));
        assert_eq!(session.ledger().total(), 5.0);
    }

    #[tokio::test]
    async fn store_backed_session_verifies_topology() {
        let dir = TempDir::new().unwrap();
        let mut store = MemoryGraphStore::new();
        store.add_edge("T1", "T2").unwrap();
        let matcher: Box<dyn Matcher> = Box::new(StoreMatcher::new(store, 5.0));
        let mut session = Session::open(paths(&dir), matcher).unwrap();

        let old = snap(&[("T1", Empty), ("T2", Empty)]);
        let new = snap(&[("T1", Wired), ("T2", Wired)]);
        let report = session.process_cycle(&old, &new).await.unwrap();
        let match_report = report.match_report.unwrap();
        assert_eq!(match_report.total, 5.0);
        assert_eq!(match_report.unavailable, 0);
    }

    #[tokio::test]
    async fn recorded_pair_score_ignores_concurrent_purges() {
        let dir = TempDir::new().unwrap();
        let matcher: Box<dyn Matcher> = Box::new(CatalogMatcher::new(RuleCatalog::new(vec![
            RulePattern {
                id: 1,
                nodes: vec!["T1".into(), "T2".into()],
                score: 5.0,
            },
            RulePattern {
                id: 2,
                nodes: vec!["T3".into(), "T4".into()],
                score: 7.0,
            },
        ])));
        let mut session = Session::open(paths(&dir), matcher).unwrap();

        let start = snap(&[("T1", Empty), ("T2", Empty), ("T3", Empty), ("T4", Empty)]);
        let mid = snap(&[("T1", Wired), ("T2", Wired), ("T3", Empty), ("T4", Empty)]);
        session.process_cycle(&start, &mid).await.unwrap();
        assert_eq!(session.ledger().total(), 5.0);

        // T3-T4 is wired while T1 and T2 both go empty in the same window:
        // the ledger credits the new pair with its own rule's 7, even
        // though the purges pull the net delta down to 2.
        let end = snap(&[("T1", Empty), ("T2", Empty), ("T3", Wired), ("T4", Wired)]);
        let report = session.process_cycle(&mid, &end).await.unwrap();
        assert!(matches!(report.event, WiringEvent::Add(_, _)));
        assert!(report.needs_review);
        assert_eq!(report.score_delta, 2.0);
        assert_eq!(session.ledger().total(), 7.0);
        assert_eq!(session.ledger().results()[1].score, 7.0);
    }

    #[tokio::test]
    async fn reset_session_archives_results() {
        let dir = TempDir::new().unwrap();
        let mut session = Session::open(paths(&dir), catalog_matcher()).unwrap();
        let old = snap(&[("T1", Empty), ("T2", Empty)]);
        let new = snap(&[("T1", Wired), ("T2", Wired)]);
        session.process_cycle(&old, &new).await.unwrap();

        session.reset_session().unwrap();
        assert_eq!(session.ledger().session_score(), 0.0);
        assert_eq!(session.ledger().history().len(), 1);

        let reloaded = ScoreLedger::load_from_file(&paths(&dir).ledger).unwrap();
        assert_eq!(reloaded.history().len(), 1);
    }
}
