//! Snapshot diff classification.
//!
//! Turns two successive terminal-state snapshots into exactly one
//! [`WiringEvent`]. The detector is pure: it never mutates connectivity
//! state, it only classifies.

use crate::types::{Snapshot, Terminal, TerminalState, WiringEvent};

/// Result of one diff pass. The event drives `union`/`remove_node`; the
/// deletion candidates are an independent output of the same pass and
/// drive `remove_node` on their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffOutcome {
    pub event: WiringEvent,

    /// Terminals that went `wired → empty` and can no longer participate
    /// in any component. They must be purged from connectivity state, not
    /// merely un-flagged.
    pub deletions: Vec<Terminal>,
}

impl DiffOutcome {
    /// True when an add event and deletion candidates landed in the same
    /// diff window. Legal, but flagged for manual review rather than
    /// resolved silently.
    pub fn needs_review(&self) -> bool {
        matches!(self.event, WiringEvent::Add(_, _)) && !self.deletions.is_empty()
    }
}

/// Compare two snapshots keyed by terminal name.
///
/// Terminals present in only one snapshot are ignored — the modeled domain
/// never introduces new terminals mid-run. Each differing row contributes
/// an addition signal (`empty → wired`, `wired → wired2`) or a removal
/// signal (`wired → empty`, `wired2 → wired`); exactly two signals on one
/// axis classify the event, anything else is [`WiringEvent::Ambiguous`].
///
/// A transition outside the stepwise model (e.g. `wired2 → empty` in a
/// single step) is ambiguous on its own: the domain assumes one wire moves
/// per detection pass.
pub fn diff_snapshots(old: &Snapshot, new: &Snapshot) -> DiffOutcome {
    use TerminalState::*;

    let mut added: Vec<Terminal> = Vec::new();
    let mut removed: Vec<Terminal> = Vec::new();
    let mut deletions: Vec<Terminal> = Vec::new();

    for (name, old_state) in old {
        let Some(new_state) = new.get(name) else {
            continue;
        };
        if new_state == old_state {
            continue;
        }
        match (old_state, new_state) {
            (Empty, Wired) | (Wired, Wired2) => added.push(name.clone()),
            (Wired, Empty) | (Wired2, Wired) => removed.push(name.clone()),
            _ => {
                // Not a stepwise transition. The whole window is suspect.
                return DiffOutcome {
                    event: WiringEvent::Ambiguous,
                    deletions: Vec::new(),
                };
            }
        }
        if (old_state, new_state) == (&Wired, &Empty) {
            deletions.push(name.clone());
        }
    }

    let event = if added.len() == 2 {
        WiringEvent::Add(added[0].clone(), added[1].clone())
    } else if removed.len() == 2 {
        WiringEvent::Remove(removed[0].clone(), removed[1].clone())
    } else if added.is_empty() && removed.is_empty() {
        WiringEvent::NoChange
    } else {
        WiringEvent::Ambiguous
    };

    DiffOutcome { event, deletions }
}
