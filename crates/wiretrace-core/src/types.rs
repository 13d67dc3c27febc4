use crate::error::{Result, TraceError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Type alias for terminal identifiers — the named contact points on the
/// trainer board ("KM1-13", "QF1-1", ...). Equality is exact string
/// equality.
pub type Terminal = String;

/// Per-terminal detection outcome at one detection pass.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TerminalState {
    /// No wire on the terminal.
    Empty,

    /// One wire attached.
    Wired,

    /// A second wire attached on top of the first.
    Wired2,
}

impl TerminalState {
    pub fn as_str(self) -> &'static str {
        match self {
            TerminalState::Empty => "empty",
            TerminalState::Wired => "wired",
            TerminalState::Wired2 => "wired2",
        }
    }
}

impl FromStr for TerminalState {
    type Err = TraceError;

    /// Strict parse. Unknown state strings are rejected at the boundary,
    /// never passed through.
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "empty" => Ok(TerminalState::Empty),
            "wired" => Ok(TerminalState::Wired),
            "wired2" => Ok(TerminalState::Wired2),
            _ => Err(TraceError::Validation(format!(
                "unknown terminal state `{s}` (expected empty|wired|wired2)"
            ))),
        }
    }
}

impl std::fmt::Display for TerminalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detection pass's complete terminal → state mapping, captured
/// atomically. Ordered so iteration (and therefore diff signal order) is
/// deterministic.
pub type Snapshot = BTreeMap<Terminal, TerminalState>;

/// The classified outcome of comparing two successive snapshots.
/// Exactly one kind is produced per diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WiringEvent {
    /// Exactly two terminals gained a wire: they were just connected.
    Add(Terminal, Terminal),

    /// Exactly two terminals lost a wire: their connection was undone.
    Remove(Terminal, Terminal),

    /// No terminal changed state between the two snapshots.
    NoChange,

    /// The diff does not fit the two-terminal add/remove shape.
    /// Reported to the caller, never silently resolved.
    Ambiguous,
}

/// An undirected wiring edge, canonicalized by sorting the endpoint pair
/// lexicographically so `(a, b)` and `(b, a)` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    a: Terminal,
    b: Terminal,
}

impl Edge {
    /// Build a canonical edge. Self-loops are rejected: a terminal is
    /// never wired to itself.
    pub fn new(a: impl Into<Terminal>, b: impl Into<Terminal>) -> Result<Self> {
        let (a, b) = (a.into(), b.into());
        if a == b {
            return Err(TraceError::InvalidEdge {
                reason: format!("self-loop on `{a}`"),
            });
        }
        if a <= b {
            Ok(Edge { a, b })
        } else {
            Ok(Edge { a: b, b: a })
        }
    }

    /// Endpoints in canonical (lexicographic) order.
    pub fn endpoints(&self) -> (&str, &str) {
        (&self.a, &self.b)
    }

    /// Given one endpoint, the opposite one. `None` if `name` is not an
    /// endpoint of this edge.
    pub fn other(&self, name: &str) -> Option<&str> {
        if self.a == name {
            Some(&self.b)
        } else if self.b == name {
            Some(&self.a)
        } else {
            None
        }
    }

    pub fn touches(&self, name: &str) -> bool {
        self.a == name || self.b == name
    }
}

impl std::fmt::Display for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.a, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_is_canonical() {
        let ab = Edge::new("KM1-13", "KM1-53").unwrap();
        let ba = Edge::new("KM1-53", "KM1-13").unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.endpoints(), ("KM1-13", "KM1-53"));
    }

    #[test]
    fn edge_rejects_self_loop() {
        assert!(matches!(
            Edge::new("T1", "T1"),
            Err(TraceError::InvalidEdge { .. })
        ));
    }

    #[test]
    fn state_parses_strictly() {
        assert_eq!("wired2".parse::<TerminalState>().unwrap(), TerminalState::Wired2);
        assert!("Wired".parse::<TerminalState>().is_err());
        assert!("".parse::<TerminalState>().is_err());
    }
}
