pub mod types;
pub mod error;
pub mod snapshot;
pub mod diff;
pub mod connect;
pub mod rules;
pub mod ledger;
pub mod store;
pub mod verify;
pub mod matcher;
pub mod session;

mod persist;

pub use error::{Result, TraceError};
pub use types::{Edge, Snapshot, Terminal, TerminalState, WiringEvent};
pub use diff::{diff_snapshots, DiffOutcome};
pub use connect::ConnectivityTracker;
pub use rules::{RuleCatalog, RulePattern};
pub use ledger::{ScoreLedger, SessionRecord, WiringRecord};
pub use store::{GraphStore, HttpGraphStore, MemoryGraphStore};
pub use verify::{TopologyVerifier, VerifyOutcome, VerifyReport};
pub use matcher::{CatalogMatcher, MatchReport, Matcher, RuleMatch, StoreMatcher};
pub use session::{CycleReport, Session, SessionPaths};
