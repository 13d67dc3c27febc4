//! Connectivity tracking over terminal identifiers.
//!
//! A disjoint-set forest with union-by-size and path compression, plus the
//! two operations union-find does not give you for free: node removal
//! (rebuild from the surviving edges) and durable persistence as a
//! numbered component list with its edge set.

use crate::error::{Result, TraceError};
use crate::persist;
use crate::types::{Edge, Terminal};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;

/// On-disk record: one connected component with a 1-based id.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedComponent {
    id: u64,
    nodes: Vec<Terminal>,
}

/// Full persisted document: the numbered partition plus the accepted edge
/// set it was derived from. The edges keep removal correct after a reload.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedState {
    components: Vec<PersistedComponent>,
    edges: Vec<(Terminal, Terminal)>,
}

/// The single source of truth for "what is currently wired to what".
///
/// Owns the parent and size maps exclusively; all mutation goes through
/// [`add`](Self::add), [`union`](Self::union), and
/// [`remove_node`](Self::remove_node).
#[derive(Debug, Clone, Default)]
pub struct ConnectivityTracker {
    parent: HashMap<Terminal, Terminal>,
    /// Component sizes, tracked only at roots.
    size: HashMap<Terminal, usize>,
    /// Every accepted wiring edge. The forest alone cannot tell what still
    /// holds a component together once a terminal is removed.
    edges: BTreeSet<Edge>,
}

impl ConnectivityTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked terminals.
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    pub fn contains(&self, terminal: &str) -> bool {
        self.parent.contains_key(terminal)
    }

    /// Register a terminal as its own singleton component. Idempotent:
    /// adding a known terminal changes nothing.
    pub fn add(&mut self, terminal: impl Into<Terminal>) {
        let terminal = terminal.into();
        if !self.parent.contains_key(&terminal) {
            self.size.insert(terminal.clone(), 1);
            self.parent.insert(terminal.clone(), terminal);
        }
    }

    /// Representative of `terminal`'s component, compressing the path so
    /// every visited node points directly at the root afterwards.
    pub fn find(&mut self, terminal: &str) -> Result<Terminal> {
        if !self.parent.contains_key(terminal) {
            return Err(TraceError::UnknownTerminal(terminal.to_string()));
        }
        let mut path = Vec::new();
        let mut current = terminal.to_string();
        loop {
            let next = match self.parent.get(&current) {
                Some(p) => p.clone(),
                None => return Err(TraceError::UnknownTerminal(current)),
            };
            if next == current {
                break;
            }
            path.push(current);
            current = next;
        }
        for node in path {
            self.parent.insert(node, current.clone());
        }
        Ok(current)
    }

    /// Merge the components of `a` and `b` (union-by-size) and record the
    /// accepted edge. A no-op on the forest if they already share a root,
    /// but the edge is still kept: a redundant wire exists physically and
    /// matters for later removals. Both terminals must have been `add`ed
    /// first.
    pub fn union(&mut self, a: &str, b: &str) -> Result<()> {
        self.link(a, b)?;
        if a != b {
            self.edges.insert(Edge::new(a, b)?);
        }
        Ok(())
    }

    /// Forest merge without edge bookkeeping.
    fn link(&mut self, a: &str, b: &str) -> Result<()> {
        let root_a = self.find(a)?;
        let root_b = self.find(b)?;
        if root_a == root_b {
            return Ok(());
        }
        let size_a = self.size.get(&root_a).copied().unwrap_or(1);
        let size_b = self.size.get(&root_b).copied().unwrap_or(1);
        let (winner, loser) = if size_a >= size_b {
            (root_a, root_b)
        } else {
            (root_b, root_a)
        };
        self.parent.insert(loser.clone(), winner.clone());
        self.size.remove(&loser);
        self.size.insert(winner, size_a + size_b);
        Ok(())
    }

    /// Non-compressing root lookup for read-only queries.
    fn root_of(&self, terminal: &str) -> Option<Terminal> {
        let mut current = self.parent.get(terminal)?;
        loop {
            let next = self.parent.get(current)?;
            if next == current {
                return Some(current.clone());
            }
            current = next;
        }
    }

    /// Whether two terminals are in the same component. False when either
    /// is untracked.
    pub fn connected(&self, a: &str, b: &str) -> bool {
        match (self.root_of(a), self.root_of(b)) {
            (Some(ra), Some(rb)) => ra == rb,
            _ => false,
        }
    }

    /// The current partition as a sorted collection of sorted terminal
    /// lists, deterministic for persistence and comparison.
    pub fn all_components(&self) -> Vec<Vec<Terminal>> {
        let mut by_root: BTreeMap<Terminal, Vec<Terminal>> = BTreeMap::new();
        for node in self.parent.keys() {
            if let Some(root) = self.root_of(node) {
                by_root.entry(root).or_default().push(node.clone());
            }
        }
        let mut components: Vec<Vec<Terminal>> = by_root
            .into_values()
            .map(|mut members| {
                members.sort();
                members
            })
            .collect();
        components.sort();
        components
    }

    /// Largest current component, ties broken by sort order. `None` when
    /// nothing is tracked.
    pub fn largest_component(&self) -> Option<Vec<Terminal>> {
        self.all_components()
            .into_iter()
            .max_by_key(|component| component.len())
    }

    /// Remove a terminal entirely.
    ///
    /// Deletion is not a native disjoint-set primitive — local pointer
    /// surgery risks corrupting future unions. Policy: drop every edge
    /// incident to the terminal, rebuild the whole forest from the
    /// surviving edges, then swap the staged forest in atomically. A
    /// component held together only by the removed terminal splits apart;
    /// one with an alternate path stays joined.
    ///
    /// Returns `Ok(false)` if the terminal was never tracked. O(total
    /// tracked terminals + edges).
    pub fn remove_node(&mut self, terminal: &str) -> Result<bool> {
        if !self.parent.contains_key(terminal) {
            return Ok(false);
        }
        let mut rebuilt = Self::new();
        for node in self.parent.keys() {
            if node != terminal {
                rebuilt.add(node.clone());
            }
        }
        for edge in &self.edges {
            if !edge.touches(terminal) {
                let (a, b) = edge.endpoints();
                rebuilt.union(a, b)?;
            }
        }
        *self = rebuilt;
        Ok(true)
    }

    /// Persist the partition as a numbered component list together with
    /// the accepted edge set.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let components: Vec<PersistedComponent> = self
            .all_components()
            .into_iter()
            .enumerate()
            .map(|(idx, nodes)| PersistedComponent {
                id: idx as u64 + 1,
                nodes,
            })
            .collect();
        let edges = self
            .edges
            .iter()
            .map(|edge| {
                let (a, b) = edge.endpoints();
                (a.to_string(), b.to_string())
            })
            .collect();
        persist::write_json_atomic(path, &PersistedState { components, edges })
    }

    /// Load a tracker from a persisted state: every component member is
    /// re-`add`ed, then the forest is re-derived by re-unioning the
    /// persisted edges.
    ///
    /// A missing file is first-run bootstrap: an empty tracker is
    /// persisted to create it. A present-but-malformed file is a hard
    /// [`TraceError::PersistenceFormat`] failure.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::info!("{} does not exist, creating an empty connectivity file", path.display());
            let tracker = Self::new();
            tracker.save_to_file(path)?;
            return Ok(tracker);
        }
        let state: PersistedState = persist::read_json(path)?;
        let mut tracker = Self::new();
        for component in state.components {
            for node in component.nodes {
                tracker.add(node);
            }
        }
        for (a, b) in state.edges {
            tracker.union(&a, &b)?;
        }
        Ok(tracker)
    }
}
