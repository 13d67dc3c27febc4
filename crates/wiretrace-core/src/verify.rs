//! Topology verification against a reference graph store.
//!
//! The verifier owns a locally tracked query graph (the edges accepted so
//! far this run) and checks each of its connected components against the
//! store in three steps: node-set equality, canonical edge-set equality,
//! and a bounded-depth connectivity proof. Identical terminal names wired
//! in an incompatible shape (chain vs star) must not match, and neither
//! may a store that holds the right node and edge counts split across two
//! disjoint sub-patterns.

use crate::error::{Result, TraceError};
use crate::persist;
use crate::store::GraphStore;
use crate::types::{Edge, Terminal};
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::path::Path;

/// Per-component verification result. Store outages are not an outcome —
/// they surface as [`TraceError::StoreUnavailable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyOutcome {
    Matched,
    NoMatch,
}

/// Full re-verification result, keeping components unverifiable due to a
/// store outage separate from components that simply did not match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VerifyReport {
    pub matched: Vec<Vec<Terminal>>,
    pub unmatched: Vec<Vec<Terminal>>,
    pub unavailable: Vec<Vec<Terminal>>,
}

impl VerifyReport {
    pub fn all_matched(&self) -> bool {
        self.unmatched.is_empty() && self.unavailable.is_empty()
    }
}

pub struct TopologyVerifier<S: GraphStore> {
    store: S,
    edges: BTreeSet<Edge>,
    adjacency: HashMap<Terminal, BTreeSet<Terminal>>,
}

impl<S: GraphStore> TopologyVerifier<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            edges: BTreeSet::new(),
            adjacency: HashMap::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Record an edge in the query graph. Returns `false` when the edge
    /// was already present.
    pub fn add_edge(&mut self, a: &str, b: &str) -> Result<bool> {
        let edge = Edge::new(a, b)?;
        if !self.edges.insert(edge) {
            return Ok(false);
        }
        self.adjacency
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        self.adjacency
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
        Ok(true)
    }

    /// Drop a terminal and every query edge touching it.
    pub fn remove_node(&mut self, terminal: &str) {
        self.edges.retain(|edge| !edge.touches(terminal));
        self.adjacency.remove(terminal);
        for neighbors in self.adjacency.values_mut() {
            neighbors.remove(terminal);
        }
        self.adjacency.retain(|_, neighbors| !neighbors.is_empty());
    }

    /// Clear the query graph.
    pub fn clear(&mut self) {
        self.edges.clear();
        self.adjacency.clear();
    }

    /// Connected components of the local query graph, sorted.
    pub fn components(&self) -> Vec<Vec<Terminal>> {
        let nodes: BTreeSet<Terminal> = self.adjacency.keys().cloned().collect();
        bfs_partition(&nodes, &self.adjacency)
    }

    /// Canonical local edge set `E(C)` for a component, derived from the
    /// query graph, never from the store.
    pub fn component_edges(&self, component: &[Terminal]) -> BTreeSet<Edge> {
        let members: BTreeSet<&str> = component.iter().map(String::as_str).collect();
        self.edges
            .iter()
            .filter(|edge| {
                let (a, b) = edge.endpoints();
                members.contains(a) && members.contains(b)
            })
            .cloned()
            .collect()
    }

    /// Three-step check of one candidate component against the store.
    pub async fn verify_component(&self, component: &[Terminal]) -> Result<VerifyOutcome> {
        if component.is_empty() {
            return Ok(VerifyOutcome::NoMatch);
        }
        let local: BTreeSet<&str> = component.iter().map(String::as_str).collect();

        // 1. Cheap rejection before any edge work: the named nodes must
        //    all exist, and nothing else may come back.
        let existing = self.store.nodes_named(component).await?;
        if existing.len() != component.len() {
            return Ok(VerifyOutcome::NoMatch);
        }
        let existing_set: BTreeSet<&str> = existing.iter().map(String::as_str).collect();
        if existing_set != local {
            return Ok(VerifyOutcome::NoMatch);
        }

        // 2. Strict canonical edge-set equality.
        let remote_edges: BTreeSet<Edge> =
            self.store.edges_among(component).await?.into_iter().collect();
        if remote_edges != self.component_edges(component) {
            return Ok(VerifyOutcome::NoMatch);
        }

        // 3. Connectivity proof: from an arbitrary member, everything in
        //    the component must be reachable within |C| hops in the store.
        let reachable = self
            .store
            .reachable_within(&component[0], component, component.len())
            .await?;
        let reachable_set: BTreeSet<&str> = reachable.iter().map(String::as_str).collect();
        if reachable_set == local {
            Ok(VerifyOutcome::Matched)
        } else {
            Ok(VerifyOutcome::NoMatch)
        }
    }

    /// Re-verify every component of the query graph. A store outage on
    /// one component is recorded in the report and does not abort the
    /// pass; any other error propagates.
    pub async fn verify_all(&self) -> Result<VerifyReport> {
        let mut report = VerifyReport::default();
        for component in self.components() {
            match self.verify_component(&component).await {
                Ok(VerifyOutcome::Matched) => report.matched.push(component),
                Ok(VerifyOutcome::NoMatch) => report.unmatched.push(component),
                Err(TraceError::StoreUnavailable { reason }) => {
                    log::warn!(
                        "store unavailable while verifying {component:?}: {reason}"
                    );
                    report.unavailable.push(component);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }

    /// Incremental mode: record one edge, then re-verify.
    pub async fn add_edge_and_verify(&mut self, a: &str, b: &str) -> Result<VerifyReport> {
        self.add_edge(a, b)?;
        self.verify_all().await
    }

    /// Enumerate the reference store's own components by fetching all of
    /// its nodes and edges and partitioning locally.
    pub async fn store_components(&self) -> Result<Vec<Vec<Terminal>>> {
        let names = self.store.all_nodes().await?;
        let edges = self.store.edges_among(&names).await?;
        let mut adjacency: HashMap<Terminal, BTreeSet<Terminal>> = HashMap::new();
        let nodes: BTreeSet<Terminal> = names.into_iter().collect();
        for edge in edges {
            let (a, b) = edge.endpoints();
            adjacency
                .entry(a.to_string())
                .or_default()
                .insert(b.to_string());
            adjacency
                .entry(b.to_string())
                .or_default()
                .insert(a.to_string());
        }
        Ok(bfs_partition(&nodes, &adjacency))
    }

    /// Persist the query-graph edge list.
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let pairs: Vec<(Terminal, Terminal)> = self
            .edges
            .iter()
            .map(|edge| {
                let (a, b) = edge.endpoints();
                (a.to_string(), b.to_string())
            })
            .collect();
        persist::write_json_atomic(path, &pairs)
    }

    /// Load a verifier whose query graph was persisted by
    /// [`save_to_file`](Self::save_to_file). Missing file bootstraps an
    /// empty persisted log.
    pub fn load_from_file(store: S, path: &Path) -> Result<Self> {
        let mut verifier = Self::new(store);
        if !path.exists() {
            verifier.save_to_file(path)?;
            return Ok(verifier);
        }
        let pairs: Vec<(Terminal, Terminal)> = persist::read_json(path)?;
        for (a, b) in pairs {
            verifier.add_edge(&a, &b)?;
        }
        Ok(verifier)
    }
}

/// Truncate a persisted query-graph edge log to empty, without needing a
/// store connection.
pub fn reset_edge_log(path: &Path) -> Result<()> {
    let empty: Vec<(Terminal, Terminal)> = Vec::new();
    persist::write_json_atomic(path, &empty)
}

/// BFS partition of an undirected adjacency index into sorted components.
fn bfs_partition(
    nodes: &BTreeSet<Terminal>,
    adjacency: &HashMap<Terminal, BTreeSet<Terminal>>,
) -> Vec<Vec<Terminal>> {
    let mut visited: BTreeSet<&str> = BTreeSet::new();
    let mut components = Vec::new();
    for node in nodes {
        if visited.contains(node.as_str()) {
            continue;
        }
        let mut component = Vec::new();
        let mut queue: VecDeque<&Terminal> = VecDeque::new();
        visited.insert(node);
        queue.push_back(node);
        while let Some(current) = queue.pop_front() {
            component.push(current.clone());
            if let Some(neighbors) = adjacency.get(current) {
                for neighbor in neighbors {
                    if visited.insert(neighbor) {
                        queue.push_back(neighbor);
                    }
                }
            }
        }
        component.sort();
        components.push(component);
    }
    components.sort();
    components
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryGraphStore;
    use async_trait::async_trait;
    use tempfile::TempDir;

    /// Store whose every query fails, for outage handling tests.
    struct DownStore;

    #[async_trait]
    impl GraphStore for DownStore {
        async fn nodes_named(&self, _names: &[Terminal]) -> Result<Vec<Terminal>> {
            Err(TraceError::StoreUnavailable {
                reason: "connection refused".into(),
            })
        }
        async fn edges_among(&self, _names: &[Terminal]) -> Result<Vec<Edge>> {
            Err(TraceError::StoreUnavailable {
                reason: "connection refused".into(),
            })
        }
        async fn reachable_within(
            &self,
            _start: &str,
            _names: &[Terminal],
            _max_hops: usize,
        ) -> Result<Vec<Terminal>> {
            Err(TraceError::StoreUnavailable {
                reason: "connection refused".into(),
            })
        }
        async fn all_nodes(&self) -> Result<Vec<Terminal>> {
            Err(TraceError::StoreUnavailable {
                reason: "connection refused".into(),
            })
        }
    }

    fn chain_store() -> MemoryGraphStore {
        // A - B - C as a chain.
        let mut store = MemoryGraphStore::new();
        store.add_edge("A", "B").unwrap();
        store.add_edge("B", "C").unwrap();
        store
    }

    #[tokio::test]
    async fn matching_chain_verifies() {
        let mut verifier = TopologyVerifier::new(chain_store());
        verifier.add_edge("A", "B").unwrap();
        verifier.add_edge("B", "C").unwrap();
        let report = verifier.verify_all().await.unwrap();
        assert_eq!(report.matched.len(), 1);
        assert!(report.all_matched());
    }

    #[tokio::test]
    async fn chain_vs_star_is_rejected_by_edge_set() {
        // Store holds a chain A-B-C; the query graph wires a star A-B, A-C.
        // Same node set, same edge count, different topology.
        let mut verifier = TopologyVerifier::new(chain_store());
        verifier.add_edge("A", "B").unwrap();
        verifier.add_edge("A", "C").unwrap();
        let report = verifier.verify_all().await.unwrap();
        assert!(report.matched.is_empty());
        assert_eq!(report.unmatched.len(), 1);
    }

    #[tokio::test]
    async fn missing_store_node_is_cheap_no_match() {
        let mut verifier = TopologyVerifier::new(chain_store());
        verifier.add_edge("A", "GHOST").unwrap();
        assert_eq!(
            verifier.verify_component(&["A".to_string(), "GHOST".to_string()])
                .await
                .unwrap(),
            VerifyOutcome::NoMatch
        );
    }

    #[tokio::test]
    async fn disjoint_store_patterns_fail_connectivity_proof() {
        // Store: A-B and C-D disjoint. Query component {A, B}: matches.
        // Query component {A, B, C, D} cannot form since local edges drive
        // components, so check the proof path directly: a store whose
        // edges among {A,B,C,D} equal the query's would still have to
        // prove reachability.
        let mut store = MemoryGraphStore::new();
        store.add_edge("A", "B").unwrap();
        store.add_edge("C", "D").unwrap();
        let verifier = TopologyVerifier::new(store);
        let reachable = verifier
            .store()
            .reachable_within(
                "A",
                &["A".into(), "B".into(), "C".into(), "D".into()],
                4,
            )
            .await
            .unwrap();
        assert_eq!(reachable, vec!["A".to_string(), "B".to_string()]);
    }

    #[tokio::test]
    async fn outage_is_counted_separately_from_no_match() {
        let mut verifier = TopologyVerifier::new(DownStore);
        verifier.add_edge("A", "B").unwrap();
        let report = verifier.verify_all().await.unwrap();
        assert!(report.matched.is_empty());
        assert!(report.unmatched.is_empty());
        assert_eq!(report.unavailable.len(), 1);
    }

    #[tokio::test]
    async fn incremental_add_and_verify() {
        let mut verifier = TopologyVerifier::new(chain_store());
        let report = verifier.add_edge_and_verify("A", "B").await.unwrap();
        // The edge and reachability queries are restricted to the named
        // nodes, so the {A, B} prefix of the reference chain verifies.
        assert_eq!(report.matched.len(), 1);
        let report = verifier.add_edge_and_verify("B", "C").await.unwrap();
        assert_eq!(report.matched.len(), 1);
        assert_eq!(
            report.matched[0],
            vec!["A".to_string(), "B".to_string(), "C".to_string()]
        );
    }

    #[tokio::test]
    async fn remove_node_drops_touching_edges() {
        let mut verifier = TopologyVerifier::new(chain_store());
        verifier.add_edge("A", "B").unwrap();
        verifier.add_edge("B", "C").unwrap();
        verifier.remove_node("B");
        assert_eq!(verifier.edge_count(), 0);
        assert!(verifier.components().is_empty());
    }

    #[tokio::test]
    async fn store_components_enumerates_reference_topology() {
        let mut store = MemoryGraphStore::new();
        store.add_edge("A", "B").unwrap();
        store.add_edge("C", "D").unwrap();
        store.add_node("LONER");
        let verifier = TopologyVerifier::new(store);
        let components = verifier.store_components().await.unwrap();
        assert_eq!(
            components,
            vec![
                vec!["A".to_string(), "B".to_string()],
                vec!["C".to_string(), "D".to_string()],
                vec!["LONER".to_string()],
            ]
        );
    }

    #[test]
    fn edge_log_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("edges.json");
        let mut verifier = TopologyVerifier::new(MemoryGraphStore::new());
        verifier.add_edge("A", "B").unwrap();
        verifier.add_edge("B", "C").unwrap();
        verifier.save_to_file(&path).unwrap();

        let reloaded =
            TopologyVerifier::load_from_file(MemoryGraphStore::new(), &path).unwrap();
        assert_eq!(reloaded.components(), verifier.components());
    }
}
