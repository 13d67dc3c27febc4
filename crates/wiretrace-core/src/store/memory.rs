//! In-memory adjacency index implementing [`GraphStore`]. Holds a local
//! reference topology and backs the verifier tests.

use crate::error::Result;
use crate::store::GraphStore;
use crate::types::{Edge, Terminal};
use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

#[derive(Debug, Clone, Default)]
pub struct MemoryGraphStore {
    adjacency: HashMap<Terminal, BTreeSet<Terminal>>,
    edges: BTreeSet<Edge>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node, possibly isolated.
    pub fn add_node(&mut self, name: impl Into<Terminal>) {
        self.adjacency.entry(name.into()).or_default();
    }

    /// Register an undirected edge, creating both endpoints as needed.
    /// Duplicate edges collapse; self-loops are rejected.
    pub fn add_edge(&mut self, a: impl Into<Terminal>, b: impl Into<Terminal>) -> Result<()> {
        let edge = Edge::new(a, b)?;
        let (a, b) = edge.endpoints();
        self.adjacency
            .entry(a.to_string())
            .or_default()
            .insert(b.to_string());
        self.adjacency
            .entry(b.to_string())
            .or_default()
            .insert(a.to_string());
        self.edges.insert(edge);
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn nodes_named(&self, names: &[Terminal]) -> Result<Vec<Terminal>> {
        Ok(names
            .iter()
            .filter(|name| self.adjacency.contains_key(*name))
            .cloned()
            .collect())
    }

    async fn edges_among(&self, names: &[Terminal]) -> Result<Vec<Edge>> {
        let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
        Ok(self
            .edges
            .iter()
            .filter(|edge| {
                let (a, b) = edge.endpoints();
                wanted.contains(a) && wanted.contains(b)
            })
            .cloned()
            .collect())
    }

    async fn reachable_within(
        &self,
        start: &str,
        names: &[Terminal],
        max_hops: usize,
    ) -> Result<Vec<Terminal>> {
        let allowed: HashSet<&str> = names.iter().map(String::as_str).collect();
        if !allowed.contains(start) || !self.adjacency.contains_key(start) {
            return Ok(Vec::new());
        }
        let mut visited: BTreeSet<Terminal> = BTreeSet::new();
        let mut queue: VecDeque<(Terminal, usize)> = VecDeque::new();
        visited.insert(start.to_string());
        queue.push_back((start.to_string(), 0));
        while let Some((node, depth)) = queue.pop_front() {
            if depth == max_hops {
                continue;
            }
            if let Some(neighbors) = self.adjacency.get(&node) {
                for neighbor in neighbors {
                    if allowed.contains(neighbor.as_str()) && visited.insert(neighbor.clone()) {
                        queue.push_back((neighbor.clone(), depth + 1));
                    }
                }
            }
        }
        Ok(visited.into_iter().collect())
    }

    async fn all_nodes(&self) -> Result<Vec<Terminal>> {
        Ok(self.adjacency.keys().cloned().collect())
    }
}
