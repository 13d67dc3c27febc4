//! Reference graph-store interface.
//!
//! The topology verifier needs exactly three query shapes from whatever
//! holds the reference topology: labeled-node existence, edge enumeration
//! among named nodes, and bounded-hop reachability. Any backend offering
//! them satisfies the interface — a dedicated graph database behind HTTP
//! or an in-memory adjacency index.

mod http;
mod memory;

pub use http::HttpGraphStore;
pub use memory::MemoryGraphStore;

use crate::error::Result;
use crate::types::{Edge, Terminal};
use async_trait::async_trait;

#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Which of the named nodes exist in the store. Zero results are a
    /// normal answer, not an error.
    async fn nodes_named(&self, names: &[Terminal]) -> Result<Vec<Terminal>>;

    /// Undirected edges among exactly the named nodes, canonicalized the
    /// same way local edges are.
    async fn edges_among(&self, names: &[Terminal]) -> Result<Vec<Edge>>;

    /// Nodes reachable from `start` within `max_hops` hops, restricted to
    /// the named nodes. Includes `start` itself when it exists.
    async fn reachable_within(
        &self,
        start: &str,
        names: &[Terminal],
        max_hops: usize,
    ) -> Result<Vec<Terminal>>;

    /// Every node name in the store. Used to enumerate the reference
    /// topology's own components.
    async fn all_nodes(&self) -> Result<Vec<Terminal>>;
}
