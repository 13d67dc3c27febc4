//! HTTP-backed [`GraphStore`] client.
//!
//! Speaks to a JSON service exposing the three verifier query shapes.
//! Terminal names travel only as JSON data — parameterized, never
//! interpolated into query text. Every transport failure, timeout, or
//! non-2xx status maps to [`TraceError::StoreUnavailable`] so the caller
//! can tell an outage apart from a negative match.

use crate::error::{Result, TraceError};
use crate::store::GraphStore;
use crate::types::{Edge, Terminal};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct HttpGraphStore {
    client: reqwest::Client,
    base_url: String,
    /// Node label namespace on the store; one store can hold several
    /// reference boards.
    label: String,
}

#[derive(Serialize)]
struct NamesQuery<'a> {
    label: &'a str,
    names: &'a [Terminal],
}

#[derive(Serialize)]
struct ReachableQuery<'a> {
    label: &'a str,
    start: &'a str,
    names: &'a [Terminal],
    max_hops: usize,
}

#[derive(Serialize)]
struct LabelQuery<'a> {
    label: &'a str,
}

#[derive(Deserialize)]
struct NamesResponse {
    names: Vec<Terminal>,
}

#[derive(Deserialize)]
struct EdgesResponse {
    edges: Vec<(Terminal, Terminal)>,
}

impl HttpGraphStore {
    pub fn new(base_url: impl Into<String>, label: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, label, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        label: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TraceError::Validation(format!("failed to build http client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            label: label.into(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    async fn post_json<B, R>(&self, path: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: DeserializeOwned,
    {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| TraceError::StoreUnavailable {
                reason: format!("{url}: {e}"),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(TraceError::StoreUnavailable {
                reason: format!("{url} returned {status}"),
            });
        }
        response
            .json::<R>()
            .await
            .map_err(|e| TraceError::StoreUnavailable {
                reason: format!("{url}: malformed response: {e}"),
            })
    }
}

#[async_trait]
impl GraphStore for HttpGraphStore {
    async fn nodes_named(&self, names: &[Terminal]) -> Result<Vec<Terminal>> {
        let response: NamesResponse = self
            .post_json(
                "nodes/lookup",
                &NamesQuery {
                    label: &self.label,
                    names,
                },
            )
            .await?;
        Ok(response.names)
    }

    async fn edges_among(&self, names: &[Terminal]) -> Result<Vec<Edge>> {
        let response: EdgesResponse = self
            .post_json(
                "edges/among",
                &NamesQuery {
                    label: &self.label,
                    names,
                },
            )
            .await?;
        // Re-canonicalize: the store's pair order is its own business.
        response
            .edges
            .into_iter()
            .map(|(a, b)| Edge::new(a, b))
            .collect()
    }

    async fn reachable_within(
        &self,
        start: &str,
        names: &[Terminal],
        max_hops: usize,
    ) -> Result<Vec<Terminal>> {
        let response: NamesResponse = self
            .post_json(
                "nodes/reachable",
                &ReachableQuery {
                    label: &self.label,
                    start,
                    names,
                    max_hops,
                },
            )
            .await?;
        Ok(response.names)
    }

    async fn all_nodes(&self) -> Result<Vec<Terminal>> {
        let response: NamesResponse = self
            .post_json("nodes/all", &LabelQuery { label: &self.label })
            .await?;
        Ok(response.names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_host_is_store_unavailable() {
        // Reserved TEST-NET-1 address; nothing listens there.
        let store = HttpGraphStore::with_timeout(
            "http://192.0.2.1:1",
            "terminal",
            Duration::from_millis(200),
        )
        .unwrap();
        let err = store.nodes_named(&["T1".to_string()]).await.unwrap_err();
        assert!(matches!(err, TraceError::StoreUnavailable { .. }));
    }
}
