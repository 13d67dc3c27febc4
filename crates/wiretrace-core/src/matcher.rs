//! One matching capability, two implementations.
//!
//! The scoring pass does not care whether the reference is a static rule
//! catalog or a live topology in an external store; both sit behind
//! [`Matcher`], selected by configuration.

use crate::error::{Result, TraceError};
use crate::rules::RuleCatalog;
use crate::store::GraphStore;
use crate::types::Terminal;
use crate::verify::{TopologyVerifier, VerifyOutcome};
use async_trait::async_trait;
use std::path::PathBuf;

/// One matched component.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleMatch {
    /// Catalog rule id; `None` for store-backed matches, which have no
    /// catalog entry.
    pub rule_id: Option<u32>,
    pub score: f64,
    pub nodes: Vec<Terminal>,
}

/// Result of one full matching pass. `total` replaces, never accumulates
/// onto, the previous evaluation's total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchReport {
    pub matches: Vec<RuleMatch>,
    pub total: f64,
    /// Components that could not be verified because the reference store
    /// was unreachable. Never conflated with "did not match".
    pub unavailable: usize,
}

#[async_trait]
pub trait Matcher: Send {
    /// Mirror an accepted edge addition into matcher-local state.
    fn note_edge(&mut self, a: &str, b: &str) -> Result<()>;

    /// Mirror a terminal removal into matcher-local state.
    fn note_removed(&mut self, terminal: &str) -> Result<()>;

    /// Discard matcher-local state.
    fn reset(&mut self) -> Result<()>;

    /// Evaluate the current component partition and produce a fresh
    /// report.
    async fn evaluate(&self, components: &[Vec<Terminal>]) -> Result<MatchReport>;
}

/// Catalog-backed matcher: exact node-set equality against loaded rules.
/// Stateless beyond the catalog itself, so the note hooks are no-ops.
pub struct CatalogMatcher {
    catalog: RuleCatalog,
}

impl CatalogMatcher {
    pub fn new(catalog: RuleCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &RuleCatalog {
        &self.catalog
    }
}

#[async_trait]
impl Matcher for CatalogMatcher {
    fn note_edge(&mut self, _a: &str, _b: &str) -> Result<()> {
        Ok(())
    }

    fn note_removed(&mut self, _terminal: &str) -> Result<()> {
        Ok(())
    }

    fn reset(&mut self) -> Result<()> {
        Ok(())
    }

    async fn evaluate(&self, components: &[Vec<Terminal>]) -> Result<MatchReport> {
        Ok(self.catalog.match_components(components))
    }
}

/// Store-backed matcher: each component is verified against the reference
/// topology and a verified component contributes a fixed per-match score.
///
/// The verifier's query graph is matcher-local state and, when an edge log
/// path is configured, survives process restarts.
pub struct StoreMatcher<S: GraphStore> {
    verifier: TopologyVerifier<S>,
    match_score: f64,
    edge_log: Option<PathBuf>,
}

impl<S: GraphStore> StoreMatcher<S> {
    pub fn new(store: S, match_score: f64) -> Self {
        Self {
            verifier: TopologyVerifier::new(store),
            match_score,
            edge_log: None,
        }
    }

    /// Open a matcher whose query graph is persisted at `edge_log`.
    pub fn open(store: S, match_score: f64, edge_log: PathBuf) -> Result<Self> {
        let verifier = TopologyVerifier::load_from_file(store, &edge_log)?;
        Ok(Self {
            verifier,
            match_score,
            edge_log: Some(edge_log),
        })
    }

    pub fn verifier(&self) -> &TopologyVerifier<S> {
        &self.verifier
    }

    fn persist(&self) -> Result<()> {
        if let Some(path) = &self.edge_log {
            self.verifier.save_to_file(path)?;
        }
        Ok(())
    }
}

#[async_trait]
impl<S: GraphStore> Matcher for StoreMatcher<S> {
    fn note_edge(&mut self, a: &str, b: &str) -> Result<()> {
        self.verifier.add_edge(a, b)?;
        self.persist()
    }

    fn note_removed(&mut self, terminal: &str) -> Result<()> {
        self.verifier.remove_node(terminal);
        self.persist()
    }

    fn reset(&mut self) -> Result<()> {
        self.verifier.clear();
        self.persist()
    }

    async fn evaluate(&self, components: &[Vec<Terminal>]) -> Result<MatchReport> {
        let mut report = MatchReport::default();
        for component in components {
            // A lone terminal carries no wiring to verify; it would pass
            // all three checks vacuously. Never a match candidate.
            if component.len() < 2 {
                continue;
            }
            match self.verifier.verify_component(component).await {
                Ok(VerifyOutcome::Matched) => {
                    report.total += self.match_score;
                    report.matches.push(RuleMatch {
                        rule_id: None,
                        score: self.match_score,
                        nodes: component.clone(),
                    });
                }
                Ok(VerifyOutcome::NoMatch) => {}
                Err(TraceError::StoreUnavailable { reason }) => {
                    log::warn!(
                        "store unavailable while matching {component:?}: {reason}"
                    );
                    report.unavailable += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(report)
    }
}
