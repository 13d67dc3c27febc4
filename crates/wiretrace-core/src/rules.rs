//! Static rule catalog and exact-match scoring.

use crate::error::Result;
use crate::matcher::{MatchReport, RuleMatch};
use crate::persist;
use crate::types::Terminal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// One known-correct wiring configuration: a scored reference node set.
/// Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RulePattern {
    pub id: u32,
    pub nodes: Vec<Terminal>,
    pub score: f64,
}

/// A loaded catalog of [`RulePattern`]s.
#[derive(Debug, Clone, Default)]
pub struct RuleCatalog {
    rules: Vec<RulePattern>,
}

impl RuleCatalog {
    pub fn new(rules: Vec<RulePattern>) -> Self {
        Self { rules }
    }

    /// Load a catalog from a JSON list of `{id, nodes, score}` records.
    /// A malformed file is a data-format error, never a silent zero score.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(persist::read_json(path)?))
    }

    pub fn rules(&self) -> &[RulePattern] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Match every component against the catalog by exact node-set
    /// equality: order-independent, size must match. Partial or superset
    /// wiring never matches. The returned total replaces, not accumulates
    /// onto, any previous full-evaluation total.
    pub fn match_components(&self, components: &[Vec<Terminal>]) -> MatchReport {
        let mut matches = Vec::new();
        for component in components {
            let component_set: BTreeSet<&str> =
                component.iter().map(String::as_str).collect();
            for rule in &self.rules {
                if rule.nodes.len() != component_set.len() {
                    continue;
                }
                let rule_set: BTreeSet<&str> =
                    rule.nodes.iter().map(String::as_str).collect();
                if rule_set == component_set {
                    matches.push(RuleMatch {
                        rule_id: Some(rule.id),
                        score: rule.score,
                        nodes: rule.nodes.clone(),
                    });
                }
            }
        }
        let total = matches.iter().map(|m| m.score).sum();
        MatchReport {
            matches,
            total,
            unavailable: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn catalog() -> RuleCatalog {
        RuleCatalog::new(vec![
            RulePattern {
                id: 1,
                nodes: vec!["T1".into(), "T2".into()],
                score: 5.0,
            },
            RulePattern {
                id: 2,
                nodes: vec!["A".into(), "B".into(), "C".into()],
                score: 10.0,
            },
        ])
    }

    fn component(nodes: &[&str]) -> Vec<Terminal> {
        nodes.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn matches_order_independently() {
        let report = catalog().match_components(&[component(&["C", "B", "A"])]);
        assert_eq!(report.matches.len(), 1);
        assert_eq!(report.matches[0].rule_id, Some(2));
        assert_eq!(report.total, 10.0);
    }

    #[test]
    fn rejects_subset_and_superset() {
        let report = catalog().match_components(&[
            component(&["A", "B"]),
            component(&["A", "B", "C", "D"]),
        ]);
        assert!(report.matches.is_empty());
        assert_eq!(report.total, 0.0);
    }

    #[test]
    fn sums_across_components() {
        let report = catalog().match_components(&[
            component(&["T2", "T1"]),
            component(&["A", "B", "C"]),
        ]);
        assert_eq!(report.matches.len(), 2);
        assert_eq!(report.total, 15.0);
    }

    #[test]
    fn load_rejects_malformed_catalog() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        std::fs::write(&path, "[{\"id\": 1}]").unwrap();
        assert!(RuleCatalog::load_from_file(&path).is_err());
    }

    #[test]
    fn load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("rules.json");
        let text = serde_json::to_string(catalog().rules()).unwrap();
        std::fs::write(&path, text).unwrap();
        let loaded = RuleCatalog::load_from_file(&path).unwrap();
        assert_eq!(loaded.rules(), catalog().rules());
    }
}
