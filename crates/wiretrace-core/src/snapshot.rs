//! Snapshot loading and boundary validation.
//!
//! The detector pipeline delivers per-terminal states either as `name,state`
//! CSV rows (the merged output of the per-region detectors) or as a JSON
//! object map. Both shapes are validated strictly: an unknown state string
//! is rejected, never passed through.

use crate::error::{Result, TraceError};
use crate::types::{Snapshot, TerminalState};
use std::fs;
use std::path::Path;

/// Parse a snapshot from `name,state` CSV text. Blank lines are skipped
/// and columns beyond the second are detector metadata, ignored.
pub fn from_csv_str(text: &str) -> Result<Snapshot> {
    let mut snapshot = Snapshot::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let mut cols = line.split(',');
        let name = cols.next().unwrap_or("").trim();
        let Some(state) = cols.next().map(str::trim) else {
            return Err(TraceError::Validation(format!(
                "line {}: expected `name,state`, got `{line}`",
                idx + 1
            )));
        };
        if name.is_empty() {
            return Err(TraceError::Validation(format!(
                "line {}: empty terminal name",
                idx + 1
            )));
        }
        let state: TerminalState = state.parse().map_err(|e| {
            TraceError::Validation(format!("line {} (`{name}`): {e}", idx + 1))
        })?;
        snapshot.insert(name.to_string(), state);
    }
    Ok(snapshot)
}

pub fn from_csv_path(path: &Path) -> Result<Snapshot> {
    from_csv_str(&fs::read_to_string(path)?)
}

/// Load a snapshot from a JSON object map, e.g. `{"T1": "wired"}`.
pub fn from_json_path(path: &Path) -> Result<Snapshot> {
    crate::persist::read_json(path)
}
