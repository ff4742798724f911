//! Inputs for a new run: the measurements written by the benchmark job and
//! the commit they were taken on.

use std::fs;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::schema::{Bench, Commit};

/// Parse the custom-tool output: a JSON array of `{name, value, unit}` objects,
/// optionally with `range` and `extra`.
pub fn read_benches(path: impl AsRef<Path>) -> Result<Vec<Bench>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_str(&text).map_err(|e| Error::json(path, e))
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CommitSource {
    /// A push event payload, as found at `$GITHUB_EVENT_PATH`.
    Event { head_commit: Commit },
    Bare(Commit),
}

/// Read commit metadata, either a bare commit object or a push event payload.
pub fn read_commit(path: impl AsRef<Path>) -> Result<Commit> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let source: CommitSource = serde_json::from_str(&text).map_err(|e| Error::json(path, e))?;
    Ok(match source {
        CommitSource::Event { head_commit } => head_commit,
        CommitSource::Bare(commit) => commit,
    })
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}
