//! Checking every `data.js` below a directory.
//!
//! Histories live one per category directory (`ARM64/disk/read/data.js`,
//! `X86/standard/latency/read/data.js`, ...). Each file is independent, so
//! they are loaded in parallel and one bad file never hides the others.

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::schema::BenchmarkFile;
use crate::store;

pub const DATA_FILE_NAME: &str = "data.js";

#[derive(Debug, Clone, Serialize)]
pub struct SeriesSummary {
    pub series: String,
    pub entries: usize,
    pub tool: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Ok {
        last_update: u64,
        series: Vec<SeriesSummary>,
    },
    Invalid {
        error: String,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    /// Directory of the file relative to the scan root, `/`-separated.
    pub category: String,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileReport {
    pub fn is_ok(&self) -> bool {
        matches!(self.status, FileStatus::Ok { .. })
    }
}

fn summarize(file: &BenchmarkFile) -> FileStatus {
    FileStatus::Ok {
        last_update: file.last_update,
        series: file
            .entries
            .iter()
            .map(|(name, runs)| SeriesSummary {
                series: name.clone(),
                entries: runs.len(),
                tool: runs.first().map(|e| e.tool.to_string()),
            })
            .collect(),
    }
}

fn category(root: &Path, path: &Path) -> String {
    path.parent()
        .and_then(|dir| dir.strip_prefix(root).ok())
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/")
        })
        .unwrap_or_default()
}

/// Every `data.js` below `root`, sorted by path.
pub fn find_data_files(root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();
    let mut found = Vec::new();
    for dent in WalkDir::new(root).sort_by_file_name() {
        let dent = dent.map_err(|e| {
            let path = e.path().unwrap_or(root).to_path_buf();
            Error::io(path, e.into())
        })?;
        if dent.file_type().is_file() && dent.file_name() == DATA_FILE_NAME {
            found.push(dent.into_path());
        }
    }
    debug!(root = %root.display(), files = found.len(), "found benchmark data files");
    Ok(found)
}

pub fn check_file(root: &Path, path: &Path) -> FileReport {
    let status = match store::load(path) {
        Ok(file) => summarize(&file),
        Err(e) => {
            warn!(error = %e, "invalid benchmark data");
            FileStatus::Invalid {
                error: e.to_string(),
            }
        }
    };
    FileReport {
        path: path.to_path_buf(),
        category: category(root, path),
        status,
    }
}

/// Load and validate every `data.js` below `root`. A plain file is checked on its own.
pub fn scan(root: impl AsRef<Path>) -> Result<Vec<FileReport>> {
    let root = root.as_ref();
    if root.is_file() {
        let dir = root.parent().unwrap_or(Path::new(""));
        return Ok(vec![check_file(dir, root)]);
    }

    let files = find_data_files(root)?;
    Ok(files.par_iter().map(|p| check_file(root, p)).collect())
}
