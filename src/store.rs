//! Loading, appending to and persisting `data.js` files.
//!
//! A file is rewritten wholesale on every run. Writes go to a temporary file
//! in the destination directory which is then renamed over the target, so a
//! failed write never leaves a truncated history behind.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

use crate::config::UpdateConfig;
use crate::error::{Error, Result, ValidationError};
use crate::format;
use crate::schema::{BenchmarkEntry, BenchmarkFile, DEFAULT_SERIES};
use crate::validate::{validate_file, SeriesRules};

type ContentDigest = [u8; 32];

fn digest(bytes: &[u8]) -> ContentDigest {
    Sha256::digest(bytes).into()
}

impl BenchmarkFile {
    /// An empty history for `repo_url`, used before the first run is recorded.
    pub fn init(repo_url: impl Into<String>) -> Self {
        Self {
            last_update: 0,
            repo_url: repo_url.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Append a run to the default series. See [`BenchmarkFile::append_to`].
    pub fn append(&mut self, entry: BenchmarkEntry) -> Result<(), ValidationError> {
        self.append_to(DEFAULT_SERIES, entry)
    }

    /// Append a run at the end of `series`, creating the series if needed.
    ///
    /// The entry must be valid on its own and consistent with the polarity and
    /// units already recorded in the series; on error nothing changes. Earlier
    /// entries are never touched. `lastUpdate` only moves forward.
    pub fn append_to(&mut self, series: &str, entry: BenchmarkEntry) -> Result<(), ValidationError> {
        let history = self.series(series);
        SeriesRules::from_history(history).admit(&entry)?;

        self.last_update = self.last_update.max(entry.date);
        self.entries
            .entry(series.to_string())
            .or_default()
            .push(entry);
        Ok(())
    }
}

fn decode(path: &Path, bytes: &[u8]) -> Result<BenchmarkFile> {
    let file = format::from_js_bytes(bytes).map_err(|source| Error::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate_file(&file).map_err(|(series, source)| Error::Validation {
        path: path.to_path_buf(),
        series,
        source,
    })?;
    Ok(file)
}

fn read_snapshot(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::io(path, e)),
    }
}

/// Read and validate a `data.js` file. Any malformed entry fails the whole load.
pub fn load(path: impl AsRef<Path>) -> Result<BenchmarkFile> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    let file = decode(path, &bytes)?;
    debug!(
        path = %path.display(),
        entries = file.entry_count(),
        "loaded benchmark data"
    );
    Ok(file)
}

/// Load `path`, or start an empty history for `repo_url` if it does not exist.
pub fn load_or_init(path: impl AsRef<Path>, repo_url: &str) -> Result<BenchmarkFile> {
    let path = path.as_ref();
    match read_snapshot(path)? {
        Some(bytes) => decode(path, &bytes),
        None => {
            debug!(path = %path.display(), "no benchmark data yet, starting empty");
            Ok(BenchmarkFile::init(repo_url))
        }
    }
}

fn render(path: &Path, file: &BenchmarkFile) -> Result<String> {
    validate_file(file).map_err(|(series, source)| Error::Validation {
        path: path.to_path_buf(),
        series,
        source,
    })?;
    format::to_js(file).map_err(|e| Error::json(path, e))
}

/// Write `text` beside `path` and rename it into place.
///
/// With `expected` set, the current content of `path` must still hash to it
/// (or still be absent for `Some(None)`) right before the rename.
fn write_atomic(
    path: &Path,
    text: &str,
    expected: Option<Option<ContentDigest>>,
) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    tmp.write_all(text.as_bytes())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| Error::io(tmp.path(), e))?;

    if let Some(expected) = expected {
        let current = read_snapshot(path)?.map(|b| digest(&b));
        if current != expected {
            return Err(Error::Conflict {
                path: path.to_path_buf(),
                attempts: 1,
            });
        }
    }

    // The temp file is created 0600; keep the mode of the file being replaced.
    if let Ok(meta) = fs::metadata(path) {
        tmp.as_file()
            .set_permissions(meta.permissions())
            .map_err(|e| Error::io(tmp.path(), e))?;
    }

    tmp.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}

/// Serialize deterministically and replace `path`.
pub fn save(file: &BenchmarkFile, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let text = render(path, file)?;
    write_atomic(path, &text, None)?;
    debug!(
        path = %path.display(),
        entries = file.entry_count(),
        bytes = text.len(),
        "saved benchmark data"
    );
    Ok(())
}

/// Optimistic read-modify-write of `path`.
///
/// `f` runs against a fresh load on every attempt. The write only lands if the
/// file on disk is unchanged since it was read; otherwise the cycle restarts
/// after a jittered backoff, up to `cfg.attempts` times.
pub fn update<T>(
    path: impl AsRef<Path>,
    cfg: &UpdateConfig,
    mut f: impl FnMut(&mut BenchmarkFile) -> Result<T>,
) -> Result<T> {
    let path = path.as_ref();
    let attempts = cfg.attempts.max(1);
    let mut rng = cfg.rng();

    for attempt in 1..=attempts {
        let snapshot = read_snapshot(path)?;
        let mut file = match (&snapshot, &cfg.init_repo_url) {
            (Some(bytes), _) => decode(path, bytes)?,
            (None, Some(url)) => BenchmarkFile::init(url.as_str()),
            (None, None) => {
                return Err(Error::io(
                    path,
                    io::Error::new(io::ErrorKind::NotFound, "benchmark data file not found"),
                ))
            }
        };

        let out = f(&mut file)?;
        let text = render(path, &file)?;
        let expected = snapshot.as_deref().map(digest);

        match write_atomic(path, &text, Some(expected)) {
            Ok(()) => {
                debug!(path = %path.display(), attempt, "updated benchmark data");
                return Ok(out);
            }
            Err(e) if e.is_conflict() && attempt < attempts => {
                let delay = cfg.backoff(attempt, &mut rng);
                warn!(
                    path = %path.display(),
                    attempt,
                    ?delay,
                    "benchmark data changed while updating, retrying"
                );
                std::thread::sleep(delay);
            }
            Err(e) if e.is_conflict() => break,
            Err(e) => return Err(e),
        }
    }

    Err(Error::Conflict {
        path: path.to_path_buf(),
        attempts,
    })
}

/// Record one run in `path` under `cfg.series`.
pub fn append_run(path: impl AsRef<Path>, cfg: &UpdateConfig, entry: BenchmarkEntry) -> Result<usize> {
    let path = path.as_ref();
    let len = update(path, cfg, |file| {
        file.append_to(&cfg.series, entry.clone())
            .map_err(|source| Error::Validation {
                path: path.to_path_buf(),
                series: cfg.series.clone(),
                source,
            })?;
        Ok(file.series(&cfg.series).len())
    })?;
    info!(
        path = %path.display(),
        series = %cfg.series,
        commit = %entry.commit.id,
        entries = len,
        "recorded benchmark run"
    );
    Ok(len)
}
