use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// The file is not a well-formed `data.js` document.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("file does not start with `window.BENCHMARK_DATA = `")]
    MissingPrefix,
    #[error("benchmark data is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("malformed benchmark data: {0}")]
    Json(#[from] serde_json::Error),
}

/// The document parsed but breaks a rule of the data model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("entry {entry}: unrecognized tool {tool:?}")]
    UnknownTool { entry: usize, tool: String },
    #[error("entry {entry}: bench {bench:?} has non-finite value {value}")]
    NonFiniteValue { entry: usize, bench: String, value: f64 },
    #[error("entry {entry}: bench {bench:?} has non-numeric value {text:?}")]
    NonNumericValue {
        entry: usize,
        bench: String,
        text: String,
    },
    #[error("entry {entry}: bench {bench:?} has an empty unit")]
    EmptyUnit { entry: usize, bench: String },
    #[error("entry {entry}: bench #{index} has an empty name")]
    EmptyName { entry: usize, index: usize },
    #[error("entry {entry}: no benches recorded")]
    NoBenches { entry: usize },
    #[error("entry {entry}: bench {bench:?} appears more than once")]
    DuplicateBench { entry: usize, bench: String },
    #[error("entry {entry}: tool {found} differs from series tool {expected}")]
    MixedTool {
        entry: usize,
        expected: String,
        found: String,
    },
    #[error("entry {entry}: bench {bench:?} unit changed from {expected:?} to {found:?}")]
    UnitChanged {
        entry: usize,
        bench: String,
        expected: String,
        found: String,
    },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("{}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("{}: series {series:?}: {source}", path.display())]
    Validation {
        path: PathBuf,
        series: String,
        #[source]
        source: ValidationError,
    },
    #[error("{}: modified concurrently, gave up after {attempts} attempt(s)", path.display())]
    Conflict { path: PathBuf, attempts: u32 },
    #[error("{}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Error::Json {
            path: path.into(),
            source,
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict { .. })
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        let kind = match &e {
            Error::Io { source, .. } => source.kind(),
            Error::Parse { .. } | Error::Validation { .. } | Error::Json { .. } => {
                io::ErrorKind::InvalidData
            }
            Error::Conflict { .. } => io::ErrorKind::Other,
        };
        io::Error::new(kind, e.to_string())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
