use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::format::RawBench;

/// Series label the benchmark action writes runs under.
pub const DEFAULT_SERIES: &str = "Benchmark";

/// Comparison polarity of every value in a [`BenchmarkEntry`].
///
/// Unrecognized strings survive deserialization as [`Tool::Other`] so that
/// validation can name them; they are never valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Tool {
    BiggerIsBetter,
    SmallerIsBetter,
    Other(String),
}

impl Tool {
    pub fn as_str(&self) -> &str {
        match self {
            Tool::BiggerIsBetter => "customBiggerIsBetter",
            Tool::SmallerIsBetter => "customSmallerIsBetter",
            Tool::Other(s) => s,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Tool::Other(_))
    }
}

impl From<String> for Tool {
    fn from(s: String) -> Self {
        match s.as_str() {
            "customBiggerIsBetter" => Tool::BiggerIsBetter,
            "customSmallerIsBetter" => Tool::SmallerIsBetter,
            _ => Tool::Other(s),
        }
    }
}

impl From<Tool> for String {
    fn from(t: Tool) -> Self {
        match t {
            Tool::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl From<crate::Polarity> for Tool {
    fn from(p: crate::Polarity) -> Self {
        match p {
            crate::Polarity::BiggerIsBetter => Tool::BiggerIsBetter,
            crate::Polarity::SmallerIsBetter => Tool::SmallerIsBetter,
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key order a person object was written with. Older runs use
/// `email, name, username`, newer ones `name, username, email`; rewriting a
/// history keeps each object's order so the diff is only the new run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PersonLayout {
    #[default]
    EmailFirst,
    NameFirst,
}

/// Commit author or committer. Serialized by hand in [`crate::format`].
#[derive(Debug, Clone, Eq)]
pub struct Person {
    pub email: String,
    pub name: String,
    pub username: Option<String>,
    pub layout: PersonLayout,
}

impl Person {
    pub fn new(name: impl Into<String>, email: impl Into<String>, username: Option<String>) -> Self {
        Self {
            email: email.into(),
            name: name.into(),
            username,
            layout: PersonLayout::default(),
        }
    }
}

impl PartialEq for Person {
    fn eq(&self, other: &Self) -> bool {
        self.email == other.email && self.name == other.name && self.username == other.username
    }
}

/// Commit the run was recorded against. Field order matches the files on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    pub author: Person,
    pub committer: Person,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distinct: Option<bool>,
    pub id: String,
    pub message: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tree_id: Option<String>,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawBench", into = "RawBench")]
pub struct Bench {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub range: Option<String>,
    pub extra: Option<String>,
    /// Original text when the value was stored as a JSON string (`"0.00000"`).
    pub(crate) value_text: Option<String>,
}

impl Bench {
    pub fn new(name: impl Into<String>, value: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value,
            unit: unit.into(),
            range: None,
            extra: None,
            value_text: None,
        }
    }

    pub fn value_text(&self) -> Option<&str> {
        self.value_text.as_deref()
    }
}

/// One CI run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkEntry {
    pub commit: Commit,
    /// Milliseconds since the epoch at which the run was recorded.
    pub date: u64,
    pub tool: Tool,
    pub benches: Vec<Bench>,
}

impl BenchmarkEntry {
    pub fn new(commit: Commit, date: u64, tool: impl Into<Tool>, benches: Vec<Bench>) -> Self {
        Self {
            commit,
            date,
            tool: tool.into(),
            benches,
        }
    }

    pub fn bench(&self, name: &str) -> Option<&Bench> {
        self.benches.iter().find(|b| b.name == name)
    }
}

/// Contents of one `data.js` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BenchmarkFile {
    pub last_update: u64,
    pub repo_url: String,
    /// Series label to runs, oldest first. Sorted keys keep output stable.
    pub entries: BTreeMap<String, Vec<BenchmarkEntry>>,
}

impl BenchmarkFile {
    pub fn series(&self, name: &str) -> &[BenchmarkEntry] {
        self.entries.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn latest(&self, series: &str) -> Option<&BenchmarkEntry> {
        self.series(series).last()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}
