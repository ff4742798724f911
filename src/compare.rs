//! Newest run versus the one before it, oriented by polarity.
//!
//! `ratio > 1.0` always means the newest run is worse: `previous / current`
//! for bigger-is-better series, `current / previous` for smaller-is-better.
//! A bench is flagged once its ratio reaches the alert threshold.

use serde::Serialize;

use crate::schema::{BenchmarkEntry, BenchmarkFile, Tool};

/// Alert threshold the benchmark action uses by default (200%).
pub const DEFAULT_THRESHOLD: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRef {
    pub commit: String,
    pub date: u64,
}

impl From<&BenchmarkEntry> for RunRef {
    fn from(e: &BenchmarkEntry) -> Self {
        Self {
            commit: e.commit.id.clone(),
            date: e.date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BenchDelta {
    pub name: String,
    pub unit: String,
    pub previous: f64,
    pub current: f64,
    /// `None` when the denominator is zero.
    pub ratio: Option<f64>,
    pub regression: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    pub series: String,
    pub tool: String,
    pub threshold: f64,
    pub current: RunRef,
    pub previous: Option<RunRef>,
    pub benches: Vec<BenchDelta>,
    /// Benches only in the newest run.
    pub added: Vec<String>,
    /// Benches only in the previous run.
    pub removed: Vec<String>,
}

impl Comparison {
    pub fn regressions(&self) -> impl Iterator<Item = &BenchDelta> {
        self.benches.iter().filter(|b| b.regression)
    }

    pub fn has_regression(&self) -> bool {
        self.regressions().next().is_some()
    }
}

fn worse_ratio(tool: &Tool, previous: f64, current: f64) -> Option<f64> {
    let (num, den) = match tool {
        Tool::BiggerIsBetter => (previous, current),
        Tool::SmallerIsBetter => (current, previous),
        Tool::Other(_) => return None,
    };
    (den != 0.0).then(|| num / den)
}

/// Compare the last two runs of `series`. `None` when the series is empty.
pub fn compare(file: &BenchmarkFile, series: &str, threshold: f64) -> Option<Comparison> {
    let runs = file.series(series);
    let current = runs.last()?;
    let previous = runs.len().checked_sub(2).map(|i| &runs[i]);

    let mut benches = Vec::new();
    let mut added = Vec::new();
    for bench in &current.benches {
        match previous.and_then(|p| p.bench(&bench.name)) {
            Some(old) => {
                let ratio = worse_ratio(&current.tool, old.value, bench.value);
                benches.push(BenchDelta {
                    name: bench.name.clone(),
                    unit: bench.unit.clone(),
                    previous: old.value,
                    current: bench.value,
                    ratio,
                    regression: ratio.is_some_and(|r| r >= threshold),
                });
            }
            None => added.push(bench.name.clone()),
        }
    }

    let removed = previous
        .map(|p| {
            p.benches
                .iter()
                .filter(|b| current.bench(&b.name).is_none())
                .map(|b| b.name.clone())
                .collect()
        })
        .unwrap_or_default();

    Some(Comparison {
        series: series.to_string(),
        tool: current.tool.to_string(),
        threshold,
        current: current.into(),
        previous: previous.map(RunRef::from),
        benches,
        added,
        removed,
    })
}
