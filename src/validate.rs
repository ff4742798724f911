//! Entry- and series-level validation.
//!
//! Loading fails fast on anything here: history is used for regression
//! detection, so a malformed run is rejected rather than coerced or dropped.

use std::collections::{HashMap, HashSet};

use crate::error::ValidationError;
use crate::format::parse_value_text;
use crate::schema::{BenchmarkEntry, BenchmarkFile, Tool};

/// Check a single run in isolation. Errors report it as entry 0.
pub fn validate(entry: &BenchmarkEntry) -> Result<(), ValidationError> {
    check_entry(0, entry)
}

pub(crate) fn check_entry(index: usize, entry: &BenchmarkEntry) -> Result<(), ValidationError> {
    if !entry.tool.is_known() {
        return Err(ValidationError::UnknownTool {
            entry: index,
            tool: entry.tool.to_string(),
        });
    }
    if entry.benches.is_empty() {
        return Err(ValidationError::NoBenches { entry: index });
    }

    let mut seen = HashSet::with_capacity(entry.benches.len());
    for (i, bench) in entry.benches.iter().enumerate() {
        if bench.name.is_empty() {
            return Err(ValidationError::EmptyName { entry: index, index: i });
        }
        if !seen.insert(bench.name.as_str()) {
            return Err(ValidationError::DuplicateBench {
                entry: index,
                bench: bench.name.clone(),
            });
        }
        if let Some(text) = bench.value_text() {
            if parse_value_text(text).is_none() {
                return Err(ValidationError::NonNumericValue {
                    entry: index,
                    bench: bench.name.clone(),
                    text: text.to_string(),
                });
            }
        }
        if !bench.value.is_finite() {
            return Err(ValidationError::NonFiniteValue {
                entry: index,
                bench: bench.name.clone(),
                value: bench.value,
            });
        }
        if bench.unit.is_empty() {
            return Err(ValidationError::EmptyUnit {
                entry: index,
                bench: bench.name.clone(),
            });
        }
    }
    Ok(())
}

/// Cross-entry rules of one series: constant polarity, constant unit per bench.
#[derive(Debug, Default)]
pub(crate) struct SeriesRules {
    tool: Option<Tool>,
    units: HashMap<String, String>,
    len: usize,
}

impl SeriesRules {
    /// Rules implied by entries that are already known to be valid.
    pub(crate) fn from_history(entries: &[BenchmarkEntry]) -> Self {
        let mut rules = SeriesRules::default();
        for entry in entries {
            rules.record(entry);
        }
        rules
    }

    /// Validate the next entry of the series and, if it passes, record it.
    pub(crate) fn admit(&mut self, entry: &BenchmarkEntry) -> Result<(), ValidationError> {
        let index = self.len;
        check_entry(index, entry)?;

        if let Some(expected) = &self.tool {
            if *expected != entry.tool {
                return Err(ValidationError::MixedTool {
                    entry: index,
                    expected: expected.to_string(),
                    found: entry.tool.to_string(),
                });
            }
        }
        for bench in &entry.benches {
            if let Some(expected) = self.units.get(&bench.name) {
                if *expected != bench.unit {
                    return Err(ValidationError::UnitChanged {
                        entry: index,
                        bench: bench.name.clone(),
                        expected: expected.clone(),
                        found: bench.unit.clone(),
                    });
                }
            }
        }

        self.record(entry);
        Ok(())
    }

    fn record(&mut self, entry: &BenchmarkEntry) {
        self.tool.get_or_insert_with(|| entry.tool.clone());
        for bench in &entry.benches {
            self.units
                .entry(bench.name.clone())
                .or_insert_with(|| bench.unit.clone());
        }
        self.len += 1;
    }
}

pub fn validate_series(entries: &[BenchmarkEntry]) -> Result<(), ValidationError> {
    let mut rules = SeriesRules::default();
    entries.iter().try_for_each(|e| rules.admit(e))
}

/// Validate every series, returning the name of the first failing one.
pub fn validate_file(file: &BenchmarkFile) -> Result<(), (String, ValidationError)> {
    for (series, entries) in &file.entries {
        validate_series(entries).map_err(|e| (series.clone(), e))?;
    }
    Ok(())
}
