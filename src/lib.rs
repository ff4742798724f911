use clap::ValueEnum;

pub mod compare;
pub mod config;
pub mod error;
pub mod format;
pub mod input;
pub mod scan;
pub mod schema;
pub mod store;
pub mod validate;

pub use error::{Error, ParseError, Result, ValidationError};
pub use schema::{Bench, BenchmarkEntry, BenchmarkFile, Commit, Person, PersonLayout, Tool};
pub use store::{load, save};
pub use validate::validate;

/// Comparison polarity of a benchmark run, as accepted on the command line.
#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum Polarity {
    /// Throughput-style values (`customBiggerIsBetter`).
    BiggerIsBetter,
    /// Latency or wall-time values (`customSmallerIsBetter`).
    SmallerIsBetter,
}
