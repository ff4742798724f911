use bench_history::compare::{self, DEFAULT_THRESHOLD};
use bench_history::config::{self, UpdateConfig};
use bench_history::input;
use bench_history::scan;
use bench_history::schema::{BenchmarkEntry, BenchmarkFile, DEFAULT_SERIES};
use bench_history::store;
use bench_history::Polarity;
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

#[derive(Subcommand, Debug)]
enum Command {
    /// Record one benchmark run at the end of a data.js history.
    Append {
        /// History file to update; created if missing.
        #[arg(long, value_name = "FILE")]
        data: PathBuf,

        /// Custom-tool output: JSON array of {name, value, unit}.
        #[arg(long, value_name = "FILE")]
        benches: PathBuf,

        /// Commit metadata: a commit object or a push event payload.
        #[arg(long, value_name = "FILE")]
        commit: PathBuf,

        /// Whether larger or smaller values are better for this run.
        #[arg(long, value_enum)]
        tool: Polarity,

        /// Repository URL for a newly created history.
        /// Defaults to $GITHUB_SERVER_URL/$GITHUB_REPOSITORY.
        #[arg(long, value_name = "URL")]
        repo_url: Option<String>,

        /// Recording time in ms since the epoch; defaults to now.
        #[arg(long)]
        date: Option<u64>,

        #[arg(long, default_value = DEFAULT_SERIES)]
        series: String,

        /// Read-modify-write attempts before giving up on concurrent writers.
        #[arg(long, default_value_t = 5)]
        attempts: u32,

        /// Base retry backoff in milliseconds.
        #[arg(long, default_value_t = 50)]
        backoff_ms: u64,
    },

    /// Validate one data.js file or every data.js below a directory.
    Check {
        #[arg(value_name = "PATH")]
        path: PathBuf,
    },

    /// Compare the newest run with the previous one.
    Compare {
        #[arg(long, value_name = "FILE")]
        data: PathBuf,

        #[arg(long, default_value = DEFAULT_SERIES)]
        series: String,

        /// Ratio (oriented so that larger is worse) at which a bench is flagged.
        #[arg(long, default_value_t = DEFAULT_THRESHOLD)]
        threshold: f64,

        /// Exit with an error when any bench is flagged.
        #[arg(long, default_value_t = false)]
        fail_on_regression: bool,
    },

    /// Summarize a history: runs, polarity, benches and their latest values.
    Show {
        #[arg(long, value_name = "FILE")]
        data: PathBuf,

        /// Only report this series. All series by default.
        #[arg(long, value_name = "NAME")]
        series: Option<String>,
    },
}

#[derive(Parser, Debug)]
#[command(name = "bench-history")]
#[command(about = "Maintain github-action-benchmark data.js histories")]
struct Args {
    #[arg(long, default_value_t = 0, global = true)]
    seed: u64,

    /// Where to write the JSON report. If omitted, prints to stdout.
    #[arg(long, global = true)]
    out: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Serialize)]
struct LatestBench {
    name: String,
    unit: String,
    value: f64,
}

#[derive(Serialize)]
struct SeriesReport {
    series: String,
    entries: usize,
    tool: Option<String>,
    first_date: Option<u64>,
    last_date: Option<u64>,
    latest_commit: Option<String>,
    benches: Vec<LatestBench>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ShowReport {
    repo_url: String,
    last_update: u64,
    series: Vec<SeriesReport>,
}

fn show(file: &BenchmarkFile, only: Option<&str>) -> ShowReport {
    let series = file
        .entries
        .iter()
        .filter(|(name, _)| only.map_or(true, |s| s == name.as_str()))
        .map(|(name, runs)| {
            let latest = runs.last();
            SeriesReport {
                series: name.clone(),
                entries: runs.len(),
                tool: latest.map(|e| e.tool.to_string()),
                first_date: runs.first().map(|e| e.date),
                last_date: latest.map(|e| e.date),
                latest_commit: latest.map(|e| e.commit.id.clone()),
                benches: latest
                    .map(|e| {
                        e.benches
                            .iter()
                            .map(|b| LatestBench {
                                name: b.name.clone(),
                                unit: b.unit.clone(),
                                value: b.value,
                            })
                            .collect()
                    })
                    .unwrap_or_default(),
            }
        })
        .collect();

    ShowReport {
        repo_url: file.repo_url.clone(),
        last_update: file.last_update,
        series,
    }
}

fn emit<T: Serialize>(out: Option<&Path>, report: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(report).map_err(io::Error::other)?;
    if let Some(out) = out {
        fs::write(out, json)?;
    } else {
        println!("{json}");
    }
    Ok(())
}

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let out = args.out.as_deref();

    match args.cmd {
        Command::Append {
            data,
            benches,
            commit,
            tool,
            repo_url,
            date,
            series,
            attempts,
            backoff_ms,
        } => {
            let benches = input::read_benches(&benches)?;
            let commit = input::read_commit(&commit)?;
            let entry = BenchmarkEntry::new(
                commit,
                date.unwrap_or_else(input::now_millis),
                tool,
                benches,
            );

            let cfg = UpdateConfig {
                series,
                attempts,
                base_backoff: Duration::from_millis(backoff_ms),
                seed: args.seed,
                init_repo_url: repo_url.or_else(config::repo_url_from_env),
            };
            store::append_run(&data, &cfg, entry)?;
        }
        Command::Check { path } => {
            let reports = scan::scan(&path)?;
            emit(out, &reports)?;

            let bad = reports.iter().filter(|r| !r.is_ok()).count();
            if bad > 0 {
                error!(invalid = bad, total = reports.len(), "benchmark data check failed");
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("{bad} of {} file(s) invalid", reports.len()),
                ));
            }
            info!(files = reports.len(), "benchmark data ok");
        }
        Command::Compare {
            data,
            series,
            threshold,
            fail_on_regression,
        } => {
            let file = store::load(&data)?;
            let cmp = compare::compare(&file, &series, threshold).ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("{}: series {series:?} has no runs", data.display()),
                )
            })?;
            emit(out, &cmp)?;

            for r in cmp.regressions() {
                error!(
                    bench = %r.name,
                    previous = r.previous,
                    current = r.current,
                    ratio = r.ratio,
                    "performance regression"
                );
            }
            if fail_on_regression && cmp.has_regression() {
                return Err(io::Error::other(format!(
                    "{} bench(es) regressed beyond {threshold}x",
                    cmp.regressions().count()
                )));
            }
        }
        Command::Show { data, series } => {
            let file = store::load(&data)?;
            if let Some(name) = series.as_deref() {
                if !file.entries.contains_key(name) {
                    return Err(io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("{}: no series {name:?}", data.display()),
                    ));
                }
            }
            emit(out, &show(&file, series.as_deref()))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bench_history::{Bench, Commit, Person, Tool};

    fn run(date: u64, value: f64) -> BenchmarkEntry {
        let person = Person::new("GitHub", "noreply@github.com", Some("web-flow".into()));
        let id = format!("{date:040x}");
        let commit = Commit {
            author: person.clone(),
            committer: person,
            distinct: Some(true),
            url: format!("https://github.com/Azure/azure-storage-fuse/commit/{id}"),
            id,
            message: "Update pipeline".into(),
            timestamp: "2025-03-10T22:32:05+05:30".into(),
            tree_id: None,
        };
        BenchmarkEntry::new(
            commit,
            date,
            Tool::BiggerIsBetter,
            vec![Bench::new("sequential_read", value, "MiB/s")],
        )
    }

    fn two_series() -> BenchmarkFile {
        let mut file = BenchmarkFile::init("https://github.com/Azure/azure-storage-fuse");
        file.append(run(10, 1800.0)).unwrap();
        file.append(run(20, 1900.0)).unwrap();
        file.append_to("Read Bandwidth", run(30, 2400.0)).unwrap();
        file
    }

    #[test]
    fn show_reports_every_series_by_default() {
        let report = show(&two_series(), None);
        let names: Vec<&str> = report.series.iter().map(|s| s.series.as_str()).collect();
        assert_eq!(names, vec![DEFAULT_SERIES, "Read Bandwidth"]);
        assert_eq!(report.last_update, 30);
    }

    #[test]
    fn show_filters_to_one_series() {
        let report = show(&two_series(), Some(DEFAULT_SERIES));
        assert_eq!(report.series.len(), 1);
        let only = &report.series[0];
        assert_eq!(only.entries, 2);
        assert_eq!(only.last_date, Some(20));
        assert_eq!(only.benches[0].value, 1900.0);

        assert!(show(&two_series(), Some("Write Bandwidth")).series.is_empty());
    }

    #[test]
    fn show_flag_parses() {
        let args = Args::parse_from([
            "bench-history",
            "show",
            "--data",
            "data.js",
            "--series",
            "Read Bandwidth",
        ]);
        assert!(matches!(
            args.cmd,
            Command::Show { series: Some(ref s), .. } if s == "Read Bandwidth"
        ));
    }
}
