//! History store benchmark suite
//!
//! Benchmarks for the data.js history store:
//! - Wire format encode/decode at various history lengths
//! - Load and atomic save through the filesystem
//! - Appending a run (validation against the full series)
//! - Scanning a tree of category directories

use bench_history::config::UpdateConfig;
use bench_history::{format, scan, store};
use bench_history::{Bench, BenchmarkEntry, BenchmarkFile, Commit, Person, Tool};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::TempDir;

const BENCH_NAMES: [&str; 9] = [
    "sequential_read",
    "random_read",
    "sequential_read_small_file",
    "random_read_small_file",
    "sequential_read_direct_io",
    "random_read_direct_io",
    "sequential_read_4_threads",
    "sequential_read_16_threads",
    "random_read_4_threads",
];

fn run(i: usize) -> BenchmarkEntry {
    let person = Person::new("GitHub", "noreply@github.com", Some("web-flow".into()));
    let id = format!("{:040x}", i);
    let commit = Commit {
        author: person.clone(),
        committer: person,
        distinct: Some(true),
        url: format!("https://github.com/Azure/azure-storage-fuse/commit/{id}"),
        id,
        message: format!("Merge pull request #{i}"),
        timestamp: "2025-03-10T22:32:05+05:30".into(),
        tree_id: None,
    };
    let benches = BENCH_NAMES
        .iter()
        .enumerate()
        .map(|(j, name)| Bench::new(*name, 1000.0 / (j + 1) as f64 + i as f64 * 0.125, "MiB/s"))
        .collect();
    BenchmarkEntry::new(commit, 1_741_426_022_487 + i as u64 * 3_600_000, Tool::BiggerIsBetter, benches)
}

fn history(runs: usize) -> BenchmarkFile {
    let mut file = BenchmarkFile::init("https://github.com/Azure/azure-storage-fuse");
    for i in 0..runs {
        file.append(run(i)).unwrap();
    }
    file
}

/// Benchmark wire format encode/decode
fn bench_format(c: &mut Criterion) {
    let mut group = c.benchmark_group("format");

    for runs in [10, 100, 1000] {
        let file = history(runs);
        let text = format::to_js(&file).unwrap();

        group.bench_with_input(BenchmarkId::new("to_js", runs), &file, |bencher, file| {
            bencher.iter(|| black_box(format::to_js(black_box(file)).unwrap()))
        });

        group.bench_with_input(BenchmarkId::new("from_js", runs), &text, |bencher, text| {
            bencher.iter(|| black_box(format::from_js(black_box(text)).unwrap()))
        });
    }

    group.finish();
}

/// Benchmark load and save through the filesystem
fn bench_file_io(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_io");

    for runs in [10, 100, 1000] {
        let file = history(runs);

        group.bench_with_input(BenchmarkId::new("save", runs), &file, |bencher, file| {
            bencher.iter_with_setup(
                || TempDir::new().unwrap(),
                |temp_dir| {
                    store::save(black_box(file), temp_dir.path().join("data.js")).unwrap();
                    temp_dir
                },
            )
        });

        group.bench_with_input(BenchmarkId::new("load", runs), &file, |bencher, file| {
            bencher.iter_with_setup(
                || {
                    let temp_dir = TempDir::new().unwrap();
                    let path = temp_dir.path().join("data.js");
                    store::save(file, &path).unwrap();
                    (temp_dir, path)
                },
                |(_temp_dir, path)| black_box(store::load(black_box(&path)).unwrap()),
            )
        });
    }

    group.finish();
}

/// Benchmark appending one run, in memory and as a full read-modify-write
fn bench_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("append");
    let cfg = UpdateConfig::default();

    for runs in [10, 100, 1000] {
        let file = history(runs);
        let next = run(runs);

        group.bench_with_input(BenchmarkId::new("in_memory", runs), &file, |bencher, file| {
            bencher.iter_with_setup(
                || file.clone(),
                |mut file| {
                    file.append(black_box(next.clone())).unwrap();
                    file
                },
            )
        });

        group.bench_with_input(BenchmarkId::new("append_run", runs), &file, |bencher, file| {
            bencher.iter_with_setup(
                || {
                    let temp_dir = TempDir::new().unwrap();
                    let path = temp_dir.path().join("data.js");
                    store::save(file, &path).unwrap();
                    (temp_dir, path)
                },
                |(temp_dir, path)| {
                    store::append_run(&path, &cfg, next.clone()).unwrap();
                    temp_dir
                },
            )
        });
    }

    group.finish();
}

/// Benchmark scanning a tree of category directories
fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan");
    group.sample_size(20);

    for categories in [4, 16, 64] {
        let temp_dir = TempDir::new().unwrap();
        let file = history(50);
        for i in 0..categories {
            let dir = temp_dir.path().join(format!("arch_{}/cache_{}/read", i % 4, i));
            std::fs::create_dir_all(&dir).unwrap();
            store::save(&file, dir.join("data.js")).unwrap();
        }

        group.bench_with_input(
            BenchmarkId::new("scan", categories),
            &temp_dir,
            |bencher, temp_dir| {
                bencher.iter(|| black_box(scan::scan(black_box(temp_dir.path())).unwrap()))
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_format, bench_file_io, bench_append, bench_scan);
criterion_main!(benches);
