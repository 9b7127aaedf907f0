use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flate2::{write::GzEncoder, Compression};
use logscout::{
    classify::classify_logs,
    search::{search_file, PatternSet},
};
use std::{fs::File, io::Write, path::Path};
use tempfile::tempdir;

fn write_log<W: Write>(mut w: W, lines: usize) -> std::io::Result<W> {
    for j in 0..lines {
        writeln!(
            w,
            "2025-07-14 08:{:02}:{:02} INFO worker-{} request {} handled",
            (j / 60) % 60,
            j % 60,
            j % 8,
            j
        )?;
    }
    Ok(w)
}

fn create_logs(dir: &Path, lines: usize) -> std::io::Result<()> {
    write_log(File::create(dir.join("app.log"))?, lines)?;
    let gz = write_log(
        GzEncoder::new(File::create(dir.join("app.log.gz_1"))?, Compression::default()),
        lines,
    )?;
    gz.finish()?;
    Ok(())
}

fn bench_line_search(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    create_logs(dir.path(), 50_000).unwrap();

    let literal = PatternSet::literal("request 49999");
    let timestamp = PatternSet::timestamp("2025-07-14-08.25.22.214000").unwrap();

    let mut group = c.benchmark_group("Line Search");
    for (name, file) in [("plain", "app.log"), ("gzip", "app.log.gz_1")] {
        let path = dir.path().join(file);
        group.bench_function(format!("{}_literal", name), |b| {
            b.iter(|| black_box(search_file(&path, &literal).unwrap()));
        });
        group.bench_function(format!("{}_timestamp", name), |b| {
            b.iter(|| black_box(search_file(&path, &timestamp).unwrap()));
        });
    }
    group.finish();
}

fn bench_classification(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    for i in 0..500 {
        let sub = dir.path().join(format!("node{}", i % 10));
        std::fs::create_dir_all(&sub).unwrap();
        for name in ["app.log", "app.log_1", "app.log.gz_2", "notes.txt", "x.tar.gz"] {
            File::create(sub.join(format!("{}-{}", i, name))).unwrap();
        }
    }

    c.bench_function("classify_logs", |b| {
        b.iter(|| black_box(classify_logs(dir.path())));
    });
}

criterion_group!(benches, bench_line_search, bench_classification);
criterion_main!(benches);
