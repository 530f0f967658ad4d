use criterion::{criterion_group, criterion_main, Criterion};
use record_log::{Record, RecordLog};
use serde_json::Value;
use tempfile::tempdir;

fn append_benchmark(c: &mut Criterion) {
    let dir = tempdir().unwrap();
    let log = RecordLog::open(dir.path()).unwrap();

    let mut record = Record::new();
    record.insert("id".to_string(), Value::String("bench".to_string()));
    record.insert("payload".to_string(), Value::String("x".repeat(256)));

    c.bench_function("append record", |b| {
        b.iter(|| {
            log.append(&record).unwrap();
        })
    });
}

criterion_group!(benches, append_benchmark);
criterion_main!(benches);
