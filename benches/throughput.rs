//! Throughput Benchmark for contextd
//!
//! This benchmark measures the context store and the protocol codec
//! under various workloads.

use contextd::protocol::{parse, Message};
use contextd::storage::ContextStore;
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::sync::Arc;
use std::time::Duration;

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let store = Arc::new(ContextStore::new());

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_one_client", |b| {
        let mut i = 0u64;
        b.iter(|| {
            store.set("client", format!("key:{}", i % 1000), "value");
            i += 1;
        });
    });

    group.bench_function("set_many_clients", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let client = format!("client:{}", i % 10_000);
            store.set(&client, "name", "alice");
            i += 1;
        });
    });

    group.bench_function("set_multiple_4", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let client = format!("batch:{}", i % 1000);
            store.set_multiple(
                &client,
                [("name", "alice"), ("room", "42"), ("lang", "en"), ("tz", "utc")],
            );
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let store = Arc::new(ContextStore::new());

    // Pre-populate with data
    for i in 0..10_000 {
        store.set_multiple(
            &format!("client:{}", i),
            [("name", format!("user{}", i)), ("room", (i % 100).to_string())],
        );
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let client = format!("client:{}", i % 10_000);
            black_box(store.get(&client, "name"));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let client = format!("missing:{}", i);
            black_box(store.get(&client, "name"));
            i += 1;
        });
    });

    group.bench_function("get_all", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let client = format!("client:{}", i % 10_000);
            black_box(store.get_all(&client));
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark QUERY scans
fn bench_query(c: &mut Criterion) {
    let store = Arc::new(ContextStore::new());

    for i in 0..10_000 {
        store.set(&format!("client:{}", i), "room", (i % 100).to_string());
    }

    let mut group = c.benchmark_group("query");

    group.bench_function("query_10k_clients", |b| {
        b.iter(|| {
            black_box(store.query_clients("room", "42"));
        });
    });

    group.bench_function("list_clients", |b| {
        b.iter(|| {
            black_box(store.list_clients());
        });
    });

    group.finish();
}

/// Benchmark concurrent access
fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let store = Arc::new(ContextStore::new());
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        let client = format!("client:{}", t);
                        for i in 0..10_000 {
                            let key = format!("key:{}", i);
                            store.set(&client, key.clone(), "value");
                            store.get(&client, &key);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(store.len());
        });
    });

    group.finish();
}

/// Benchmark the protocol codec
fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    group.throughput(Throughput::Elements(1));

    group.bench_function("parse_ping", |b| {
        b.iter(|| black_box(parse(black_box("PING:\n")).unwrap()));
    });

    group.bench_function("parse_context", |b| {
        b.iter(|| {
            black_box(parse(black_box("CONTEXT:name=alice;room=42;lang=en;tz=utc\n")).unwrap())
        });
    });

    let message = Message::new(
        "CONTEXT",
        [("name", "alice"), ("room", "42"), ("lang", "en"), ("tz", "utc")],
    );
    group.bench_function("format_context", |b| {
        b.iter(|| black_box(message.to_line()));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_query,
    bench_concurrent,
    bench_codec,
);

criterion_main!(benches);
