//! Benchmarks for the producer-side cost of firing records.

use std::sync::Arc;
use std::time::Duration;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use femtogelf::hook::{HookIdentity, encode_envelope};
use femtogelf::{FemtoGelfHook, FemtoLevel, FemtoLogRecord, Transport, TransportError};

/// Accepts every payload without keeping it.
struct NullTransport;

impl Transport for NullTransport {
    fn post(&self, _url: &str, body: &[u8]) -> Result<u16, TransportError> {
        black_box(body);
        Ok(202)
    }
}

fn identity() -> HookIdentity {
    let mut identity = HookIdentity {
        host: "bench-host".into(),
        facility: "bench".into(),
        ..Default::default()
    };
    identity.extra.insert("env".into(), "bench".into());
    identity.extra.insert("region".into(), "eu-west-1".into());
    identity
}

fn sample_record() -> FemtoLogRecord {
    FemtoLogRecord::new(FemtoLevel::Info, "request served")
        .with_location("src/server.rs", 128)
        .with_field("status", 200)
        .with_field("path", "/api/v1/orders")
        .with_field("duration_ms", 12.5)
}

fn bench_encode(c: &mut Criterion) {
    let identity = identity();
    let record = sample_record();
    c.bench_function("encode_envelope", |b| {
        b.iter(|| encode_envelope(black_box(&record), black_box(&identity)).expect("encode"));
    });
}

fn bench_fire(c: &mut Criterion) {
    let hook = FemtoGelfHook::builder("http://collector/gelf")
        .with_transport(Arc::new(NullTransport))
        .with_host("bench-host")
        .with_facility("bench")
        .build()
        .expect("build hook");
    c.bench_function("fire_and_flush_64", |b| {
        b.iter_batched(
            || (0..64).map(|_| sample_record()).collect::<Vec<_>>(),
            |records| {
                for record in &records {
                    hook.fire(record).expect("fire");
                }
                assert!(hook.flush_timeout(Duration::from_secs(5)));
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_encode, bench_fire);
criterion_main!(benches);
