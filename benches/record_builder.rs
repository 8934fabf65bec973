//! Benchmarks for the producer-side hot path: building a record from an event
//! and encoding it as a forward entry.

use std::time::SystemTime;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use fluent_forwarder::{ForwardEvent, Level, RecordBuilder, encode_entry};

fn sample_event() -> ForwardEvent {
    ForwardEvent::new("com.example.checkout.Service", Level::Info, "order accepted")
        .with_logger_class("com.example.checkout.Service")
        .with_location("com.example.checkout.Service(service.rs:118)")
        .with_thread_name("worker-3")
        .with_ndc("tenant-7 order-991")
        .with_mdc("requestId", "8f1c2a")
        .with_mdc("userId", 4711)
        .with_mdc("retry", false)
}

fn bench_build(c: &mut Criterion) {
    let builder = RecordBuilder::new(vec!["requestId".into(), "userId".into(), "retry".into()], true)
        .with_hostname_resolver(|| Ok("bench-host".to_owned()));
    let event = sample_event();
    c.bench_function("build_record", |b| {
        b.iter(|| black_box(builder.build(black_box(&event))))
    });
}

fn bench_build_and_encode(c: &mut Criterion) {
    let builder = RecordBuilder::new(vec!["requestId".into()], false);
    let event = sample_event();
    let now = SystemTime::now();
    c.bench_function("build_and_encode_entry", |b| {
        b.iter(|| {
            let record = builder.build(black_box(&event));
            black_box(encode_entry("svc.app", now, &record))
        })
    });
}

criterion_group!(benches, bench_build, bench_build_and_encode);
criterion_main!(benches);
