//! # Sealed-Chat Core Benchmarks
//!
//! Hot paths on the receive side of the client.
//!
//! ```bash
//! cargo bench --package sc-tests --bench core_benchmarks
//! cargo bench --package sc-tests --bench core_benchmarks -- crypto
//! ```
//!
//! | Group | Path |
//! |-------|------|
//! | crypto | encrypt, decrypt, seal, open of one chat message |
//! | frames | classifying a raw realtime frame |
//! | dispatch | fan-out of one event to N handlers |

use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sc_01_realtime::InboundFrame;
use serde_json::json;
use shared_bus::{handler_fn, SubscriptionRegistry};
use shared_crypto::{generate_key_pair, CryptoEngine, EncryptedEnvelope};
use shared_types::NoOpObserver;

fn bench_crypto(c: &mut Criterion) {
    let mut group = c.benchmark_group("crypto");
    group.measurement_time(Duration::from_secs(5));

    let engine = CryptoEngine::new();
    let (alice_public, alice_secret) = generate_key_pair();
    let (bob_public, bob_secret) = generate_key_pair();

    for size in [64usize, 1024, 16 * 1024] {
        let plaintext = "x".repeat(size);
        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("encrypt", size), &plaintext, |b, text| {
            b.iter(|| engine.encrypt(black_box(text), &bob_public, &alice_secret));
        });

        let envelope = engine
            .encrypt(&plaintext, &bob_public, &alice_secret)
            .expect("encrypt");
        group.bench_with_input(BenchmarkId::new("decrypt", size), &envelope, |b, env| {
            b.iter(|| engine.decrypt(black_box(env), &alice_public, &bob_secret));
        });

        let sealed = engine.seal(&plaintext, &bob_public).expect("seal");
        group.bench_with_input(BenchmarkId::new("open_sealed", size), &sealed, |b, env| {
            b.iter(|| engine.open_sealed(black_box(env), &bob_secret));
        });

        let wire = envelope.to_json();
        group.bench_with_input(BenchmarkId::new("envelope_from_json", size), &wire, |b, json| {
            b.iter(|| EncryptedEnvelope::from_json(black_box(json)));
        });
    }

    group.finish();
}

fn bench_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("frames");

    let event = json!({
        "channel": "message",
        "action": "created",
        "data": { "data": { "id": "7", "attributes": { "id": 7, "sender_id": 1, "recipient_id": 2 } } }
    })
    .to_string();
    let ping = r#"{"type":"ping","message":1700000000}"#;
    let garbage = "<html>502 Bad Gateway</html>";

    group.bench_function("event", |b| b.iter(|| InboundFrame::parse(black_box(&event))));
    group.bench_function("ping", |b| b.iter(|| InboundFrame::parse(black_box(ping))));
    group.bench_function("not_json", |b| b.iter(|| InboundFrame::parse(black_box(garbage))));

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let mut group = c.benchmark_group("dispatch");
    let payload = json!({ "id": 7, "status": "sent" });

    for handlers in [1usize, 16, 256] {
        let mut registry = SubscriptionRegistry::new();
        for _ in 0..handlers {
            registry.add("message", "created", handler_fn(|_| Ok(())));
        }
        // Noise on other keys that the lookup has to skip.
        for i in 0..handlers {
            registry.add(format!("room-{i}"), "created", handler_fn(|_| Ok(())));
        }

        group.throughput(Throughput::Elements(handlers as u64));
        group.bench_with_input(BenchmarkId::new("fan_out", handlers), &registry, |b, registry| {
            b.iter(|| registry.dispatch("message", "created", black_box(&payload), &NoOpObserver));
        });
    }

    let failing = {
        let mut registry = SubscriptionRegistry::new();
        registry.add("message", "created", handler_fn(|_| Err("boom".into())));
        registry.add("message", "created", handler_fn(|_| Ok(())));
        registry
    };
    group.bench_function("isolated_failure", |b| {
        b.iter(|| failing.dispatch("message", "created", black_box(&payload), &NoOpObserver));
    });

    group.finish();
}

criterion_group!(benches, bench_crypto, bench_frames, bench_dispatch);
criterion_main!(benches);
