//! # Validation Engine Benchmarks
//!
//! | Path | Target |
//! |------|--------|
//! | Registry register + deliver + receive | < 5µs |
//! | Cache hit (in-memory) | < 1µs |
//! | Full broker round trip (in-memory) | < 100µs |

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use gateway_bus::InMemoryBroker;
use pg_api_gateway::domain::messages::ApiKeyValidationResponse;
use pg_api_gateway::validator::normalize_user_id;
use pg_api_gateway::{CorrelationId, CorrelationRegistry, InMemoryCache, ValidationCache};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

// ============================================================================
// Correlation registry
// ============================================================================

fn bench_registry(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("correlation-registry");
    group.measurement_time(Duration::from_secs(5));

    let registry = Arc::new(CorrelationRegistry::<ApiKeyValidationResponse>::new());

    group.bench_function("register_deliver_recv", |b| {
        b.iter(|| {
            let id = CorrelationId::new();
            let mut slot = registry.register(id);
            registry.deliver(
                id,
                ApiKeyValidationResponse {
                    correlation_id: id,
                    valid: true,
                    merchant_id: 1,
                },
            );
            black_box(rt.block_on(slot.recv()))
        })
    });

    // Delivery cost with many other requests in flight
    for in_flight in [10usize, 1_000, 10_000] {
        let slots: Vec<_> = (0..in_flight)
            .map(|_| registry.register(CorrelationId::new()))
            .collect();

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::new("deliver_unknown", in_flight), &in_flight, |b, _| {
            b.iter(|| {
                let id = CorrelationId::new();
                black_box(registry.deliver(
                    id,
                    ApiKeyValidationResponse {
                        correlation_id: id,
                        valid: false,
                        merchant_id: 0,
                    },
                ))
            })
        });
        drop(slots);
    }

    group.finish();
}

// ============================================================================
// Cache and subject normalization
// ============================================================================

fn bench_cache_and_subject(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("cache-aside");

    let cache = InMemoryCache::new();
    rt.block_on(cache.set("merchant:api_key:abc", "42".to_string(), Duration::from_secs(600)))
        .unwrap();

    group.bench_function("cache_hit", |b| {
        b.iter(|| black_box(rt.block_on(cache.get("merchant:api_key:abc")).unwrap()))
    });

    group.bench_function("normalize_user_id_string", |b| {
        let subject = serde_json::json!(" 123456 ");
        b.iter(|| black_box(normalize_user_id(&subject).unwrap()))
    });

    group.finish();
}

// ============================================================================
// Broker round trip
// ============================================================================

fn bench_round_trip(c: &mut Criterion) {
    use gateway_runtime::handlers::{MerchantDirectory, ValidationResponder};
    use pg_api_gateway::{GatewayConfig, RequestContext, ValidationGateway};

    let rt = runtime();
    let broker = InMemoryBroker::new();
    let (gateway, _responder) = rt.block_on(async {
        // Zero TTL: every call goes through the broker
        let mut config = GatewayConfig::default();
        config.merchant_validator.cache_ttl = Duration::ZERO;
        let responder = ValidationResponder::new(
            MerchantDirectory::new().with_key("sk_bench", 9),
            Arc::new(broker.clone()),
        )
        .start(&broker, &config.merchant_validator.request_topic, "merchant-service")
        .await
        .unwrap();
        let gateway = ValidationGateway::start(
            config,
            Arc::new(broker.clone()),
            &broker,
            Arc::new(InMemoryCache::new()),
        )
        .await
        .unwrap();
        (gateway, responder)
    });

    let mut headers = axum::http::HeaderMap::new();
    headers.insert("x-api-key", "sk_bench".parse().unwrap());
    let validator = gateway.merchant_validator().clone();

    let mut group = c.benchmark_group("broker-round-trip");
    group.bench_function("merchant_key_uncached", |b| {
        b.iter(|| {
            let ctx = RequestContext::new().with_headers(headers.clone());
            black_box(rt.block_on(validator.authenticate(&ctx)).unwrap())
        })
    });
    group.finish();
}

criterion_group!(benches, bench_registry, bench_cache_and_subject, bench_round_trip);
criterion_main!(benches);
