//! Round-trip benchmarks for the stub server

use criterion::{criterion_group, criterion_main, Criterion};
use serde_json::json;
use stub_server::{StubResponse, StubServer};

fn benchmark_round_trip(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("Tokio runtime");
    let server = runtime
        .block_on(StubServer::start(StubResponse::json(200, json!({"id": 1}))))
        .expect("Stub server should start");
    let client = reqwest::Client::new();
    let url = server.url("/users/1");

    c.bench_function("stub_get_users_1", |b| {
        b.iter(|| {
            runtime.block_on(async {
                client
                    .get(&url)
                    .send()
                    .await
                    .expect("Stub should answer")
                    .bytes()
                    .await
                    .expect("Body should be readable")
            })
        });
    });
}

criterion_group!(benches, benchmark_round_trip);
criterion_main!(benches);
