//! Request round-trip benchmark suite.
//!
//! Benchmarks command correlation against a local echo target:
//! - Sequential round trips
//! - Concurrent round trips: 16, 64, 256 in flight
//! - Inbound frame classification
//!
//! Run with: cargo bench --bench round_trip
//! Results saved to: target/criterion/

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use futures_util::future::join_all;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use devtools_bridge::protocol::Frame;
use devtools_bridge::{ConnectOptions, Connection};

// ============================================================================
// Benchmark Parameters
// ============================================================================

const IN_FLIGHT: &[usize] = &[16, 64, 256];

// ============================================================================
// Echo Target
// ============================================================================

/// Starts a target that answers every request with its own params.
async fn echo_target() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(ws) = accept_async(stream).await else {
                    return;
                };
                let (mut write, mut read) = ws.split();
                while let Some(Ok(Message::Text(text))) = read.next().await {
                    let request: Value = serde_json::from_str(text.as_str()).unwrap();
                    let reply = json!({ "id": request["id"], "result": request["params"] });
                    if write.send(Message::Text(reply.to_string().into())).await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    format!("ws://{addr}/devtools/page/ECHO")
}

async fn open(url: &str) -> Connection {
    Connection::open(url, &ConnectOptions::default())
        .await
        .unwrap()
}

// ============================================================================
// Benchmark: Sequential
// ============================================================================

fn bench_sequential(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let connection = rt.block_on(async { open(&echo_target().await).await });

    c.bench_function("round_trip/sequential", |b| {
        b.to_async(&rt).iter(|| async {
            connection
                .invoke("Runtime", "evaluate", json!({ "expression": "1" }))
                .await
                .unwrap()
        });
    });
}

// ============================================================================
// Benchmark: Concurrent
// ============================================================================

fn bench_concurrent(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let connection = rt.block_on(async { open(&echo_target().await).await });

    let mut group = c.benchmark_group("round_trip/concurrent");
    for &count in IN_FLIGHT {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.to_async(&rt).iter(|| {
                let connection = connection.clone();
                async move {
                    let calls = (0..count)
                        .map(|n| connection.invoke("Runtime", "evaluate", json!({ "n": n })));
                    for result in join_all(calls).await {
                        result.unwrap();
                    }
                }
            });
        });
    }
    group.finish();
}

// ============================================================================
// Benchmark: Frame Classification
// ============================================================================

fn bench_decode(c: &mut Criterion) {
    let response = r#"{"id":42,"result":{"result":{"type":"number","value":2}}}"#;
    let event = r#"{"method":"Network.requestWillBeSent","params":{"requestId":"R1","request":{"url":"https://example.com/","method":"GET"}}}"#;

    let mut group = c.benchmark_group("frame_decode");
    group.bench_function("response", |b| b.iter(|| Frame::decode(response).unwrap()));
    group.bench_function("event", |b| b.iter(|| Frame::decode(event).unwrap()));
    group.finish();
}

criterion_group!(benches, bench_sequential, bench_concurrent, bench_decode);
criterion_main!(benches);
