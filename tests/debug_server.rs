//! Debug endpoint round trips against a server on an ephemeral port.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use leaksim::server::create_router;
use leaksim::{AppContext, LeakedBlock, Sampler, SimConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

async fn spawn_server(ctx: Arc<AppContext>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = axum::serve(listener, create_router(ctx)).await;
    });

    addr
}

fn test_ctx() -> Arc<AppContext> {
    let config = SimConfig::new(
        Duration::from_secs(5),
        1024 * 1024,
        Duration::from_secs(10),
        0,
    )
    .unwrap();
    Arc::new(AppContext::new(config))
}

#[tokio::test(flavor = "multi_thread")]
async fn index_lists_the_routes() {
    let addr = spawn_server(test_ctx()).await;

    let body = reqwest::get(format!("http://{addr}/debug/pprof/"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.contains("/debug/pprof/heap"));
    assert!(body.contains("/debug/pprof/tasks"));
}

#[tokio::test(flavor = "multi_thread")]
async fn heap_route_returns_a_json_profile() {
    let ctx = test_ctx();
    ctx.retention().append(LeakedBlock::new(2048));
    let addr = spawn_server(Arc::clone(&ctx)).await;

    let response = reqwest::get(format!("http://{addr}/debug/pprof/heap"))
        .await
        .unwrap();
    assert!(response.status().is_success());

    let profile: serde_json::Value = response.json().await.unwrap();
    assert!(profile["allocated_bytes"].is_u64());
    assert_eq!(profile["retained"]["blocks"], 1);
    assert_eq!(profile["retained"]["bytes"], 2048);
}

#[tokio::test(flavor = "multi_thread")]
async fn tasks_route_reports_a_count() {
    let addr = spawn_server(test_ctx()).await;

    let body = reqwest::get(format!("http://{addr}/debug/pprof/tasks"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

    assert!(body.starts_with("tasks: "));
}

#[tokio::test(flavor = "multi_thread")]
async fn samples_route_returns_the_history() {
    let ctx = test_ctx();
    Sampler::new(&ctx).sample_once().unwrap();
    Sampler::new(&ctx).sample_once().unwrap();
    let addr = spawn_server(Arc::clone(&ctx)).await;

    let samples: serde_json::Value = reqwest::get(format!("http://{addr}/debug/pprof/samples"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let samples = samples.as_array().unwrap();
    assert_eq!(samples.len(), 2);
    assert!(samples[0]["system_bytes"].as_u64().unwrap() > 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn retention_route_reports_totals() {
    let ctx = test_ctx();
    ctx.retention().append(LeakedBlock::new(4096));
    ctx.retention().append(LeakedBlock::new(4096));
    let addr = spawn_server(Arc::clone(&ctx)).await;

    let totals: serde_json::Value = reqwest::get(format!("http://{addr}/debug/pprof/retention"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(totals["blocks"], 2);
    assert_eq!(totals["bytes"], 8192);
}
