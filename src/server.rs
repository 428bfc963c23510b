//! Pprof-style HTTP debug endpoint.
//!
//! GET-only routes under `/debug/pprof`, bound to a fixed local port with no
//! authentication. A bind failure is fatal at startup; capture failures are
//! reported to the requester as JSON problem bodies.

use crate::context::AppContext;
use crate::error::{LeakSimError, Result};
use crate::heap;
use crate::snapshot::SnapshotExporter;
use axum::{
    Json, Router,
    extract::State,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Problem body returned for failed captures
#[derive(Serialize)]
struct ErrorResponse {
    title: String,
    status: u16,
    detail: String,
}

impl IntoResponse for LeakSimError {
    fn into_response(self) -> Response {
        let status = StatusCode::INTERNAL_SERVER_ERROR;
        let body = ErrorResponse {
            title: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            status: status.as_u16(),
            detail: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Bind the debug port and serve until the process exits.
///
/// # Errors
///
/// Returns `Startup` if the port is already bound or the server dies.
pub async fn run_server(ctx: Arc<AppContext>) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], ctx.config().debug_port()));

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| LeakSimError::Startup { addr, source: e })?;

    info!("debug endpoint listening on http://{addr}/debug/pprof/");

    axum::serve(listener, create_router(ctx))
        .await
        .map_err(|e| LeakSimError::Startup { addr, source: e })
}

/// Create the debug router. Exposed so tests can serve on an ephemeral port.
pub fn create_router(ctx: Arc<AppContext>) -> Router {
    Router::new()
        .route("/debug/pprof", get(index))
        .route("/debug/pprof/", get(index))
        .route("/debug/pprof/heap", get(heap_profile))
        .route("/debug/pprof/tasks", get(task_count))
        .route("/debug/pprof/samples", get(sample_history))
        .route("/debug/pprof/retention", get(retention_summary))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Plain-text index of the available routes.
async fn index() -> &'static str {
    "leaksim debug endpoint\n\
     \n\
     /debug/pprof/heap       heap profile (JSON)\n\
     /debug/pprof/tasks      alive task count\n\
     /debug/pprof/samples    sample history (JSON)\n\
     /debug/pprof/retention  retained block totals (JSON)\n"
}

/// Capture and return a heap profile.
async fn heap_profile(
    State(ctx): State<Arc<AppContext>>,
) -> std::result::Result<Response, LeakSimError> {
    let snapshot = SnapshotExporter::new(&ctx).capture()?;
    Ok((
        [(header::CONTENT_TYPE, "application/json")],
        snapshot.into_bytes(),
    )
        .into_response())
}

/// Alive-task count, the goroutine-count analog.
async fn task_count() -> String {
    format!("tasks: {}\n", heap::alive_tasks())
}

/// Full sample history, oldest first.
async fn sample_history(State(ctx): State<Arc<AppContext>>) -> Response {
    Json(ctx.history().all()).into_response()
}

#[derive(Serialize)]
struct RetentionResponse {
    blocks: usize,
    bytes: usize,
}

/// Retained block and byte totals.
async fn retention_summary(State(ctx): State<Arc<AppContext>>) -> Response {
    let retention = ctx.retention();
    Json(RetentionResponse {
        blocks: retention.len(),
        bytes: retention.retained_bytes(),
    })
    .into_response()
}
