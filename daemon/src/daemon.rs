use anyhow::Result;
use axum::Json;
use axum::Router;
use axum::extract::MatchedPath;
use axum::extract::Query;
use axum::extract::Request;
use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::routing::get;
use serde::Deserialize;
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tindex_core::Description;
use tindex_core::FilterOptions;
use tindex_core::IndexError;
use tindex_core::Summary;
use tindex_core::TemplateIndex;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Clone)]
struct AppState {
    index: Arc<TemplateIndex>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub templates: usize,
    pub ledgers: Vec<String>,
}

pub fn router(index: Arc<TemplateIndex>) -> Router {
    Router::new()
        .route("/oses", get(oses_handler))
        .route("/workloads", get(workloads_handler))
        .route("/sizes", get(sizes_handler))
        .route("/templates", get(templates_handler))
        .route("/health", get(health_handler))
        .route_layer(middleware::from_fn(log_request))
        .with_state(AppState { index })
}

/// Binds `addr` and serves until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    index: Arc<TemplateIndex>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    serve_listener(listener, index, shutdown).await
}

pub async fn serve_listener(
    listener: TcpListener,
    index: Arc<TemplateIndex>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let addr = listener.local_addr()?;
    info!("template index listening on {addr}");
    axum::serve(listener, router(index))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("template index on {addr} stopped");
    Ok(())
}

async fn log_request(request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_default();

    let response = next.run(request).await;
    info!(
        %method,
        %uri,
        %route,
        status = response.status().as_u16(),
        elapsed = ?started.elapsed(),
        "handled request"
    );
    response
}

async fn oses_handler(State(state): State<AppState>) -> Result<Json<Vec<Summary>>, AppError> {
    summaries(&state, "os")
}

async fn workloads_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Summary>>, AppError> {
    summaries(&state, "workload")
}

async fn sizes_handler(State(state): State<AppState>) -> Result<Json<Vec<Summary>>, AppError> {
    summaries(&state, "size")
}

fn summaries(state: &AppState, key: &str) -> Result<Json<Vec<Summary>>, AppError> {
    Ok(Json(state.index.summarize_by(key)?))
}

async fn templates_handler(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Json<Vec<Description>> {
    let filters = FilterOptions::from_query(params);
    Json(state.index.describe_by(&filters))
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthStatus> {
    Json(HealthStatus {
        templates: state.index.count(),
        ledgers: state.index.ledger_keys(),
    })
}

#[derive(Debug)]
struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    fn not_found(err: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: err.to_string(),
        }
    }

    fn internal(err: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<IndexError> for AppError {
    fn from(err: IndexError) -> Self {
        match err {
            IndexError::UnknownLedger(_) => Self::not_found(err),
            other => Self::internal(other),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}
