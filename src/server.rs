//! Service shell (§4.8): routing, auth, a per-request deadline, and the
//! uniform response envelope from §6.
//!
//! Grounded on the `other_examples/` riptide-api files for the axum/tower
//! shape (`AppState`, typed `ApiError`/`ApiResult`, `tower_http::trace`),
//! since the teacher's own HTTP transport is a private crate this gateway
//! can't depend on.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Extension, Path, Query, Request, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::orchestrator::Orchestrator;

pub struct AppState {
    pub orchestrator: Orchestrator,
    pub config: GatewayConfig,
}

#[derive(Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    timestamp: chrono::DateTime<chrono::Utc>,
}

impl<T: Serialize> Envelope<T> {
    fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: chrono::Utc::now(),
        }
    }
}

fn ok_json<T: Serialize>(data: T) -> Response {
    Json(Envelope::ok(data)).into_response()
}

#[must_use]
pub fn build_router(state: Arc<AppState>) -> Router {
    let public_routes = Router::new()
        .route("/", get(service_info))
        .route("/health", get(health))
        .route("/r/:provider/:id", get(redirect));

    let api_routes = Router::new()
        .route("/cache/stats", get(cache_stats))
        .route("/cache/clear", delete(cache_clear))
        .route("/cache/:provider/:id", delete(cache_remove))
        .route("/api/:provider/search", get(search))
        .route("/api/:provider/:id", get(detail))
        .route_layer(axum::middleware::from_fn_with_state(Arc::clone(&state), auth_middleware));

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .with_state(Arc::clone(&state))
        .layer(
            ServiceBuilder::new()
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(axum::middleware::from_fn(request_id_middleware))
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn_with_state(state, deadline_middleware))
                .layer(CorsLayer::permissive()),
        )
}

/// §4.8's per-request deadline: every request gets its own
/// [`CancellationToken`], stashed as a request extension so handlers can
/// thread it into the orchestrator instead of fabricating an unconnected
/// one. If the configured `RequestTimeoutSeconds` elapses first, the token
/// is cancelled — every suspension point downstream (limiter wait,
/// rate-limiter sleep, network I/O, fan-out join) observes it promptly per
/// §5 — and the client gets the typed "cancelled" envelope rather than a
/// generic proxy timeout.
async fn deadline_middleware(State(state): State<Arc<AppState>>, mut request: Request, next: Next) -> Response {
    let ct = CancellationToken::new();
    request.extensions_mut().insert(ct.clone());

    let deadline = Duration::from_secs(state.config.request_timeout_seconds());

    tokio::select! {
        response = next.run(request) => response,
        () = tokio::time::sleep(deadline) => {
            ct.cancel();
            tracing::warn!(event = "RequestDeadlineExceeded", timeout_secs = state.config.request_timeout_seconds(), "request exceeded the configured hard timeout");
            GatewayError::Cancelled.into_response()
        }
    }
}

/// §4.8's global unhandled-error trap: a handler panic is logged and turned
/// into the same `500` envelope shape as [`GatewayError::Internal`], instead
/// of tearing down the connection or leaking a bare panic message.
fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    GatewayError::Internal(message).into_response()
}

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Stamps every request with a UUID, carried on the tracing span and echoed
/// back on the response, so a caller's error report can be correlated with
/// a specific server-side log line (§4.8's "observability hooks").
async fn request_id_middleware(request: Request, next: Next) -> Response {
    use tracing::Instrument;

    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("request", %request_id);

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = axum::http::HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = state.config.auth_token() else {
        return next.run(request).await;
    };

    let provided = headers
        .get(state.config.token_header_name())
        .and_then(|v| v.to_str().ok());

    if provided == Some(expected) {
        next.run(request).await
    } else {
        GatewayError::InvalidInput("missing or incorrect auth token".to_string()).into_response()
    }
}

#[derive(Serialize)]
struct ServiceInfo {
    auth_enabled: bool,
    version: &'static str,
}

async fn service_info(State(state): State<Arc<AppState>>) -> Response {
    ok_json(ServiceInfo {
        auth_enabled: state.config.auth_token().is_some(),
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    timestamp: chrono::DateTime<chrono::Utc>,
}

async fn health() -> Response {
    ok_json(Health {
        status: "healthy",
        timestamp: chrono::Utc::now(),
    })
}

/// §6: a plain `302 Found` to the provider's canonical detail URL. Axum's
/// `Redirect` helper only offers 303/307/308, none of which is a 302, so
/// the response is built directly.
async fn redirect(State(state): State<Arc<AppState>>, Path((provider, id)): Path<(String, String)>) -> Response {
    match state.orchestrator.redirect_target(&provider, &id) {
        Ok(url) => match HeaderValue::from_str(&url) {
            Ok(location) => (StatusCode::FOUND, [(header::LOCATION, location)]).into_response(),
            Err(_) => GatewayError::Internal("detail url is not a valid header value".to_string()).into_response(),
        },
        Err(e @ GatewayError::UnknownProvider(_)) => (StatusCode::NOT_FOUND, e.to_string()).into_response(),
        Err(e) => e.into_response(),
    }
}

async fn cache_stats(State(state): State<Arc<AppState>>) -> Response {
    let stats = state.orchestrator.cache().stats();
    ok_json(serde_json::json!({
        "hits": stats.hits,
        "misses": stats.misses,
        "evictions": stats.evictions,
        "totalRequests": stats.total_requests(),
        "hitRatio": stats.hit_ratio(),
        "size": state.orchestrator.cache().len(),
    }))
}

async fn cache_clear(State(state): State<Arc<AppState>>) -> Response {
    state.orchestrator.cache().clear();
    ok_json(serde_json::json!({ "cleared": true }))
}

async fn cache_remove(State(state): State<Arc<AppState>>, Path((provider, id)): Path<(String, String)>) -> Response {
    state.orchestrator.cache().remove(&provider, &id);
    ok_json(serde_json::json!({ "removed": true }))
}

#[derive(Deserialize)]
struct SearchQuery {
    title: String,
    #[serde(default = "default_max")]
    max: usize,
}

fn default_max() -> usize {
    12
}

async fn search(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Query(query): Query<SearchQuery>,
    Extension(ct): Extension<CancellationToken>,
) -> Response {
    match state
        .orchestrator
        .search(&provider, &query.title, query.max, &ct)
        .await
    {
        Ok(results) => ok_json(results),
        Err(e) => e.into_response(),
    }
}

async fn detail(
    State(state): State<Arc<AppState>>,
    Path((provider, id)): Path<(String, String)>,
    Extension(ct): Extension<CancellationToken>,
) -> Response {
    match state.orchestrator.detail_by_id(&provider, &id, &ct).await {
        Ok(metadata) => ok_json(metadata),
        Err(e) => e.into_response(),
    }
}
