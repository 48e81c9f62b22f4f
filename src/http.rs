use crate::ai::AiClient;
use crate::auth::TokenStore;
use crate::error::ProbeError;
use crate::metrics::Metrics;
use crate::probes::Probes;
use crate::snapshot::{build_snapshot, SnapshotRequest};
use axum::body::Body;
use axum::extract::{Query, Request, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

#[derive(Clone)]
pub struct HttpAppState {
    pub metrics: Arc<Metrics>,
    pub probes: Arc<Probes>,
    pub tokens: Arc<TokenStore>,
    pub ai: Option<Arc<AiClient>>,
}

pub fn build_router(state: HttpAppState) -> Router {
    let protected = Router::new()
        .route("/api/network-status", get(network_status))
        .route("/api/bandwidth/current", get(bandwidth_current))
        .route("/api/bandwidth/speedtest", get(bandwidth_speedtest))
        .route("/api/network-action", post(network_action))
        .route("/api/snapshot", get(snapshot_handler))
        .route("/api/ask", post(ask))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_token,
        ));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
        .route("/api/login", post(login))
        .merge(protected)
        .with_state(state)
}

async fn require_token(State(state): State<HttpAppState>, req: Request, next: Next) -> Response {
    let bearer = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match bearer {
        Some(token) if state.tokens.is_valid(token).await => next.run(req).await,
        _ => error_response(StatusCode::UNAUTHORIZED, "invalid or expired token"),
    }
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn metrics_handler(State(state): State<HttpAppState>) -> Response {
    state.metrics.inc_scrape_count();
    match state.metrics.encode_metrics() {
        Ok(encoded) => {
            let mut response = Response::new(Body::from(encoded));
            response.headers_mut().insert(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; version=0.0.4"),
            );
            response
        }
        Err(err) => error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("failed to encode metrics: {err}"),
        ),
    }
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn login(State(state): State<HttpAppState>, Json(req): Json<LoginRequest>) -> Response {
    if req.email.is_empty() || req.password.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Missing email or password");
    }

    match state.tokens.login(&req.email, &req.password).await {
        Some(token) => Json(token).into_response(),
        None => {
            state.metrics.inc_login_failure();
            error_response(StatusCode::BAD_REQUEST, "Invalid credentials")
        }
    }
}

async fn network_status(State(state): State<HttpAppState>) -> Response {
    state.metrics.inc_probe("status");
    Json(state.probes.status.generate()).into_response()
}

async fn bandwidth_current(State(state): State<HttpAppState>) -> Response {
    state.metrics.inc_probe("bandwidth");
    match state.probes.bandwidth.sample() {
        Ok(sample) => {
            state.metrics.record_bandwidth(&sample);
            Json(sample).into_response()
        }
        Err(err) => {
            state.metrics.inc_probe_error("bandwidth");
            probe_error_response(&err)
        }
    }
}

async fn bandwidth_speedtest(State(state): State<HttpAppState>) -> Response {
    state.metrics.inc_probe("speedtest");
    match state.probes.speedtest.run().await {
        Ok(result) => {
            state.metrics.record_speedtest(&result);
            Json(result).into_response()
        }
        Err(err) => {
            state.metrics.inc_probe_error("speedtest");
            probe_error_response(&err)
        }
    }
}

#[derive(Debug, Deserialize)]
struct NetworkActionRequest {
    #[serde(default)]
    action: String,
    ip_address: Option<String>,
    count: Option<u32>,
}

async fn network_action(
    State(state): State<HttpAppState>,
    Json(req): Json<NetworkActionRequest>,
) -> Response {
    match req.action.as_str() {
        "ping" => {
            let Some(ip_address) = req.ip_address else {
                return error_response(StatusCode::BAD_REQUEST, "IP address is required");
            };
            state.metrics.inc_probe("ping");
            match state.probes.ping.probe(&ip_address, req.count).await {
                Ok(output) => Json(output).into_response(),
                Err(err) => {
                    if !err.is_caller_error() {
                        state.metrics.inc_probe_error("ping");
                    }
                    probe_error_response(&err)
                }
            }
        }
        "topology" => match &state.ai {
            Some(ai) => match ai.topology().await {
                Ok(topology) => Json(json!({ "result": topology })).into_response(),
                Err(err) => {
                    warn!(error = %err, "topology generation failed");
                    error_response(StatusCode::BAD_GATEWAY, &err.to_string())
                }
            },
            None => error_response(StatusCode::SERVICE_UNAVAILABLE, "AI service not configured"),
        },
        _ => error_response(StatusCode::BAD_REQUEST, "Invalid action"),
    }
}

#[derive(Debug, Deserialize)]
struct SnapshotParams {
    include: Option<String>,
}

async fn snapshot_handler(
    State(state): State<HttpAppState>,
    Query(params): Query<SnapshotParams>,
) -> Response {
    let include = match params.include.as_deref() {
        None => SnapshotRequest::cheap(),
        Some(list) => {
            let mut include = SnapshotRequest::default();
            for section in list.split(',').filter(|s| !s.is_empty()) {
                match section {
                    "status" => include.status = true,
                    "bandwidth" => include.bandwidth = true,
                    "speedtest" => include.speedtest = true,
                    other => {
                        return error_response(
                            StatusCode::BAD_REQUEST,
                            &format!("unknown snapshot section '{other}'"),
                        )
                    }
                }
            }
            include
        }
    };

    state.metrics.inc_probe("snapshot");
    Json(build_snapshot(&state.probes, include).await).into_response()
}

#[derive(Debug, Deserialize)]
struct AskRequest {
    #[serde(default)]
    question: String,
}

async fn ask(State(state): State<HttpAppState>, Json(req): Json<AskRequest>) -> Response {
    if req.question.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Question is required");
    }

    match &state.ai {
        Some(ai) => match ai.ask(&req.question).await {
            Ok(answer) => Json(json!({ "response": answer })).into_response(),
            Err(err) => {
                warn!(error = %err, "AI question failed");
                error_response(StatusCode::BAD_GATEWAY, &err.to_string())
            }
        },
        None => error_response(StatusCode::SERVICE_UNAVAILABLE, "AI service not configured"),
    }
}

fn probe_error_response(err: &ProbeError) -> Response {
    let status = if err.is_caller_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    error_response(status, &err.to_string())
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}
