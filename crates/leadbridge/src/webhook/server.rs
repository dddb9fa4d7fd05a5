//! HTTP endpoint that accepts CRM webhooks and enqueues pipeline runs.
//!
//! Ingestion is fire-and-forget: the caller only ever sees ingestion-time
//! success or failure, never the fate of the pipeline run. Redelivered
//! webhooks are not deduplicated; each accepted call enqueues exactly one
//! event.

use crate::webhook::{normalize, InboundEvent};
use axum::{
    body::Bytes,
    extract::State,
    http::{header::CONTENT_TYPE, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{any, get},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{info, warn};

const ALLOWED_METHODS: [&str; 2] = ["POST", "GET"];

#[derive(Clone)]
struct AppState {
    trigger: mpsc::Sender<InboundEvent>,
}

pub fn router(trigger: mpsc::Sender<InboundEvent>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/webhooks/amocrm", any(webhook))
        .with_state(AppState { trigger })
}

async fn health() -> impl IntoResponse {
    Json(json!({
        "service": "leadbridge",
        "status": "ok",
        "timestamp": Utc::now(),
    }))
}

async fn webhook(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match method {
        Method::POST => receive(state, &headers, &body).await.into_response(),
        // The CRM probes its webhook targets with GET before saving them.
        Method::GET => (
            StatusCode::OK,
            Json(json!({
                "message": "amoCRM webhook endpoint",
                "status": "ready",
                "allowed_methods": ALLOWED_METHODS,
                "timestamp": Utc::now(),
            })),
        )
            .into_response(),
        other => (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(json!({
                "error": "method not allowed",
                "received_method": other.as_str(),
                "allowed_methods": ALLOWED_METHODS,
            })),
        )
            .into_response(),
    }
}

async fn receive(
    state: AppState,
    headers: &HeaderMap,
    body: &Bytes,
) -> (StatusCode, Json<Value>) {
    let event = InboundEvent::new(decode_body(headers, body));

    match &event.hint.record_id {
        Some(record_id) => info!(%record_id, "webhook received"),
        // Accepted anyway so the CRM does not pile up redeliveries; the
        // run will fail at the parse step instead.
        None => warn!("webhook accepted without a record id hint"),
    }

    match state.trigger.send(event).await {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "webhook received",
                "timestamp": Utc::now(),
            })),
        ),
        Err(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({
                "error": "pipeline trigger is not running",
            })),
        ),
    }
}

fn decode_body(headers: &HeaderMap, body: &Bytes) -> Value {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if content_type.starts_with("application/json") {
        serde_json::from_slice(body).unwrap_or_else(|_| normalize::form_to_value(body))
    } else {
        // amoCRM sends application/x-www-form-urlencoded by default.
        normalize::form_to_value(body)
    }
}
