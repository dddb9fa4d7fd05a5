//! Router-level tests for the webhook ingestion endpoint.

use axum::body::{to_bytes, Body};
use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
use leadbridge::webhook::{server, InboundEvent};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;

fn channel() -> (mpsc::Sender<InboundEvent>, mpsc::Receiver<InboundEvent>) {
    mpsc::channel(8)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn form_encoded_post_is_accepted_and_enqueued() {
    let (tx, mut rx) = channel();
    let response = server::router(tx)
        .oneshot(
            Request::post("/webhooks/amocrm")
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(
                    "leads%5Bstatus%5D%5B0%5D%5Bid%5D=45721053\
                     &account%5Bsubdomain%5D=oooprometei",
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);

    let event = rx.try_recv().unwrap();
    assert_eq!(event.hint.record_id.as_deref(), Some("45721053"));
    assert_eq!(event.hint.subdomain.as_deref(), Some("oooprometei"));
    assert_eq!(event.entity.as_deref(), Some("leads"));
    assert_eq!(event.action.as_deref(), Some("status"));
}

#[tokio::test]
async fn json_post_is_accepted_and_enqueued() {
    let (tx, mut rx) = channel();
    let payload = json!({
        "data": { "leads[status][0][id]": "45721053" },
        "id": "evt-1",
        "ts": 1724668800
    });
    let response = server::router(tx)
        .oneshot(
            Request::post("/webhooks/amocrm")
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let event = rx.try_recv().unwrap();
    assert_eq!(event.hint.record_id.as_deref(), Some("45721053"));
}

#[tokio::test]
async fn payload_without_a_record_id_is_still_accepted() {
    let (tx, mut rx) = channel();
    let response = server::router(tx)
        .oneshot(
            Request::post("/webhooks/amocrm")
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("account%5Bsubdomain%5D=oooprometei"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let event = rx.try_recv().unwrap();
    assert!(event.hint.record_id.is_none());
}

#[tokio::test]
async fn get_probe_reports_ready() {
    let (tx, _rx) = channel();
    let response = server::router(tx)
        .oneshot(
            Request::get("/webhooks/amocrm")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ready");
    assert_eq!(body["allowed_methods"], json!(["POST", "GET"]));
}

#[tokio::test]
async fn other_methods_are_rejected() {
    let (tx, _rx) = channel();
    let response = server::router(tx)
        .oneshot(
            Request::delete("/webhooks/amocrm")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body_json(response).await["received_method"], "DELETE");
}

#[tokio::test]
async fn closed_trigger_surfaces_as_server_error() {
    let (tx, rx) = channel();
    drop(rx);
    let response = server::router(tx)
        .oneshot(
            Request::post("/webhooks/amocrm")
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("leads%5Bstatus%5D%5B0%5D%5Bid%5D=1"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn health_endpoint_responds() {
    let (tx, _rx) = channel();
    let response = server::router(tx)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], "ok");
}
