//! End-to-end pipeline runs against mocked CRM and ERP endpoints.

use leadbridge::config::{Config, CrmAuth, CrmConfig, ErpConfig, ServerConfig};
use leadbridge::error::IntegrationError;
use leadbridge::pipeline::{Pipeline, PipelineDeps};
use leadbridge::webhook::InboundEvent;
use leadbridge_core::{RetryPolicy, RunError};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(crm: &MockServer, erp: &MockServer, auth: CrmAuth) -> Config {
    Config {
        crm: CrmConfig {
            subdomain: "oooprometei".into(),
            auth,
            base_url: Some(Url::parse(&crm.uri()).unwrap()),
        },
        erp: ErpConfig {
            url: Url::parse(&erp.uri()).unwrap(),
            key: "erp-key".into(),
            username: "erp-user".into(),
            password: "erp-pass".into(),
            entity_id: 70,
        },
        server: ServerConfig {
            listen_addr: "127.0.0.1:0".into(),
        },
    }
}

fn refresh_auth() -> CrmAuth {
    CrmAuth::Refresh {
        client_id: "client".into(),
        client_secret: "secret".into(),
        redirect_uri: "https://example.com/callback".into(),
        refresh_token: "refresh".into(),
    }
}

fn pipeline(config: Config) -> Pipeline {
    let deps = Arc::new(
        PipelineDeps::new(Arc::new(config))
            .with_upstream_retry(RetryPolicy::fixed(3, Duration::from_millis(5))),
    );
    Pipeline::new(deps).unwrap()
}

fn status_change_payload() -> Value {
    json!({
        "leads[status][0][id]": ["45721053"],
        "account[subdomain]": ["oooprometei"],
        "leads[status][0][status_id]": ["77186758"],
        "leads[status][0][old_status_id]": ["77186754"]
    })
}

async fn mount_token_exchange(crm: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/oauth2/access_token"))
        .and(body_partial_json(json!({
            "client_id": "client",
            "grant_type": "refresh_token",
            "refresh_token": "refresh"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": 86400,
            "access_token": "tok-123",
            "refresh_token": "refresh-next"
        })))
        .expect(1)
        .mount(crm)
        .await;
}

async fn mount_lead(crm: &MockServer, lead: Value) {
    Mock::given(method("GET"))
        .and(path("/api/v4/leads/45721053"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(lead))
        .expect(1)
        .mount(crm)
        .await;
}

#[tokio::test]
async fn relays_a_status_change_into_an_erp_task() {
    let crm = MockServer::start().await;
    let erp = MockServer::start().await;

    mount_token_exchange(&crm).await;
    mount_lead(
        &crm,
        json!({
            "id": 45721053,
            "name": "Deal X",
            "price": 12000,
            "status_id": 77186758,
            "pipeline_id": 7718
        }),
    )
    .await;
    Mock::given(method("POST"))
        .and(path("/"))
        .and(body_partial_json(json!({
            "key": "erp-key",
            "action": "insert",
            "entity_id": 70,
            "items": { "field_1039": "Deal X", "field_1040": 12000 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": 9001 } })))
        .expect(1)
        .mount(&erp)
        .await;

    let pipeline = pipeline(config(&crm, &erp, refresh_auth()));
    let summary = pipeline
        .run(InboundEvent::new(status_change_payload()))
        .await
        .unwrap();

    assert_eq!(summary.record.id, 45721053);
    assert_eq!(summary.record.price, Some(12000));
    assert!(summary.changes.status_changed);
    assert!(!summary.changes.pipeline_changed);
    assert_eq!(summary.task.task_id, Some(9001));
    assert!(summary.steps.task_created);
    assert!(summary.run_id.is_some());
}

#[tokio::test]
async fn omits_the_amount_field_when_the_lead_has_no_price() {
    let crm = MockServer::start().await;
    let erp = MockServer::start().await;

    mount_token_exchange(&crm).await;
    mount_lead(&crm, json!({ "id": 45721053, "name": "Deal X" })).await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": 9002 } })))
        .expect(1)
        .mount(&erp)
        .await;

    let pipeline = pipeline(config(&crm, &erp, refresh_auth()));
    pipeline
        .run(InboundEvent::new(status_change_payload()))
        .await
        .unwrap();

    let requests = erp.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["items"]["field_1039"], "Deal X");
    assert!(body["items"].get("field_1040").is_none());
}

#[tokio::test]
async fn zero_price_is_treated_like_no_price() {
    let crm = MockServer::start().await;
    let erp = MockServer::start().await;

    mount_token_exchange(&crm).await;
    mount_lead(&crm, json!({ "id": 45721053, "name": "Deal X", "price": 0 })).await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": 9003 } })))
        .expect(1)
        .mount(&erp)
        .await;

    let pipeline = pipeline(config(&crm, &erp, refresh_auth()));
    pipeline
        .run(InboundEvent::new(status_change_payload()))
        .await
        .unwrap();

    let requests = erp.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body["items"].get("field_1040").is_none());
}

#[tokio::test]
async fn long_lived_token_mode_skips_the_exchange() {
    let crm = MockServer::start().await;
    let erp = MockServer::start().await;

    // No token-exchange mock mounted: a call to it would 404 and fail the
    // run after retries.
    Mock::given(method("GET"))
        .and(path("/api/v4/leads/45721053"))
        .and(header("authorization", "Bearer llt-1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({ "id": 45721053, "name": "Deal X", "price": 500 })),
        )
        .expect(1)
        .mount(&crm)
        .await;
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": { "id": 9004 } })))
        .expect(1)
        .mount(&erp)
        .await;

    let auth = CrmAuth::LongLived {
        token: "llt-1".into(),
    };
    let pipeline = pipeline(config(&crm, &erp, auth));
    let summary = pipeline
        .run(InboundEvent::new(status_change_payload()))
        .await
        .unwrap();
    assert_eq!(summary.task.task_id, Some(9004));
}

#[tokio::test]
async fn erp_failure_exhausts_retries_and_fails_at_create_task() {
    let crm = MockServer::start().await;
    let erp = MockServer::start().await;

    mount_token_exchange(&crm).await;
    mount_lead(&crm, json!({ "id": 45721053, "name": "Deal X", "price": 12000 })).await;
    // Every attempt re-POSTs the insert: 1 initial + 3 retries. Were the
    // ERP accepting these, each would create a duplicate task.
    Mock::given(method("POST"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .expect(4)
        .mount(&erp)
        .await;

    let pipeline = pipeline(config(&crm, &erp, refresh_auth()));
    let err = pipeline
        .run(InboundEvent::new(status_change_payload()))
        .await
        .unwrap_err();

    match err {
        RunError::StepFailed {
            step,
            attempts,
            error,
        } => {
            assert_eq!(step.as_str(), "create-task");
            assert_eq!(attempts, 4);
            assert!(matches!(
                error.source_as::<IntegrationError>(),
                Some(IntegrationError::ErpApi { status: 500, .. })
            ));
        }
        other => panic!("unexpected run error: {other}"),
    }
}

#[tokio::test]
async fn auth_rejection_is_retried_then_fails_at_authenticate() {
    let crm = MockServer::start().await;
    let erp = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/oauth2/access_token"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .expect(4)
        .mount(&crm)
        .await;

    let pipeline = pipeline(config(&crm, &erp, refresh_auth()));
    let err = pipeline
        .run(InboundEvent::new(status_change_payload()))
        .await
        .unwrap_err();

    assert_eq!(err.step().as_str(), "authenticate");
    match err {
        RunError::StepFailed { error, .. } => {
            assert!(matches!(
                error.source_as::<IntegrationError>(),
                Some(IntegrationError::CrmAuth { status: 502, .. })
            ));
        }
        other => panic!("unexpected run error: {other}"),
    }
}

#[tokio::test]
async fn payload_without_a_record_id_fails_without_touching_the_network() {
    let crm = MockServer::start().await;
    let erp = MockServer::start().await;

    let pipeline = pipeline(config(&crm, &erp, refresh_auth()));
    let err = pipeline
        .run(InboundEvent::new(json!({
            "account[subdomain]": ["oooprometei"]
        })))
        .await
        .unwrap_err();

    match err {
        RunError::StepFailed {
            step,
            attempts,
            error,
        } => {
            assert_eq!(step.as_str(), "parse-webhook");
            // Fatal: no retry is useful for a malformed payload.
            assert_eq!(attempts, 1);
            assert!(matches!(
                error.source_as::<IntegrationError>(),
                Some(IntegrationError::MissingRecordId)
            ));
        }
        other => panic!("unexpected run error: {other}"),
    }

    assert!(crm.received_requests().await.unwrap().is_empty());
    assert!(erp.received_requests().await.unwrap().is_empty());
}
