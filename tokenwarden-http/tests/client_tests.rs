use futures::future::join_all;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokenwarden_http::{HttpConfig, HttpError, IntermediaryClient};
use tokenwarden_lifecycle::{
    CredentialPair, RefreshCoordinator, RenewalClient, RenewalError, StatusProbe,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn setup(server: &MockServer) -> IntermediaryClient {
    let config = HttpConfig {
        base_url: server.uri(),
        request_timeout_secs: 5,
        ..HttpConfig::default()
    };
    IntermediaryClient::new(config, 300).unwrap()
}

fn status_body(is_expired: bool, secs: i64) -> serde_json::Value {
    serde_json::json!({
        "isExpired": is_expired,
        "timeUntilExpiry": secs,
        "shouldRefresh": !is_expired && secs <= 300
    })
}

fn renew_body() -> serde_json::Value {
    serde_json::json!({
        "newAccessCredential": "at-new",
        "newRefreshCredential": "rt-new"
    })
}

async fn mount_status(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path("/api/auth/status"))
        .respond_with(template)
        .mount(server)
        .await;
}

async fn mount_refresh(server: &MockServer, template: ResponseTemplate) {
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(template)
        .mount(server)
        .await;
}

// --- Status ---

#[tokio::test]
async fn probe_valid_session() {
    let server = MockServer::start().await;
    mount_status(&server, ResponseTemplate::new(200).set_body_json(status_body(false, 3600))).await;

    let status = setup(&server).probe().await;

    assert!(!status.is_expired);
    assert_eq!(status.seconds_until_expiry, 3600);
    assert!(!status.should_renew_soon);
}

#[tokio::test]
async fn probe_near_expiry_renews_soon() {
    let server = MockServer::start().await;
    mount_status(&server, ResponseTemplate::new(200).set_body_json(status_body(false, 250))).await;

    let status = setup(&server).probe().await;

    assert!(!status.is_expired);
    assert!(status.should_renew_soon);
}

#[tokio::test]
async fn probe_uses_local_threshold_not_server_hint() {
    let server = MockServer::start().await;
    mount_status(
        &server,
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "isExpired": false,
            "timeUntilExpiry": 900,
            "shouldRefresh": true
        })),
    )
    .await;

    let status = setup(&server).probe().await;

    assert!(!status.should_renew_soon);
}

#[tokio::test]
async fn probe_negative_remaining_clamps_to_zero() {
    let server = MockServer::start().await;
    mount_status(&server, ResponseTemplate::new(200).set_body_json(status_body(true, -45))).await;

    let status = setup(&server).probe().await;

    assert!(status.is_expired);
    assert_eq!(status.seconds_until_expiry, 0);
}

#[tokio::test]
async fn probe_server_error_fails_closed() {
    let server = MockServer::start().await;
    mount_status(&server, ResponseTemplate::new(500)).await;

    let status = setup(&server).probe().await;

    assert!(status.is_expired);
    assert_eq!(status.seconds_until_expiry, 0);
    assert!(!status.should_renew_soon);
}

#[tokio::test]
async fn probe_malformed_body_fails_closed() {
    let server = MockServer::start().await;
    mount_status(&server, ResponseTemplate::new(200).set_body_string("<html>login</html>")).await;

    let status = setup(&server).probe().await;

    assert!(status.is_expired);
}

#[tokio::test]
async fn probe_timeout_fails_closed() {
    let server = MockServer::start().await;
    mount_status(
        &server,
        ResponseTemplate::new(200)
            .set_body_json(status_body(false, 3600))
            .set_delay(Duration::from_secs(3)),
    )
    .await;
    let client = IntermediaryClient::new(
        HttpConfig {
            base_url: server.uri(),
            request_timeout_secs: 1,
            ..HttpConfig::default()
        },
        300,
    )
    .unwrap();

    assert!(client.probe().await.is_expired);
}

#[tokio::test]
async fn probe_unreachable_fails_closed() {
    let server = MockServer::start().await;
    let client = setup(&server);
    drop(server);

    assert!(client.probe().await.is_expired);
}

// --- Renewal ---

#[tokio::test]
async fn renew_success() {
    let server = MockServer::start().await;
    mount_refresh(&server, ResponseTemplate::new(200).set_body_json(renew_body())).await;

    let outcome = setup(&server).renew().await;

    assert_eq!(
        outcome,
        Ok(CredentialPair {
            access_credential: "at-new".into(),
            renewal_credential: "rt-new".into(),
        })
    );
}

#[tokio::test]
async fn renew_401_is_unauthorized() {
    let server = MockServer::start().await;
    mount_refresh(
        &server,
        ResponseTemplate::new(401).set_body_json(serde_json::json!({"error": "refresh token expired"})),
    )
    .await;

    assert_eq!(setup(&server).renew().await, Err(RenewalError::Unauthorized));
}

#[tokio::test]
async fn renew_403_is_unauthorized() {
    let server = MockServer::start().await;
    mount_refresh(&server, ResponseTemplate::new(403)).await;

    assert_eq!(setup(&server).renew().await, Err(RenewalError::Unauthorized));
}

#[tokio::test]
async fn renew_500_is_transient() {
    let server = MockServer::start().await;
    mount_refresh(&server, ResponseTemplate::new(500).set_body_string("upstream down")).await;

    let outcome = setup(&server).renew().await;

    assert!(matches!(outcome, Err(RenewalError::Transient(msg)) if msg.contains("500")));
}

#[tokio::test]
async fn renew_malformed_body_is_transient() {
    let server = MockServer::start().await;
    mount_refresh(&server, ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true}))).await;

    assert!(matches!(
        setup(&server).renew().await,
        Err(RenewalError::Transient(_))
    ));
}

#[tokio::test]
async fn exchange_exposes_rejection() {
    let server = MockServer::start().await;
    mount_refresh(&server, ResponseTemplate::new(401)).await;

    let err = setup(&server).exchange().await.unwrap_err();

    assert!(err.is_rejection());
    assert!(matches!(err, HttpError::Status { status: 401, .. }));
}

#[tokio::test]
async fn concurrent_renewals_hit_intermediary_once() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(renew_body())
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let coordinator = Arc::new(RefreshCoordinator::new(Arc::new(setup(&server))));
    let outcomes = join_all((0..6).map(|_| {
        let coordinator = coordinator.clone();
        async move { coordinator.refresh_once().await }
    }))
    .await;

    assert!(outcomes.iter().all(|o| o.is_ok()));
    server.verify().await;
}
