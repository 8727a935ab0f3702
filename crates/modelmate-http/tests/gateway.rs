//! Gateway tests against a mock REST API.
//!
//! Tokens here are opaque strings: the gateway never inspects them, it only
//! reacts to the server's 401s.

mod common;

use std::time::Duration;

use futures_util::future::join_all;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use modelmate_core::{TokenPair, TokenStore};
use modelmate_core::error::{AuthError, Error};
use modelmate_http::ApiRequest;

use common::{Harness, pair};

async fn mount_protected(server: &MockServer, route: &str, valid_token: &str) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("authorization", format!("Bearer {}", valid_token).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"route": route})))
        .with_priority(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "Given token not valid for any token type",
            "code": "token_not_valid"
        })))
        .with_priority(5)
        .mount(server)
        .await;
}

// ============================================================================
// Request Path
// ============================================================================

#[tokio::test]
async fn attaches_bearer_token_when_present() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/models/"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, pair("access-1", Some("refresh-1")));
    let models: Value = harness.gateway.get("/models/").await.unwrap();

    assert_eq!(models, json!([{"id": 1}]));
}

#[tokio::test]
async fn sends_unauthenticated_without_access_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/categories/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let harness = Harness::new(&server, TokenPair::empty());
    let _: Value = harness.gateway.get("/categories/").await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn public_requests_never_carry_credentials() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/register/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "nope"})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "never"})))
        .expect(0)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, pair("access-1", Some("refresh-1")));
    let err = harness
        .gateway
        .execute_public(&ApiRequest::post("/auth/register/").with_body(json!({})))
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
    assert_eq!(harness.stored(), pair("access-1", Some("refresh-1")));
}

// ============================================================================
// Refresh Protocol
// ============================================================================

#[tokio::test]
async fn expired_token_is_refreshed_and_request_replayed() {
    let server = MockServer::start().await;
    mount_protected(&server, "/users/me/", "access-2").await;

    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .and(body_json(json!({"refresh": "refresh-1"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "access-2"})))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, pair("access-1", Some("refresh-1")));
    let me: Value = harness.gateway.get("/users/me/").await.unwrap();

    assert_eq!(me, json!({"route": "/users/me/"}));
    // No refresh token in the response: the old one is retained.
    assert_eq!(harness.stored(), pair("access-2", Some("refresh-1")));
    assert_eq!(harness.navigator.redirects(), 0);
    assert!(!harness.gateway.is_refreshing());
}

#[tokio::test]
async fn rotated_refresh_token_replaces_old_one() {
    let server = MockServer::start().await;
    mount_protected(&server, "/users/me/", "access-2").await;

    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": "access-2",
            "refresh": "refresh-2"
        })))
        .mount(&server)
        .await;

    let harness = Harness::new(&server, pair("access-1", Some("refresh-1")));
    let _: Value = harness.gateway.get("/users/me/").await.unwrap();

    assert_eq!(harness.stored(), pair("access-2", Some("refresh-2")));
}

#[tokio::test]
async fn replayed_request_keeps_method_and_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/reviews/"))
        .and(header("authorization", "Bearer access-2"))
        .and(body_json(json!({"model": 3, "rating": 4})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": 99})))
        .expect(1)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/reviews/"))
        .respond_with(ResponseTemplate::new(401))
        .with_priority(5)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "access-2"})))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, pair("access-1", Some("refresh-1")));
    let created: Value = harness
        .gateway
        .post("/reviews/", &json!({"model": 3, "rating": 4}))
        .await
        .unwrap();

    assert_eq!(created, json!({"id": 99}));
}

#[tokio::test]
async fn concurrent_requests_share_one_refresh() {
    let server = MockServer::start().await;
    mount_protected(&server, "/models/", "access-2").await;

    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "access-2"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, pair("access-1", Some("refresh-1")));

    let requests = (0..8).map(|_| harness.gateway.get::<Value>("/models/"));
    let results = join_all(requests).await;

    assert_eq!(results.len(), 8);
    for result in results {
        assert_eq!(result.unwrap(), json!({"route": "/models/"}));
    }
    assert_eq!(harness.stored(), pair("access-2", Some("refresh-1")));
    assert_eq!(harness.navigator.redirects(), 0);
    assert_eq!(harness.gateway.queued_requests(), 0);
}

#[tokio::test]
async fn queued_requests_wait_behind_the_refresh() {
    let server = MockServer::start().await;
    mount_protected(&server, "/models/", "access-2").await;

    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "access-2"}))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, pair("access-1", Some("refresh-1")));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let gateway = harness.gateway.clone();
            tokio::spawn(async move { gateway.get::<Value>("/models/").await })
        })
        .collect();

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(harness.gateway.is_refreshing());
    assert_eq!(harness.gateway.queued_requests(), 3);

    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert!(!harness.gateway.is_refreshing());
    assert_eq!(harness.gateway.queued_requests(), 0);
}

#[tokio::test]
async fn failed_refresh_rejects_every_request_together() {
    let server = MockServer::start().await;
    mount_protected(&server, "/models/", "access-2").await;

    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(json!({
                    "detail": "Token is invalid or expired",
                    "code": "token_not_valid"
                }))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, pair("access-1", Some("refresh-1")));

    let requests = (0..8).map(|_| harness.gateway.get::<Value>("/models/"));
    let results = join_all(requests).await;

    for result in results {
        match result.unwrap_err() {
            Error::Auth(AuthError::RefreshRejected { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message.as_deref(), Some("Token is invalid or expired"));
            }
            other => panic!("expected refresh rejection, got {other:?}"),
        }
    }

    assert!(harness.stored().is_empty());
    assert_eq!(harness.navigator.redirects(), 1);
    assert!(!harness.gateway.is_refreshing());
}

#[tokio::test]
async fn missing_refresh_token_ends_session_without_calling_server() {
    let server = MockServer::start().await;
    mount_protected(&server, "/users/me/", "access-2").await;

    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "access-2"})))
        .expect(0)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, pair("access-1", None));
    let err = harness.gateway.get::<Value>("/users/me/").await.unwrap_err();

    assert!(matches!(err, Error::Auth(AuthError::RefreshTokenMissing)));
    assert!(harness.stored().is_empty());
    assert_eq!(harness.navigator.redirects(), 1);
}

#[tokio::test]
async fn rejected_replay_is_not_refreshed_again() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/users/me/"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "detail": "User is inactive",
            "code": "user_inactive"
        })))
        .expect(2)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "access-2"})))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, pair("access-1", Some("refresh-1")));
    let err = harness.gateway.get::<Value>("/users/me/").await.unwrap_err();

    // The replay's own 401 surfaces unchanged.
    match &err {
        Error::Api(api) => {
            assert_eq!(api.status, 401);
            assert_eq!(api.detail(), Some("User is inactive"));
        }
        other => panic!("expected API error, got {other:?}"),
    }
    assert!(harness.stored().is_empty());
    assert_eq!(harness.navigator.redirects(), 1);
}

#[tokio::test]
async fn rejected_replays_sign_out_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/models/"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "access-2"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, pair("access-1", Some("refresh-1")));

    let requests = (0..5).map(|_| harness.gateway.get::<Value>("/models/"));
    let results = join_all(requests).await;

    for result in results {
        assert!(result.unwrap_err().is_unauthorized());
    }
    assert!(harness.stored().is_empty());
    assert_eq!(harness.navigator.redirects(), 1);
}

#[tokio::test]
async fn rejected_replay_spares_a_newer_session() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/models/"))
        .and(header("authorization", "Bearer access-2"))
        .respond_with(ResponseTemplate::new(401).set_delay(Duration::from_millis(300)))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/models/"))
        .respond_with(ResponseTemplate::new(401))
        .with_priority(5)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "access-2"})))
        .mount(&server)
        .await;

    let harness = Harness::new(&server, pair("access-1", Some("refresh-1")));

    let (result, ()) = tokio::join!(harness.gateway.get::<Value>("/models/"), async {
        // A fresh login lands while the replay is in flight.
        tokio::time::sleep(Duration::from_millis(150)).await;
        harness.store.set(&pair("access-9", Some("refresh-9")));
    });

    assert!(result.unwrap_err().is_unauthorized());
    assert_eq!(harness.stored(), pair("access-9", Some("refresh-9")));
    assert_eq!(harness.navigator.redirects(), 0);
}

#[tokio::test]
async fn refresh_timeout_releases_queued_requests() {
    let server = MockServer::start().await;
    mount_protected(&server, "/models/", "access-2").await;

    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "access-2"}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let harness = Harness::with_refresh_timeout(
        &server,
        pair("access-1", Some("refresh-1")),
        Duration::from_millis(200),
    );

    let requests = (0..3).map(|_| harness.gateway.get::<Value>("/models/"));
    let results = join_all(requests).await;

    for result in results {
        assert!(matches!(
            result.unwrap_err(),
            Error::Auth(AuthError::RefreshTimedOut { duration_ms: 200 })
        ));
    }
    assert!(harness.stored().is_empty());
    assert_eq!(harness.navigator.redirects(), 1);
}

#[tokio::test]
async fn settled_refresh_allows_a_new_cycle() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "access-2"})))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access": "access-3",
            "refresh": "refresh-3"
        })))
        .with_priority(2)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, pair("access-1", Some("refresh-1")));

    let first = harness.gateway.refresh().await.unwrap();
    assert_eq!(first.as_str(), "access-2");
    assert!(!harness.gateway.is_refreshing());

    let second = harness.gateway.refresh().await.unwrap();
    assert_eq!(second.as_str(), "access-3");
    assert_eq!(harness.stored(), pair("access-3", Some("refresh-3")));

    let refreshes = server
        .received_requests()
        .await
        .unwrap()
        .into_iter()
        .filter(|r| r.url.path() == "/token/refresh/")
        .count();
    assert_eq!(refreshes, 2);
}

#[tokio::test]
async fn explicit_refresh_joins_the_cycle_in_flight() {
    let server = MockServer::start().await;
    mount_protected(&server, "/models/", "access-2").await;

    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"access": "access-2"}))
                .set_delay(Duration::from_millis(300)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, pair("access-1", Some("refresh-1")));

    let (request, refreshed) = tokio::join!(harness.gateway.get::<Value>("/models/"), async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        harness.gateway.refresh().await
    });

    request.unwrap();
    assert_eq!(refreshed.unwrap().as_str(), "access-2");
}

// ============================================================================
// Pass-through Failures
// ============================================================================

#[tokio::test]
async fn server_errors_pass_through_untouched() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/models/"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"detail": "maintenance"})))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token/refresh/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access": "x"})))
        .expect(0)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, pair("access-1", Some("refresh-1")));
    let err = harness.gateway.get::<Value>("/models/").await.unwrap_err();

    match err {
        Error::Api(api) => {
            assert_eq!(api.status, 503);
            assert!(api.is_server_error());
        }
        other => panic!("expected API error, got {other:?}"),
    }
    assert_eq!(harness.stored(), pair("access-1", Some("refresh-1")));
    assert_eq!(harness.navigator.redirects(), 0);
}

#[tokio::test]
async fn malformed_success_body_is_a_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/models/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let harness = Harness::new(&server, pair("access-1", None));
    let err = harness.gateway.get::<Value>("/models/").await.unwrap_err();

    assert!(matches!(
        err,
        Error::Transport(modelmate_core::error::TransportError::Decode { .. })
    ));
}

#[tokio::test]
async fn delete_accepts_empty_response() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/reviews/5/"))
        .and(header("authorization", "Bearer access-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, pair("access-1", None));
    harness.gateway.delete("/reviews/5/").await.unwrap();
}
