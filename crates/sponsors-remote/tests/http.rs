//! Integration tests for the HTTP entitlement client.
//!
//! These spin up a fake entitlement service with `axum` on a random local
//! port and point a real `HttpEntitlementService` at it, so the query
//! strings, status handling, and body decoding are exercised end to end.

#![cfg(feature = "http")]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use sponsors_protocol::{ConfigReader, RoleId, SponsorsConfig, UserId};
use sponsors_remote::{EntitlementService, HttpEntitlementService, RemoteError};

// =========================================================================
// Fake entitlement service
// =========================================================================

/// One recorded request: the endpoint name and its query parameters.
type Hit = (&'static str, HashMap<String, String>);

struct Script {
    roles_status: u16,
    roles_body: String,
    is_given_status: u16,
    post_status: u16,
    delay: Duration,
    hits: Vec<Hit>,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            roles_status: 200,
            roles_body: r#"{"roles":["1150745050196738169"]}"#.to_string(),
            is_given_status: 200,
            post_status: 200,
            delay: Duration::ZERO,
            hits: Vec::new(),
        }
    }
}

#[derive(Clone, Default)]
struct Fake {
    script: Arc<Mutex<Script>>,
}

impl Fake {
    fn edit(&self, f: impl FnOnce(&mut Script)) {
        f(&mut self.script.lock().unwrap());
    }

    fn hits(&self) -> Vec<Hit> {
        self.script.lock().unwrap().hits.clone()
    }

    fn record(&self, endpoint: &'static str, query: HashMap<String, String>) {
        self.script.lock().unwrap().hits.push((endpoint, query));
    }
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap()
}

async fn roles(
    State(fake): State<Fake>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    fake.record("roles", query);
    let delay = fake.script.lock().unwrap().delay;
    tokio::time::sleep(delay).await;
    let script = fake.script.lock().unwrap();
    (status(script.roles_status), script.roles_body.clone())
}

async fn is_given(
    State(fake): State<Fake>,
    Query(query): Query<HashMap<String, String>>,
) -> StatusCode {
    fake.record("is_given", query);
    status(fake.script.lock().unwrap().is_given_status)
}

async fn given(
    State(fake): State<Fake>,
    Query(query): Query<HashMap<String, String>>,
) -> StatusCode {
    fake.record("given", query);
    status(fake.script.lock().unwrap().post_status)
}

async fn wipe_given(
    State(fake): State<Fake>,
    Query(query): Query<HashMap<String, String>>,
) -> StatusCode {
    fake.record("wipe_given", query);
    status(fake.script.lock().unwrap().post_status)
}

/// Starts the fake on a random port and returns it with its base URL.
async fn start_fake() -> (Fake, String) {
    let fake = Fake::default();
    let app = Router::new()
        .route("/api/roles", get(roles))
        .route("/api/is_given", get(is_given))
        .route("/api/given", post(given))
        .route("/api/wipe_given", post(wipe_given))
        .with_state(fake.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let addr = listener.local_addr().expect("should have local addr");

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (fake, format!("http://{addr}/api"))
}

fn config_for(base: &str) -> SponsorsConfig {
    SponsorsConfig {
        enabled: true,
        api_url: base.to_string(),
        api_key: "secret-key".to_string(),
        guild_id: "guild-1".to_string(),
        request_timeout_secs: 1,
        ..SponsorsConfig::default()
    }
}

fn client_for(base: &str) -> HttpEntitlementService {
    HttpEntitlementService::new(ConfigReader::fixed(config_for(base)))
        .expect("client should build")
}

// =========================================================================
// fetch_roles()
// =========================================================================

#[tokio::test]
async fn test_fetch_roles_sends_user_guild_and_key() {
    let (fake, base) = start_fake().await;
    let user = UserId::new_random();

    let roles = client_for(&base).fetch_roles(user).await.unwrap();

    assert_eq!(roles, vec![RoleId::from("1150745050196738169")]);
    let hits = fake.hits();
    assert_eq!(hits.len(), 1);
    let (endpoint, query) = &hits[0];
    assert_eq!(*endpoint, "roles");
    assert_eq!(query["userid"], user.to_string());
    assert_eq!(query["guildid"], "guild-1");
    assert_eq!(query["api_token"], "secret-key");
}

#[tokio::test]
async fn test_fetch_roles_non_success_status_is_error() {
    let (fake, base) = start_fake().await;
    fake.edit(|s| s.roles_status = 500);

    let result = client_for(&base).fetch_roles(UserId::new_random()).await;

    assert!(
        matches!(result, Err(RemoteError::Status(500))),
        "got {result:?}"
    );
}

#[tokio::test]
async fn test_fetch_roles_missing_field_is_malformed() {
    let (fake, base) = start_fake().await;
    fake.edit(|s| s.roles_body = r#"{"other":[]}"#.to_string());

    let result = client_for(&base).fetch_roles(UserId::new_random()).await;

    assert!(matches!(result, Err(RemoteError::Malformed(_))), "got {result:?}");
}

#[tokio::test]
async fn test_fetch_roles_empty_list_is_ok() {
    let (fake, base) = start_fake().await;
    fake.edit(|s| s.roles_body = r#"{"roles":[]}"#.to_string());

    let roles = client_for(&base)
        .fetch_roles(UserId::new_random())
        .await
        .unwrap();

    assert!(roles.is_empty());
}

#[tokio::test]
async fn test_fetch_roles_slow_service_times_out() {
    let (fake, base) = start_fake().await;
    fake.edit(|s| s.delay = Duration::from_secs(5));

    let result = client_for(&base).fetch_roles(UserId::new_random()).await;

    let err = result.expect_err("should time out");
    assert!(err.is_timeout(), "expected timeout, got {err:?}");
}

#[tokio::test]
async fn test_fetch_roles_unreachable_service_is_request_error() {
    // Grab a free port, then close it so nothing is listening there.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = client_for(&format!("http://{addr}/api"))
        .fetch_roles(UserId::new_random())
        .await;

    assert!(matches!(result, Err(RemoteError::Request(_))), "got {result:?}");
}

// =========================================================================
// fetch_granted()
// =========================================================================

#[tokio::test]
async fn test_fetch_granted_200_is_true() {
    let (fake, base) = start_fake().await;
    let user = UserId::new_random();

    assert!(client_for(&base).fetch_granted(user).await.unwrap());

    let hits = fake.hits();
    assert_eq!(hits[0].0, "is_given");
    assert_eq!(hits[0].1["userid"], user.to_string());
    assert_eq!(hits[0].1["api_token"], "secret-key");
    assert!(!hits[0].1.contains_key("guildid"));
}

#[tokio::test]
async fn test_fetch_granted_other_statuses_are_false() {
    let (fake, base) = start_fake().await;
    let client = client_for(&base);

    for code in [204, 404, 500] {
        fake.edit(|s| s.is_given_status = code);
        let granted = client.fetch_granted(UserId::new_random()).await.unwrap();
        assert!(!granted, "status {code} must read as not granted");
    }
}

// =========================================================================
// set_granted() / wipe_granted()
// =========================================================================

#[tokio::test]
async fn test_set_granted_encodes_flag_as_digit() {
    let (fake, base) = start_fake().await;
    let client = client_for(&base);
    let user = UserId::new_random();

    client.set_granted(user, true).await.unwrap();
    client.set_granted(user, false).await.unwrap();

    let hits = fake.hits();
    assert_eq!(hits[0].0, "given");
    assert_eq!(hits[0].1["given"], "1");
    assert_eq!(hits[1].1["given"], "0");
    assert_eq!(hits[1].1["userid"], user.to_string());
}

#[tokio::test]
async fn test_set_granted_failure_status_is_error() {
    let (fake, base) = start_fake().await;
    fake.edit(|s| s.post_status = 503);

    let result = client_for(&base)
        .set_granted(UserId::new_random(), true)
        .await;

    assert!(matches!(result, Err(RemoteError::Status(503))));
}

#[tokio::test]
async fn test_wipe_granted_sends_only_key() {
    let (fake, base) = start_fake().await;

    client_for(&base).wipe_granted().await.unwrap();

    let hits = fake.hits();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0, "wipe_given");
    assert_eq!(hits[0].1.len(), 1);
    assert_eq!(hits[0].1["api_token"], "secret-key");
}

#[tokio::test]
async fn test_wipe_granted_failure_status_is_error() {
    let (fake, base) = start_fake().await;
    fake.edit(|s| s.post_status = 500);

    let result = client_for(&base).wipe_granted().await;

    assert!(matches!(result, Err(RemoteError::Status(500))));
}

// =========================================================================
// Live configuration
// =========================================================================

#[tokio::test]
async fn test_config_change_applies_to_next_request() {
    let (fake, base) = start_fake().await;
    let watch = sponsors_protocol::ConfigWatch::new(config_for(&base));
    let client = HttpEntitlementService::new(watch.reader()).unwrap();

    client.wipe_granted().await.unwrap();
    watch.modify(|c| c.api_key = "rotated".to_string());
    client.wipe_granted().await.unwrap();

    let hits = fake.hits();
    assert_eq!(hits[0].1["api_token"], "secret-key");
    assert_eq!(hits[1].1["api_token"], "rotated");
}
