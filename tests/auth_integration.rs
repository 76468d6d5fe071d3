use std::net::TcpListener;
use std::sync::Arc;

use serde_json::{json, Value};
use session_auth::auth::{AuthService, TokenCodec};
use session_auth::configuration::AuthSettings;
use session_auth::startup::run;
use session_auth::store::{InMemoryCredentialStore, InMemoryTokenRecordStore};

pub struct TestApp {
    pub address: String,
    pub codec: Arc<TokenCodec>,
    pub records: Arc<InMemoryTokenRecordStore>,
    pub client: reqwest::Client,
}

fn test_settings() -> AuthSettings {
    AuthSettings {
        access_secret: "integration-access-secret-0123456789".to_string(),
        refresh_secret: "integration-refresh-secret-0123456789".to_string(),
        issuer: "test".to_string(),
        access_token_expiry: 300,
        refresh_token_expiry: 2_592_000,
        password_hash_cost: 4,
    }
}

fn spawn_app() -> TestApp {
    let listener = TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let records = Arc::new(InMemoryTokenRecordStore::new());
    let auth = AuthService::new(
        &test_settings(),
        Arc::new(InMemoryCredentialStore::new()),
        records.clone(),
    )
    .expect("Failed to build auth service");
    let codec = auth.codec();

    let server = run(listener, auth).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    TestApp {
        address,
        codec,
        records,
        client: reqwest::Client::new(),
    }
}

impl TestApp {
    async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        self.client
            .post(&format!("{}{}", &self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn register_alice(&self) -> Value {
        let response = self
            .post(
                "/auth/register",
                &json!({
                    "email": "alice@example.com",
                    "password": "secret1",
                    "first_name": "Alice",
                    "last_name": "Liddell"
                }),
            )
            .await;
        assert_eq!(201, response.status().as_u16());
        response.json().await.expect("Failed to parse response")
    }

    async fn refresh(&self, refresh_token: &str) -> reqwest::Response {
        self.post("/auth/refresh", &json!({ "refresh_token": refresh_token })).await
    }
}

fn token(body: &Value, key: &str) -> String {
    body[key].as_str().expect("token missing").to_string()
}

// --- Registration ---

#[tokio::test]
async fn register_returns_201_with_token_pair() {
    let app = spawn_app();
    let body = app.register_alice().await;

    assert_eq!(body["token_type"], "Bearer");
    assert_eq!(body["expires_in"], 300);
    assert_eq!(body["user"]["email"], "alice@example.com");
    assert_eq!(body["user"]["first_name"], "Alice");
    assert!(body["user"].get("password_hash").is_none());

    let claims = app.codec.decode_access(&token(&body, "access_token")).unwrap();
    assert_eq!(claims.sub, body["user"]["id"].as_str().unwrap());
}

#[tokio::test]
async fn register_captures_client_metadata() {
    let app = spawn_app();
    let response = app
        .client
        .post(&format!("{}/auth/register", app.address))
        .header("User-Agent", "integration-agent/1.0")
        .json(&json!({
            "email": "alice@example.com",
            "password": "secret1",
            "first_name": "Alice",
            "last_name": "Liddell"
        }))
        .send()
        .await
        .expect("Failed to execute request.");
    assert_eq!(201, response.status().as_u16());

    let body: Value = response.json().await.unwrap();
    let user_id = uuid::Uuid::parse_str(body["user"]["id"].as_str().unwrap()).unwrap();
    let records = app.records.records_for(user_id);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].user_agent.as_deref(), Some("integration-agent/1.0"));
    assert!(records[0].ip_address.is_some());
}

#[tokio::test]
async fn register_returns_409_for_duplicate_email() {
    let app = spawn_app();
    app.register_alice().await;

    let response = app
        .post(
            "/auth/register",
            &json!({
                "email": "alice@example.com",
                "password": "another1",
                "first_name": "Other",
                "last_name": "Alice"
            }),
        )
        .await;

    assert_eq!(409, response.status().as_u16());
}

#[tokio::test]
async fn register_returns_400_for_invalid_input() {
    let app = spawn_app();

    let test_cases = vec![
        (json!({"email": "notanemail", "password": "secret1", "first_name": "A", "last_name": "B"}), "invalid email"),
        (json!({"email": "a@example.com", "password": "abc", "first_name": "A", "last_name": "B"}), "short password"),
        (json!({"email": "a@example.com", "password": "secret1", "first_name": "", "last_name": "B"}), "empty first name"),
        (json!({"email": "a@example.com", "password": "secret1", "first_name": "A"}), "missing last name"),
        (json!({}), "missing all fields"),
    ];

    for (body, reason) in test_cases {
        let response = app.post("/auth/register", &body).await;
        assert_eq!(400, response.status().as_u16(), "Should reject: {}", reason);
    }
}

// --- Login ---

#[tokio::test]
async fn login_returns_200_for_valid_credentials() {
    let app = spawn_app();
    app.register_alice().await;

    let response = app
        .post("/auth/login", &json!({"email": "alice@example.com", "password": "secret1"}))
        .await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert!(body.get("access_token").is_some());
    assert!(body.get("refresh_token").is_some());
}

#[tokio::test]
async fn login_failures_are_indistinguishable() {
    let app = spawn_app();
    app.register_alice().await;

    let wrong_password = app
        .post("/auth/login", &json!({"email": "alice@example.com", "password": "wrong-one"}))
        .await;
    let unknown_email = app
        .post("/auth/login", &json!({"email": "bob@example.com", "password": "secret1"}))
        .await;

    assert_eq!(401, wrong_password.status().as_u16());
    assert_eq!(401, unknown_email.status().as_u16());

    let a: Value = wrong_password.json().await.unwrap();
    let b: Value = unknown_email.json().await.unwrap();
    assert_eq!(a["code"], b["code"]);
    assert_eq!(a["message"], b["message"]);
}

// --- Refresh ---

#[tokio::test]
async fn refresh_rotates_and_rejects_replay() {
    let app = spawn_app();
    let a = app.register_alice().await;

    let response = app.refresh(&token(&a, "refresh_token")).await;
    assert_eq!(200, response.status().as_u16());
    let b: Value = response.json().await.unwrap();
    assert_ne!(token(&a, "refresh_token"), token(&b, "refresh_token"));

    let replay = app.refresh(&token(&a, "refresh_token")).await;
    assert_eq!(401, replay.status().as_u16());

    let response = app.refresh(&token(&b, "refresh_token")).await;
    assert_eq!(200, response.status().as_u16());
}

#[tokio::test]
async fn refresh_rejects_garbage_and_access_tokens() {
    let app = spawn_app();
    let a = app.register_alice().await;

    assert_eq!(401, app.refresh("garbage").await.status().as_u16());
    assert_eq!(401, app.refresh(&token(&a, "access_token")).await.status().as_u16());

    // the legitimate refresh token is still usable afterwards
    assert_eq!(200, app.refresh(&token(&a, "refresh_token")).await.status().as_u16());
}

#[tokio::test]
async fn concurrent_refresh_has_single_winner() {
    let app = spawn_app();
    let a = app.register_alice().await;
    let refresh_token = token(&a, "refresh_token");

    let attempts = (0..8).map(|_| app.refresh(&refresh_token));
    let statuses: Vec<u16> = futures::future::join_all(attempts)
        .await
        .into_iter()
        .map(|r| r.status().as_u16())
        .collect();

    assert_eq!(statuses.iter().filter(|s| **s == 200).count(), 1, "{:?}", statuses);
    assert_eq!(statuses.iter().filter(|s| **s == 401).count(), 7, "{:?}", statuses);
}

// --- Logout ---

#[tokio::test]
async fn logout_is_idempotent_and_blocks_refresh() {
    let app = spawn_app();
    let a = app.register_alice().await;
    let refresh_token = token(&a, "refresh_token");

    for _ in 0..2 {
        let response = app.post("/auth/logout", &json!({ "refresh_token": refresh_token })).await;
        assert_eq!(200, response.status().as_u16());
    }

    let response = app.post("/auth/logout", &json!({ "refresh_token": "never-issued" })).await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], "Logged out successfully");

    assert_eq!(401, app.refresh(&refresh_token).await.status().as_u16());
}

#[tokio::test]
async fn logout_all_requires_access_token() {
    let app = spawn_app();
    let a = app.register_alice().await;

    let missing = app.post("/auth/logout-all", &json!({})).await;
    assert_eq!(401, missing.status().as_u16());

    let with_refresh_token = app
        .client
        .post(&format!("{}/auth/logout-all", app.address))
        .bearer_auth(token(&a, "refresh_token"))
        .send()
        .await
        .unwrap();
    assert_eq!(401, with_refresh_token.status().as_u16());
}

#[tokio::test]
async fn logout_all_revokes_every_session() {
    let app = spawn_app();
    let first = app.register_alice().await;
    let second: Value = app
        .post("/auth/login", &json!({"email": "alice@example.com", "password": "secret1"}))
        .await
        .json()
        .await
        .unwrap();

    let response = app
        .client
        .post(&format!("{}/auth/logout-all", app.address))
        .bearer_auth(token(&second, "access_token"))
        .send()
        .await
        .unwrap();
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["revoked"], 2);

    assert_eq!(401, app.refresh(&token(&first, "refresh_token")).await.status().as_u16());
    assert_eq!(401, app.refresh(&token(&second, "refresh_token")).await.status().as_u16());
}

// --- Profile ---

#[tokio::test]
async fn profile_returns_current_identity() {
    let app = spawn_app();
    let a = app.register_alice().await;

    let response = app
        .client
        .get(&format!("{}/auth/profile", app.address))
        .bearer_auth(token(&a, "access_token"))
        .send()
        .await
        .unwrap();

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["last_name"], "Liddell");
    assert_eq!(body["is_active"], true);
}

#[tokio::test]
async fn profile_rejects_missing_or_invalid_token() {
    let app = spawn_app();

    let missing = app
        .client
        .get(&format!("{}/auth/profile", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(401, missing.status().as_u16());

    let invalid = app
        .client
        .get(&format!("{}/auth/profile", app.address))
        .bearer_auth("invalid.token.here")
        .send()
        .await
        .unwrap();
    assert_eq!(401, invalid.status().as_u16());
}
