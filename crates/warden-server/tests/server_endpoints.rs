use std::sync::Arc;

use serde_json::{Value, json};
use tokio::task::JoinHandle;
use warden_auth::{AuthService, InMemoryUserStorage};
use warden_notifications::LogNotifier;
use warden_server::{AppConfig, build_app, build_auth_service, drain_notifications};

fn test_config() -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.auth.token.secret = "integration-test-secret".into();
    // Cheapest Argon2id parameters keep the tests fast
    cfg.auth.password.hash_memory_kib = 8;
    cfg.auth.password.hash_iterations = 1;
    cfg.auth.password.hash_parallelism = 1;
    cfg.server.body_limit_bytes = 1024;
    cfg
}

async fn start_server(
    cfg: &AppConfig,
) -> (
    String,
    Arc<AuthService>,
    tokio::sync::oneshot::Sender<()>,
    JoinHandle<()>,
) {
    let service = build_auth_service(
        cfg,
        Arc::new(InMemoryUserStorage::new()),
        Arc::new(LogNotifier),
    )
    .expect("build service");
    let app = build_app(cfg, service.clone());

    // Bind to an ephemeral port
    let listener = tokio::net::TcpListener::bind((std::net::Ipv4Addr::LOCALHOST, 0))
        .await
        .expect("bind");
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.await;
            })
            .await;
    });

    (format!("http://{addr}"), service, tx, server)
}

#[tokio::test]
async fn server_endpoints_work() {
    let cfg = test_config();
    let (base, service, shutdown_tx, handle) = start_server(&cfg).await;
    let client = reqwest::Client::new();

    // GET /healthz
    let resp = client.get(format!("{base}/healthz")).send().await.unwrap();
    assert!(resp.status().is_success());
    assert!(resp.headers().contains_key("x-request-id"));
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    // Request id is echoed back when supplied
    let resp = client
        .get(format!("{base}/healthz"))
        .header("x-request-id", "req-123")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.headers()["x-request-id"], "req-123");

    // POST /auth/register
    let resp = client
        .post(format!("{base}/auth/register"))
        .json(&json!({"email": " Ada@Example.com ", "password": "p1-pass", "name": "Ada"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "User registered successfully");
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert!(body["user"].get("password_hash").is_none());
    assert!(body["token"].as_str().is_some_and(|t| !t.is_empty()));

    // Duplicate registration conflicts
    let resp = client
        .post(format!("{base}/auth/register"))
        .json(&json!({"email": "ada@example.com", "password": "other-pass"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 409);

    // POST /auth/login with a wrong password
    let resp = client
        .post(format!("{base}/auth/login"))
        .json(&json!({"email": "ada@example.com", "password": "nope-nope"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert!(resp.headers().contains_key("www-authenticate"));
    let wrong_password: Value = resp.json().await.unwrap();

    // Unknown email gets the identical response body
    let resp = client
        .post(format!("{base}/auth/login"))
        .json(&json!({"email": "ghost@example.com", "password": "nope-nope"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let unknown_email: Value = resp.json().await.unwrap();
    assert_eq!(wrong_password, unknown_email);

    // POST /auth/login
    let resp = client
        .post(format!("{base}/auth/login"))
        .json(&json!({"email": "ADA@example.com", "password": "p1-pass"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Login successful");
    let token = body["token"].as_str().unwrap().to_string();

    // GET /api/profile
    let resp = client
        .get(format!("{base}/api/profile"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["email"], "ada@example.com");
    assert_eq!(body["user"]["name"], "Ada");

    // Profile without a token
    let resp = client
        .get(format!("{base}/api/profile"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Profile with a tampered token
    let resp = client
        .get(format!("{base}/api/profile"))
        .bearer_auth(format!("{token}x"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "invalid_token");

    // Malformed body is a client error
    let resp = client
        .post(format!("{base}/auth/login"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Oversized body is rejected before reaching the handler
    let resp = client
        .post(format!("{base}/auth/register"))
        .json(&json!({
            "email": "big@example.com",
            "password": "p1-pass",
            "name": "x".repeat(4096),
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 413);

    // Unknown route
    let resp = client.get(format!("{base}/nope")).send().await.unwrap();
    assert_eq!(resp.status(), 404);

    let _ = shutdown_tx.send(());
    let _ = handle.await;

    // Welcome notifications were queued and drain cleanly
    drain_notifications(&service, &cfg).await;
    let stats = service.dispatcher().stats();
    assert_eq!(stats.submitted, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.in_flight, 0);
}
