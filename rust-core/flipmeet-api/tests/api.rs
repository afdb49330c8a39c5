//! End-to-end tests: server handle -> dispatcher -> middleware -> controller
//! -> model -> in-memory SQLite.

use flipmeet_api::auth::password::MIN_COST;
use flipmeet_api::{App, AppConfig, AuthConfig};
use flipmeet_core::{ServerConfig, Value as Column};
use hyper::header::HeaderValue;
use hyper::HeaderMap;
use serde_json::{json, Value};

const SCHEMA: &str = include_str!("fixtures/schema.sql");

async fn app() -> App {
    let config = AppConfig {
        server: ServerConfig {
            base_path: "/FlipMeet/".to_string(),
            ..ServerConfig::default()
        },
        auth: AuthConfig {
            password_cost: MIN_COST,
            ..AuthConfig::new("test-secret")
        },
        ..AppConfig::default()
    };
    let app = App::build(&config).unwrap();
    app.database.run_script(SCHEMA).await.unwrap();
    app
}

async fn send(app: &App, method: &str, path: &str, token: Option<&str>, body: Option<&[u8]>) -> (u16, Value) {
    let mut headers = HeaderMap::new();
    if let Some(token) = token {
        headers.insert("x-token", HeaderValue::from_str(token).unwrap());
    }
    let uri = format!("/FlipMeet/{path}");
    let resp = app.server.handle(method, &uri, headers, body).await;
    assert!(resp.header("x-request-id").is_some());

    let json = if resp.body.is_empty() {
        Value::Null
    } else {
        serde_json::from_str(&resp.body).unwrap()
    };
    (resp.status, json)
}

async fn send_json(app: &App, method: &str, path: &str, token: Option<&str>, body: Value) -> (u16, Value) {
    let bytes = body.to_string().into_bytes();
    send(app, method, path, token, Some(bytes.as_slice())).await
}

fn ana() -> Value {
    json!({
        "name": "Ana",
        "lastname": "García",
        "email": "ana@example.com",
        "password": "secret1",
        "location": "Madrid",
        "birthday": "1990-05-17T00:00:00.000Z",
        "fkinterest": 1
    })
}

/// Register Ana and return a session token
async fn sign_in(app: &App) -> String {
    let (status, _) = send_json(app, "POST", "api/users", None, ana()).await;
    assert_eq!(status, 201);

    let (status, body) = send_json(
        app,
        "POST",
        "api/login",
        None,
        json!({ "email": "ana@example.com", "password": "secret1" }),
    )
    .await;
    assert_eq!(status, 200);
    body["data"]["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_register_login_and_profile() {
    let app = app().await;

    let (status, body) = send_json(&app, "POST", "api/users", None, ana()).await;
    assert_eq!(status, 201);
    assert_eq!(body["statusText"], "Created");
    assert_eq!(body["data"]["id"], 1);

    let (status, body) = send_json(
        &app,
        "POST",
        "api/login",
        None,
        json!({ "email": "ana@example.com", "password": "secret1" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["email"], "ana@example.com");
    assert_eq!(body["data"]["name"], "Ana");
    let token = body["data"]["token"].as_str().unwrap().to_string();

    let (status, body) = send(&app, "GET", "api/users/1", Some(&token), None).await;
    assert_eq!(status, 200);
    assert_eq!(
        body["data"],
        json!({
            "id": 1,
            "name": "Ana",
            "lastname": "García",
            "location": "Madrid",
            "birthday": "1990-05-17",
            "fkinterest": 1,
            "interest": "Friendship"
        })
    );

    let rows = app
        .database
        .fetch_all("SELECT password FROM users WHERE id = ?", &[Column::Int(1)])
        .await
        .unwrap();
    let stored = rows[0]["password"].as_text().into_owned();
    assert!(stored.starts_with("$2b$04$"), "{stored}");
}

#[tokio::test]
async fn test_guarded_route_without_token() {
    let app = app().await;
    sign_in(&app).await;

    let (status, body) = send(&app, "GET", "api/users/1", None, None).await;
    assert_eq!(status, 401);
    assert_eq!(body["statusText"], "Unauthorized");
    assert!(body.get("data").is_none());

    let (status, _) = send(&app, "GET", "api/users/1", Some("forged.token.value"), None).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_registration_validation() {
    let app = app().await;
    let (status, body) = send_json(
        &app,
        "POST",
        "api/users",
        None,
        json!({ "email": "not-an-email", "password": "abc", "location": "Madrid", "birthday": "1990-01-01" }),
    )
    .await;

    assert_eq!(status, 422);
    let errors = body["validationErrors"].as_object().unwrap();
    assert!(errors.contains_key("email"));
    assert!(errors.contains_key("password"));
    assert!(!errors.contains_key("name"));
}

#[tokio::test]
async fn test_duplicate_email_conflicts() {
    let app = app().await;
    sign_in(&app).await;

    let (status, body) = send_json(&app, "POST", "api/users", None, ana()).await;
    assert_eq!(status, 409);
    assert_eq!(body["message"], "A user with that email already exists.");
}

#[tokio::test]
async fn test_login_failures() {
    let app = app().await;
    sign_in(&app).await;

    let (status, _) = send_json(
        &app,
        "POST",
        "api/login",
        None,
        json!({ "email": "ana@example.com", "password": "wrong-pass" }),
    )
    .await;
    assert_eq!(status, 401);

    let (status, body) = send_json(&app, "POST", "api/login", None, json!({ "email": "" })).await;
    assert_eq!(status, 422);
    assert!(body["validationErrors"]["password"].is_array());
}

#[tokio::test]
async fn test_edit_profile() {
    let app = app().await;
    let token = sign_in(&app).await;

    let (status, body) = send_json(
        &app,
        "PUT",
        "api/users/1",
        Some(&token),
        json!({ "name": "Ana María", "email": "eve@example.com" }),
    )
    .await;
    assert_eq!(status, 200);
    assert_eq!(body["message"], "User updated successfully.");

    let (_, body) = send(&app, "GET", "api/users/1", Some(&token), None).await;
    assert_eq!(body["data"]["name"], "Ana María");

    // email is not editable, so the old credentials still work
    let (status, _) = send_json(
        &app,
        "POST",
        "api/login",
        None,
        json!({ "email": "ana@example.com", "password": "secret1" }),
    )
    .await;
    assert_eq!(status, 200);
}

#[tokio::test]
async fn test_edit_rejects_invalid_and_foreign_profiles() {
    let app = app().await;
    let token = sign_in(&app).await;

    let (status, _) = send_json(&app, "PUT", "api/users/1", Some(&token), json!({ "name": "" })).await;
    assert_eq!(status, 422);

    let (status, _) = send_json(&app, "PUT", "api/users/99", Some(&token), json!({ "name": "Eve" })).await;
    assert_eq!(status, 404);

    let mut bruno = ana();
    bruno["email"] = json!("bruno@example.com");
    let (status, _) = send_json(&app, "POST", "api/users", None, bruno).await;
    assert_eq!(status, 201);

    let (status, _) = send_json(&app, "PUT", "api/users/2", Some(&token), json!({ "name": "Eve" })).await;
    assert_eq!(status, 401);
}

#[tokio::test]
async fn test_posts_and_comments() {
    let app = app().await;
    let token = sign_in(&app).await;

    let (status, _) = send_json(&app, "POST", "api/posts", None, json!({ "text": "Hello" })).await;
    assert_eq!(status, 401);

    let (status, body) = send_json(&app, "POST", "api/posts", Some(&token), json!({ "text": "hello world" })).await;
    assert_eq!(status, 201);
    assert_eq!(body["data"]["text"], "hello world");
    assert_eq!(body["data"]["fkuser"], 1);
    let post_id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send(&app, "GET", "api/posts", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, "GET", &format!("api/posts/{post_id}"), None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["text"], "hello world");

    let (status, _) = send(&app, "GET", "api/posts/abc", None, None).await;
    assert_eq!(status, 404);

    let (status, _) = send_json(
        &app,
        "POST",
        "api/comments",
        Some(&token),
        json!({ "text": "Nice", "fkpost": 42 }),
    )
    .await;
    assert_eq!(status, 404);

    let (status, body) = send_json(
        &app,
        "POST",
        "api/comments",
        Some(&token),
        json!({ "text": "Nice", "fkpost": post_id }),
    )
    .await;
    assert_eq!(status, 201);
    assert_eq!(body["data"]["fkpost"], post_id);
    assert_eq!(body["data"]["user"], "Ana");
    assert_eq!(body["data"]["post"], "Hello world");

    let (status, body) = send(&app, "GET", &format!("api/posts/{post_id}/comments"), None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"][0]["text"], "Nice");
    assert_eq!(body["data"][0]["user"], "Ana");
    assert_eq!(body["data"][0]["post"], "Hello world");

    let (status, body) = send(&app, "GET", "api/posts/99/comments", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn test_catalogues() {
    let app = app().await;

    let (status, body) = send(&app, "GET", "api/interests", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"][1]["interest"], "skating");

    let (status, body) = send(&app, "GET", "api/categories", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"][0], json!({ "id": 1, "category": "news" }));
}

#[tokio::test]
async fn test_unmatched_route_is_silent() {
    let app = app().await;
    let (status, body) = send(&app, "GET", "api/nowhere", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body, Value::Null);

    let (status, body) = send(&app, "DELETE", "api/posts/1", None, None).await;
    assert_eq!(status, 200);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_malformed_and_unsupported_requests() {
    let app = app().await;

    let (status, body) = send(&app, "POST", "api/users", None, Some(b"[1, 2]")).await;
    assert_eq!(status, 400);
    assert_eq!(body["statusCode"], 400);

    let (status, _) = send(&app, "TRACE", "api/users", None, None).await;
    assert_eq!(status, 405);
}
