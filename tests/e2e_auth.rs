//! E2E tests for signup, login and session handling

mod common;

use common::TestServer;
use serde_json::{Value, json};

#[tokio::test]
async fn test_signup_creates_default_profile_and_session() {
    let server = TestServer::new().await;

    let response = server
        .post(
            "/api/auth/signup",
            None,
            json!({ "email": "Hanako@Example.com", "password": "password123" }),
        )
        .await;
    assert_eq!(response.status(), 200);

    let set_cookie = response
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("set-cookie header")
        .to_string();
    assert!(set_cookie.starts_with("session="));
    assert!(set_cookie.contains("HttpOnly"));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["account"]["nickname"], "Anonymous");

    let token = body["token"].as_str().unwrap();
    let me = server
        .client
        .get(server.url("/api/me"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(me.status(), 200);
    let me: Value = me.json().await.unwrap();
    assert_eq!(me["id"], body["account"]["id"]);
    assert_eq!(me["is_own_profile"], true);
}

#[tokio::test]
async fn test_login_round_trip() {
    let server = TestServer::new().await;
    let credentials = json!({ "email": "taro@example.com", "password": "password123" });

    let signup = server.post("/api/auth/signup", None, credentials.clone()).await;
    assert_eq!(signup.status(), 200);
    let signup: Value = signup.json().await.unwrap();

    let login = server.post("/api/auth/login", None, credentials).await;
    assert_eq!(login.status(), 200);
    let login: Value = login.json().await.unwrap();
    assert_eq!(login["account"]["id"], signup["account"]["id"]);

    let wrong = server
        .post(
            "/api/auth/login",
            None,
            json!({ "email": "taro@example.com", "password": "not-the-password" }),
        )
        .await;
    assert_eq!(wrong.status(), 401);
    let wrong: Value = wrong.json().await.unwrap();
    assert_eq!(wrong["success"], false);
}

#[tokio::test]
async fn test_signup_validation_and_duplicates() {
    let server = TestServer::new().await;

    let bad_email = server
        .post(
            "/api/auth/signup",
            None,
            json!({ "email": "not-an-email", "password": "password123" }),
        )
        .await;
    assert_eq!(bad_email.status(), 400);

    let short_password = server
        .post(
            "/api/auth/signup",
            None,
            json!({ "email": "a@example.com", "password": "short" }),
        )
        .await;
    assert_eq!(short_password.status(), 400);

    let first = server
        .post(
            "/api/auth/signup",
            None,
            json!({ "email": "a@example.com", "password": "password123" }),
        )
        .await;
    assert_eq!(first.status(), 200);

    let duplicate = server
        .post(
            "/api/auth/signup",
            None,
            json!({ "email": "A@example.com", "password": "password123" }),
        )
        .await;
    assert_eq!(duplicate.status(), 409);
}

#[tokio::test]
async fn test_session_cookie_authenticates() {
    let server = TestServer::new().await;
    let user = server.signup("cookie").await;

    let response = server
        .client
        .get(server.url("/api/me"))
        .header("Cookie", format!("session={}", user.token))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_invalid_token_is_anonymous_on_reads_and_rejected_on_writes() {
    let server = TestServer::new().await;

    let read = server
        .client
        .get(server.url("/api/timeline"))
        .bearer_auth("forged.token")
        .send()
        .await
        .unwrap();
    assert_eq!(read.status(), 200);

    let write = server
        .client
        .post(server.url("/api/posts"))
        .bearer_auth("forged.token")
        .json(&json!({ "comment": "hello" }))
        .send()
        .await
        .unwrap();
    assert_eq!(write.status(), 401);
    let body: Value = write.json().await.unwrap();
    assert_eq!(body, json!({ "success": false, "error": "Login required" }));

    let me = server.get("/api/me", None).await;
    assert_eq!(me.status(), 401);
}
