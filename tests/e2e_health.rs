//! E2E tests for health check and basic server functionality

mod common;

use common::TestServer;

#[tokio::test]
async fn test_health_check() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/health"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_cors_headers() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/health"))
        .header("Origin", "https://test.example.com")
        .send()
        .await
        .unwrap();

    // CORS should allow the configured instance origin.
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_404_for_unknown_routes() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/unknown/route"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_metrics_endpoint_is_public() {
    mutuals::metrics::init_metrics();
    let server = TestServer::new().await;

    let response = server
        .client
        .get(&server.url("/metrics"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("mutuals_"));
}

#[tokio::test]
async fn test_geo_gate_blocks_disallowed_country() {
    let server = TestServer::with_config(|config| {
        config.geo_block.enabled = true;
        config.geo_block.allowed_countries = vec!["JP".to_string()];
    })
    .await;

    let blocked = server
        .client
        .get(&server.url("/api/timeline"))
        .header("cf-ipcountry", "US")
        .send()
        .await
        .unwrap();
    assert_eq!(blocked.status(), 403);
    let body: serde_json::Value = blocked.json().await.unwrap();
    assert_eq!(body["error"], "Access denied");

    let allowed = server
        .client
        .get(&server.url("/api/timeline"))
        .header("x-vercel-ip-country", "JP")
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.status(), 200);

    let unknown = server
        .client
        .get(&server.url("/api/timeline"))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status(), 200);
}
