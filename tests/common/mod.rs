//! Common test utilities for E2E tests

#![allow(dead_code)]

use mutuals::{AppState, config};
use reqwest::{RequestBuilder, Response};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub state: AppState,
    pub _temp_dir: TempDir,
    pub client: reqwest::Client,
}

/// A signed-up account and its bearer token
#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: String,
    pub token: String,
}

pub fn test_config(temp_dir: &TempDir) -> config::AppConfig {
    config::AppConfig {
        server: config::ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0, // Let OS assign port
            domain: "test.example.com".to_string(),
            protocol: "https".to_string(),
        },
        database: config::DatabaseConfig {
            path: temp_dir.path().join("test.db"),
            max_connections: 4,
        },
        storage: config::StorageConfig {
            avatar: config::AvatarStorageConfig {
                bucket: "test-avatars".to_string(),
                public_url: "https://media.test.example.com".to_string(),
                max_bytes: 1024 * 1024,
            },
        },
        cloudflare: config::CloudflareConfig {
            account_id: "test-account".to_string(),
            r2_access_key_id: "test-key".to_string(),
            r2_secret_access_key: "test-secret".to_string(),
        },
        auth: config::AuthConfig {
            session_secret: "test-secret-key-32-bytes-long!!!".to_string(),
            session_max_age: 604800,
        },
        timeline: config::TimelineConfig {
            default_limit: 30,
            max_limit: 100,
        },
        geo_block: config::GeoBlockConfig::default(),
        logging: config::LoggingConfig {
            level: "info".to_string(),
            format: "pretty".to_string(),
        },
    }
}

impl TestServer {
    /// Create a new test server instance
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Create a test server after adjusting the default test configuration
    pub async fn with_config(adjust: impl FnOnce(&mut config::AppConfig)) -> Self {
        let temp_dir = TempDir::new().unwrap();
        let mut config = test_config(&temp_dir);
        adjust(&mut config);

        let state = AppState::new(config).await.unwrap();

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        // Bind to random port
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let app = mutuals::build_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: format!("http://{}", addr),
            state,
            _temp_dir: temp_dir,
            client,
        }
    }

    /// Get base URL for API requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    fn authorized(builder: RequestBuilder, user: Option<&TestUser>) -> RequestBuilder {
        match user {
            Some(user) => builder.bearer_auth(&user.token),
            None => builder,
        }
    }

    pub async fn get(&self, path: &str, user: Option<&TestUser>) -> Response {
        Self::authorized(self.client.get(self.url(path)), user)
            .send()
            .await
            .unwrap()
    }

    pub async fn post(&self, path: &str, user: Option<&TestUser>, body: Value) -> Response {
        Self::authorized(self.client.post(self.url(path)), user)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    pub async fn get_json(&self, path: &str, user: Option<&TestUser>) -> Value {
        let response = self.get(path, user).await;
        assert_eq!(response.status(), 200, "GET {path}");
        response.json().await.unwrap()
    }

    /// Sign up a fresh account and set its nickname
    pub async fn signup(&self, nickname: &str) -> TestUser {
        let email = format!("{}-{}@example.com", nickname, ulid::Ulid::new()).to_lowercase();
        let response = self
            .post(
                "/api/auth/signup",
                None,
                json!({ "email": email, "password": "password123" }),
            )
            .await;
        assert_eq!(response.status(), 200, "signup {nickname}");
        let body: Value = response.json().await.unwrap();

        let user = TestUser {
            id: body["account"]["id"].as_str().unwrap().to_string(),
            token: body["token"].as_str().unwrap().to_string(),
        };

        let response = Self::authorized(self.client.patch(self.url("/api/me/profile")), Some(&user))
            .json(&json!({ "nickname": nickname }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "set nickname {nickname}");
        user
    }

    /// Create a post and return its id
    pub async fn create_post(&self, user: &TestUser, comment: &str, is_private: bool) -> String {
        let response = self
            .post(
                "/api/posts",
                Some(user),
                json!({ "comment": comment, "is_private": is_private }),
            )
            .await;
        assert_eq!(response.status(), 200, "create post");
        let body: Value = response.json().await.unwrap();
        body["post"]["id"].as_str().unwrap().to_string()
    }

    /// Toggle a follow edge and return the resulting state
    pub async fn toggle_follow(&self, follower: &TestUser, target: &TestUser) -> bool {
        let path = format!("/api/accounts/{}/follow", target.id);
        let response = self.post(&path, Some(follower), json!({})).await;
        assert_eq!(response.status(), 200, "toggle follow");
        let body: Value = response.json().await.unwrap();
        body["is_following"].as_bool().unwrap()
    }

    /// Make two accounts follow each other
    pub async fn make_mutual(&self, a: &TestUser, b: &TestUser) {
        assert!(self.toggle_follow(a, b).await);
        assert!(self.toggle_follow(b, a).await);
    }
}

/// Ids of the posts in a timeline-shaped response
pub fn post_ids(posts: &Value) -> Vec<String> {
    posts
        .as_array()
        .unwrap()
        .iter()
        .map(|post| post["id"].as_str().unwrap().to_string())
        .collect()
}
