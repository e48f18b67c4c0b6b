//! Mutuals - a small social posting server with mutual-follow private posts
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - JSON endpoints for timeline, posts, accounts             │
//! │  - Session extractors, geo gate                             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Visibility predicate and mutual-follow set               │
//! │  - Timeline assembly, post and account commands             │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SocialStore trait, SQLite (sqlx)                         │
//! │  - R2 avatar storage                                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers and DTOs
//! - `service`: Business logic layer
//! - `data`: Models, store trait and SQLite implementation
//! - `storage`: Cloudflare R2 avatar storage
//! - `auth`: Sessions, passwords, extractors, geo gate
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;
pub mod storage;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// Cloned for each request; holds only shared handles.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Backing store for accounts, follows, posts and edges
    pub store: Arc<dyn data::SocialStore>,

    /// Avatar storage (Cloudflare R2)
    pub avatars: Arc<storage::AvatarStorage>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to SQLite database and run migrations
    /// 2. Build the R2 avatar client
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let db =
            data::Database::connect(&config.database.path, config.database.max_connections).await?;
        tracing::info!(path = %config.database.path.display(), "Database connected");

        let avatars = storage::AvatarStorage::new(&config.storage.avatar, &config.cloudflare);
        tracing::info!(bucket = %config.storage.avatar.bucket, "Avatar storage initialized");

        Ok(Self::from_parts(config, Arc::new(db), Arc::new(avatars)))
    }

    /// Assemble state from already-built parts
    pub fn from_parts(
        config: config::AppConfig,
        store: Arc<dyn data::SocialStore>,
        avatars: Arc<storage::AvatarStorage>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            avatars,
        }
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, extract::DefaultBodyLimit, middleware};
    use tower_http::{
        compression::CompressionLayer, limit::RequestBodyLimitLayer, trace::TraceLayer,
    };

    let cors_layer = build_cors_layer(&state.config.server);
    // Room for multipart framing around the largest accepted avatar
    let body_limit = state.config.storage.avatar.max_bytes + 64 * 1024;

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .nest("/api", api::api_router())
        .layer(middleware::from_fn_with_state(state.clone(), auth::geo_gate))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
        .merge(api::metrics_router())
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::HeaderValue;
    use tower_http::cors::{Any, CorsLayer};

    if !server.protocol.eq_ignore_ascii_case("https") {
        return CorsLayer::permissive();
    }

    let allowed_origin = server.base_url();
    match HeaderValue::from_str(&allowed_origin) {
        Ok(origin) => CorsLayer::new()
            .allow_origin([origin])
            .allow_methods(Any)
            .allow_headers(Any),
        Err(error) => {
            tracing::error!(
                %error,
                origin = %allowed_origin,
                "Failed to parse CORS origin from server base URL; denying cross-origin requests"
            );
            CorsLayer::new().allow_methods(Any).allow_headers(Any)
        }
    }
}

async fn health_check() -> &'static str {
    "OK"
}
