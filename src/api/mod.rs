//! API layer
//!
//! JSON HTTP handlers for:
//! - Signup and login
//! - Timeline, post detail and post actions
//! - Accounts, profiles and follows
//! - Metrics (Prometheus)

mod accounts;
mod auth;
mod dto;
pub mod metrics;
mod posts;
mod timeline;

pub use dto::*;
pub use metrics::metrics_router;

use axum::{
    Router,
    routing::{get, post},
};

use crate::AppState;
use crate::error::AppError;
use crate::metrics::HTTP_REQUESTS_TOTAL;
use crate::service::{AccountService, PostService, TimelineService};

/// Create the `/api` router
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Auth
        .route("/auth/signup", post(auth::signup))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        // Timeline and posts
        .route("/timeline", get(timeline::timeline))
        .route("/posts", post(posts::create_post))
        .route("/posts/:id", get(timeline::post_detail))
        .route("/posts/:id/stats", get(posts::post_stats))
        .route("/posts/:id/actions", get(posts::post_actions))
        .route("/posts/:id/replies", post(posts::create_reply))
        .route("/posts/:id/quotes", post(posts::create_quote))
        .route("/posts/:id/repost", post(posts::toggle_repost))
        .route("/posts/:id/like", post(posts::toggle_like))
        .route("/posts/:id/bookmark", post(posts::toggle_bookmark))
        // Signed-in account
        .route("/me", get(accounts::me))
        .route("/me/likes", get(timeline::liked_posts))
        .route("/me/bookmarks", get(timeline::bookmarked_posts))
        .route("/me/mutuals", get(accounts::mutuals))
        .route("/me/profile", axum::routing::patch(accounts::update_profile))
        .route("/me/avatar", post(accounts::upload_avatar))
        // Accounts
        .route("/accounts/search", get(accounts::search))
        .route("/accounts/:id", get(accounts::get_profile))
        .route(
            "/accounts/:id/follow",
            get(accounts::follow_status).post(accounts::toggle_follow),
        )
}

fn timeline_service(state: &AppState) -> TimelineService {
    TimelineService::new(state.store.clone())
}

fn post_service(state: &AppState) -> PostService {
    PostService::new(state.store.clone())
}

fn account_service(state: &AppState) -> AccountService {
    AccountService::new(
        state.store.clone(),
        state.avatars.clone(),
        state.config.auth.clone(),
    )
}

/// Count a handled request by its outcome status
fn track<T>(method: &str, endpoint: &str, result: &Result<T, AppError>) {
    let status = match result {
        Ok(_) => axum::http::StatusCode::OK,
        Err(error) => error.status_code(),
    };
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, endpoint, status.as_str()])
        .inc();
}
