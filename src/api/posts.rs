//! Post creation, counters and toggle endpoints
//!
//! Mutations answer `{ "success": true, ... }`; failures go through
//! `AppError` as `{ "success": false, "error": ... }`.

use axum::{
    Json,
    extract::{Path, State},
};
use serde_json::{Value, json};

use super::{CommentRequest, CreatePostRequest, CreatedPostResponse};
use super::{post_service, track};
use crate::AppState;
use crate::auth::MaybeUser;
use crate::data::{PostActions, PostStats};
use crate::error::AppError;
use crate::metrics::{HTTP_REQUEST_DURATION_SECONDS, record_action};
use crate::service;

/// POST /api/posts
pub async fn create_post(
    State(state): State<AppState>,
    user: MaybeUser,
    Json(body): Json<CreatePostRequest>,
) -> Result<Json<CreatedPostResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/posts"])
        .start_timer();

    let result = post_service(&state)
        .create_post(user.viewer().as_ref(), &body.comment, body.is_private)
        .await;

    record_action("create_post", &result);
    track("POST", "/api/posts", &result);
    Ok(Json(CreatedPostResponse {
        success: true,
        post: result?,
    }))
}

/// POST /api/posts/:id/replies
pub async fn create_reply(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
    Json(body): Json<CommentRequest>,
) -> Result<Json<CreatedPostResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/posts/:id/replies"])
        .start_timer();

    let result = post_service(&state)
        .create_reply(user.viewer().as_ref(), &id, &body.comment)
        .await;

    record_action("reply", &result);
    track("POST", "/api/posts/:id/replies", &result);
    Ok(Json(CreatedPostResponse {
        success: true,
        post: result?,
    }))
}

/// POST /api/posts/:id/quotes
pub async fn create_quote(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
    Json(body): Json<CommentRequest>,
) -> Result<Json<CreatedPostResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/posts/:id/quotes"])
        .start_timer();

    let result = post_service(&state)
        .create_quote_post(user.viewer().as_ref(), &id, &body.comment)
        .await;

    record_action("quote", &result);
    track("POST", "/api/posts/:id/quotes", &result);
    Ok(Json(CreatedPostResponse {
        success: true,
        post: result?,
    }))
}

/// POST /api/posts/:id/repost
pub async fn toggle_repost(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let result = post_service(&state)
        .toggle_repost(user.viewer().as_ref(), &id)
        .await;

    record_action("repost", &result);
    track("POST", "/api/posts/:id/repost", &result);
    Ok(Json(json!({ "success": true, "is_reposted": result? })))
}

/// POST /api/posts/:id/like
pub async fn toggle_like(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let result = post_service(&state)
        .toggle_like(user.viewer().as_ref(), &id)
        .await;

    record_action("like", &result);
    track("POST", "/api/posts/:id/like", &result);
    Ok(Json(json!({ "success": true, "is_liked": result? })))
}

/// POST /api/posts/:id/bookmark
pub async fn toggle_bookmark(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let result = post_service(&state)
        .toggle_bookmark(user.viewer().as_ref(), &id)
        .await;

    record_action("bookmark", &result);
    track("POST", "/api/posts/:id/bookmark", &result);
    Ok(Json(json!({ "success": true, "is_bookmarked": result? })))
}

/// GET /api/posts/:id/stats
///
/// Counters degrade to 0 on lookup failure. A post the viewer may not see
/// is reported as missing.
pub async fn post_stats(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<PostStats>, AppError> {
    ensure_visible(&state, &user, &id).await?;
    Ok(Json(service::post_stats(state.store.as_ref(), &id).await))
}

/// GET /api/posts/:id/actions
pub async fn post_actions(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<PostActions>, AppError> {
    ensure_visible(&state, &user, &id).await?;
    let viewer = user.viewer();
    Ok(Json(
        service::post_actions(state.store.as_ref(), &id, viewer.as_ref()).await,
    ))
}

async fn ensure_visible(state: &AppState, user: &MaybeUser, post_id: &str) -> Result<(), AppError> {
    let store = state.store.as_ref();
    let record = store.get_post(post_id).await?.ok_or(AppError::NotFound)?;
    if !record.post.is_private {
        return Ok(());
    }

    let viewer = user.viewer();
    let mutuals = service::mutual_follow_ids(store, viewer.as_ref()).await?;
    if service::can_view(Some(&record.post), viewer.as_ref(), &mutuals) {
        Ok(())
    } else {
        Err(AppError::NotFound)
    }
}
