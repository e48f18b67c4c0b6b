//! Timeline, post detail and saved-post endpoints

use axum::{
    Json,
    extract::{Path, Query, State},
};

use super::{ListQuery, PostDetailResponse, PostResponse, TimelineQuery, TimelineResponse};
use super::{timeline_service, track};
use crate::AppState;
use crate::auth::{CurrentUser, MaybeUser};
use crate::error::AppError;
use crate::metrics::HTTP_REQUEST_DURATION_SECONDS;

/// GET /api/timeline
///
/// Query: `offset`, `limit` (clamped to the configured maximum) and
/// `scope` (`all`, `public` or `private`).
pub async fn timeline(
    State(state): State<AppState>,
    user: MaybeUser,
    Query(params): Query<TimelineQuery>,
) -> Result<Json<TimelineResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/timeline"])
        .start_timer();

    let viewer = user.viewer();
    let limit = state.config.timeline.clamp_limit(params.limit);
    let result = timeline_service(&state)
        .timeline_posts(
            viewer.as_ref(),
            params.offset.unwrap_or(0),
            limit,
            params.scope,
        )
        .await;

    track("GET", "/api/timeline", &result);
    Ok(Json(result?.into()))
}

/// GET /api/posts/:id
pub async fn post_detail(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<PostDetailResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/posts/:id"])
        .start_timer();

    let viewer = user.viewer();
    let result = timeline_service(&state)
        .post_detail(&id, viewer.as_ref())
        .await;

    track("GET", "/api/posts/:id", &result);
    Ok(Json(result?.into()))
}

/// GET /api/me/likes
pub async fn liked_posts(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<PostResponse>>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/me/likes"])
        .start_timer();

    let limit = state.config.timeline.clamp_limit(params.limit);
    let result = timeline_service(&state)
        .liked_posts(&user.viewer(), limit)
        .await;

    track("GET", "/api/me/likes", &result);
    Ok(Json(result?.into_iter().map(Into::into).collect()))
}

/// GET /api/me/bookmarks
pub async fn bookmarked_posts(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<PostResponse>>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/me/bookmarks"])
        .start_timer();

    let limit = state.config.timeline.clamp_limit(params.limit);
    let result = timeline_service(&state)
        .bookmarked_posts(&user.viewer(), limit)
        .await;

    track("GET", "/api/me/bookmarks", &result);
    Ok(Json(result?.into_iter().map(Into::into).collect()))
}
