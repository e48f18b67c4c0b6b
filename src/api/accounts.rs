//! Account, profile and follow endpoints

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
};
use serde_json::{Value, json};

use super::{AccountResponse, ProfileResponse, SearchQuery, UpdateProfileRequest};
use super::{account_service, track};
use crate::AppState;
use crate::auth::{CurrentUser, MaybeUser};
use crate::error::AppError;
use crate::metrics::{HTTP_REQUEST_DURATION_SECONDS, record_action};
use crate::service;

/// GET /api/me
pub async fn me(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let viewer = user.viewer();
    let profile = account_service(&state)
        .get_profile(&viewer.id, Some(&viewer))
        .await?;
    Ok(Json(profile.into()))
}

/// GET /api/accounts/:id
pub async fn get_profile(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<ProfileResponse>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/accounts/:id"])
        .start_timer();

    let viewer = user.viewer();
    let result = account_service(&state)
        .get_profile(&id, viewer.as_ref())
        .await;

    track("GET", "/api/accounts/:id", &result);
    Ok(Json(result?.into()))
}

/// GET /api/accounts/search?q=
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<AccountResponse>>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["GET", "/api/accounts/search"])
        .start_timer();

    let result = account_service(&state).search_users(&params.q).await;

    track("GET", "/api/accounts/search", &result);
    Ok(Json(result?.into_iter().map(Into::into).collect()))
}

/// POST /api/accounts/:id/follow
pub async fn toggle_follow(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let result = account_service(&state)
        .toggle_follow(user.viewer().as_ref(), &id)
        .await;

    record_action("follow", &result);
    track("POST", "/api/accounts/:id/follow", &result);
    Ok(Json(json!({ "success": true, "is_following": result? })))
}

/// GET /api/accounts/:id/follow
pub async fn follow_status(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let viewer = user.viewer();
    let service = account_service(&state);
    let (is_following, counts) = tokio::try_join!(
        service.follow_status(viewer.as_ref(), &id),
        service.follow_counts(&id)
    )?;

    Ok(Json(json!({
        "is_following": is_following,
        "follower_count": counts.follower_count,
        "following_count": counts.following_count,
    })))
}

/// GET /api/me/mutuals
pub async fn mutuals(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Value>, AppError> {
    let viewer = user.viewer();
    let mutuals = service::mutual_follow_ids(state.store.as_ref(), Some(&viewer)).await?;
    Ok(Json(json!({ "account_ids": mutuals.sorted_ids() })))
}

/// PATCH /api/me/profile
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<Value>, AppError> {
    let viewer = user.viewer();
    let result = account_service(&state)
        .update_profile(Some(&viewer), &body.nickname, &body.intro)
        .await;

    record_action("update_profile", &result);
    track("PATCH", "/api/me/profile", &result);
    Ok(Json(json!({
        "success": true,
        "account": AccountResponse::from(result?),
    })))
}

/// POST /api/me/avatar
///
/// Multipart form with a single `file` field.
pub async fn upload_avatar(
    State(state): State<AppState>,
    user: CurrentUser,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/me/avatar"])
        .start_timer();

    let max_size = state.config.storage.avatar.max_bytes;
    let mut upload: Option<(Vec<u8>, String)> = None;

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Failed to parse multipart: {}", e)))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::Validation("Missing content type for uploaded file".to_string())
            })?;

        let mut bytes = Vec::new();
        while let Some(chunk) = field
            .chunk()
            .await
            .map_err(|e| AppError::Validation(format!("Failed to read file: {}", e)))?
        {
            if bytes.len() + chunk.len() > max_size {
                return Err(AppError::Validation(format!(
                    "Avatar must be at most {} bytes",
                    max_size
                )));
            }
            bytes.extend_from_slice(&chunk);
        }

        upload = Some((bytes, content_type));
    }

    let (bytes, content_type) =
        upload.ok_or_else(|| AppError::Validation("No file provided".to_string()))?;

    let viewer = user.viewer();
    let result = account_service(&state)
        .upload_avatar(Some(&viewer), bytes, &content_type)
        .await;

    record_action("upload_avatar", &result);
    track("POST", "/api/me/avatar", &result);
    Ok(Json(json!({
        "success": true,
        "account": AccountResponse::from(result?),
    })))
}
