//! Authentication extractors
//!
//! Sessions arrive as `Authorization: Bearer <token>` or a `session` cookie.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use axum_extra::extract::CookieJar;

use super::session::{Session, verify_session_token};
use crate::AppState;
use crate::error::AppError;
use crate::service::Viewer;

/// Cookie carrying the session token
pub const SESSION_COOKIE: &str = "session";

fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
        .or_else(|| {
            let jar = CookieJar::from_headers(headers);
            jar.get(SESSION_COOKIE)
                .map(|cookie| cookie.value().to_owned())
        })
}

fn session_from_parts(parts: &mut Parts, state: &AppState) -> Result<Session, AppError> {
    if let Some(session) = parts.extensions.get::<Session>().cloned() {
        return Ok(session);
    }

    let token = extract_token_from_headers(&parts.headers).ok_or(AppError::Unauthorized)?;
    let session = verify_session_token(&token, &state.config.auth.session_secret)?;
    parts.extensions.insert(session.clone());
    Ok(session)
}

/// Extractor for current authenticated user
///
/// Rejects with `Unauthorized` when no valid session is present.
///
/// # Usage
/// ```ignore
/// async fn handler(CurrentUser(session): CurrentUser) -> impl IntoResponse {
///     format!("Hello, {}", session.account_id)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Session);

impl CurrentUser {
    pub fn viewer(&self) -> Viewer {
        self.0.viewer()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        session_from_parts(parts, &state).map(CurrentUser)
    }
}

/// Optional current user extractor
///
/// Missing, forged and expired tokens all read as anonymous.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Session>);

impl MaybeUser {
    pub fn viewer(&self) -> Option<Viewer> {
        self.0.as_ref().map(Session::viewer)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let session = match session_from_parts(parts, &state) {
            Ok(session) => Some(session),
            Err(error) => {
                if extract_token_from_headers(&parts.headers).is_some() {
                    tracing::debug!(%error, "Ignoring invalid session on optional auth");
                }
                None
            }
        };

        Ok(MaybeUser(session))
    }
}
