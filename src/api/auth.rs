//! Signup, login and logout endpoints
//!
//! The session token is returned in the body and set as an HTTP-only
//! `session` cookie.

use axum::{Json, extract::State};
use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use serde_json::{Value, json};

use super::{AuthResponse, CredentialsRequest};
use super::{account_service, track};
use crate::AppState;
use crate::auth::SESSION_COOKIE;
use crate::error::AppError;
use crate::metrics::{HTTP_REQUEST_DURATION_SECONDS, record_action};
use crate::service::SignedIn;

fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(state.config.should_use_secure_cookies())
        .same_site(SameSite::Lax)
        .build()
}

fn signed_in_response(
    state: &AppState,
    jar: CookieJar,
    signed_in: SignedIn,
) -> (CookieJar, Json<AuthResponse>) {
    let jar = jar.add(session_cookie(state, signed_in.token.clone()));
    (
        jar,
        Json(AuthResponse {
            success: true,
            token: signed_in.token,
            account: signed_in.account.into(),
        }),
    )
}

/// POST /api/auth/signup
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<CredentialsRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/auth/signup"])
        .start_timer();

    let result = account_service(&state)
        .signup(&body.email, &body.password)
        .await;

    record_action("signup", &result);
    track("POST", "/api/auth/signup", &result);
    Ok(signed_in_response(&state, jar, result?))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<CredentialsRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), AppError> {
    let _timer = HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&["POST", "/api/auth/login"])
        .start_timer();

    let result = account_service(&state)
        .login(&body.email, &body.password)
        .await;

    record_action("login", &result);
    track("POST", "/api/auth/login", &result);
    Ok(signed_in_response(&state, jar, result?))
}

/// POST /api/auth/logout
///
/// Tokens are stateless; this only clears the cookie.
pub async fn logout(jar: CookieJar) -> (CookieJar, Json<Value>) {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(json!({ "success": true })))
}
