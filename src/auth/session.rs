//! Session management
//!
//! Uses HMAC-signed tokens carried in a cookie or bearer header.
//! No server-side session storage needed.

use base64::{Engine as _, engine::general_purpose};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::AppError;
use crate::service::Viewer;

type HmacSha256 = Hmac<Sha256>;

/// Signed-in account session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub account_id: String,
    pub email: String,
    /// When session was created
    pub created_at: DateTime<Utc>,
    /// When session expires
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// New session valid for `max_age_secs`
    pub fn new(account_id: impl Into<String>, email: impl Into<String>, max_age_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            account_id: account_id.into(),
            email: email.into(),
            created_at: now,
            expires_at: now + Duration::seconds(max_age_secs),
        }
    }

    /// Check if session is expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    pub fn viewer(&self) -> Viewer {
        Viewer::new(self.account_id.clone())
    }
}

fn mac_for(secret: &str) -> Result<HmacSha256, AppError> {
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|e| AppError::Encryption(e.to_string()))
}

/// Create a signed session token
///
/// Token format: base64(payload).base64(hmac_sha256(payload))
///
/// # Arguments
/// * `session` - Session data to encode
/// * `secret` - HMAC secret key
pub fn create_session_token(session: &Session, secret: &str) -> Result<String, AppError> {
    let payload = serde_json::to_string(session).map_err(|e| AppError::Internal(e.into()))?;
    let payload_b64 = general_purpose::URL_SAFE_NO_PAD.encode(payload.as_bytes());

    let mut mac = mac_for(secret)?;
    mac.update(payload_b64.as_bytes());
    let signature_b64 = general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{}.{}", payload_b64, signature_b64))
}

/// Verify and decode a session token
///
/// # Errors
/// `Unauthorized` if the token is malformed, forged or expired
pub fn verify_session_token(token: &str, secret: &str) -> Result<Session, AppError> {
    let (payload_b64, signature_b64) = token.split_once('.').ok_or(AppError::Unauthorized)?;

    let signature = general_purpose::URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|_| AppError::Unauthorized)?;
    let mut mac = mac_for(secret)?;
    mac.update(payload_b64.as_bytes());
    mac.verify_slice(&signature)
        .map_err(|_| AppError::Unauthorized)?;

    let payload = general_purpose::URL_SAFE_NO_PAD
        .decode(payload_b64)
        .map_err(|_| AppError::Unauthorized)?;
    let session: Session =
        serde_json::from_slice(&payload).map_err(|_| AppError::Unauthorized)?;

    if session.is_expired() {
        return Err(AppError::Unauthorized);
    }

    Ok(session)
}
