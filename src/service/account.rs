//! Account service
//!
//! Signup and login against local credentials, public profiles, profile
//! edits, avatars, user search and the follow toggle.

use std::sync::Arc;

use chrono::Utc;

use super::visibility::Viewer;
use crate::auth::{Session, create_session_token, password};
use crate::config::AuthConfig;
use crate::data::{Account, Credential, FollowCounts, SocialStore};
use crate::error::AppError;
use crate::metrics::AVATAR_UPLOADS_TOTAL;
use crate::storage::{AvatarStorage, validate_avatar};

pub const MIN_PASSWORD_CHARS: usize = 8;
pub const MAX_NICKNAME_CHARS: usize = 50;
pub const MAX_INTRO_CHARS: usize = 500;
/// Most accounts returned by one search
pub const SEARCH_LIMIT: usize = 20;

/// Result of a successful signup or login
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub account: Account,
    pub session: Session,
    pub token: String,
}

/// A public profile as seen by a (possibly anonymous) viewer
#[derive(Debug, Clone)]
pub struct Profile {
    pub account: Account,
    pub counts: FollowCounts,
    pub is_following: bool,
    pub is_own_profile: bool,
}

fn normalize_email(email: &str) -> Result<String, AppError> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(AppError::Validation("Invalid email address".to_string())),
    }
}

fn bounded_text(value: &str, field: &str, max_chars: usize) -> Result<String, AppError> {
    let trimmed = value.trim();
    if trimmed.chars().count() > max_chars {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, max_chars
        )));
    }
    Ok(trimmed.to_string())
}

/// Account service
pub struct AccountService {
    store: Arc<dyn SocialStore>,
    avatars: Arc<AvatarStorage>,
    auth: AuthConfig,
}

impl AccountService {
    /// Create new account service
    pub fn new(store: Arc<dyn SocialStore>, avatars: Arc<AvatarStorage>, auth: AuthConfig) -> Self {
        Self {
            store,
            avatars,
            auth,
        }
    }

    fn issue(&self, account: Account, email: String) -> Result<SignedIn, AppError> {
        let session = Session::new(account.id.clone(), email, self.auth.session_max_age);
        let token = create_session_token(&session, &self.auth.session_secret)?;
        Ok(SignedIn {
            account,
            session,
            token,
        })
    }

    /// Register a new account with the default profile
    ///
    /// # Errors
    /// `Validation` for a malformed email or short password, `Conflict`
    /// when the email is already registered.
    pub async fn signup(&self, email: &str, password: &str) -> Result<SignedIn, AppError> {
        let email = normalize_email(email)?;
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_CHARS
            )));
        }

        let password = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || password::hash_password(&password))
            .await
            .map_err(|e| AppError::Internal(e.into()))??;

        let account = Account::new_default();
        let credential = Credential {
            account_id: account.id.clone(),
            email: email.clone(),
            password_hash,
            created_at: Utc::now(),
        };
        self.store
            .insert_account_with_credential(&account, &credential)
            .await?;

        tracing::info!(account_id = %account.id, "Account created");
        self.issue(account, email)
    }

    /// Exchange email and password for a session
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<SignedIn, AppError> {
        let email = email.trim().to_lowercase();
        let credential = self
            .store
            .get_credential_by_email(&email)
            .await?
            .ok_or(AppError::Unauthorized)?;

        let password = password.to_string();
        let stored_hash = credential.password_hash.clone();
        let verified =
            tokio::task::spawn_blocking(move || password::verify_password(&password, &stored_hash))
                .await
                .map_err(|e| AppError::Internal(e.into()))?;
        if !verified {
            tracing::info!(account_id = %credential.account_id, "Login rejected");
            return Err(AppError::Unauthorized);
        }

        let account = self
            .store
            .get_account(&credential.account_id)
            .await?
            .ok_or(AppError::NotFound)?;
        self.issue(account, email)
    }

    /// Public profile with follow counters
    ///
    /// `is_following` and `is_own_profile` are false for anonymous viewers.
    pub async fn get_profile(
        &self,
        account_id: &str,
        viewer: Option<&Viewer>,
    ) -> Result<Profile, AppError> {
        let account = self
            .store
            .get_account(account_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let (counts, is_following) = tokio::try_join!(
            self.follow_counts(account_id),
            self.follow_status(viewer, account_id)
        )?;

        Ok(Profile {
            is_own_profile: viewer.is_some_and(|v| v.id == account.id),
            account,
            counts,
            is_following,
        })
    }

    /// Change the viewer's nickname and intro
    pub async fn update_profile(
        &self,
        viewer: Option<&Viewer>,
        nickname: &str,
        intro: &str,
    ) -> Result<Account, AppError> {
        let viewer = viewer.ok_or(AppError::Unauthorized)?;

        let nickname = bounded_text(nickname, "Nickname", MAX_NICKNAME_CHARS)?;
        if nickname.is_empty() {
            return Err(AppError::Validation("Nickname cannot be empty".to_string()));
        }
        let intro = bounded_text(intro, "Intro", MAX_INTRO_CHARS)?;

        self.store
            .update_account_profile(&viewer.id, &nickname, &intro)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Store a new avatar image and point the profile at it
    ///
    /// The previous object is removed when its key differs from the new one.
    pub async fn upload_avatar(
        &self,
        viewer: Option<&Viewer>,
        data: Vec<u8>,
        content_type: &str,
    ) -> Result<Account, AppError> {
        let viewer = viewer.ok_or(AppError::Unauthorized)?;
        if let Err(error) = validate_avatar(content_type, data.len(), self.avatars.max_bytes()) {
            AVATAR_UPLOADS_TOTAL.with_label_values(&["rejected"]).inc();
            return Err(error);
        }

        let account = self
            .store
            .get_account(&viewer.id)
            .await?
            .ok_or(AppError::NotFound)?;
        let previous_key = account.avatar_key.clone();

        let (key, url) = match self.avatars.upload(&account.id, data, content_type).await {
            Ok(uploaded) => uploaded,
            Err(error) => {
                AVATAR_UPLOADS_TOTAL.with_label_values(&["failed"]).inc();
                return Err(error);
            }
        };
        // Same key is overwritten in place; bust CDN caches
        let versioned_url = format!("{}?v={}", url, Utc::now().timestamp());

        if let Err(error) = self
            .store
            .update_account_avatar(&account.id, &versioned_url, &key)
            .await
        {
            if previous_key.as_deref() != Some(key.as_str()) {
                if let Err(cleanup_error) = self.avatars.delete(&key).await {
                    tracing::warn!(
                        key = %key,
                        error = %cleanup_error,
                        "failed to rollback uploaded avatar after database update error"
                    );
                }
            }
            AVATAR_UPLOADS_TOTAL.with_label_values(&["failed"]).inc();
            return Err(error);
        }

        if let Some(previous) = previous_key.filter(|previous| *previous != key) {
            if let Err(error) = self.avatars.delete(&previous).await {
                tracing::warn!(key = %previous, %error, "failed to delete previous avatar");
            }
        }

        AVATAR_UPLOADS_TOTAL.with_label_values(&["success"]).inc();
        tracing::info!(account_id = %account.id, key = %key, "Avatar updated");

        Ok(Account {
            avatar_url: Some(versioned_url),
            avatar_key: Some(key),
            updated_at: Utc::now(),
            ..account
        })
    }

    /// Case-insensitive nickname search
    ///
    /// A blank query matches nothing.
    pub async fn search_users(&self, query: &str) -> Result<Vec<Account>, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        self.store.search_accounts(query, SEARCH_LIMIT).await
    }

    /// Follow or unfollow `target_id`
    ///
    /// # Returns
    /// Whether the viewer follows the target afterwards
    pub async fn toggle_follow(
        &self,
        viewer: Option<&Viewer>,
        target_id: &str,
    ) -> Result<bool, AppError> {
        let viewer = viewer.ok_or(AppError::Unauthorized)?;
        if viewer.id == target_id {
            return Err(AppError::Validation(
                "You cannot follow yourself".to_string(),
            ));
        }

        if self.store.delete_follow(&viewer.id, target_id).await? {
            tracing::info!(follower = %viewer.id, following = target_id, "Unfollowed");
            return Ok(false);
        }

        if self.store.get_account(target_id).await?.is_none() {
            return Err(AppError::NotFound);
        }
        self.store.insert_follow(&viewer.id, target_id).await?;
        tracing::info!(follower = %viewer.id, following = target_id, "Followed");
        Ok(true)
    }

    /// Whether the viewer follows `target_id`; false for anonymous viewers
    pub async fn follow_status(
        &self,
        viewer: Option<&Viewer>,
        target_id: &str,
    ) -> Result<bool, AppError> {
        match viewer {
            Some(viewer) if viewer.id != target_id => {
                self.store.is_following(&viewer.id, target_id).await
            }
            _ => Ok(false),
        }
    }

    pub async fn follow_counts(&self, account_id: &str) -> Result<FollowCounts, AppError> {
        let (follower_count, following_count) = tokio::try_join!(
            self.store.count_followers(account_id),
            self.store.count_following(account_id)
        )?;
        Ok(FollowCounts {
            follower_count,
            following_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::valid_config;
    use crate::data::MockSocialStore;
    use crate::service::test_support::TestStore;

    fn avatars() -> Arc<AvatarStorage> {
        let config = valid_config();
        Arc::new(AvatarStorage::new(
            &config.storage.avatar,
            &config.cloudflare,
        ))
    }

    fn service(store: Arc<dyn SocialStore>) -> AccountService {
        AccountService::new(store, avatars(), valid_config().auth)
    }

    #[test]
    fn email_normalization() {
        assert_eq!(
            normalize_email("  Alice@Example.COM ").unwrap(),
            "alice@example.com"
        );
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("alice@").is_err());
    }

    #[tokio::test]
    async fn signup_then_login() {
        let fixture = TestStore::new().await;
        let service = service(fixture.store());

        let signed_up = service.signup("Alice@Example.com", "password123").await.unwrap();
        assert_eq!(signed_up.account.nickname, "Anonymous");
        assert_eq!(signed_up.session.email, "alice@example.com");

        let logged_in = service.login("alice@example.com", "password123").await.unwrap();
        assert_eq!(logged_in.account.id, signed_up.account.id);

        let error = service.login("alice@example.com", "wrong-password").await.unwrap_err();
        assert!(matches!(error, AppError::Unauthorized));
        let error = service.login("nobody@example.com", "password123").await.unwrap_err();
        assert!(matches!(error, AppError::Unauthorized));
    }

    #[tokio::test]
    async fn signup_validates_and_rejects_duplicates() {
        let fixture = TestStore::new().await;
        let service = service(fixture.store());

        assert!(matches!(
            service.signup("alice@example.com", "short").await,
            Err(AppError::Validation(_))
        ));
        service.signup("alice@example.com", "password123").await.unwrap();
        assert!(matches!(
            service.signup("ALICE@example.com", "password456").await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn self_follow_is_rejected_without_queries() {
        let mut store = MockSocialStore::new();
        store.expect_delete_follow().times(0);
        store.expect_insert_follow().times(0);
        let service = service(Arc::new(store));

        let viewer = Viewer::new("me");
        let error = service.toggle_follow(Some(&viewer), "me").await.unwrap_err();
        assert!(matches!(
            error,
            AppError::Validation(message) if message == "You cannot follow yourself"
        ));
    }

    #[tokio::test]
    async fn follow_toggle_and_profile() {
        let fixture = TestStore::new().await;
        let a = fixture.account("a").await;
        let b = fixture.account("b").await;
        let service = service(fixture.store());

        assert!(service.toggle_follow(Some(&a), &b.id).await.unwrap());
        let profile = service.get_profile(&b.id, Some(&a)).await.unwrap();
        assert!(profile.is_following);
        assert!(!profile.is_own_profile);
        assert_eq!(profile.counts.follower_count, 1);
        assert_eq!(profile.counts.following_count, 0);

        let own = service.get_profile(&a.id, Some(&a)).await.unwrap();
        assert!(own.is_own_profile);
        assert_eq!(own.counts.following_count, 1);

        let anonymous = service.get_profile(&b.id, None).await.unwrap();
        assert!(!anonymous.is_following && !anonymous.is_own_profile);

        assert!(!service.toggle_follow(Some(&a), &b.id).await.unwrap());
        assert!(!service.follow_status(Some(&a), &b.id).await.unwrap());

        assert!(matches!(
            service.toggle_follow(Some(&a), "missing").await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn profile_update_and_search() {
        let fixture = TestStore::new().await;
        let me = fixture.account("before").await;
        let service = service(fixture.store());

        let updated = service
            .update_profile(Some(&me), "  Hanako  ", "hello")
            .await
            .unwrap();
        assert_eq!(updated.nickname, "Hanako");

        assert!(matches!(
            service.update_profile(Some(&me), "   ", "").await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.update_profile(None, "x", "").await,
            Err(AppError::Unauthorized)
        ));

        assert!(service.search_users("  ").await.unwrap().is_empty());
        let found = service.search_users("hana").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, me.id);
    }

    #[tokio::test]
    async fn avatar_with_wrong_type_is_rejected_before_lookup() {
        let mut store = MockSocialStore::new();
        store.expect_get_account().times(0);
        let service = service(Arc::new(store));

        let viewer = Viewer::new("me");
        let error = service
            .upload_avatar(Some(&viewer), b"hello".to_vec(), "text/plain")
            .await
            .unwrap_err();
        assert!(matches!(error, AppError::Validation(_)));
    }
}
