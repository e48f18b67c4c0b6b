//! Data-access seam
//!
//! Everything above the data layer talks to storage through `SocialStore`,
//! passed in explicitly. Each method is one independent round trip; callers
//! must not assume atomicity across calls.

use async_trait::async_trait;

use super::models::*;
use crate::error::AppError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SocialStore: Send + Sync {
    // Accounts

    async fn get_account(&self, id: &str) -> Result<Option<Account>, AppError>;

    /// Insert an account and its credential together.
    ///
    /// Fails with `Conflict` when the email is taken.
    async fn insert_account_with_credential(
        &self,
        account: &Account,
        credential: &Credential,
    ) -> Result<(), AppError>;

    async fn get_credential_by_email(&self, email: &str) -> Result<Option<Credential>, AppError>;

    /// Returns the updated account, or `None` if it does not exist.
    async fn update_account_profile(
        &self,
        id: &str,
        nickname: &str,
        intro: &str,
    ) -> Result<Option<Account>, AppError>;

    async fn update_account_avatar(
        &self,
        id: &str,
        avatar_url: &str,
        avatar_key: &str,
    ) -> Result<(), AppError>;

    /// Case-insensitive substring match on nickname.
    async fn search_accounts(&self, query: &str, limit: usize) -> Result<Vec<Account>, AppError>;

    // Follows

    /// Ids the account follows.
    async fn following_ids(&self, account_id: &str) -> Result<Vec<String>, AppError>;

    /// Ids following the account.
    async fn follower_ids(&self, account_id: &str) -> Result<Vec<String>, AppError>;

    async fn is_following(&self, follower_id: &str, following_id: &str) -> Result<bool, AppError>;

    async fn insert_follow(&self, follower_id: &str, following_id: &str) -> Result<(), AppError>;

    /// Returns whether an edge was removed.
    async fn delete_follow(&self, follower_id: &str, following_id: &str)
    -> Result<bool, AppError>;

    async fn count_followers(&self, account_id: &str) -> Result<i64, AppError>;

    async fn count_following(&self, account_id: &str) -> Result<i64, AppError>;

    // Posts

    async fn get_post(&self, id: &str) -> Result<Option<PostRecord>, AppError>;

    /// All posts, newest first.
    async fn list_posts(&self, offset: usize, limit: usize) -> Result<Vec<PostRecord>, AppError>;

    /// Direct replies to a post, oldest first.
    async fn list_replies(&self, parent_id: &str) -> Result<Vec<PostRecord>, AppError>;

    /// Posts the account has liked or bookmarked, most recent edge first.
    async fn list_posts_with_edge(
        &self,
        edge: PostEdge,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<PostRecord>, AppError>;

    async fn insert_post(&self, post: &NewPost) -> Result<Post, AppError>;

    async fn delete_post(&self, id: &str) -> Result<(), AppError>;

    /// The account's bare repost of `target_id`, if any.
    async fn find_repost_id(
        &self,
        author_id: &str,
        target_id: &str,
    ) -> Result<Option<String>, AppError>;

    /// Number of posts whose `kind` reference points at `post_id`.
    async fn count_referencing(
        &self,
        kind: ReferenceKind,
        post_id: &str,
    ) -> Result<i64, AppError>;

    // Likes / Bookmarks

    async fn has_edge(&self, edge: PostEdge, post_id: &str, user_id: &str)
    -> Result<bool, AppError>;

    async fn insert_edge(&self, edge: PostEdge, post_id: &str, user_id: &str)
    -> Result<(), AppError>;

    async fn delete_edge(&self, edge: PostEdge, post_id: &str, user_id: &str)
    -> Result<(), AppError>;

    async fn count_edges(&self, edge: PostEdge, post_id: &str) -> Result<i64, AppError>;
}
