//! API request and response DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{Account, AuthorSummary, PostActions, PostRecord, PostStats};
use crate::service::{EnrichedPost, PostDetail, Profile, TimelinePage, TimelineScope};

// =============================================================================
// Requests
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub comment: String,
    #[serde(default)]
    pub is_private: bool,
}

/// Body for replies and quote posts
#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub nickname: String,
    #[serde(default)]
    pub intro: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimelineQuery {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    #[serde(default)]
    pub scope: TimelineScope,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

// =============================================================================
// Accounts
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct AccountResponse {
    pub id: String,
    pub nickname: String,
    pub avatar_url: Option<String>,
    pub intro: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Account> for AccountResponse {
    fn from(account: Account) -> Self {
        Self {
            id: account.id,
            nickname: account.nickname,
            avatar_url: account.avatar_url,
            intro: account.intro,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    #[serde(flatten)]
    pub account: AccountResponse,
    pub follower_count: i64,
    pub following_count: i64,
    pub is_following: bool,
    pub is_own_profile: bool,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            account: profile.account.into(),
            follower_count: profile.counts.follower_count,
            following_count: profile.counts.following_count,
            is_following: profile.is_following,
            is_own_profile: profile.is_own_profile,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    pub account: AccountResponse,
}

// =============================================================================
// Posts
// =============================================================================

/// A referenced post: content and author only, never counters
#[derive(Debug, Clone, Serialize)]
pub struct ReferencedPostResponse {
    pub id: String,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_private: bool,
    pub author: AuthorSummary,
}

impl From<PostRecord> for ReferencedPostResponse {
    fn from(record: PostRecord) -> Self {
        Self {
            id: record.post.id,
            comment: record.post.comment,
            created_at: record.post.created_at,
            is_private: record.post.is_private,
            author: record.author,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostResponse {
    pub id: String,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_private: bool,
    pub author: AuthorSummary,
    pub parent_post_id: Option<String>,
    pub quote_of: Option<String>,
    pub repost_of: Option<String>,
    /// `null` when missing or hidden from the viewer
    pub parent_post: Option<ReferencedPostResponse>,
    pub quoted_post: Option<ReferencedPostResponse>,
    pub reposted_post: Option<ReferencedPostResponse>,
    pub stats: PostStats,
    pub actions: PostActions,
}

impl From<EnrichedPost> for PostResponse {
    fn from(enriched: EnrichedPost) -> Self {
        let PostRecord { post, author } = enriched.record;
        Self {
            id: post.id,
            comment: post.comment,
            created_at: post.created_at,
            is_private: post.is_private,
            author,
            parent_post_id: post.parent_post_id,
            quote_of: post.quote_of,
            repost_of: post.repost_of,
            parent_post: enriched.parent.map(Into::into),
            quoted_post: enriched.quoted.map(Into::into),
            reposted_post: enriched.reposted.map(Into::into),
            stats: enriched.stats,
            actions: enriched.actions,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TimelineResponse {
    pub posts: Vec<PostResponse>,
    pub has_more: bool,
}

impl From<TimelinePage> for TimelineResponse {
    fn from(page: TimelinePage) -> Self {
        Self {
            posts: page.posts.into_iter().map(Into::into).collect(),
            has_more: page.has_more,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostDetailResponse {
    pub post: PostResponse,
    pub replies: Vec<PostResponse>,
}

impl From<PostDetail> for PostDetailResponse {
    fn from(detail: PostDetail) -> Self {
        Self {
            post: detail.post.into(),
            replies: detail.replies.into_iter().map(Into::into).collect(),
        }
    }
}

/// Newly created post, before any enrichment
#[derive(Debug, Serialize)]
pub struct CreatedPostResponse {
    pub success: bool,
    pub post: crate::data::Post,
}
