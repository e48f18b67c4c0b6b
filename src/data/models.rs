//! Data models
//!
//! Rust structs representing database entities and derived aggregates.
//! All models use ULID for IDs and chrono for timestamps.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }

    /// Create from existing string
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

/// Nickname given to accounts that have not set one
pub const DEFAULT_NICKNAME: &str = "Anonymous";

// =============================================================================
// Account
// =============================================================================

/// A registered account and its public profile
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: String,
    pub nickname: String,
    /// Public URL of the current avatar object
    pub avatar_url: Option<String>,
    /// Object-storage key backing `avatar_url`
    pub avatar_key: Option<String>,
    pub intro: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Fresh account with the default profile
    pub fn new_default() -> Self {
        let now = Utc::now();
        Self {
            id: EntityId::new().0,
            nickname: DEFAULT_NICKNAME.to_string(),
            avatar_url: None,
            avatar_key: None,
            intro: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Login credential for an account
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Credential {
    pub account_id: String,
    /// Normalized (trimmed, lowercase) email
    pub email: String,
    /// Argon2 PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Author fields shown next to a post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorSummary {
    pub id: String,
    pub nickname: String,
    pub avatar_url: Option<String>,
}

// =============================================================================
// Follow relationships
// =============================================================================

/// Directed follow edge
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FollowEdge {
    pub follower_id: String,
    pub following_id: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Posts
// =============================================================================

/// Which kind of post a reference points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// Reply to the target
    Parent,
    /// Quote repost with its own comment
    Quote,
    /// Bare repost, no comment
    Repost,
}

impl ReferenceKind {
    /// Column on `posts` holding this reference
    pub fn column(&self) -> &'static str {
        match self {
            Self::Parent => "parent_post_id",
            Self::Quote => "quote_of",
            Self::Repost => "repost_of",
        }
    }
}

/// Weak reference from one post to another
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostReference {
    pub kind: ReferenceKind,
    pub target_id: String,
}

/// A post as stored
///
/// At most one of `parent_post_id`, `quote_of`, `repost_of` is set.
/// `comment` is `None` only for a bare repost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_private: bool,
    pub parent_post_id: Option<String>,
    pub quote_of: Option<String>,
    pub repost_of: Option<String>,
}

impl Post {
    /// The single reference this post carries, if any
    pub fn reference(&self) -> Option<PostReference> {
        let (kind, target) = if let Some(id) = &self.parent_post_id {
            (ReferenceKind::Parent, id)
        } else if let Some(id) = &self.quote_of {
            (ReferenceKind::Quote, id)
        } else if let Some(id) = &self.repost_of {
            (ReferenceKind::Repost, id)
        } else {
            return None;
        };

        Some(PostReference {
            kind,
            target_id: target.clone(),
        })
    }
}

/// A post joined with its author's profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub post: Post,
    pub author: AuthorSummary,
}

/// Input for inserting a post
///
/// `is_private` for a referencing post must come from the referenced
/// post; see `service::post`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPost {
    pub author_id: String,
    pub comment: Option<String>,
    pub is_private: bool,
    pub reference: Option<PostReference>,
}

// =============================================================================
// Likes / Bookmarks
// =============================================================================

/// Existence-only edge between an account and a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PostEdge {
    Like,
    Bookmark,
}

impl PostEdge {
    pub fn table(&self) -> &'static str {
        match self {
            Self::Like => "likes",
            Self::Bookmark => "bookmarks",
        }
    }
}

// =============================================================================
// Derived aggregates
// =============================================================================

/// Per-post counters, computed per request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostStats {
    pub like_count: i64,
    /// Bare reposts plus quote reposts
    pub repost_count: i64,
    pub reply_count: i64,
    pub bookmark_count: i64,
}

/// The viewer's own actions on a post
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostActions {
    pub is_liked: bool,
    pub is_bookmarked: bool,
    pub is_reposted: bool,
}

/// Follower/following totals for an account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowCounts {
    pub follower_count: i64,
    pub following_count: i64,
}
