//! Post service
//!
//! Command handlers for creating posts and toggling per-post edges.
//! Every command needs a signed-in viewer and reports its outcome as a
//! `Result`; nothing here panics on bad input.

use std::sync::Arc;

use super::visibility::{Viewer, can_view, mutual_follow_ids};
use crate::data::{NewPost, Post, PostEdge, PostReference, ReferenceKind, SocialStore};
use crate::error::AppError;

/// Upper bound on comment length, in characters
pub const MAX_COMMENT_CHARS: usize = 500;

fn require_viewer(viewer: Option<&Viewer>) -> Result<&Viewer, AppError> {
    viewer.ok_or(AppError::Unauthorized)
}

/// Trim a comment and reject empty or oversized text
fn normalize_comment(comment: &str) -> Result<String, AppError> {
    let trimmed = comment.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Comment cannot be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::Validation(format!(
            "Comment must be at most {} characters",
            MAX_COMMENT_CHARS
        )));
    }
    Ok(trimmed.to_string())
}

fn denied_message(kind: ReferenceKind) -> &'static str {
    match kind {
        ReferenceKind::Parent => "You do not have permission to reply to this post",
        ReferenceKind::Quote => "You do not have permission to quote this post",
        ReferenceKind::Repost => "You do not have permission to repost this post",
    }
}

/// Post service
pub struct PostService {
    store: Arc<dyn SocialStore>,
}

impl PostService {
    /// Create new post service
    pub fn new(store: Arc<dyn SocialStore>) -> Self {
        Self { store }
    }

    /// Publish a standalone post
    ///
    /// # Arguments
    /// * `comment` - Post text; trimmed, must not be empty
    /// * `is_private` - Restrict to the author and their mutuals
    pub async fn create_post(
        &self,
        viewer: Option<&Viewer>,
        comment: &str,
        is_private: bool,
    ) -> Result<Post, AppError> {
        let viewer = require_viewer(viewer)?;
        let comment = normalize_comment(comment)?;

        let post = self
            .store
            .insert_post(&NewPost {
                author_id: viewer.id.clone(),
                comment: Some(comment),
                is_private,
                reference: None,
            })
            .await?;

        tracing::info!(post_id = %post.id, author = %viewer.id, is_private, "Post created");
        Ok(post)
    }

    /// Reply to a post
    ///
    /// The reply takes the parent's privacy. A private parent requires the
    /// viewer to be its author or a mutual of its author.
    pub async fn create_reply(
        &self,
        viewer: Option<&Viewer>,
        parent_id: &str,
        comment: &str,
    ) -> Result<Post, AppError> {
        let viewer = require_viewer(viewer)?;
        let comment = normalize_comment(comment)?;
        self.create_referencing(viewer, ReferenceKind::Parent, parent_id, Some(comment))
            .await
    }

    /// Quote a post with a comment of one's own
    pub async fn create_quote_post(
        &self,
        viewer: Option<&Viewer>,
        target_id: &str,
        comment: &str,
    ) -> Result<Post, AppError> {
        let viewer = require_viewer(viewer)?;
        let comment = normalize_comment(comment)?;
        self.create_referencing(viewer, ReferenceKind::Quote, target_id, Some(comment))
            .await
    }

    /// Repost, or undo the viewer's existing repost
    ///
    /// # Returns
    /// Whether the viewer has reposted the target afterwards
    pub async fn toggle_repost(
        &self,
        viewer: Option<&Viewer>,
        target_id: &str,
    ) -> Result<bool, AppError> {
        let viewer = require_viewer(viewer)?;

        if let Some(existing) = self.store.find_repost_id(&viewer.id, target_id).await? {
            self.store.delete_post(&existing).await?;
            tracing::info!(target_id, viewer = %viewer.id, "Repost removed");
            return Ok(false);
        }

        self.create_referencing(viewer, ReferenceKind::Repost, target_id, None)
            .await?;
        Ok(true)
    }

    /// Like or unlike a post
    pub async fn toggle_like(
        &self,
        viewer: Option<&Viewer>,
        post_id: &str,
    ) -> Result<bool, AppError> {
        self.toggle_edge(PostEdge::Like, viewer, post_id).await
    }

    /// Bookmark or unbookmark a post
    pub async fn toggle_bookmark(
        &self,
        viewer: Option<&Viewer>,
        post_id: &str,
    ) -> Result<bool, AppError> {
        self.toggle_edge(PostEdge::Bookmark, viewer, post_id).await
    }

    /// Delete-if-exists-else-insert
    ///
    /// Two concurrent toggles from the same viewer may both read the same
    /// state; the loser then fails on the unique key.
    async fn toggle_edge(
        &self,
        edge: PostEdge,
        viewer: Option<&Viewer>,
        post_id: &str,
    ) -> Result<bool, AppError> {
        let viewer = require_viewer(viewer)?;

        if self.store.has_edge(edge, post_id, &viewer.id).await? {
            self.store.delete_edge(edge, post_id, &viewer.id).await?;
            tracing::debug!(post_id, viewer = %viewer.id, edge = edge.table(), "Edge removed");
            return Ok(false);
        }

        let target = self
            .store
            .get_post(post_id)
            .await?
            .ok_or(AppError::NotFound)?;

        // Hidden posts answer like missing ones
        if target.post.is_private {
            let mutuals = mutual_follow_ids(self.store.as_ref(), Some(viewer)).await?;
            if !can_view(Some(&target.post), Some(viewer), &mutuals) {
                return Err(AppError::NotFound);
            }
        }

        self.store.insert_edge(edge, post_id, &viewer.id).await?;
        tracing::debug!(post_id, viewer = %viewer.id, edge = edge.table(), "Edge added");
        Ok(true)
    }

    /// Insert a post that references `target_id`
    ///
    /// `is_private` is always copied from the target.
    async fn create_referencing(
        &self,
        viewer: &Viewer,
        kind: ReferenceKind,
        target_id: &str,
        comment: Option<String>,
    ) -> Result<Post, AppError> {
        let target = self
            .store
            .get_post(target_id)
            .await?
            .ok_or(AppError::NotFound)?;

        if target.post.is_private {
            let mutuals = mutual_follow_ids(self.store.as_ref(), Some(viewer)).await?;
            if !can_view(Some(&target.post), Some(viewer), &mutuals) {
                tracing::info!(
                    target_id,
                    viewer = %viewer.id,
                    kind = ?kind,
                    "Rejected reference to private post"
                );
                return Err(AppError::Forbidden(denied_message(kind).to_string()));
            }
        }

        let post = self
            .store
            .insert_post(&NewPost {
                author_id: viewer.id.clone(),
                comment,
                is_private: target.post.is_private,
                reference: Some(PostReference {
                    kind,
                    target_id: target.post.id.clone(),
                }),
            })
            .await?;

        tracing::info!(
            post_id = %post.id,
            target_id,
            kind = ?kind,
            is_private = post.is_private,
            "Referencing post created"
        );
        Ok(post)
    }
}
