//! Timeline service
//!
//! Assembles pages of posts for a viewer: filters primaries through the
//! visibility predicate, resolves and redacts referenced posts, and attaches
//! per-post counters and the viewer's own action flags.

use std::sync::Arc;

use futures::future::join_all;
use serde::Deserialize;

use super::visibility::{MutualSet, Viewer, can_view, mutual_follow_ids};
use crate::data::{
    PostActions, PostEdge, PostRecord, PostReference, PostStats, ReferenceKind, SocialStore,
};
use crate::error::AppError;
use crate::metrics::POSTS_HIDDEN_TOTAL;

/// Which posts a timeline page keeps after the visibility check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimelineScope {
    #[default]
    All,
    Public,
    Private,
}

impl TimelineScope {
    fn keeps(&self, record: &PostRecord) -> bool {
        match self {
            Self::All => true,
            Self::Public => !record.post.is_private,
            Self::Private => record.post.is_private,
        }
    }
}

/// A visible post with everything a client renders next to it
///
/// At most one of the referenced posts is set. A reference that is missing
/// or not viewable is `None`; referenced posts never carry counters.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedPost {
    pub record: PostRecord,
    pub stats: PostStats,
    pub actions: PostActions,
    pub parent: Option<PostRecord>,
    pub quoted: Option<PostRecord>,
    pub reposted: Option<PostRecord>,
}

/// One page of the timeline
#[derive(Debug, Clone, PartialEq)]
pub struct TimelinePage {
    pub posts: Vec<EnrichedPost>,
    /// True when the raw page was full, before any filtering
    pub has_more: bool,
}

/// A post with its visible direct replies
#[derive(Debug, Clone, PartialEq)]
pub struct PostDetail {
    pub post: EnrichedPost,
    pub replies: Vec<EnrichedPost>,
}

/// Timeline service
pub struct TimelineService {
    store: Arc<dyn SocialStore>,
}

impl TimelineService {
    /// Create new timeline service
    pub fn new(store: Arc<dyn SocialStore>) -> Self {
        Self { store }
    }

    /// Get a page of the global timeline
    ///
    /// # Arguments
    /// * `viewer` - Signed-in account, or `None` for anonymous
    /// * `offset` - Rows to skip in the newest-first post list
    /// * `limit` - Raw page size, already clamped by the caller
    /// * `scope` - Keep all, only public, or only private survivors
    ///
    /// # Errors
    /// Fails when the page or the mutual set cannot be fetched. Enrichment
    /// failures degrade per post instead.
    pub async fn timeline_posts(
        &self,
        viewer: Option<&Viewer>,
        offset: usize,
        limit: usize,
        scope: TimelineScope,
    ) -> Result<TimelinePage, AppError> {
        let store = self.store.as_ref();
        let (raw, mutuals) = tokio::try_join!(
            store.list_posts(offset, limit),
            mutual_follow_ids(store, viewer)
        )?;

        let has_more = raw.len() == limit;
        let raw_len = raw.len();

        let visible: Vec<PostRecord> = raw
            .into_iter()
            .filter(|record| keep_visible(record, viewer, &mutuals))
            .filter(|record| scope.keeps(record))
            .collect();

        tracing::debug!(
            offset,
            limit,
            fetched = raw_len,
            visible = visible.len(),
            "Assembled timeline page"
        );

        let posts = enrich_all(store, visible, viewer, &mutuals).await;
        Ok(TimelinePage { posts, has_more })
    }

    /// Get one post with its visible replies, oldest reply first
    ///
    /// # Errors
    /// `NotFound` when the post does not exist or the viewer may not see it.
    pub async fn post_detail(
        &self,
        post_id: &str,
        viewer: Option<&Viewer>,
    ) -> Result<PostDetail, AppError> {
        let store = self.store.as_ref();
        let (record, mutuals) =
            tokio::try_join!(store.get_post(post_id), mutual_follow_ids(store, viewer))?;

        let record = record.ok_or(AppError::NotFound)?;
        if !keep_visible(&record, viewer, &mutuals) {
            return Err(AppError::NotFound);
        }

        let replies: Vec<PostRecord> = store
            .list_replies(post_id)
            .await?
            .into_iter()
            .filter(|reply| keep_visible(reply, viewer, &mutuals))
            .collect();

        let (post, replies) = tokio::join!(
            enrich(store, record, viewer, &mutuals),
            enrich_all(store, replies, viewer, &mutuals)
        );

        Ok(PostDetail { post, replies })
    }

    /// Posts the viewer has liked, most recent like first
    pub async fn liked_posts(
        &self,
        viewer: &Viewer,
        limit: usize,
    ) -> Result<Vec<EnrichedPost>, AppError> {
        self.posts_with_edge(PostEdge::Like, viewer, limit).await
    }

    /// Posts the viewer has bookmarked, most recent bookmark first
    pub async fn bookmarked_posts(
        &self,
        viewer: &Viewer,
        limit: usize,
    ) -> Result<Vec<EnrichedPost>, AppError> {
        self.posts_with_edge(PostEdge::Bookmark, viewer, limit).await
    }

    async fn posts_with_edge(
        &self,
        edge: PostEdge,
        viewer: &Viewer,
        limit: usize,
    ) -> Result<Vec<EnrichedPost>, AppError> {
        let store = self.store.as_ref();
        let (records, mutuals) = tokio::try_join!(
            store.list_posts_with_edge(edge, &viewer.id, limit),
            mutual_follow_ids(store, Some(viewer))
        )?;

        // A past like or bookmark does not outlive the mutual relation
        let visible: Vec<PostRecord> = records
            .into_iter()
            .filter(|record| keep_visible(record, Some(viewer), &mutuals))
            .collect();

        Ok(enrich_all(store, visible, Some(viewer), &mutuals).await)
    }
}

// =============================================================================
// Enrichment
// =============================================================================

fn keep_visible(record: &PostRecord, viewer: Option<&Viewer>, mutuals: &MutualSet) -> bool {
    let visible = can_view(Some(&record.post), viewer, mutuals);
    if !visible {
        POSTS_HIDDEN_TOTAL.with_label_values(&["primary"]).inc();
    }
    visible
}

/// Enrich posts concurrently, preserving input order
async fn enrich_all(
    store: &dyn SocialStore,
    records: Vec<PostRecord>,
    viewer: Option<&Viewer>,
    mutuals: &MutualSet,
) -> Vec<EnrichedPost> {
    join_all(
        records
            .into_iter()
            .map(|record| enrich(store, record, viewer, mutuals)),
    )
    .await
}

/// Attach counters, action flags and the resolved reference to a visible post
async fn enrich(
    store: &dyn SocialStore,
    record: PostRecord,
    viewer: Option<&Viewer>,
    mutuals: &MutualSet,
) -> EnrichedPost {
    let post_id = record.post.id.as_str();
    let reference = record.post.reference();

    let (stats, actions, resolved) = tokio::join!(
        post_stats(store, post_id),
        post_actions(store, post_id, viewer),
        async {
            match &reference {
                Some(reference) => resolve_reference(store, reference, viewer, mutuals).await,
                None => None,
            }
        }
    );

    let mut enriched = EnrichedPost {
        record,
        stats,
        actions,
        parent: None,
        quoted: None,
        reposted: None,
    };
    if let Some(reference) = reference {
        match reference.kind {
            ReferenceKind::Parent => enriched.parent = resolved,
            ReferenceKind::Quote => enriched.quoted = resolved,
            ReferenceKind::Repost => enriched.reposted = resolved,
        }
    }
    enriched
}

/// Look up a referenced post and pass it through the visibility check
///
/// Missing, failed and hidden lookups all come back as `None`.
pub async fn resolve_reference(
    store: &dyn SocialStore,
    reference: &PostReference,
    viewer: Option<&Viewer>,
    mutuals: &MutualSet,
) -> Option<PostRecord> {
    let record = match store.get_post(&reference.target_id).await {
        Ok(record) => record?,
        Err(error) => {
            tracing::warn!(
                target_id = %reference.target_id,
                kind = ?reference.kind,
                %error,
                "Failed to resolve referenced post"
            );
            return None;
        }
    };

    if can_view(Some(&record.post), viewer, mutuals) {
        Some(record)
    } else {
        POSTS_HIDDEN_TOTAL.with_label_values(&["reference"]).inc();
        None
    }
}

// =============================================================================
// Counters and action flags
// =============================================================================

fn degrade<T: Default>(result: Result<T, AppError>, what: &str, post_id: &str) -> T {
    result.unwrap_or_else(|error| {
        tracing::warn!(post_id, what, %error, "Post lookup failed; using default");
        T::default()
    })
}

/// Counters for one post
///
/// Each count is an independent query; a failed count is reported as 0.
/// `repost_count` covers bare reposts and quote reposts.
pub async fn post_stats(store: &dyn SocialStore, post_id: &str) -> PostStats {
    let (likes, reposts, quotes, replies, bookmarks) = tokio::join!(
        store.count_edges(PostEdge::Like, post_id),
        store.count_referencing(ReferenceKind::Repost, post_id),
        store.count_referencing(ReferenceKind::Quote, post_id),
        store.count_referencing(ReferenceKind::Parent, post_id),
        store.count_edges(PostEdge::Bookmark, post_id),
    );

    PostStats {
        like_count: degrade(likes, "like_count", post_id),
        repost_count: degrade(reposts, "repost_count", post_id)
            + degrade(quotes, "quote_count", post_id),
        reply_count: degrade(replies, "reply_count", post_id),
        bookmark_count: degrade(bookmarks, "bookmark_count", post_id),
    }
}

/// The viewer's own like, bookmark and repost flags for one post
///
/// Anonymous viewers get all-false without a query.
pub async fn post_actions(
    store: &dyn SocialStore,
    post_id: &str,
    viewer: Option<&Viewer>,
) -> PostActions {
    let Some(viewer) = viewer else {
        return PostActions::default();
    };

    let (liked, bookmarked, repost) = tokio::join!(
        store.has_edge(PostEdge::Like, post_id, &viewer.id),
        store.has_edge(PostEdge::Bookmark, post_id, &viewer.id),
        store.find_repost_id(&viewer.id, post_id),
    );

    PostActions {
        is_liked: degrade(liked, "is_liked", post_id),
        is_bookmarked: degrade(bookmarked, "is_bookmarked", post_id),
        is_reposted: degrade(repost, "is_reposted", post_id).is_some(),
    }
}
