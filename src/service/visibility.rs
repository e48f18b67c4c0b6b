//! Private-post visibility
//!
//! A private post is shown only to its author and to accounts in a mutual
//! follow relation with the author. The same predicate gates primary
//! posts, parents, quoted posts and reposted posts.

use std::collections::HashSet;

use crate::data::{Post, SocialStore};
use crate::error::AppError;

/// The signed-in account a request is made on behalf of
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Viewer {
    pub id: String,
}

impl Viewer {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Accounts the viewer follows that also follow the viewer back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutualSet(HashSet<String>);

impl MutualSet {
    /// Intersection of the two directed edge lists
    pub fn from_edges(following: Vec<String>, followers: Vec<String>) -> Self {
        let followers: HashSet<String> = followers.into_iter().collect();
        Self(
            following
                .into_iter()
                .filter(|id| followers.contains(id))
                .collect(),
        )
    }

    pub fn contains(&self, account_id: &str) -> bool {
        self.0.contains(account_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Ids in ascending order
    pub fn sorted_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.0.iter().cloned().collect();
        ids.sort();
        ids
    }
}

/// Compute the viewer's mutual-follow set
///
/// Anonymous viewers get an empty set without touching the store. The two
/// edge lists are fetched concurrently.
///
/// # Errors
/// Fails if either edge list cannot be read.
pub async fn mutual_follow_ids(
    store: &dyn SocialStore,
    viewer: Option<&Viewer>,
) -> Result<MutualSet, AppError> {
    let Some(viewer) = viewer else {
        return Ok(MutualSet::default());
    };

    let (following, followers) = tokio::try_join!(
        store.following_ids(&viewer.id),
        store.follower_ids(&viewer.id)
    )?;

    let mut mutuals = MutualSet::from_edges(following, followers);
    // A self-edge cannot exist, but never let the viewer count as their own mutual
    mutuals.0.remove(&viewer.id);

    tracing::debug!(viewer = %viewer.id, mutuals = mutuals.len(), "Resolved mutual set");
    Ok(mutuals)
}

/// Whether `viewer` may see `post`
///
/// An absent post is "visible" in the sense that there is nothing to hide;
/// callers render it as missing content.
pub fn can_view(post: Option<&Post>, viewer: Option<&Viewer>, mutuals: &MutualSet) -> bool {
    let Some(post) = post else {
        return true;
    };
    if !post.is_private {
        return true;
    }

    match viewer {
        Some(viewer) => viewer.id == post.author_id || mutuals.contains(&post.author_id),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MockSocialStore;
    use crate::service::test_support::TestStore;
    use chrono::Utc;

    fn post(author: &str, is_private: bool) -> Post {
        Post {
            id: crate::data::EntityId::new().0,
            author_id: author.to_string(),
            comment: Some("hello".to_string()),
            created_at: Utc::now(),
            is_private,
            parent_post_id: None,
            quote_of: None,
            repost_of: None,
        }
    }

    fn ids(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn public_posts_are_visible_to_everyone() {
        let public = post("author", false);
        let mutuals = MutualSet::default();

        assert!(can_view(Some(&public), None, &mutuals));
        assert!(can_view(
            Some(&public),
            Some(&Viewer::new("stranger")),
            &mutuals
        ));
    }

    #[test]
    fn absent_post_is_not_hidden() {
        assert!(can_view(None, None, &MutualSet::default()));
    }

    #[test]
    fn private_post_hidden_from_anonymous_even_with_mutuals() {
        let private = post("author", true);
        let mutuals = MutualSet::from_edges(ids(&["author"]), ids(&["author"]));

        assert!(!can_view(Some(&private), None, &mutuals));
    }

    #[test]
    fn private_post_visible_to_author_and_mutuals_only() {
        let private = post("author", true);
        let empty = MutualSet::default();
        let with_author = MutualSet::from_edges(ids(&["author"]), ids(&["author"]));

        assert!(can_view(Some(&private), Some(&Viewer::new("author")), &empty));
        assert!(can_view(
            Some(&private),
            Some(&Viewer::new("friend")),
            &with_author
        ));
        assert!(!can_view(
            Some(&private),
            Some(&Viewer::new("stranger")),
            &empty
        ));
    }

    #[test]
    fn one_way_follow_is_not_mutual() {
        // Viewer follows the author, the author does not follow back
        let mutuals = MutualSet::from_edges(ids(&["author", "other"]), ids(&["other"]));

        assert!(!mutuals.contains("author"));
        assert!(mutuals.contains("other"));
        assert!(!can_view(
            Some(&post("author", true)),
            Some(&Viewer::new("viewer")),
            &mutuals
        ));
    }

    #[test]
    fn mutual_set_is_intersection() {
        let mutuals = MutualSet::from_edges(ids(&["a", "b", "c"]), ids(&["b", "c", "d"]));
        assert_eq!(mutuals.sorted_ids(), ids(&["b", "c"]));
    }

    #[test]
    fn predicate_matches_definition_over_grid() {
        let authors = ["author", "friend", "stranger"];
        let viewers = [None, Some("author"), Some("friend"), Some("stranger")];
        let mutuals = MutualSet::from_edges(ids(&["friend", "author"]), ids(&["friend"]));

        for author in authors {
            for is_private in [false, true] {
                let candidate = post(author, is_private);
                for viewer_id in viewers {
                    let viewer = viewer_id.map(Viewer::new);
                    let expected = !is_private
                        || viewer_id
                            .map(|id| id == author || mutuals.contains(author))
                            .unwrap_or(false);
                    assert_eq!(
                        can_view(Some(&candidate), viewer.as_ref(), &mutuals),
                        expected,
                        "author={author} private={is_private} viewer={viewer_id:?}"
                    );
                }
            }
        }
    }

    #[tokio::test]
    async fn anonymous_mutual_set_issues_no_queries() {
        let mut store = MockSocialStore::new();
        store.expect_following_ids().times(0);
        store.expect_follower_ids().times(0);

        let mutuals = mutual_follow_ids(&store, None).await.unwrap();
        assert!(mutuals.is_empty());
    }

    #[tokio::test]
    async fn mutual_set_intersects_store_edges() {
        let mut store = MockSocialStore::new();
        store
            .expect_following_ids()
            .returning(|_| Ok(vec!["b".to_string(), "c".to_string()]));
        store
            .expect_follower_ids()
            .returning(|_| Ok(vec!["c".to_string(), "d".to_string()]));

        let viewer = Viewer::new("a");
        let mutuals = mutual_follow_ids(&store, Some(&viewer)).await.unwrap();
        assert_eq!(mutuals.sorted_ids(), vec!["c".to_string()]);
        assert!(!mutuals.contains("a"));
    }

    #[tokio::test]
    async fn mutual_membership_is_symmetric() {
        let fixture = TestStore::new().await;
        let alice = fixture.account("alice").await;
        let bob = fixture.account("bob").await;
        let carol = fixture.account("carol").await;
        let store = fixture.store();

        fixture.follow(&alice, &bob).await;
        fixture.follow(&alice, &carol).await;
        fixture.follow(&carol, &alice).await;

        let of_alice = mutual_follow_ids(store.as_ref(), Some(&alice)).await.unwrap();
        let of_bob = mutual_follow_ids(store.as_ref(), Some(&bob)).await.unwrap();
        assert!(!of_alice.contains(&bob.id));
        assert!(!of_bob.contains(&alice.id));
        assert!(of_alice.contains(&carol.id));

        fixture.follow(&bob, &alice).await;

        let of_alice = mutual_follow_ids(store.as_ref(), Some(&alice)).await.unwrap();
        let of_bob = mutual_follow_ids(store.as_ref(), Some(&bob)).await.unwrap();
        assert!(of_alice.contains(&bob.id));
        assert!(of_bob.contains(&alice.id));
        assert!(!of_bob.contains(&carol.id));

        for (viewer, mutuals) in [(&alice, &of_alice), (&bob, &of_bob)] {
            for other in [&alice, &bob, &carol] {
                if other.id == viewer.id {
                    continue;
                }
                let reverse = mutual_follow_ids(store.as_ref(), Some(other)).await.unwrap();
                assert_eq!(mutuals.contains(&other.id), reverse.contains(&viewer.id));
            }
        }
    }

    #[tokio::test]
    async fn mutual_set_propagates_store_failure() {
        let mut store = MockSocialStore::new();
        store
            .expect_following_ids()
            .returning(|_| Err(AppError::Storage("down".to_string())));
        store.expect_follower_ids().returning(|_| Ok(Vec::new()));

        let viewer = Viewer::new("a");
        assert!(mutual_follow_ids(&store, Some(&viewer)).await.is_err());
    }
}
