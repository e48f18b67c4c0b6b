//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services receive their `SocialStore` explicitly and never reach for
//! global state.

mod account;
mod post;
mod timeline;
mod visibility;

#[cfg(test)]
pub(crate) mod test_support;

pub use account::{AccountService, Profile, SEARCH_LIMIT, SignedIn};
pub use post::{MAX_COMMENT_CHARS, PostService};
pub use timeline::{
    EnrichedPost, PostDetail, TimelinePage, TimelineScope, TimelineService, post_actions,
    post_stats, resolve_reference,
};
pub use visibility::{MutualSet, Viewer, can_view, mutual_follow_ids};
