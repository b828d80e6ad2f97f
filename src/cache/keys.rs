//! Cache key definitions.
//!
//! Every key renders to the exact string stored in the cache, so keys written
//! by one process are addressable by any other sharing the same store.

use std::fmt;

use uuid::Uuid;

use crate::domain::types::ContentKind;

pub const SESSION_PATTERN: &str = "token:*";

/// Identifies one cached snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// `post:<id>`, `news:<id>`, `event:<id>`
    Detail(ContentKind, Uuid),
    /// `allPosts`, `allNews`, `allEvents`
    Listing(ContentKind),
    /// `topicPosts:<topicId>`, `topicNews:<topicId>`, `topicEvents:<topicId>`
    TopicListing(ContentKind, Uuid),
    /// `allUnacceptedEvents`
    UnacceptedEvents,
    /// `comments:<contentId>`
    Comments(Uuid),
    /// `userInfo:<userId>`
    UserInfo(Uuid),
    /// `allTags`
    AllTags,
    /// `allTopics`
    AllTopics,
    /// `token:<token>`
    Session(String),
}

impl CacheKey {
    /// Low-cardinality label used for metrics.
    pub fn family(&self) -> &'static str {
        match self {
            CacheKey::Detail(kind, _) => kind.as_str(),
            CacheKey::Listing(kind) => listing_name(*kind),
            CacheKey::TopicListing(kind, _) => topic_listing_prefix(*kind),
            CacheKey::UnacceptedEvents => "allUnacceptedEvents",
            CacheKey::Comments(_) => "comments",
            CacheKey::UserInfo(_) => "userInfo",
            CacheKey::AllTags => "allTags",
            CacheKey::AllTopics => "allTopics",
            CacheKey::Session(_) => "token",
        }
    }
}

fn listing_name(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Post => "allPosts",
        ContentKind::News => "allNews",
        ContentKind::Event => "allEvents",
    }
}

fn topic_listing_prefix(kind: ContentKind) -> &'static str {
    match kind {
        ContentKind::Post => "topicPosts",
        ContentKind::News => "topicNews",
        ContentKind::Event => "topicEvents",
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Detail(kind, id) => write!(f, "{}:{id}", kind.as_str()),
            CacheKey::Listing(kind) => f.write_str(listing_name(*kind)),
            CacheKey::TopicListing(kind, topic_id) => {
                write!(f, "{}:{topic_id}", topic_listing_prefix(*kind))
            }
            CacheKey::UnacceptedEvents => f.write_str("allUnacceptedEvents"),
            CacheKey::Comments(content_id) => write!(f, "comments:{content_id}"),
            CacheKey::UserInfo(user_id) => write!(f, "userInfo:{user_id}"),
            CacheKey::AllTags => f.write_str("allTags"),
            CacheKey::AllTopics => f.write_str("allTopics"),
            CacheKey::Session(token) => write!(f, "token:{token}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_render_to_stored_names() {
        let id = Uuid::nil();
        assert_eq!(
            CacheKey::Detail(ContentKind::Post, id).to_string(),
            format!("post:{id}")
        );
        assert_eq!(
            CacheKey::Detail(ContentKind::News, id).to_string(),
            format!("news:{id}")
        );
        assert_eq!(
            CacheKey::Detail(ContentKind::Event, id).to_string(),
            format!("event:{id}")
        );
        assert_eq!(CacheKey::Listing(ContentKind::Post).to_string(), "allPosts");
        assert_eq!(CacheKey::Listing(ContentKind::News).to_string(), "allNews");
        assert_eq!(CacheKey::Listing(ContentKind::Event).to_string(), "allEvents");
        assert_eq!(
            CacheKey::TopicListing(ContentKind::Post, id).to_string(),
            format!("topicPosts:{id}")
        );
        assert_eq!(
            CacheKey::TopicListing(ContentKind::News, id).to_string(),
            format!("topicNews:{id}")
        );
        assert_eq!(
            CacheKey::UnacceptedEvents.to_string(),
            "allUnacceptedEvents"
        );
        assert_eq!(
            CacheKey::Comments(id).to_string(),
            format!("comments:{id}")
        );
        assert_eq!(
            CacheKey::UserInfo(id).to_string(),
            format!("userInfo:{id}")
        );
        assert_eq!(CacheKey::AllTags.to_string(), "allTags");
        assert_eq!(CacheKey::AllTopics.to_string(), "allTopics");
        assert_eq!(
            CacheKey::Session("abc".to_string()).to_string(),
            "token:abc"
        );
    }

    #[test]
    fn family_strips_identifiers() {
        let id = Uuid::new_v4();
        assert_eq!(CacheKey::Detail(ContentKind::Event, id).family(), "event");
        assert_eq!(CacheKey::TopicListing(ContentKind::Post, id).family(), "topicPosts");
        assert_eq!(CacheKey::Session("t".to_string()).family(), "token");
    }
}
