//! Write-side events fed to the planner.
//!
//! Services describe what they changed in the store; the planner turns that
//! description into cache keys to drop or patch.

use uuid::Uuid;

use crate::domain::types::ContentKind;

/// A committed store mutation that may leave cached snapshots stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    ContentCreated {
        kind: ContentKind,
        id: Uuid,
        topic_id: Option<Uuid>,
    },
    ContentEdited {
        kind: ContentKind,
        id: Uuid,
        topic_id: Option<Uuid>,
        previous_topic_id: Option<Uuid>,
    },
    ContentDeleted {
        kind: ContentKind,
        id: Uuid,
        topic_id: Option<Uuid>,
    },
    /// Like-set toggled; `likes` is the set as returned by the store.
    ContentLiked {
        kind: ContentKind,
        id: Uuid,
        topic_id: Option<Uuid>,
        likes: Vec<Uuid>,
    },
    /// View recorded; `views` is the set as returned by the store.
    ContentViewed {
        kind: ContentKind,
        id: Uuid,
        topic_id: Option<Uuid>,
        views: Vec<Uuid>,
    },
    ContentImageChanged {
        kind: ContentKind,
        id: Uuid,
        topic_id: Option<Uuid>,
    },
    /// An event was accepted by a moderator.
    EventAccepted { id: Uuid, topic_id: Option<Uuid> },
    CommentCreated { kind: ContentKind, content_id: Uuid },
    CommentLiked { content_id: Uuid },
    CommentDeleted { kind: ContentKind, content_id: Uuid },
    /// Drops only `userInfo:<id>`. Author summaries embedded in cached
    /// details, listings and comment threads keep the old name or avatar
    /// until their own TTL expires.
    ProfileChanged { user_id: Uuid },
    TagsChanged,
    TopicsChanged,
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::ContentCreated { .. } => "content.created",
            Mutation::ContentEdited { .. } => "content.edited",
            Mutation::ContentDeleted { .. } => "content.deleted",
            Mutation::ContentLiked { .. } => "content.liked",
            Mutation::ContentViewed { .. } => "content.viewed",
            Mutation::ContentImageChanged { .. } => "content.image_changed",
            Mutation::EventAccepted { .. } => "event.accepted",
            Mutation::CommentCreated { .. } => "comment.created",
            Mutation::CommentLiked { .. } => "comment.liked",
            Mutation::CommentDeleted { .. } => "comment.deleted",
            Mutation::ProfileChanged { .. } => "user.profile_changed",
            Mutation::TagsChanged => "tags.changed",
            Mutation::TopicsChanged => "topics.changed",
        }
    }
}
