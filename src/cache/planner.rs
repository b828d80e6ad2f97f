//! Invalidation plan generation.
//!
//! Maps a single mutation onto the cache keys it affects. Listings are always
//! dropped, never patched. Details are dropped for structural changes and
//! patched in place for like and view updates.

use std::fmt;

use uuid::Uuid;

use super::events::Mutation;
use super::keys::CacheKey;
use crate::domain::types::ContentKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchField {
    Likes,
    Views,
}

impl PatchField {
    pub fn as_str(self) -> &'static str {
        match self {
            PatchField::Likes => "likes",
            PatchField::Views => "views",
        }
    }
}

/// Overwrite one set-valued field of a cached detail, if the detail is cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailPatch {
    pub key: CacheKey,
    pub field: PatchField,
    pub members: Vec<Uuid>,
}

/// Actions to execute for cache consistency after one mutation.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct InvalidationPlan {
    /// Keys to delete, deduplicated, in insertion order.
    pub invalidate: Vec<CacheKey>,
    pub patch: Option<DetailPatch>,
}

impl fmt::Display for InvalidationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InvalidationPlan {{ invalidate: {}, patch: {} }}",
            self.invalidate.len(),
            self.patch
                .as_ref()
                .map(|patch| patch.field.as_str())
                .unwrap_or("none"),
        )
    }
}

impl InvalidationPlan {
    pub fn for_mutation(mutation: &Mutation) -> Self {
        let mut plan = Self::default();

        match mutation {
            Mutation::ContentCreated { kind, topic_id, .. } => {
                plan.drop_listings(*kind, *topic_id);
            }
            Mutation::ContentEdited {
                kind,
                id,
                topic_id,
                previous_topic_id,
            } => {
                plan.drop_key(CacheKey::Detail(*kind, *id));
                plan.drop_listings(*kind, *topic_id);
                if previous_topic_id != topic_id
                    && let Some(previous) = previous_topic_id
                {
                    plan.drop_key(CacheKey::TopicListing(*kind, *previous));
                }
            }
            Mutation::ContentDeleted { kind, id, topic_id } => {
                plan.drop_key(CacheKey::Detail(*kind, *id));
                plan.drop_listings(*kind, *topic_id);
                plan.drop_key(CacheKey::Comments(*id));
            }
            Mutation::ContentLiked {
                kind,
                id,
                topic_id,
                likes,
            } => {
                plan.drop_listings(*kind, *topic_id);
                plan.patch = Some(DetailPatch {
                    key: CacheKey::Detail(*kind, *id),
                    field: PatchField::Likes,
                    members: likes.clone(),
                });
            }
            Mutation::ContentViewed {
                kind,
                id,
                topic_id,
                views,
            } => {
                plan.drop_listings(*kind, *topic_id);
                plan.patch = Some(DetailPatch {
                    key: CacheKey::Detail(*kind, *id),
                    field: PatchField::Views,
                    members: views.clone(),
                });
            }
            Mutation::ContentImageChanged { kind, id, topic_id } => {
                plan.drop_key(CacheKey::Detail(*kind, *id));
                plan.drop_listings(*kind, *topic_id);
            }
            Mutation::EventAccepted { id, topic_id } => {
                plan.drop_key(CacheKey::Detail(ContentKind::Event, *id));
                plan.drop_listings(ContentKind::Event, *topic_id);
            }
            Mutation::CommentCreated { kind, content_id }
            | Mutation::CommentDeleted { kind, content_id } => {
                plan.drop_key(CacheKey::Comments(*content_id));
                plan.drop_key(CacheKey::Detail(*kind, *content_id));
            }
            Mutation::CommentLiked { content_id } => {
                plan.drop_key(CacheKey::Comments(*content_id));
            }
            Mutation::ProfileChanged { user_id } => {
                plan.drop_key(CacheKey::UserInfo(*user_id));
            }
            Mutation::TagsChanged => plan.drop_key(CacheKey::AllTags),
            Mutation::TopicsChanged => plan.drop_key(CacheKey::AllTopics),
        }

        plan
    }

    pub fn is_empty(&self) -> bool {
        self.invalidate.is_empty() && self.patch.is_none()
    }

    fn drop_key(&mut self, key: CacheKey) {
        if !self.invalidate.contains(&key) {
            self.invalidate.push(key);
        }
    }

    /// Every composed listing that can contain an item of `kind`.
    fn drop_listings(&mut self, kind: ContentKind, topic_id: Option<Uuid>) {
        self.drop_key(CacheKey::Listing(kind));
        if let Some(topic_id) = topic_id {
            self.drop_key(CacheKey::TopicListing(kind, topic_id));
        }
        if kind.requires_acceptance() {
            self.drop_key(CacheKey::UnacceptedEvents);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_drops_listings_only() {
        let topic = Uuid::new_v4();
        let plan = InvalidationPlan::for_mutation(&Mutation::ContentCreated {
            kind: ContentKind::Post,
            id: Uuid::new_v4(),
            topic_id: Some(topic),
        });

        assert_eq!(
            plan.invalidate,
            vec![
                CacheKey::Listing(ContentKind::Post),
                CacheKey::TopicListing(ContentKind::Post, topic),
            ]
        );
        assert!(plan.patch.is_none());
    }

    #[test]
    fn event_mutations_include_moderation_listing() {
        let plan = InvalidationPlan::for_mutation(&Mutation::ContentCreated {
            kind: ContentKind::Event,
            id: Uuid::new_v4(),
            topic_id: None,
        });
        assert!(plan.invalidate.contains(&CacheKey::UnacceptedEvents));
        assert!(plan.invalidate.contains(&CacheKey::Listing(ContentKind::Event)));
    }

    #[test]
    fn like_patches_detail_and_drops_listings() {
        let id = Uuid::new_v4();
        let liker = Uuid::new_v4();
        let plan = InvalidationPlan::for_mutation(&Mutation::ContentLiked {
            kind: ContentKind::News,
            id,
            topic_id: None,
            likes: vec![liker],
        });

        assert_eq!(plan.invalidate, vec![CacheKey::Listing(ContentKind::News)]);
        assert!(!plan.invalidate.contains(&CacheKey::Detail(ContentKind::News, id)));
        assert_eq!(
            plan.patch,
            Some(DetailPatch {
                key: CacheKey::Detail(ContentKind::News, id),
                field: PatchField::Likes,
                members: vec![liker],
            })
        );
    }

    #[test]
    fn view_patches_views_field() {
        let plan = InvalidationPlan::for_mutation(&Mutation::ContentViewed {
            kind: ContentKind::Event,
            id: Uuid::new_v4(),
            topic_id: None,
            views: Vec::new(),
        });
        assert_eq!(
            plan.patch.map(|patch| patch.field),
            Some(PatchField::Views)
        );
    }

    #[test]
    fn edit_moving_topics_drops_both_topic_listings() {
        let id = Uuid::new_v4();
        let old_topic = Uuid::new_v4();
        let new_topic = Uuid::new_v4();
        let plan = InvalidationPlan::for_mutation(&Mutation::ContentEdited {
            kind: ContentKind::Post,
            id,
            topic_id: Some(new_topic),
            previous_topic_id: Some(old_topic),
        });

        assert_eq!(
            plan.invalidate,
            vec![
                CacheKey::Detail(ContentKind::Post, id),
                CacheKey::Listing(ContentKind::Post),
                CacheKey::TopicListing(ContentKind::Post, new_topic),
                CacheKey::TopicListing(ContentKind::Post, old_topic),
            ]
        );
    }

    #[test]
    fn delete_drops_detail_listings_and_comments() {
        let id = Uuid::new_v4();
        let plan = InvalidationPlan::for_mutation(&Mutation::ContentDeleted {
            kind: ContentKind::Post,
            id,
            topic_id: None,
        });
        assert!(plan.invalidate.contains(&CacheKey::Detail(ContentKind::Post, id)));
        assert!(plan.invalidate.contains(&CacheKey::Comments(id)));
        assert!(plan.invalidate.contains(&CacheKey::Listing(ContentKind::Post)));
    }

    #[test]
    fn comment_creation_invalidates_detail_and_comment_listing() {
        let content_id = Uuid::new_v4();
        let plan = InvalidationPlan::for_mutation(&Mutation::CommentCreated {
            kind: ContentKind::Post,
            content_id,
        });
        assert_eq!(
            plan.invalidate,
            vec![
                CacheKey::Comments(content_id),
                CacheKey::Detail(ContentKind::Post, content_id),
            ]
        );
    }

    #[test]
    fn profile_change_drops_only_user_info() {
        let user_id = Uuid::new_v4();
        let plan = InvalidationPlan::for_mutation(&Mutation::ProfileChanged { user_id });
        assert_eq!(plan.invalidate, vec![CacheKey::UserInfo(user_id)]);
        assert!(plan.patch.is_none());
    }

    #[test]
    fn plan_display_summarises_actions() {
        let plan = InvalidationPlan::for_mutation(&Mutation::TagsChanged);
        assert_eq!(
            plan.to_string(),
            "InvalidationPlan { invalidate: 1, patch: none }"
        );
    }
}
