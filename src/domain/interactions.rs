//! Like, view and threading rules shared by every interaction path.
//!
//! These functions operate on in-memory sets; persistence adapters call them
//! (or an equivalent atomic statement) and the services decide what to
//! invalidate afterwards.

use uuid::Uuid;

use crate::domain::entities::CommentRecord;
use crate::domain::error::DomainError;
use crate::domain::types::NotificationKind;

pub const ALREADY_VIEWED: &str = "already viewed";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
}

/// Flip membership of `user_id` in a like set.
pub fn toggle_member(set: &mut Vec<Uuid>, user_id: Uuid) -> ToggleOutcome {
    if let Some(position) = set.iter().position(|member| *member == user_id) {
        set.remove(position);
        ToggleOutcome::Removed
    } else {
        set.push(user_id);
        ToggleOutcome::Added
    }
}

/// Record a first view; a repeat view is rejected and leaves the set untouched.
pub fn record_view(set: &mut Vec<Uuid>, user_id: Uuid) -> Result<(), DomainError> {
    if set.contains(&user_id) {
        return Err(DomainError::conflict(ALREADY_VIEWED));
    }
    set.push(user_id);
    Ok(())
}

/// Check that a reply targets an existing comment on the same content item.
pub fn validate_reply(
    comment_id: Uuid,
    content_id: Uuid,
    reply_to: Uuid,
    parent: Option<&CommentRecord>,
) -> Result<(), DomainError> {
    if reply_to == comment_id {
        return Err(DomainError::validation("a comment cannot reply to itself"));
    }
    let parent = parent.ok_or_else(|| DomainError::not_found("comment"))?;
    if parent.content_id != content_id {
        return Err(DomainError::validation(
            "reply target belongs to a different content item",
        ));
    }
    Ok(())
}

/// A notification the dispatcher should emit for a new comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationTarget {
    pub recipient_id: Uuid,
    pub kind: NotificationKind,
}

/// Derive the notifications owed for a new comment.
///
/// The reply and content-author emissions are decided independently, so one
/// recipient may receive both when they wrote the parent comment and the
/// content item.
pub fn comment_notification_targets(
    commenter_id: Uuid,
    content_author_id: Uuid,
    parent_author_id: Option<Uuid>,
) -> Vec<NotificationTarget> {
    let mut targets = Vec::with_capacity(2);
    if let Some(parent_author_id) = parent_author_id
        && parent_author_id != commenter_id
    {
        targets.push(NotificationTarget {
            recipient_id: parent_author_id,
            kind: NotificationKind::Reply,
        });
    }
    if content_author_id != commenter_id {
        targets.push(NotificationTarget {
            recipient_id: content_author_id,
            kind: NotificationKind::Comment,
        });
    }
    targets
}

#[cfg(test)]
mod tests {
    use time::OffsetDateTime;

    use super::*;

    fn comment_on(content_id: Uuid) -> CommentRecord {
        CommentRecord {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            content_id,
            reply_to: None,
            body: "first".to_string(),
            created_at: OffsetDateTime::now_utc(),
            likes: Vec::new(),
        }
    }

    #[test]
    fn toggling_twice_restores_membership() {
        let user = Uuid::new_v4();
        let other = Uuid::new_v4();
        let mut likes = vec![other];

        assert_eq!(toggle_member(&mut likes, user), ToggleOutcome::Added);
        assert_eq!(likes, vec![other, user]);
        assert_eq!(toggle_member(&mut likes, user), ToggleOutcome::Removed);
        assert_eq!(likes, vec![other]);
    }

    #[test]
    fn second_view_is_rejected_without_growth() {
        let user = Uuid::new_v4();
        let mut views = Vec::new();

        record_view(&mut views, user).expect("first view");
        let err = record_view(&mut views, user).expect_err("second view");

        assert_eq!(err, DomainError::conflict(ALREADY_VIEWED));
        assert_eq!(views.len(), 1);
    }

    #[test]
    fn reply_must_target_same_content() {
        let content_id = Uuid::new_v4();
        let parent = comment_on(content_id);
        let new_id = Uuid::new_v4();

        assert!(validate_reply(new_id, content_id, parent.id, Some(&parent)).is_ok());
        assert!(matches!(
            validate_reply(new_id, Uuid::new_v4(), parent.id, Some(&parent)),
            Err(DomainError::Validation { .. })
        ));
        assert!(matches!(
            validate_reply(new_id, content_id, new_id, None),
            Err(DomainError::Validation { .. })
        ));
        assert_eq!(
            validate_reply(new_id, content_id, Uuid::new_v4(), None),
            Err(DomainError::not_found("comment"))
        );
    }

    #[test]
    fn fan_out_targets_both_distinct_authors() {
        let commenter = Uuid::new_v4();
        let parent_author = Uuid::new_v4();
        let content_author = Uuid::new_v4();

        let targets =
            comment_notification_targets(commenter, content_author, Some(parent_author));

        assert_eq!(
            targets,
            vec![
                NotificationTarget {
                    recipient_id: parent_author,
                    kind: NotificationKind::Reply,
                },
                NotificationTarget {
                    recipient_id: content_author,
                    kind: NotificationKind::Comment,
                },
            ]
        );
    }

    #[test]
    fn self_reply_on_own_content_notifies_nobody() {
        let author = Uuid::new_v4();
        assert!(comment_notification_targets(author, author, Some(author)).is_empty());
    }

    #[test]
    fn same_recipient_can_receive_both_kinds() {
        let commenter = Uuid::new_v4();
        let author = Uuid::new_v4();
        let targets = comment_notification_targets(commenter, author, Some(author));
        assert_eq!(targets.len(), 2);
    }
}
