//! Notification fan-out for new comments and the recipient-facing inbox.

use std::sync::Arc;

use metrics::counter;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::identity::Principal;
use crate::application::realtime::{RealtimeChannel, notification_room};
use crate::application::repos::{CreateNotificationParams, NotificationsRepo};
use crate::domain::entities::{CommentRecord, ContentRecord, NotificationRecord, UserRecord};
use crate::domain::interactions::{NotificationTarget, comment_notification_targets};
use crate::domain::types::NotificationKind;

const TARGET: &str = "agora::application::notifications";
pub const NOTIFICATION_EVENT: &str = "notification";
pub const INBOX_LIMIT: u32 = 20;

/// Derives notifications from interactions, persists them and pushes them to
/// the recipient's room. Nothing here fails the originating request.
#[derive(Clone)]
pub struct NotificationDispatcher {
    repo: Arc<dyn NotificationsRepo>,
    realtime: Arc<dyn RealtimeChannel>,
}

impl NotificationDispatcher {
    pub fn new(repo: Arc<dyn NotificationsRepo>, realtime: Arc<dyn RealtimeChannel>) -> Self {
        Self { repo, realtime }
    }

    /// Emit the reply and comment notifications owed for `comment`.
    /// Returns the notifications that were persisted.
    pub async fn comment_created(
        &self,
        commenter: &UserRecord,
        content: &ContentRecord,
        comment: &CommentRecord,
        parent: Option<&CommentRecord>,
    ) -> Vec<NotificationRecord> {
        let targets = comment_notification_targets(
            commenter.id,
            content.author_id,
            parent.map(|parent| parent.author_id),
        );

        let mut delivered = Vec::with_capacity(targets.len());
        for target in targets {
            let params = CreateNotificationParams {
                recipient_id: target.recipient_id,
                kind: target.kind,
                body: notification_text(&commenter.nickname, content, &target),
                link: format!("/{}/{}", content.kind.route_segment(), content.id),
            };
            if let Some(record) = self.deliver(params, comment.id).await {
                delivered.push(record);
            }
        }
        delivered
    }

    async fn deliver(
        &self,
        params: CreateNotificationParams,
        comment_id: Uuid,
    ) -> Option<NotificationRecord> {
        let kind = params.kind;
        let record = match self.repo.create_notification(params).await {
            Ok(record) => record,
            Err(err) => {
                warn!(
                    target: TARGET,
                    kind = kind.as_str(),
                    comment = %comment_id,
                    error = %err,
                    "failed to persist notification"
                );
                return None;
            }
        };

        let room = notification_room(record.recipient_id);
        let payload = match serde_json::to_value(&record) {
            Ok(payload) => payload,
            Err(err) => {
                warn!(target: TARGET, room = %room, error = %err, "failed to encode notification");
                return Some(record);
            }
        };

        match self.realtime.publish(&room, NOTIFICATION_EVENT, payload).await {
            Ok(receivers) => {
                counter!("agora_realtime_publish_total", "event" => NOTIFICATION_EVENT)
                    .increment(1);
                debug!(target: TARGET, room = %room, receivers, "notification published");
            }
            Err(err) => {
                warn!(target: TARGET, room = %room, error = %err, "failed to publish notification");
            }
        }
        Some(record)
    }
}

fn notification_text(nickname: &str, content: &ContentRecord, target: &NotificationTarget) -> String {
    match target.kind {
        NotificationKind::Reply => format!("{nickname} replied to your comment"),
        _ => format!("{nickname} commented on your {}", content.kind.as_str()),
    }
}

#[derive(Clone)]
pub struct NotificationService {
    repo: Arc<dyn NotificationsRepo>,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationsRepo>) -> Self {
        Self { repo }
    }

    pub async fn list(&self, principal: &Principal) -> Result<Vec<NotificationRecord>, AppError> {
        Ok(self
            .repo
            .list_for_user(principal.user_id, INBOX_LIMIT)
            .await?)
    }

    pub async fn mark_read(&self, principal: &Principal, id: Uuid) -> Result<(), AppError> {
        if self.repo.mark_read(principal.user_id, id).await? {
            Ok(())
        } else {
            Err(AppError::not_found("notification"))
        }
    }

    pub async fn mark_all_read(&self, principal: &Principal) -> Result<u64, AppError> {
        Ok(self.repo.mark_all_read(principal.user_id).await?)
    }

    pub async fn delete(&self, principal: &Principal, id: Uuid) -> Result<(), AppError> {
        if self.repo.delete_notification(principal.user_id, id).await? {
            Ok(())
        } else {
            Err(AppError::not_found("notification"))
        }
    }
}
