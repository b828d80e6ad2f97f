//! Bans and administrative cache maintenance.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use tracing::info;
use uuid::Uuid;

use crate::application::auth::SessionStore;
use crate::application::error::AppError;
use crate::application::identity::Principal;
use crate::application::repos::{BansRepo, CreateBanParams, UsersRepo};
use crate::cache::{CacheCoordinator, Mutation};
use crate::domain::entities::BanRecord;
use crate::infra::error::InfraError;

const TARGET: &str = "agora::application::moderation";

#[derive(Debug, Clone)]
pub struct BanCommand {
    pub user_id: Uuid,
    pub reason: String,
    /// `None` bans permanently.
    pub days: Option<u32>,
}

#[derive(Clone)]
pub struct ModerationService {
    users: Arc<dyn UsersRepo>,
    bans: Arc<dyn BansRepo>,
    sessions: SessionStore,
    cache: Arc<CacheCoordinator>,
}

impl ModerationService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        bans: Arc<dyn BansRepo>,
        sessions: SessionStore,
        cache: Arc<CacheCoordinator>,
    ) -> Self {
        Self {
            users,
            bans,
            sessions,
            cache,
        }
    }

    /// Ban a user, flag the account and end its sessions.
    pub async fn ban(&self, principal: &Principal, command: BanCommand) -> Result<BanRecord, AppError> {
        principal.require_admin()?;
        if command.reason.trim().is_empty() {
            return Err(AppError::validation("reason must not be empty"));
        }
        if command.user_id == principal.user_id {
            return Err(AppError::validation("administrators cannot ban themselves"));
        }

        let user = self
            .users
            .find_by_id(command.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("user"))?;

        let now = OffsetDateTime::now_utc();
        if let Some(existing) = self.bans.find_active_for_user(user.id).await? {
            if existing.is_in_force(now) {
                return Err(AppError::conflict("user is already banned"));
            }
            self.bans.deactivate_ban(existing.id).await?;
        }

        let ban = self
            .bans
            .create_ban(CreateBanParams {
                user_id: user.id,
                admin_id: principal.user_id,
                reason: command.reason.trim().to_string(),
                expires_at: command
                    .days
                    .map(|days| now + Duration::days(i64::from(days))),
            })
            .await?;
        self.users.set_banned(user.id, true).await?;
        let revoked = self.sessions.revoke_user(user.id).await;
        self.cache
            .apply(&Mutation::ProfileChanged { user_id: user.id })
            .await;

        info!(
            target: TARGET,
            user = %user.id,
            admin = %principal.user_id,
            days = ?command.days,
            revoked,
            "user banned"
        );
        Ok(ban)
    }

    pub async fn unban(&self, principal: &Principal, user_id: Uuid) -> Result<(), AppError> {
        principal.require_admin()?;
        let ban = self
            .bans
            .find_active_for_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("ban"))?;

        self.bans.deactivate_ban(ban.id).await?;
        self.users.set_banned(user_id, false).await?;
        self.cache
            .apply(&Mutation::ProfileChanged { user_id })
            .await;

        info!(target: TARGET, user = %user_id, admin = %principal.user_id, "user unbanned");
        Ok(())
    }

    pub async fn list_bans(&self, principal: &Principal) -> Result<Vec<BanRecord>, AppError> {
        principal.require_admin()?;
        Ok(self.bans.list_active().await?)
    }

    /// Drop cache keys matching a glob pattern; returns how many went.
    pub async fn purge_cache(&self, principal: &Principal, pattern: &str) -> Result<u64, AppError> {
        principal.require_admin()?;
        let pattern = pattern.trim();
        if pattern.is_empty() {
            return Err(AppError::validation("pattern must not be empty"));
        }

        let removed = self
            .cache
            .purge(pattern)
            .await
            .map_err(InfraError::from)?;
        info!(target: TARGET, pattern, removed, admin = %principal.user_id, "cache purged");
        Ok(removed)
    }
}
