use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::{MemoryRepositories, newest_first};
use crate::application::repos::{
    BansRepo, CreateBanParams, CreateUserParams, RepoError, UpdateProfileParams, UsersRepo,
};
use crate::domain::entities::{BanRecord, DEFAULT_RANK, UserRecord};
use crate::domain::types::Role;

#[async_trait]
impl UsersRepo for MemoryRepositories {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let mut users = self.users.write().await;
        if users.values().any(|user| user.email == params.email) {
            return Err(RepoError::duplicate("users_email_key"));
        }
        if users.values().any(|user| user.nickname == params.nickname) {
            return Err(RepoError::duplicate("users_nickname_key"));
        }

        let record = UserRecord {
            id: Uuid::new_v4(),
            email: params.email,
            nickname: params.nickname,
            name: params.name,
            last_name: params.last_name,
            password_hash: params.password_hash,
            role: params.role,
            is_banned: false,
            avatar: None,
            car: None,
            rank: DEFAULT_RANK.to_string(),
            reset_token_hash: None,
            reset_token_expires_at: None,
            created_at: OffsetDateTime::now_utc(),
        };
        users.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<UserRecord>, RepoError> {
        let users = self.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<UserRecord>, RepoError> {
        let lowered = login.to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.email == lowered || user.nickname == login)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.reset_token_hash.as_deref() == Some(token_hash))
            .cloned())
    }

    async fn update_profile(&self, params: UpdateProfileParams) -> Result<UserRecord, RepoError> {
        let mut users = self.users.write().await;
        if users
            .values()
            .any(|user| user.id != params.id && user.nickname == params.nickname)
        {
            return Err(RepoError::duplicate("users_nickname_key"));
        }
        let user = users.get_mut(&params.id).ok_or(RepoError::NotFound)?;
        user.name = params.name;
        user.last_name = params.last_name;
        user.nickname = params.nickname;
        user.car = params.car;
        Ok(user.clone())
    }

    async fn update_avatar(&self, id: Uuid, avatar: &str) -> Result<UserRecord, RepoError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(RepoError::NotFound)?;
        user.avatar = Some(avatar.to_string());
        Ok(user.clone())
    }

    async fn set_banned(&self, id: Uuid, banned: bool) -> Result<(), RepoError> {
        let mut users = self.users.write().await;
        users.get_mut(&id).ok_or(RepoError::NotFound)?.is_banned = banned;
        Ok(())
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<(), RepoError> {
        let mut users = self.users.write().await;
        users.get_mut(&id).ok_or(RepoError::NotFound)?.role = role;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), RepoError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(RepoError::NotFound)?;
        user.reset_token_hash = Some(token_hash.to_string());
        user.reset_token_expires_at = Some(expires_at);
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), RepoError> {
        let mut users = self.users.write().await;
        let user = users.get_mut(&id).ok_or(RepoError::NotFound)?;
        user.password_hash = password_hash.to_string();
        user.reset_token_hash = None;
        user.reset_token_expires_at = None;
        Ok(())
    }

    async fn count_users(&self) -> Result<u64, RepoError> {
        Ok(self.users.read().await.len() as u64)
    }
}

#[async_trait]
impl BansRepo for MemoryRepositories {
    async fn create_ban(&self, params: CreateBanParams) -> Result<BanRecord, RepoError> {
        let record = BanRecord {
            id: Uuid::new_v4(),
            user_id: params.user_id,
            admin_id: params.admin_id,
            reason: params.reason,
            created_at: OffsetDateTime::now_utc(),
            expires_at: params.expires_at,
            active: true,
        };
        self.bans.write().await.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_active_for_user(&self, user_id: Uuid) -> Result<Option<BanRecord>, RepoError> {
        let mut active: Vec<BanRecord> = self
            .bans
            .read()
            .await
            .values()
            .filter(|ban| ban.user_id == user_id && ban.active)
            .cloned()
            .collect();
        newest_first(&mut active, |ban| (ban.created_at, ban.id));
        Ok(active.into_iter().next())
    }

    async fn deactivate_ban(&self, id: Uuid) -> Result<(), RepoError> {
        let mut bans = self.bans.write().await;
        bans.get_mut(&id).ok_or(RepoError::NotFound)?.active = false;
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<BanRecord>, RepoError> {
        let mut active: Vec<BanRecord> = self
            .bans
            .read()
            .await
            .values()
            .filter(|ban| ban.active)
            .cloned()
            .collect();
        newest_first(&mut active, |ban| (ban.created_at, ban.id));
        Ok(active)
    }
}
