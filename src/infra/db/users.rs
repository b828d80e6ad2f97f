use async_trait::async_trait;
use time::OffsetDateTime;
use uuid::Uuid;

use super::PostgresRepositories;
use super::util::{convert_count, map_sqlx_error};
use crate::application::repos::{
    BansRepo, CreateBanParams, CreateUserParams, RepoError, UpdateProfileParams, UsersRepo,
};
use crate::domain::entities::{BanRecord, UserRecord};
use crate::domain::types::Role;

const USER_COLUMNS: &str = "id, email, nickname, name, last_name, password_hash, role, \
    is_banned, avatar, car, rank, reset_token_hash, reset_token_expires_at, created_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    nickname: String,
    name: String,
    last_name: String,
    password_hash: String,
    role: Role,
    is_banned: bool,
    avatar: Option<String>,
    car: Option<String>,
    rank: String,
    reset_token_hash: Option<String>,
    reset_token_expires_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            nickname: row.nickname,
            name: row.name,
            last_name: row.last_name,
            password_hash: row.password_hash,
            role: row.role,
            is_banned: row.is_banned,
            avatar: row.avatar,
            car: row.car,
            rank: row.rank,
            reset_token_hash: row.reset_token_hash,
            reset_token_expires_at: row.reset_token_expires_at,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct BanRow {
    id: Uuid,
    user_id: Uuid,
    admin_id: Uuid,
    reason: String,
    created_at: OffsetDateTime,
    expires_at: Option<OffsetDateTime>,
    active: bool,
}

impl From<BanRow> for BanRecord {
    fn from(row: BanRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            admin_id: row.admin_id,
            reason: row.reason,
            created_at: row.created_at,
            expires_at: row.expires_at,
            active: row.active,
        }
    }
}

impl PostgresRepositories {
    async fn fetch_user(&self, condition: &str, value: &str) -> Result<Option<UserRecord>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {condition}");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(value)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(UserRecord::from))
    }

    async fn touch_user(&self, sql: &str, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query(sql)
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn create_user(&self, params: CreateUserParams) -> Result<UserRecord, RepoError> {
        let sql = format!(
            "INSERT INTO users (id, email, nickname, name, last_name, password_hash, role) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(&params.email)
            .bind(&params.nickname)
            .bind(&params.name)
            .bind(&params.last_name)
            .bind(&params.password_hash)
            .bind(params.role)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(UserRecord::from))
    }

    async fn find_many(&self, ids: &[Uuid]) -> Result<Vec<UserRecord>, RepoError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)");
        let rows = sqlx::query_as::<_, UserRow>(&sql)
            .bind(ids)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(UserRecord::from).collect())
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<UserRecord>, RepoError> {
        self.fetch_user("email = lower($1) OR nickname = $1 LIMIT 1", login)
            .await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, RepoError> {
        self.fetch_user("email = $1", email).await
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
    ) -> Result<Option<UserRecord>, RepoError> {
        self.fetch_user("reset_token_hash = $1", token_hash).await
    }

    async fn update_profile(&self, params: UpdateProfileParams) -> Result<UserRecord, RepoError> {
        let sql = format!(
            "UPDATE users SET name = $2, last_name = $3, nickname = $4, car = $5 \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(params.id)
            .bind(&params.name)
            .bind(&params.last_name)
            .bind(&params.nickname)
            .bind(&params.car)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn update_avatar(&self, id: Uuid, avatar: &str) -> Result<UserRecord, RepoError> {
        let sql = format!("UPDATE users SET avatar = $2 WHERE id = $1 RETURNING {USER_COLUMNS}");
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .bind(avatar)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn set_banned(&self, id: Uuid, banned: bool) -> Result<(), RepoError> {
        let sql = if banned {
            "UPDATE users SET is_banned = TRUE WHERE id = $1"
        } else {
            "UPDATE users SET is_banned = FALSE WHERE id = $1"
        };
        self.touch_user(sql, id).await
    }

    async fn set_role(&self, id: Uuid, role: Role) -> Result<(), RepoError> {
        let result = sqlx::query("UPDATE users SET role = $2 WHERE id = $1")
            .bind(id)
            .bind(role)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> Result<(), RepoError> {
        let result = sqlx::query(
            "UPDATE users SET reset_token_hash = $2, reset_token_expires_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn update_password(&self, id: Uuid, password_hash: &str) -> Result<(), RepoError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, reset_token_hash = NULL, \
             reset_token_expires_at = NULL WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn count_users(&self) -> Result<u64, RepoError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        convert_count(count)
    }
}

const BAN_COLUMNS: &str = "id, user_id, admin_id, reason, created_at, expires_at, active";

#[async_trait]
impl BansRepo for PostgresRepositories {
    async fn create_ban(&self, params: CreateBanParams) -> Result<BanRecord, RepoError> {
        let sql = format!(
            "INSERT INTO bans (id, user_id, admin_id, reason, expires_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {BAN_COLUMNS}"
        );
        let row = sqlx::query_as::<_, BanRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(params.user_id)
            .bind(params.admin_id)
            .bind(&params.reason)
            .bind(params.expires_at)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.into())
    }

    async fn find_active_for_user(&self, user_id: Uuid) -> Result<Option<BanRecord>, RepoError> {
        let sql = format!(
            "SELECT {BAN_COLUMNS} FROM bans WHERE user_id = $1 AND active \
             ORDER BY created_at DESC LIMIT 1"
        );
        let row = sqlx::query_as::<_, BanRow>(&sql)
            .bind(user_id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(BanRecord::from))
    }

    async fn deactivate_ban(&self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("UPDATE bans SET active = FALSE WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn list_active(&self) -> Result<Vec<BanRecord>, RepoError> {
        let sql = format!("SELECT {BAN_COLUMNS} FROM bans WHERE active ORDER BY created_at DESC");
        let rows = sqlx::query_as::<_, BanRow>(&sql)
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(rows.into_iter().map(BanRecord::from).collect())
    }
}
