//! Accounts, sessions and password resets.

use std::sync::Arc;
use std::time::Duration;

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use async_trait::async_trait;
use metrics::counter;
use serde::Serialize;
use sha2::{Digest, Sha256};
use time::OffsetDateTime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::application::error::AppError;
use crate::application::identity::Principal;
use crate::application::repos::{BansRepo, CreateUserParams, UsersRepo};
use crate::application::views::UserInfo;
use crate::cache::{
    CacheCoordinator, CacheError, CacheKey, CacheStore, Mutation, SESSION_PATTERN,
};
use crate::domain::entities::UserRecord;
use crate::domain::types::Role;
use crate::infra::error::InfraError;

const TARGET: &str = "agora::application::auth";
const MIN_PASSWORD_LEN: usize = 8;

/// Delivers password reset tokens to their owner.
#[async_trait]
pub trait ResetMailer: Send + Sync {
    async fn send_reset(&self, user: &UserRecord, token: &str) -> Result<(), AppError>;
}

/// Development mailer: writes the reset path to the log instead of sending mail.
pub struct LogResetMailer;

#[async_trait]
impl ResetMailer for LogResetMailer {
    async fn send_reset(&self, user: &UserRecord, token: &str) -> Result<(), AppError> {
        info!(
            target: TARGET,
            user = %user.id,
            email = %user.email,
            path = %format!("/reset-password/{token}"),
            "password reset issued"
        );
        Ok(())
    }
}

/// Opaque session tokens kept as `token:<token>` → user id in a store of
/// their own, apart from the snapshot cache.
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    pub async fn issue(&self, user_id: Uuid) -> Result<String, AppError> {
        let token = generate_secret();
        self.store
            .set(
                &CacheKey::Session(token.clone()).to_string(),
                user_id.to_string(),
                self.ttl,
            )
            .await
            .map_err(InfraError::from)?;
        Ok(token)
    }

    /// Resolve a token to its user. Store failures resolve to nobody.
    pub async fn resolve(&self, token: &str) -> Option<Uuid> {
        let key = CacheKey::Session(token.to_string()).to_string();
        match self.store.get(&key).await {
            Ok(value) => value.and_then(|value| Uuid::parse_str(&value).ok()),
            Err(err) => {
                warn!(target: TARGET, error = %err, "session lookup failed; treating as anonymous");
                None
            }
        }
    }

    /// Forget one session. Store failures are logged; the token then lives
    /// until its TTL runs out.
    pub async fn revoke(&self, token: &str) {
        let key = CacheKey::Session(token.to_string()).to_string();
        if let Err(err) = self.store.delete(&key).await {
            report_revoke_failure("revoke.delete", &err);
        }
    }

    /// Drop every session belonging to `user_id`, returning how many went.
    /// Store failures are logged and skipped, never surfaced to the caller.
    pub async fn revoke_user(&self, user_id: Uuid) -> u64 {
        let owner = user_id.to_string();
        let keys = match self.store.scan(SESSION_PATTERN).await {
            Ok(keys) => keys,
            Err(err) => {
                report_revoke_failure("revoke_user.scan", &err);
                return 0;
            }
        };

        let mut revoked = 0;
        for key in keys {
            match self.store.get(&key).await {
                Ok(Some(value)) if value == owner => {}
                Ok(_) => continue,
                Err(err) => {
                    report_revoke_failure("revoke_user.get", &err);
                    continue;
                }
            }
            match self.store.delete(&key).await {
                Ok(()) => revoked += 1,
                Err(err) => report_revoke_failure("revoke_user.delete", &err),
            }
        }
        debug!(target: TARGET, user = %user_id, revoked, "sessions revoked");
        revoked
    }
}

fn report_revoke_failure(op: &'static str, err: &CacheError) {
    counter!("agora_cache_error_total", "op" => op).increment(1);
    warn!(target: TARGET, op, error = %err, "session revocation failed; continuing");
}

#[derive(Debug, Clone)]
pub struct RegisterCommand {
    pub email: String,
    pub nickname: String,
    pub name: String,
    pub last_name: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginOutcome {
    pub token: String,
    pub user: UserInfo,
}

#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UsersRepo>,
    bans: Arc<dyn BansRepo>,
    sessions: SessionStore,
    cache: Arc<CacheCoordinator>,
    mailer: Arc<dyn ResetMailer>,
    reset_token_ttl: time::Duration,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        bans: Arc<dyn BansRepo>,
        sessions: SessionStore,
        cache: Arc<CacheCoordinator>,
        mailer: Arc<dyn ResetMailer>,
        reset_token_ttl: Duration,
    ) -> Self {
        Self {
            users,
            bans,
            sessions,
            cache,
            mailer,
            reset_token_ttl: time::Duration::seconds(
                i64::try_from(reset_token_ttl.as_secs()).unwrap_or(i64::MAX),
            ),
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub async fn register(&self, command: RegisterCommand) -> Result<UserInfo, AppError> {
        let email = command.email.trim().to_lowercase();
        let nickname = command.nickname.trim().to_string();
        if !email.contains('@') {
            return Err(AppError::validation("email must be a valid address"));
        }
        if nickname.is_empty() {
            return Err(AppError::validation("nickname must not be empty"));
        }
        if command.name.trim().is_empty() {
            return Err(AppError::validation("name must not be empty"));
        }
        validate_password(&command.password)?;

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AppError::conflict("email is already registered"));
        }
        if self.users.find_by_login(&nickname).await?.is_some() {
            return Err(AppError::conflict("nickname is already taken"));
        }

        let password_hash = hash_password(&command.password)?;
        let user = self
            .users
            .create_user(CreateUserParams {
                email,
                nickname,
                name: command.name.trim().to_string(),
                last_name: command.last_name.trim().to_string(),
                password_hash,
                role: Role::User,
            })
            .await?;

        info!(target: TARGET, user = %user.id, "user registered");
        Ok(UserInfo::from(&user))
    }

    /// Authenticate by email or nickname. Bans still in force reject the
    /// login; expired ones are lifted on the way through.
    pub async fn login(&self, login: &str, password: &str) -> Result<LoginOutcome, AppError> {
        let mut user = self
            .users
            .find_by_login(login.trim())
            .await?
            .ok_or(AppError::Unauthorized)?;
        if !verify_password(password, &user.password_hash)? {
            return Err(AppError::Unauthorized);
        }

        if user.is_banned {
            let now = OffsetDateTime::now_utc();
            let ban = self.bans.find_active_for_user(user.id).await?;
            if ban.as_ref().is_some_and(|ban| ban.is_in_force(now)) {
                return Err(AppError::Forbidden("account is banned"));
            }
            if let Some(ban) = ban {
                self.bans.deactivate_ban(ban.id).await?;
            }
            self.users.set_banned(user.id, false).await?;
            self.cache
                .apply(&Mutation::ProfileChanged { user_id: user.id })
                .await;
            user.is_banned = false;
            info!(target: TARGET, user = %user.id, "expired ban lifted at login");
        }

        let token = self.sessions.issue(user.id).await?;
        Ok(LoginOutcome {
            token,
            user: UserInfo::from(&user),
        })
    }

    pub async fn logout(&self, principal: &Principal, token: &str) -> Result<(), AppError> {
        self.sessions.revoke(token).await;
        self.cache
            .invalidate(&[CacheKey::UserInfo(principal.user_id)])
            .await;
        Ok(())
    }

    /// Resolve a session token to the caller, or `None` for anonymous.
    pub async fn authenticate(&self, token: &str) -> Result<Option<Principal>, AppError> {
        let Some(user_id) = self.sessions.resolve(token).await else {
            return Ok(None);
        };
        Ok(self
            .user_info(user_id)
            .await?
            .map(|info| Principal::new(info.id, info.role)))
    }

    pub async fn me(&self, principal: &Principal) -> Result<UserInfo, AppError> {
        self.user_info(principal.user_id)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    /// Issue a reset token for `email` and hand it to the mailer. Only the
    /// digest is stored.
    pub async fn forgot_password(&self, email: &str) -> Result<(), AppError> {
        let user = self
            .users
            .find_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(|| AppError::not_found("user"))?;

        let token = generate_secret();
        let expires_at = OffsetDateTime::now_utc() + self.reset_token_ttl;
        self.users
            .set_reset_token(user.id, &hash_token(&token), expires_at)
            .await?;
        self.mailer.send_reset(&user, &token).await
    }

    /// Consume a reset token. A token works once: the password update clears
    /// it, and every session of the user is revoked.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AppError> {
        validate_password(new_password)?;

        let user = self
            .users
            .find_by_reset_token(&hash_token(token))
            .await?
            .ok_or_else(|| AppError::validation("reset token is invalid or expired"))?;
        let now = OffsetDateTime::now_utc();
        if user
            .reset_token_expires_at
            .is_none_or(|expires_at| expires_at <= now)
        {
            return Err(AppError::validation("reset token is invalid or expired"));
        }

        let password_hash = hash_password(new_password)?;
        self.users.update_password(user.id, &password_hash).await?;
        let revoked = self.sessions.revoke_user(user.id).await;
        self.cache
            .apply(&Mutation::ProfileChanged { user_id: user.id })
            .await;

        info!(target: TARGET, user = %user.id, revoked, "password reset");
        Ok(())
    }

    async fn user_info(&self, user_id: Uuid) -> Result<Option<UserInfo>, AppError> {
        let ttl = self.cache.config().user_info_ttl();
        self.cache
            .read_through(&CacheKey::UserInfo(user_id), ttl, || async {
                Ok::<_, AppError>(
                    self.users
                        .find_by_id(user_id)
                        .await?
                        .as_ref()
                        .map(UserInfo::from),
                )
            })
            .await
    }
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|err| AppError::unexpected(format!("invalid salt: {err}")))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AppError::unexpected(format!("password hashing failed: {err}")))
}

fn verify_password(password: &str, stored: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|err| AppError::unexpected(format!("stored password hash is invalid: {err}")))?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(err) => Err(AppError::unexpected(format!(
            "password verification failed: {err}"
        ))),
    }
}

fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

fn generate_secret() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_verifies_only_the_original() {
        let hash = hash_password("correct horse").expect("hash");
        assert!(verify_password("correct horse", &hash).expect("verify"));
        assert!(!verify_password("battery staple", &hash).expect("verify"));
    }

    #[test]
    fn reset_tokens_are_stored_as_hex_digests() {
        let digest = hash_token("token");
        assert_eq!(digest.len(), 64);
        assert_ne!(digest, hash_token("token2"));
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }
}
