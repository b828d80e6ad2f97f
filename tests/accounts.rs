mod common;

use std::sync::Arc;

use agora::application::error::AppError;
use agora::application::moderation::BanCommand;
use agora::application::repos::UsersRepo;
use agora::cache::{CacheConfig, CacheError, CacheStore, MemoryCacheStore};
use async_trait::async_trait;
use common::{PASSWORD, TestApp};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

/// Session store that can issue and resolve tokens but fails every
/// scan and delete.
struct UnrevokableStore {
    inner: MemoryCacheStore,
}

#[async_trait]
impl CacheStore for UnrevokableStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.inner.get(key).await
    }

    async fn set(
        &self,
        key: &str,
        value: String,
        ttl: std::time::Duration,
    ) -> Result<(), CacheError> {
        self.inner.set(key, value, ttl).await
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Err(CacheError::backend("down"))
    }

    async fn scan(&self, _pattern: &str) -> Result<Vec<String>, CacheError> {
        Err(CacheError::backend("down"))
    }

    async fn delete_pattern(&self, _pattern: &str) -> Result<u64, CacheError> {
        Err(CacheError::backend("down"))
    }
}

fn unrevokable_app() -> TestApp {
    TestApp::with_session_store(Arc::new(UnrevokableStore {
        inner: MemoryCacheStore::unbounded(),
    }))
}

#[tokio::test]
async fn login_issues_a_session_that_resolves_to_the_user() {
    let app = TestApp::new();
    let user = app.register("alice").await;

    let outcome = app
        .state
        .auth
        .login("alice@example.com", PASSWORD)
        .await
        .expect("login");
    assert_eq!(outcome.user.id, user.user_id);
    assert!(app.session_owner(&outcome.token).await.is_some());

    let principal = app
        .state
        .auth
        .authenticate(&outcome.token)
        .await
        .expect("authenticate")
        .expect("session resolves");
    assert_eq!(principal.user_id, user.user_id);

    app.state
        .auth
        .logout(&principal, &outcome.token)
        .await
        .expect("logout");
    assert!(
        app.state
            .auth
            .authenticate(&outcome.token)
            .await
            .expect("authenticate")
            .is_none()
    );
}

#[tokio::test]
async fn wrong_password_and_duplicate_registration_are_rejected() {
    let app = TestApp::new();
    app.register("bob").await;

    let err = app
        .state
        .auth
        .login("bob", "not the password")
        .await
        .expect_err("bad password");
    assert!(matches!(err, AppError::Unauthorized));

    let err = app
        .state
        .auth
        .register(agora::application::auth::RegisterCommand {
            email: "BOB@example.com".to_string(),
            nickname: "bobby".to_string(),
            name: "Bob".to_string(),
            last_name: "Again".to_string(),
            password: PASSWORD.to_string(),
        })
        .await
        .expect_err("email taken");
    assert_eq!(err.status_code().as_u16(), 409);
}

#[tokio::test]
async fn seven_day_ban_blocks_login_until_lifted() {
    let app = TestApp::new();
    let admin = app.register_admin("admin").await;
    let user = app.register("carol").await;
    let session = app
        .state
        .auth
        .login("carol", PASSWORD)
        .await
        .expect("login");

    let before = OffsetDateTime::now_utc();
    let ban = app
        .state
        .moderation
        .ban(
            &admin,
            BanCommand {
                user_id: user.user_id,
                reason: "spam".to_string(),
                days: Some(7),
            },
        )
        .await
        .expect("ban");
    let expires_at = ban.expires_at.expect("temporary ban");
    assert!(expires_at >= before + Duration::days(7));
    assert!(expires_at <= OffsetDateTime::now_utc() + Duration::days(7));

    let record = app
        .repos
        .find_by_id(user.user_id)
        .await
        .expect("lookup")
        .expect("user");
    assert!(record.is_banned);
    assert!(
        app.state
            .auth
            .authenticate(&session.token)
            .await
            .expect("authenticate")
            .is_none()
    );

    let err = app
        .state
        .auth
        .login("carol", PASSWORD)
        .await
        .expect_err("banned login");
    assert!(matches!(err, AppError::Forbidden(_)));

    let err = app
        .state
        .moderation
        .ban(
            &admin,
            BanCommand {
                user_id: user.user_id,
                reason: "again".to_string(),
                days: None,
            },
        )
        .await
        .expect_err("already banned");
    assert_eq!(err.status_code().as_u16(), 409);

    app.state
        .moderation
        .unban(&admin, user.user_id)
        .await
        .expect("unban");
    assert!(
        app.state
            .moderation
            .list_bans(&admin)
            .await
            .expect("bans")
            .is_empty()
    );
    app.state
        .auth
        .login("carol", PASSWORD)
        .await
        .expect("login after unban");
}

#[tokio::test]
async fn only_admins_may_ban() {
    let app = TestApp::new();
    let user = app.register("dave").await;
    let other = app.register("erin").await;

    let err = app
        .state
        .moderation
        .ban(
            &user,
            BanCommand {
                user_id: other.user_id,
                reason: "no".to_string(),
                days: None,
            },
        )
        .await
        .expect_err("not an admin");
    assert!(matches!(err, AppError::Forbidden(_)));
}

#[tokio::test]
async fn reset_token_works_once_and_revokes_sessions() {
    let app = TestApp::new();
    let user = app.register("frank").await;
    let session = app
        .state
        .auth
        .login("frank", PASSWORD)
        .await
        .expect("login");

    app.state
        .auth
        .forgot_password("frank@example.com")
        .await
        .expect("forgot");
    let token = app
        .mailer
        .last_token_for(user.user_id)
        .expect("token mailed");

    app.state
        .auth
        .reset_password(&token, "a brand new secret")
        .await
        .expect("reset");
    assert!(
        app.state
            .auth
            .authenticate(&session.token)
            .await
            .expect("authenticate")
            .is_none()
    );

    let err = app
        .state
        .auth
        .reset_password(&token, "yet another secret")
        .await
        .expect_err("token reuse");
    assert_eq!(err.status_code().as_u16(), 400);

    app.state
        .auth
        .login("frank", "a brand new secret")
        .await
        .expect("login with new password");
    let err = app
        .state
        .auth
        .login("frank", PASSWORD)
        .await
        .expect_err("old password");
    assert!(matches!(err, AppError::Unauthorized));
}

#[tokio::test]
async fn purge_drops_matching_keys_only() {
    let app = TestApp::new();
    let admin = app.register_admin("root").await;
    let session = app
        .state
        .auth
        .login("root", PASSWORD)
        .await
        .expect("login");
    app.state
        .content
        .list_all(agora::domain::types::ContentKind::News)
        .await
        .expect("warm listing");
    assert!(app.cached("allNews").await.is_some());

    let removed = app
        .state
        .moderation
        .purge_cache(&admin, "all*")
        .await
        .expect("purge");
    assert_eq!(removed, 1);
    assert!(app.cached("allNews").await.is_none());
    assert!(app.session_owner(&session.token).await.is_some());
}

#[tokio::test]
async fn sessions_survive_snapshot_cache_pressure() {
    let app = TestApp::new();
    app.register("grace").await;
    let session = app
        .state
        .auth
        .login("grace", PASSWORD)
        .await
        .expect("login");

    let snapshots = app.cache.store();
    for _ in 0..=CacheConfig::default().capacity {
        snapshots
            .set(
                &format!("post:{}", Uuid::new_v4()),
                "{}".to_string(),
                std::time::Duration::from_secs(60),
            )
            .await
            .expect("fill snapshot cache");
    }

    assert!(
        app.state
            .auth
            .authenticate(&session.token)
            .await
            .expect("authenticate")
            .is_some()
    );
}

#[tokio::test]
async fn ban_commits_when_session_revocation_fails() {
    let app = unrevokable_app();
    let admin = app.register_admin("heidi").await;
    let user = app.register("ivan").await;

    app.state
        .moderation
        .ban(
            &admin,
            BanCommand {
                user_id: user.user_id,
                reason: "spam".to_string(),
                days: Some(7),
            },
        )
        .await
        .expect("ban succeeds without revoking sessions");
    let stored = app
        .repos
        .find_by_id(user.user_id)
        .await
        .expect("find")
        .expect("user");
    assert!(stored.is_banned);
}

#[tokio::test]
async fn logout_and_reset_tolerate_revocation_failures() {
    let app = unrevokable_app();
    let user = app.register("judy").await;
    let session = app
        .state
        .auth
        .login("judy", PASSWORD)
        .await
        .expect("login");
    let principal = app
        .state
        .auth
        .authenticate(&session.token)
        .await
        .expect("authenticate")
        .expect("session resolves");

    app.state
        .auth
        .logout(&principal, &session.token)
        .await
        .expect("logout");

    app.state
        .auth
        .forgot_password("judy@example.com")
        .await
        .expect("forgot");
    let token = app
        .mailer
        .last_token_for(user.user_id)
        .expect("token mailed");
    app.state
        .auth
        .reset_password(&token, "a brand new secret")
        .await
        .expect("reset succeeds without revoking sessions");
    app.state
        .auth
        .login("judy", "a brand new secret")
        .await
        .expect("login with new password");
}
