#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use agora::application::auth::{RegisterCommand, ResetMailer};
use agora::application::error::AppError;
use agora::application::identity::Principal;
use agora::application::realtime::{RealtimeChannel, RealtimeEvent, notification_room};
use agora::application::repos::UsersRepo;
use agora::cache::{CacheConfig, CacheCoordinator, CacheStore, MemoryCacheStore};
use agora::domain::entities::UserRecord;
use agora::domain::types::Role;
use agora::infra::http::{Collaborators, HttpState};
use agora::infra::memory::MemoryRepositories;
use agora::infra::realtime::RealtimeHub;
use agora::infra::uploads::UploadStorage;
use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::broadcast;
use uuid::Uuid;

pub const PASSWORD: &str = "correct horse";

/// Keeps every reset token handed out so tests can consume them.
#[derive(Default)]
pub struct CapturingMailer {
    sent: Mutex<Vec<(Uuid, String)>>,
}

impl CapturingMailer {
    pub fn last_token_for(&self, user_id: Uuid) -> Option<String> {
        self.sent
            .lock()
            .expect("mailer lock")
            .iter()
            .rev()
            .find(|(id, _)| *id == user_id)
            .map(|(_, token)| token.clone())
    }
}

#[async_trait]
impl ResetMailer for CapturingMailer {
    async fn send_reset(&self, user: &UserRecord, token: &str) -> Result<(), AppError> {
        self.sent
            .lock()
            .expect("mailer lock")
            .push((user.id, token.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub state: HttpState,
    pub repos: Arc<MemoryRepositories>,
    pub cache: Arc<CacheCoordinator>,
    pub sessions: Arc<dyn CacheStore>,
    pub realtime: Arc<RealtimeHub>,
    pub mailer: Arc<CapturingMailer>,
    _uploads: TempDir,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_session_store(Arc::new(MemoryCacheStore::unbounded()))
    }

    /// Build the app around a caller-supplied session store.
    pub fn with_session_store(sessions: Arc<dyn CacheStore>) -> Self {
        let config = CacheConfig::default();
        let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new(&config));
        let cache = Arc::new(CacheCoordinator::new(config, store));
        let repos = Arc::new(MemoryRepositories::new());
        let realtime = Arc::new(RealtimeHub::default());
        let mailer = Arc::new(CapturingMailer::default());
        let uploads_dir = tempfile::tempdir().expect("tempdir");
        let uploads = Arc::new(
            UploadStorage::new(uploads_dir.path().to_path_buf(), 1024 * 1024)
                .expect("upload storage"),
        );

        let channel: Arc<dyn RealtimeChannel> = realtime.clone();
        let reset_mailer: Arc<dyn ResetMailer> = mailer.clone();
        let state = HttpState::assemble(Collaborators {
            repos: repos.clone(),
            cache: cache.clone(),
            sessions: sessions.clone(),
            realtime: channel,
            uploads,
            mailer: reset_mailer,
            reset_token_ttl: Duration::from_secs(3600),
            cookie_secure: false,
            db: None,
        });

        Self {
            state,
            repos,
            cache,
            sessions,
            realtime,
            mailer,
            _uploads: uploads_dir,
        }
    }

    pub async fn register(&self, nickname: &str) -> Principal {
        let info = self
            .state
            .auth
            .register(RegisterCommand {
                email: format!("{nickname}@example.com"),
                nickname: nickname.to_string(),
                name: "Test".to_string(),
                last_name: "User".to_string(),
                password: PASSWORD.to_string(),
            })
            .await
            .expect("register");
        Principal::new(info.id, Role::User)
    }

    pub async fn register_admin(&self, nickname: &str) -> Principal {
        let user = self.register(nickname).await;
        self.repos
            .set_role(user.user_id, Role::Admin)
            .await
            .expect("promote");
        Principal::new(user.user_id, Role::Admin)
    }

    pub async fn cached(&self, key: &str) -> Option<String> {
        self.cache.store().get(key).await.expect("cache get")
    }

    pub async fn session_owner(&self, token: &str) -> Option<String> {
        self.sessions
            .get(&format!("token:{token}"))
            .await
            .expect("session get")
    }

    pub fn subscribe_notifications(&self, user_id: Uuid) -> broadcast::Receiver<RealtimeEvent> {
        self.realtime.join(&notification_room(user_id))
    }
}
