use std::sync::Arc;
use std::time::Duration;

use crate::application::auth::{AuthService, ResetMailer, SessionStore};
use crate::application::comments::CommentService;
use crate::application::content::ContentService;
use crate::application::market::MarketService;
use crate::application::moderation::ModerationService;
use crate::application::notifications::{NotificationDispatcher, NotificationService};
use crate::application::realtime::RealtimeChannel;
use crate::application::repos::{
    BansRepo, CommentsRepo, ContentRepo, MarketRepo, NotificationsRepo, TaxonomyRepo, UsersRepo,
};
use crate::application::stats::StatsService;
use crate::application::taxonomy::TaxonomyService;
use crate::application::users::UserService;
use crate::cache::{CacheCoordinator, CacheStore};
use crate::infra::db::PostgresRepositories;
use crate::infra::uploads::UploadStorage;

/// Everything a store backend has to provide to serve the API.
pub trait Repositories:
    UsersRepo
    + BansRepo
    + ContentRepo
    + CommentsRepo
    + NotificationsRepo
    + TaxonomyRepo
    + MarketRepo
    + 'static
{
}

impl<T> Repositories for T where
    T: UsersRepo
        + BansRepo
        + ContentRepo
        + CommentsRepo
        + NotificationsRepo
        + TaxonomyRepo
        + MarketRepo
        + 'static
{
}

/// Shared handles the services are built from.
pub struct Collaborators<R> {
    pub repos: Arc<R>,
    pub cache: Arc<CacheCoordinator>,
    /// Holds `token:<t>` entries. Must not evict; never the snapshot store.
    pub sessions: Arc<dyn CacheStore>,
    pub realtime: Arc<dyn RealtimeChannel>,
    pub uploads: Arc<UploadStorage>,
    pub mailer: Arc<dyn ResetMailer>,
    pub reset_token_ttl: Duration,
    pub cookie_secure: bool,
    /// Present when the Postgres backend is active; backs `/_health/db`.
    pub db: Option<Arc<PostgresRepositories>>,
}

#[derive(Clone)]
pub struct HttpState {
    pub auth: Arc<AuthService>,
    pub content: Arc<ContentService>,
    pub comments: Arc<CommentService>,
    pub notifications: Arc<NotificationService>,
    pub users: Arc<UserService>,
    pub moderation: Arc<ModerationService>,
    pub taxonomy: Arc<TaxonomyService>,
    pub market: Arc<MarketService>,
    pub stats: Arc<StatsService>,
    pub realtime: Arc<dyn RealtimeChannel>,
    pub upload_storage: Arc<UploadStorage>,
    pub cookie_secure: bool,
    pub db: Option<Arc<PostgresRepositories>>,
}

impl HttpState {
    pub fn assemble<R: Repositories>(parts: Collaborators<R>) -> Self {
        let Collaborators {
            repos,
            cache,
            sessions,
            realtime,
            uploads,
            mailer,
            reset_token_ttl,
            cookie_secure,
            db,
        } = parts;

        let users: Arc<dyn UsersRepo> = repos.clone();
        let bans: Arc<dyn BansRepo> = repos.clone();
        let content: Arc<dyn ContentRepo> = repos.clone();
        let comments: Arc<dyn CommentsRepo> = repos.clone();
        let notifications: Arc<dyn NotificationsRepo> = repos.clone();
        let taxonomy: Arc<dyn TaxonomyRepo> = repos.clone();
        let market: Arc<dyn MarketRepo> = repos;

        let sessions = SessionStore::new(sessions, cache.config().session_ttl());
        let dispatcher = NotificationDispatcher::new(notifications.clone(), realtime.clone());

        Self {
            auth: Arc::new(AuthService::new(
                users.clone(),
                bans.clone(),
                sessions.clone(),
                cache.clone(),
                mailer,
                reset_token_ttl,
            )),
            content: Arc::new(ContentService::new(
                content.clone(),
                comments.clone(),
                users.clone(),
                taxonomy.clone(),
                cache.clone(),
            )),
            comments: Arc::new(CommentService::new(
                comments.clone(),
                content.clone(),
                users.clone(),
                cache.clone(),
                dispatcher,
            )),
            notifications: Arc::new(NotificationService::new(notifications)),
            users: Arc::new(UserService::new(
                users.clone(),
                comments,
                content.clone(),
                cache.clone(),
            )),
            moderation: Arc::new(ModerationService::new(
                users.clone(),
                bans,
                sessions,
                cache.clone(),
            )),
            taxonomy: Arc::new(TaxonomyService::new(
                taxonomy.clone(),
                content.clone(),
                cache,
            )),
            market: Arc::new(MarketService::new(market, realtime.clone())),
            stats: Arc::new(StatsService::new(users, taxonomy, content)),
            realtime,
            upload_storage: uploads,
            cookie_secure,
            db,
        }
    }
}
