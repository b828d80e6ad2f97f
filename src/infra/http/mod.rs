//! JSON API over the application services.

pub mod error;
pub mod handlers;
pub mod identity;
mod middleware;
pub mod models;
mod sse;
pub mod state;

pub use error::ApiError;
pub use state::{Collaborators, HttpState, Repositories};

use axum::{
    Extension, Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{delete, get, post, put},
};

use crate::domain::types::ContentKind;

use self::handlers::{
    admin, auth, comments, content, health, market, notifications, stats, taxonomy, uploads, users,
};
use self::middleware::{log_responses, set_request_context};

/// Multipart framing on top of the file itself.
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

fn content_routes(kind: ContentKind) -> Router<HttpState> {
    Router::new()
        .route(
            "/",
            get(content::list_content).post(content::create_content),
        )
        .route(
            "/{id}",
            get(content::get_content)
                .put(content::update_content)
                .delete(content::delete_content),
        )
        .route("/{id}/like", post(content::like_content))
        .route("/{id}/view", post(content::view_content))
        .route("/{id}/image", post(content::upload_image))
        .layer(Extension(kind))
}

pub fn build_router(state: HttpState) -> Router {
    let body_limit = usize::try_from(
        state
            .upload_storage
            .max_bytes()
            .saturating_add(MULTIPART_OVERHEAD),
    )
    .unwrap_or(usize::MAX);

    let mut api = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
        .route("/auth/forgot-password", post(auth::forgot_password))
        .route("/auth/reset-password", post(auth::reset_password))
        .route("/comments", post(comments::create_comment))
        .route("/comments/{id}", delete(comments::delete_comment))
        .route("/comments/{id}/like", post(comments::like_comment))
        .route("/content/{id}/comments", get(comments::list_comments))
        .route("/content/{id}/tags", get(taxonomy::content_tags))
        .route("/notifications", get(notifications::list_notifications))
        .route("/notifications/stream", get(notifications::stream_notifications))
        .route("/notifications/read-all", post(notifications::mark_all_read))
        .route("/notifications/{id}", delete(notifications::delete_notification))
        .route("/notifications/{id}/read", post(notifications::mark_read))
        .route("/users/me", put(users::update_profile))
        .route("/users/me/avatar", post(users::upload_avatar))
        .route("/users/{id}", get(users::get_profile))
        .route("/users/{id}/activity", get(users::last_activity))
        .route("/topics", get(taxonomy::list_topics))
        .route("/topics/{id}", get(taxonomy::get_topic))
        .route("/tags", get(taxonomy::list_tags))
        .route(
            "/market/items",
            get(market::list_items).post(market::create_item),
        )
        .route("/market/items/mine", get(market::list_my_items))
        .route("/market/items/{id}", get(market::get_item))
        .route("/market/items/{id}/purchase", post(market::purchase_item))
        .route("/market/items/{id}/chat", post(market::open_chat))
        .route("/market/photos", post(market::upload_photo))
        .route("/market/chats", get(market::list_chats))
        .route("/market/chats/{id}", get(market::get_chat))
        .route("/market/chats/{id}/messages", post(market::send_message))
        .route("/market/chats/{id}/stream", get(market::stream_chat))
        .route("/stats", get(stats::site_stats))
        .route("/admin/bans", get(admin::list_bans).post(admin::ban_user))
        .route("/admin/bans/{user_id}", delete(admin::unban_user))
        .route("/admin/cache/purge", post(admin::purge_cache))
        .route("/admin/events/unaccepted", get(admin::unaccepted_events))
        .route("/admin/events/{id}/accept", post(admin::accept_event))
        .route("/admin/topics", post(admin::create_topic))
        .route("/admin/tags", post(admin::create_tag));

    for kind in [ContentKind::Post, ContentKind::News, ContentKind::Event] {
        api = api.nest(&format!("/{}", kind.route_segment()), content_routes(kind));
    }

    Router::new()
        .nest("/api", api)
        .route("/uploads/{*path}", get(uploads::serve_upload))
        .route("/_health", get(health::liveness))
        .route("/_health/db", get(health::db_health))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}
