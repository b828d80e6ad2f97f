//! Moderation and maintenance endpoints. Every service call checks the admin role.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::infra::http::error::ApiError;
use crate::infra::http::identity::Identity;
use crate::infra::http::models::{BanRequest, PurgeRequest, PurgeResponse, TagRequest, TopicRequest};
use crate::infra::http::state::HttpState;

pub async fn list_bans(
    State(state): State<HttpState>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.moderation.list_bans(&identity.principal).await?))
}

pub async fn ban_user(
    State(state): State<HttpState>,
    identity: Identity,
    Json(payload): Json<BanRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let ban = state
        .moderation
        .ban(&identity.principal, payload.into())
        .await?;
    Ok((StatusCode::CREATED, Json(ban)))
}

pub async fn unban_user(
    State(state): State<HttpState>,
    identity: Identity,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.moderation.unban(&identity.principal, user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn purge_cache(
    State(state): State<HttpState>,
    identity: Identity,
    Json(payload): Json<PurgeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let deleted = state
        .moderation
        .purge_cache(&identity.principal, &payload.pattern)
        .await?;
    Ok(Json(PurgeResponse { deleted }))
}

pub async fn unaccepted_events(
    State(state): State<HttpState>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state.content.list_unaccepted(&identity.principal).await?,
    ))
}

pub async fn accept_event(
    State(state): State<HttpState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state.content.accept_event(&identity.principal, id).await?,
    ))
}

pub async fn create_topic(
    State(state): State<HttpState>,
    identity: Identity,
    Json(payload): Json<TopicRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let topic = state
        .taxonomy
        .create_topic(&identity.principal, &payload.title, payload.image.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(topic)))
}

pub async fn create_tag(
    State(state): State<HttpState>,
    identity: Identity,
    Json(payload): Json<TagRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let tag = state
        .taxonomy
        .create_tag(&identity.principal, &payload.title)
        .await?;
    Ok((StatusCode::CREATED, Json(tag)))
}
