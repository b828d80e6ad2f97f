use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::application::realtime::notification_room;
use crate::infra::http::error::ApiError;
use crate::infra::http::identity::Identity;
use crate::infra::http::models::MarkedResponse;
use crate::infra::http::sse::room_stream;
use crate::infra::http::state::HttpState;

pub async fn list_notifications(
    State(state): State<HttpState>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.notifications.list(&identity.principal).await?))
}

pub async fn mark_read(
    State(state): State<HttpState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .notifications
        .mark_read(&identity.principal, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn mark_all_read(
    State(state): State<HttpState>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    let updated = state
        .notifications
        .mark_all_read(&identity.principal)
        .await?;
    Ok(Json(MarkedResponse { updated }))
}

pub async fn delete_notification(
    State(state): State<HttpState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.notifications.delete(&identity.principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Live feed of the caller's notification room.
pub async fn stream_notifications(
    State(state): State<HttpState>,
    identity: Identity,
) -> Response {
    room_stream(
        state.realtime.clone(),
        notification_room(identity.principal.user_id),
    )
}
