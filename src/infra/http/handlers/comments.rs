use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::infra::http::error::ApiError;
use crate::infra::http::identity::{Identity, MaybeIdentity};
use crate::infra::http::models::CommentRequest;
use crate::infra::http::state::HttpState;

pub async fn create_comment(
    State(state): State<HttpState>,
    identity: Identity,
    Json(payload): Json<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let comment = state
        .comments
        .create(&identity.principal, payload.into())
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_comments(
    State(state): State<HttpState>,
    viewer: MaybeIdentity,
    Path(content_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.comments.list(viewer.principal(), content_id).await?))
}

pub async fn like_comment(
    State(state): State<HttpState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.comments.like(&identity.principal, id).await?))
}

pub async fn delete_comment(
    State(state): State<HttpState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.comments.delete(&identity.principal, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
