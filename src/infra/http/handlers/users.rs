use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::infra::http::error::ApiError;
use crate::infra::http::identity::Identity;
use crate::infra::http::models::ProfileRequest;
use crate::infra::http::state::HttpState;

use super::store_image_field;

const AVATAR_CATEGORY: &str = "avatars";

pub async fn get_profile(
    State(state): State<HttpState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.users.profile(id).await?))
}

pub async fn last_activity(
    State(state): State<HttpState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.users.last_activity(id).await?))
}

pub async fn update_profile(
    State(state): State<HttpState>,
    identity: Identity,
    Json(payload): Json<ProfileRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let info = state
        .users
        .update_profile(&identity.principal, payload.into())
        .await?;
    Ok(Json(info))
}

pub async fn upload_avatar(
    State(state): State<HttpState>,
    identity: Identity,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let reference = store_image_field(&state, AVATAR_CATEGORY, multipart).await?;
    let info = state
        .users
        .update_avatar(&identity.principal, &reference)
        .await?;
    Ok(Json(info))
}
