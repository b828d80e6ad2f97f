//! Marketplace items and buyer/seller chats.

use axum::Json;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use uuid::Uuid;

use crate::application::realtime::chat_room;
use crate::infra::http::error::ApiError;
use crate::infra::http::identity::Identity;
use crate::infra::http::models::{ItemRequest, MessageRequest, UploadResponse};
use crate::infra::http::sse::room_stream;
use crate::infra::http::state::HttpState;

use super::store_image_field;

const PHOTO_CATEGORY: &str = "items";

pub async fn list_items(State(state): State<HttpState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.market.list_available().await?))
}

pub async fn list_my_items(
    State(state): State<HttpState>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.market.list_mine(&identity.principal).await?))
}

pub async fn create_item(
    State(state): State<HttpState>,
    identity: Identity,
    Json(payload): Json<ItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let item = state
        .market
        .create_item(&identity.principal, payload.into())
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// Photos are uploaded one at a time; the returned references go into `photos`.
pub async fn upload_photo(
    State(state): State<HttpState>,
    _identity: Identity,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let reference = store_image_field(&state, PHOTO_CATEGORY, multipart).await?;
    Ok((StatusCode::CREATED, Json(UploadResponse { reference })))
}

pub async fn get_item(
    State(state): State<HttpState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.market.get_item(id).await?))
}

pub async fn purchase_item(
    State(state): State<HttpState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.market.purchase(&identity.principal, id).await?))
}

pub async fn open_chat(
    State(state): State<HttpState>,
    identity: Identity,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(
        state.market.open_chat(&identity.principal, item_id).await?,
    ))
}

pub async fn list_chats(
    State(state): State<HttpState>,
    identity: Identity,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.market.list_chats(&identity.principal).await?))
}

pub async fn get_chat(
    State(state): State<HttpState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.market.get_chat(&identity.principal, id).await?))
}

pub async fn send_message(
    State(state): State<HttpState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<MessageRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let message = state
        .market
        .send_message(&identity.principal, id, &payload.body)
        .await?;
    Ok((StatusCode::CREATED, Json(message)))
}

/// Participants only; the membership check runs before joining the room.
pub async fn stream_chat(
    State(state): State<HttpState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state.market.get_chat(&identity.principal, id).await?;
    Ok(room_stream(state.realtime.clone(), chat_room(id)))
}
