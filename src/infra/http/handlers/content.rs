//! Posts, news and events share these handlers; the router injects the kind.

use axum::Json;
use axum::extract::{Extension, Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::application::content::TopicRef;
use crate::domain::types::ContentKind;
use crate::infra::http::error::ApiError;
use crate::infra::http::identity::{Identity, MaybeIdentity};
use crate::infra::http::models::{ContentRequest, TopicQuery};
use crate::infra::http::state::HttpState;

use super::store_image_field;

pub async fn list_content(
    State(state): State<HttpState>,
    Extension(kind): Extension<ContentKind>,
    Query(query): Query<TopicQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let topic = match (query.topic, query.title) {
        (Some(id), _) => Some(TopicRef::Id(id)),
        (None, Some(title)) => Some(TopicRef::Title(title)),
        (None, None) => None,
    };
    let items = match topic {
        Some(topic) => state.content.list_for_topic(kind, topic).await?,
        None => state.content.list_all(kind).await?,
    };
    Ok(Json(items))
}

pub async fn create_content(
    State(state): State<HttpState>,
    Extension(kind): Extension<ContentKind>,
    identity: Identity,
    Json(payload): Json<ContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .content
        .create(&identity.principal, kind, payload.into())
        .await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

pub async fn get_content(
    State(state): State<HttpState>,
    Extension(kind): Extension<ContentKind>,
    viewer: MaybeIdentity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .content
        .get_detail(viewer.principal(), kind, id)
        .await?;
    Ok(Json(detail))
}

pub async fn update_content(
    State(state): State<HttpState>,
    Extension(kind): Extension<ContentKind>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Json(payload): Json<ContentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .content
        .edit(&identity.principal, kind, id, payload.into())
        .await?;
    Ok(Json(detail))
}

pub async fn delete_content(
    State(state): State<HttpState>,
    Extension(kind): Extension<ContentKind>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state.content.delete(&identity.principal, kind, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_content(
    State(state): State<HttpState>,
    Extension(kind): Extension<ContentKind>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.content.like(&identity.principal, kind, id).await?))
}

pub async fn view_content(
    State(state): State<HttpState>,
    Extension(kind): Extension<ContentKind>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.content.view(&identity.principal, kind, id).await?))
}

pub async fn upload_image(
    State(state): State<HttpState>,
    Extension(kind): Extension<ContentKind>,
    identity: Identity,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let reference = store_image_field(&state, kind.route_segment(), multipart).await?;
    let detail = state
        .content
        .set_image(&identity.principal, kind, id, &reference)
        .await?;
    Ok(Json(detail))
}
