use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use uuid::Uuid;

use crate::infra::http::error::ApiError;
use crate::infra::http::state::HttpState;

pub async fn list_topics(State(state): State<HttpState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.taxonomy.topics().await?))
}

pub async fn get_topic(
    State(state): State<HttpState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.taxonomy.topic(id).await?))
}

pub async fn list_tags(State(state): State<HttpState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.taxonomy.tags().await?))
}

pub async fn content_tags(
    State(state): State<HttpState>,
    Path(content_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.taxonomy.tags_for_content(content_id).await?))
}
