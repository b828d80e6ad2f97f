use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;

use crate::infra::http::error::ApiError;
use crate::infra::http::state::HttpState;

pub async fn site_stats(State(state): State<HttpState>) -> Result<impl IntoResponse, ApiError> {
    Ok(Json(state.stats.snapshot().await?))
}
