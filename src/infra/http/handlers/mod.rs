pub mod admin;
pub mod auth;
pub mod comments;
pub mod content;
pub mod health;
pub mod market;
pub mod notifications;
pub mod stats;
pub mod taxonomy;
pub mod uploads;
pub mod users;

use axum::extract::Multipart;
use futures::StreamExt;
use tracing::info;

use crate::infra::uploads::UploadStorageError;

use super::error::ApiError;
use super::state::HttpState;

const UPLOAD_FIELD: &str = "file";

/// Stream the `file` field of a multipart body into upload storage and
/// return the reference to store on the entity.
pub(super) async fn store_image_field(
    state: &HttpState,
    category: &str,
    mut multipart: Multipart,
) -> Result<String, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::bad_request("invalid multipart payload", Some(err.to_string())))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::bad_request("missing file name", None))?;
        let chunks =
            field.map(|chunk| chunk.map_err(|err| UploadStorageError::Stream(err.to_string())));
        let stored = state
            .upload_storage
            .store_image(category, &filename, chunks)
            .await?;
        info!(
            target: "agora::http::uploads",
            category,
            path = %stored.stored_path,
            size_bytes = stored.size_bytes,
            checksum = %stored.checksum,
            "image stored"
        );
        return Ok(stored.reference);
    }
    Err(ApiError::bad_request("missing file", None))
}
