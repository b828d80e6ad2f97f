//! Filesystem storage for user images (avatars, covers, item photos).

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use sha2::{Digest, Sha256};
use slug::slugify;
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use uuid::Uuid;

/// Public prefix under which stored files are served.
pub const UPLOADS_ROUTE: &str = "/uploads";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

#[derive(Debug, Error)]
pub enum UploadStorageError {
    #[error("invalid stored path")]
    InvalidPath,
    #[error("unsupported file type `{0}`; expected an image")]
    UnsupportedType(String),
    #[error("uploaded file exceeds {limit} bytes")]
    TooLarge { limit: u64 },
    #[error("uploaded file is empty")]
    EmptyPayload,
    #[error("upload stream failed: {0}")]
    Stream(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Where an upload landed. `reference` is what gets stored on the entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    pub reference: String,
    pub stored_path: String,
    pub checksum: String,
    pub size_bytes: u64,
}

#[derive(Debug)]
pub struct UploadStorage {
    root: PathBuf,
    max_bytes: u64,
}

impl UploadStorage {
    pub fn new(root: PathBuf, max_bytes: u64) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;
        Ok(Self { root, max_bytes })
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Stream an image to disk under `<category>/<uuid>-<slug>.<ext>`.
    ///
    /// Partial files are removed when the stream fails or overruns the limit.
    pub async fn store_image<S>(
        &self,
        category: &str,
        original_name: &str,
        stream: S,
    ) -> Result<StoredUpload, UploadStorageError>
    where
        S: Stream<Item = Result<Bytes, UploadStorageError>>,
    {
        let filename = image_filename(original_name)?;
        let stored_path = format!("{}/{}-{filename}", slugify(category), Uuid::new_v4());
        let absolute = self.resolve(&stored_path)?;
        if let Some(parent) = absolute.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut file = fs::File::create(&absolute).await?;
        let mut hasher = Sha256::new();
        let mut total: u64 = 0;

        pin_mut!(stream);
        while let Some(chunk) = stream.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(err) => {
                    drop(file);
                    let _ = fs::remove_file(&absolute).await;
                    return Err(err);
                }
            };

            total = total.saturating_add(chunk.len() as u64);
            if total > self.max_bytes {
                drop(file);
                let _ = fs::remove_file(&absolute).await;
                return Err(UploadStorageError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            file.write_all(&chunk).await?;
            hasher.update(&chunk);
        }
        file.flush().await?;

        if total == 0 {
            drop(file);
            let _ = fs::remove_file(&absolute).await;
            return Err(UploadStorageError::EmptyPayload);
        }

        Ok(StoredUpload {
            reference: format!("{UPLOADS_ROUTE}/{stored_path}"),
            stored_path,
            checksum: hex::encode(hasher.finalize()),
            size_bytes: total,
        })
    }

    pub async fn read(&self, stored_path: &str) -> Result<Bytes, UploadStorageError> {
        let absolute = self.resolve(stored_path)?;
        Ok(Bytes::from(fs::read(absolute).await?))
    }

    fn resolve(&self, stored_path: &str) -> Result<PathBuf, UploadStorageError> {
        let relative = Path::new(stored_path);
        if relative.is_absolute()
            || relative.components().any(|component| {
                matches!(
                    component,
                    Component::ParentDir | Component::Prefix(_) | Component::RootDir
                )
            })
        {
            return Err(UploadStorageError::InvalidPath);
        }
        Ok(self.root.join(relative))
    }
}

fn image_filename(original: &str) -> Result<String, UploadStorageError> {
    let path = Path::new(original);
    let extension = path
        .extension()
        .and_then(|value| value.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !IMAGE_EXTENSIONS.contains(&extension.as_str()) {
        return Err(UploadStorageError::UnsupportedType(extension));
    }

    let stem = path
        .file_stem()
        .and_then(|value| value.to_str())
        .map(slugify)
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "image".to_string());
    Ok(format!("{stem}.{extension}"))
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;

    fn chunks(parts: &[&'static [u8]]) -> impl Stream<Item = Result<Bytes, UploadStorageError>> {
        stream::iter(
            parts
                .iter()
                .map(|part| Ok(Bytes::from_static(part)))
                .collect::<Vec<_>>(),
        )
    }

    #[tokio::test]
    async fn stores_images_with_slugged_names() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = UploadStorage::new(dir.path().to_path_buf(), 1024).expect("storage");

        let stored = storage
            .store_image("avatars", "My Car.PNG", chunks(&[b"abc", b"def"]))
            .await
            .expect("store");

        assert!(stored.stored_path.starts_with("avatars/"));
        assert!(stored.stored_path.ends_with("-my-car.png"));
        assert_eq!(stored.reference, format!("/uploads/{}", stored.stored_path));
        assert_eq!(stored.size_bytes, 6);
        assert_eq!(
            storage.read(&stored.stored_path).await.expect("read"),
            Bytes::from_static(b"abcdef")
        );
    }

    #[tokio::test]
    async fn rejects_non_images_and_oversized_payloads() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = UploadStorage::new(dir.path().to_path_buf(), 4).expect("storage");

        let err = storage
            .store_image("covers", "notes.txt", chunks(&[b"abc"]))
            .await
            .expect_err("text file");
        assert!(matches!(err, UploadStorageError::UnsupportedType(_)));

        let err = storage
            .store_image("covers", "big.jpg", chunks(&[b"abc", b"def"]))
            .await
            .expect_err("too large");
        assert!(matches!(err, UploadStorageError::TooLarge { limit: 4 }));
    }

    #[tokio::test]
    async fn refuses_paths_outside_the_root() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = UploadStorage::new(dir.path().to_path_buf(), 16).expect("storage");
        assert!(matches!(
            storage.read("../etc/passwd").await,
            Err(UploadStorageError::InvalidPath)
        ));
    }
}
