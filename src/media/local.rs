use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

use super::{ImageHost, MediaError, UploadOptions, UploadedImage};

/// Disk-backed image host used when no Cloudinary credentials are
/// configured. Files land in the local media directory and are served
/// under `/media/`.
pub struct LocalImageHost {
    media_dir: PathBuf,
    public_base: String,
}

impl LocalImageHost {
    pub fn new(media_dir: PathBuf, public_base: String) -> Self {
        Self {
            media_dir,
            public_base: public_base.trim_end_matches('/').to_string(),
        }
    }

    /// Public ids map straight to file names, so anything that could walk
    /// out of the media directory is rejected.
    fn checked_file_name(public_id: &str) -> Result<&str, MediaError> {
        let clean = !public_id.is_empty()
            && !public_id.contains('/')
            && !public_id.contains('\\')
            && !public_id.contains("..");
        if clean {
            Ok(public_id)
        } else {
            Err(MediaError::InvalidReference(public_id.to_string()))
        }
    }
}

#[async_trait]
impl ImageHost for LocalImageHost {
    async fn upload(
        &self,
        file: &Path,
        _options: &UploadOptions,
    ) -> Result<UploadedImage, MediaError> {
        tokio::fs::create_dir_all(&self.media_dir).await?;

        let extension = file
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("bin");
        let file_name = format!("{}.{}", Uuid::new_v4().simple(), extension);

        tokio::fs::copy(file, self.media_dir.join(&file_name)).await?;
        info!(file = %file_name, "cover image stored locally");

        Ok(UploadedImage {
            public_url: format!("{}/media/{}", self.public_base, file_name),
            public_id: file_name,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        let file_name = Self::checked_file_name(public_id)?;

        match tokio::fs::remove_file(self.media_dir.join(file_name)).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("bookhub-local-{}-{}", label, Uuid::new_v4()))
    }

    #[tokio::test]
    async fn upload_stores_and_destroy_removes() {
        let staging = scratch_dir("staging");
        let media = scratch_dir("media");
        tokio::fs::create_dir_all(&staging).await.unwrap();
        let source = staging.join("cover.png");
        tokio::fs::write(&source, b"bytes").await.unwrap();

        let host = LocalImageHost::new(media.clone(), "http://localhost:3000/".to_string());
        let uploaded = host
            .upload(&source, &UploadOptions::default())
            .await
            .unwrap();

        assert!(uploaded.public_url.starts_with("http://localhost:3000/media/"));
        assert!(uploaded.public_id.ends_with(".png"));
        assert!(media.join(&uploaded.public_id).exists());

        host.destroy(&uploaded.public_id).await.unwrap();
        assert!(!media.join(&uploaded.public_id).exists());

        std::fs::remove_dir_all(&staging).ok();
        std::fs::remove_dir_all(&media).ok();
    }

    #[tokio::test]
    async fn destroy_is_idempotent() {
        let host = LocalImageHost::new(scratch_dir("gone"), "http://localhost".to_string());

        host.destroy("missing.png").await.unwrap();
    }

    #[tokio::test]
    async fn destroy_rejects_path_traversal() {
        let host = LocalImageHost::new(scratch_dir("guard"), "http://localhost".to_string());

        for public_id in ["../secrets.txt", "a/b.png", "..", ""] {
            let err = host.destroy(public_id).await.unwrap_err();
            assert!(matches!(err, MediaError::InvalidReference(_)));
        }
    }
}
