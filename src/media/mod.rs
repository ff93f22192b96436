use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::config::AppConfig;

pub mod cleanup;
pub mod cloudinary;
pub mod local;

pub use cleanup::release_image;
pub use cloudinary::CloudinaryHost;
pub use local::LocalImageHost;

/// Errors from image hosting.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image host request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("image host rejected the request ({status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("invalid image reference: {0}")]
    InvalidReference(String),
}

/// Host-assigned identity of an uploaded image. `public_id` is what the
/// host needs back to delete the asset later.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub public_url: String,
    pub public_id: String,
}

#[derive(Debug, Clone, Default)]
pub struct UploadOptions {
    pub folder: String,
}

/// A place to put cover images and get them back out.
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(
        &self,
        file: &Path,
        options: &UploadOptions,
    ) -> Result<UploadedImage, MediaError>;

    async fn destroy(&self, public_id: &str) -> Result<(), MediaError>;
}

/// Pick the host from configuration: Cloudinary when credentials are set,
/// local disk otherwise.
pub fn host_from_config(config: &AppConfig) -> Arc<dyn ImageHost> {
    if config.media.cloud_name.is_empty() {
        Arc::new(LocalImageHost::new(
            config.media.local_media_dir.clone(),
            config.server.public_url.clone(),
        ))
    } else {
        Arc::new(CloudinaryHost::new(&config.media))
    }
}

/// An upload parked on local disk between request intake and handoff to the
/// image host. The backing file is removed when the value drops.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
}

impl StagedUpload {
    /// Write request bytes into the staging directory under a fresh name.
    /// The original file name contributes only a sanitized extension.
    pub async fn stage(
        staging_dir: &Path,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<Self, MediaError> {
        tokio::fs::create_dir_all(staging_dir).await?;

        let file_name = format!("{}.{}", Uuid::new_v4(), sanitized_extension(original_name));
        let path = staging_dir.join(file_name);
        tokio::fs::write(&path, bytes).await?;

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedUpload {
    fn drop(&mut self) {
        if let Err(err) = std::fs::remove_file(&self.path) {
            debug!(path = %self.path.display(), error = %err, "staged upload not removed");
        }
    }
}

fn sanitized_extension(original_name: &str) -> String {
    Path::new(original_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| {
            !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .unwrap_or_else(|| "bin".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(label: &str) -> PathBuf {
        std::env::temp_dir().join(format!("bookhub-media-{}-{}", label, Uuid::new_v4()))
    }

    #[test]
    fn extensions_are_sanitized() {
        assert_eq!(sanitized_extension("cover.PNG"), "png");
        assert_eq!(sanitized_extension("cover"), "bin");
        assert_eq!(sanitized_extension("weird.j/pg"), "bin");
        assert_eq!(sanitized_extension("archive.tar.gz"), "gz");
    }

    #[tokio::test]
    async fn staged_file_is_removed_on_drop() {
        let dir = scratch_dir("stage");

        let staged = StagedUpload::stage(&dir, "cover.png", b"not a real png")
            .await
            .unwrap();
        let path = staged.path().to_path_buf();
        assert!(path.exists());

        drop(staged);
        assert!(!path.exists());

        std::fs::remove_dir_all(&dir).ok();
    }
}
