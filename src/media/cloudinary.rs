use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use tracing::info;

use super::{ImageHost, MediaError, UploadOptions, UploadedImage};
use crate::config::MediaConfig;

const API_BASE: &str = "https://api.cloudinary.com/v1_1";

/// Cloudinary-backed image host. Requests are authenticated with a
/// SHA-256 signature over the alphabetically sorted parameters.
pub struct CloudinaryHost {
    client: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryHost {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/image/{}", API_BASE, self.cloud_name, action)
    }

    /// Hex SHA-256 of `k=v&k=v...` over sorted params plus the API secret.
    fn sign(&self, params: &[(&str, String)]) -> String {
        let mut sorted: Vec<&(&str, String)> = params.iter().collect();
        sorted.sort_by_key(|(key, _)| *key);

        let to_sign = sorted
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(to_sign.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    async fn reject_on_error(response: reqwest::Response) -> Result<reqwest::Response, MediaError> {
        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status().as_u16();
        let detail = response.text().await.unwrap_or_default();
        Err(MediaError::Rejected { status, detail })
    }
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    async fn upload(
        &self,
        file: &Path,
        options: &UploadOptions,
    ) -> Result<UploadedImage, MediaError> {
        let bytes = tokio::fs::read(file).await?;
        let timestamp = Utc::now().timestamp().to_string();

        let signed = [
            ("folder", options.folder.clone()),
            ("timestamp", timestamp.clone()),
        ];
        let signature = self.sign(&signed);

        let file_name = file
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();

        let form = Form::new()
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("folder", options.folder.clone())
            .text("signature", signature)
            .part("file", Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(self.endpoint("upload"))
            .multipart(form)
            .send()
            .await?;
        let response = Self::reject_on_error(response).await?;
        let body: UploadResponse = response.json().await?;

        info!(public_id = %body.public_id, "cover image uploaded");
        Ok(UploadedImage {
            public_url: body.secure_url,
            public_id: body.public_id,
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), MediaError> {
        let timestamp = Utc::now().timestamp().to_string();

        let signed = [
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp.clone()),
        ];
        let signature = self.sign(&signed);

        let form = Form::new()
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("public_id", public_id.to_string())
            .text("signature", signature);

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .multipart(form)
            .send()
            .await?;
        let response = Self::reject_on_error(response).await?;
        let body: DestroyResponse = response.json().await?;

        // "not found" counts as released; the asset is already gone.
        match body.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(MediaError::Rejected {
                status: 200,
                detail: format!("destroy returned '{}'", other),
            }),
        }
    }
}
