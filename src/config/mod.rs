use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Application configuration, built once at startup and passed into the
/// services that need it. Defaults come from the environment preset; every
/// field can be overridden with an individual environment variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub security: SecurityConfig,
    pub api: ApiConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    /// Base URL clients can reach this service on; used to build links to
    /// locally hosted media.
    pub public_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Empty means unconfigured; token issue/verify fails with a
    /// configuration error rather than falling back to a baked-in secret.
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    pub bcrypt_cost: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Fixed page size for book listings.
    pub page_size: i64,
    /// Request body cap; covers multipart uploads.
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Cloudinary-style account. An empty cloud_name selects the local
    /// filesystem host instead.
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub upload_folder: String,
    /// Where incoming multipart files are staged before upload.
    pub staging_dir: PathBuf,
    /// Root of locally hosted media, served under /media.
    pub local_media_dir: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid DATABASE_URL: {0}")]
    InvalidDatabaseUrl(String),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        let config = match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
        .finalized();

        config.validate()?;
        Ok(config)
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("PUBLIC_URL") {
            self.server.public_url = v;
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECT_TIMEOUT_SECS") {
            self.database.connect_timeout_secs =
                v.parse().unwrap_or(self.database.connect_timeout_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("JWT_SECRET") {
            self.security.jwt_secret = v;
        }
        if let Ok(v) = env::var("JWT_TTL_HOURS") {
            self.security.token_ttl_hours = v.parse().unwrap_or(self.security.token_ttl_hours);
        }
        if let Ok(v) = env::var("BCRYPT_COST") {
            self.security.bcrypt_cost = v.parse().unwrap_or(self.security.bcrypt_cost);
        }

        // API overrides
        if let Ok(v) = env::var("PAGE_SIZE") {
            self.api.page_size = v.parse().unwrap_or(self.api.page_size);
        }
        if let Ok(v) = env::var("MAX_UPLOAD_BYTES") {
            self.api.max_upload_bytes = v.parse().unwrap_or(self.api.max_upload_bytes);
        }

        // Media overrides
        if let Ok(v) = env::var("CLOUDINARY_CLOUD_NAME") {
            self.media.cloud_name = v;
        }
        if let Ok(v) = env::var("CLOUDINARY_API_KEY") {
            self.media.api_key = v;
        }
        if let Ok(v) = env::var("CLOUDINARY_API_SECRET") {
            self.media.api_secret = v;
        }
        if let Ok(v) = env::var("MEDIA_UPLOAD_FOLDER") {
            self.media.upload_folder = v;
        }
        if let Ok(v) = env::var("MEDIA_STAGING_DIR") {
            self.media.staging_dir = PathBuf::from(v);
        }
        if let Ok(v) = env::var("MEDIA_LOCAL_DIR") {
            self.media.local_media_dir = PathBuf::from(v);
        }

        self
    }

    fn finalized(mut self) -> Self {
        if self.server.public_url.is_empty() {
            self.server.public_url = format!("http://localhost:{}", self.server.port);
        }
        self
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(&self.database.url)
            .map_err(|e| ConfigError::InvalidDatabaseUrl(e.to_string()))?;
        if !parsed.scheme().starts_with("postgres") {
            return Err(ConfigError::InvalidDatabaseUrl(format!(
                "unsupported scheme '{}'",
                parsed.scheme()
            )));
        }
        Ok(())
    }

    /// Development defaults: runnable against a local database with a
    /// throwaway JWT secret.
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig {
                port: 3000,
                public_url: String::new(),
            },
            database: DatabaseConfig {
                url: "postgres://localhost:5432/bookhub_dev".to_string(),
                max_connections: 5,
                connect_timeout_secs: 5,
            },
            security: SecurityConfig {
                jwt_secret: "bookhub-dev-secret".to_string(),
                token_ttl_hours: 3,
                bcrypt_cost: 10,
            },
            api: ApiConfig {
                page_size: 10,
                max_upload_bytes: 5 * 1024 * 1024,
            },
            media: MediaConfig {
                cloud_name: String::new(),
                api_key: String::new(),
                api_secret: String::new(),
                upload_folder: "book-covers".to_string(),
                staging_dir: PathBuf::from("public/uploads"),
                local_media_dir: PathBuf::from("public/media"),
            },
        }
    }

    pub fn staging() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Staging;
        config.database.url = "postgres://localhost:5432/bookhub_staging".to_string();
        config.database.max_connections = 10;
        config.security.jwt_secret = String::new();
        config
    }

    /// Production defaults: secrets and the database must come from the
    /// environment.
    pub fn production() -> Self {
        let mut config = Self::development();
        config.environment = Environment::Production;
        config.database.url = "postgres://localhost:5432/bookhub".to_string();
        config.database.max_connections = 20;
        config.database.connect_timeout_secs = 10;
        config.security.jwt_secret = String::new();
        config.security.bcrypt_cost = 12;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_preset_is_runnable() {
        let config = AppConfig::development();
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.api.page_size, 10);
        assert_eq!(config.security.token_ttl_hours, 3);
        assert_eq!(config.security.bcrypt_cost, 10);
        assert!(!config.security.jwt_secret.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn production_preset_requires_secret_from_env() {
        let config = AppConfig::production();
        assert_eq!(config.environment, Environment::Production);
        assert!(config.security.jwt_secret.is_empty());
        assert!(config.database.max_connections > AppConfig::development().database.max_connections);
    }

    #[test]
    fn finalized_fills_public_url_from_port() {
        let mut config = AppConfig::development();
        config.server.port = 4242;
        let config = config.finalized();
        assert_eq!(config.server.public_url, "http://localhost:4242");
    }

    #[test]
    fn validate_rejects_non_postgres_urls() {
        let mut config = AppConfig::development();
        config.database.url = "mysql://localhost/bookhub".to_string();
        assert!(config.validate().is_err());

        config.database.url = "not a url".to_string();
        assert!(config.validate().is_err());
    }
}
