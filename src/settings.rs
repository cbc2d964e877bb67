//! Runtime settings from environment (and `.env` when present).

use crate::error::ConfigError;
use std::path::PathBuf;

const DEFAULT_BASE_URL: &str = "http://localhost:3000/";
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_SCHEMA: &str = "public";

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: Option<String>,
    /// Public base URL; always ends with '/'. Upload URLs are built as `{base_url}uploads/...`.
    pub base_url: String,
    /// Root directory for [`crate::upload::LocalFileStorage`].
    pub upload_dir: PathBuf,
    /// Directory for temporary upload files. None means the OS temp dir.
    pub temp_dir: Option<PathBuf>,
    /// When set, uploads go to this S3 bucket instead of the local upload dir.
    pub s3_bucket: Option<String>,
    /// Schema used for entities that do not name one.
    pub default_schema: String,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            temp_dir: None,
            s3_bucket: None,
            default_schema: DEFAULT_SCHEMA.to_string(),
        }
    }
}

impl Settings {
    /// Read settings from `RESOURCE_*` variables and `DATABASE_URL`. Loads `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let base_url = non_empty("RESOURCE_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") && !base_url.starts_with('/') {
            return Err(ConfigError::Settings(format!(
                "RESOURCE_BASE_URL must be an absolute URL or path, got '{}'",
                base_url
            )));
        }

        Ok(Settings {
            database_url: non_empty("DATABASE_URL"),
            base_url: with_trailing_slash(base_url),
            upload_dir: non_empty("RESOURCE_UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            temp_dir: non_empty("RESOURCE_TEMP_DIR").map(PathBuf::from),
            s3_bucket: non_empty("RESOURCE_S3_BUCKET"),
            default_schema: non_empty("RESOURCE_SCHEMA").unwrap_or_else(|| DEFAULT_SCHEMA.into()),
        })
    }

    /// Temporary directory for uploads in flight.
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

fn with_trailing_slash(mut s: String) -> String {
    if !s.ends_with('/') {
        s.push('/');
    }
    s
}
