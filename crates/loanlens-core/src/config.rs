//! Configuration module
//!
//! Settings are read from the environment (with `.env` support) once at
//! start-up and handed to the storage factory, the submission sink and the
//! watermark composer.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use chrono_tz::Tz;

use crate::constants::{DEFAULT_JPEG_QUALITY, EVIDENCE_KEY_PREFIX};
use crate::storage_types::StorageBackend;

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(anyhow::anyhow!("Invalid log format: {}", s)),
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    pub log_format: LogFormat,
    // Storage configuration
    pub storage_backend: StorageBackend,
    pub s3_bucket: Option<String>,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO, etc.)
    pub local_storage_path: Option<String>,
    pub local_storage_base_url: Option<String>,
    pub evidence_key_prefix: String,
    // Submission sink: HTTP when SUBMISSION_API_URL is set, otherwise a local directory
    pub submission_api_url: Option<String>,
    pub submission_api_key: Option<String>,
    pub submission_dir: Option<PathBuf>,
    // Watermark rendering
    /// Replaces the bundled font when set.
    pub watermark_font_path: Option<PathBuf>,
    /// `None` renders watermark times in the device's local timezone.
    pub watermark_timezone: Option<Tz>,
    pub watermark_jpeg_quality: u8,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_format: LogFormat::Pretty,
            storage_backend: StorageBackend::Local,
            s3_bucket: None,
            s3_region: None,
            s3_endpoint: None,
            local_storage_path: None,
            local_storage_base_url: None,
            evidence_key_prefix: EVIDENCE_KEY_PREFIX.to_string(),
            submission_api_url: None,
            submission_api_key: None,
            submission_dir: None,
            watermark_font_path: None,
            watermark_timezone: None,
            watermark_jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup (environment, test map, ...).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = non_empty("ENVIRONMENT")
            .or_else(|| non_empty("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let log_format = non_empty("LOG_FORMAT")
            .map(|v| v.parse::<LogFormat>())
            .transpose()?
            .unwrap_or_default();

        let storage_backend = non_empty("STORAGE_BACKEND")
            .map(|v| v.parse::<StorageBackend>())
            .transpose()?
            .unwrap_or(StorageBackend::Local);

        let watermark_timezone = non_empty("WATERMARK_TIMEZONE")
            .map(|v| {
                v.parse::<Tz>()
                    .map_err(|e| anyhow::anyhow!("Invalid WATERMARK_TIMEZONE '{}': {}", v, e))
            })
            .transpose()?;

        let watermark_jpeg_quality = non_empty("WATERMARK_JPEG_QUALITY")
            .map(|v| {
                v.parse::<u8>()
                    .map_err(|e| anyhow::anyhow!("Invalid WATERMARK_JPEG_QUALITY '{}': {}", v, e))
            })
            .transpose()?
            .unwrap_or(DEFAULT_JPEG_QUALITY);

        let config = Config {
            environment,
            log_format,
            storage_backend,
            s3_bucket: non_empty("S3_BUCKET"),
            s3_region: non_empty("S3_REGION").or_else(|| non_empty("AWS_REGION")),
            s3_endpoint: non_empty("S3_ENDPOINT"),
            local_storage_path: non_empty("LOCAL_STORAGE_PATH"),
            local_storage_base_url: non_empty("LOCAL_STORAGE_BASE_URL"),
            evidence_key_prefix: non_empty("EVIDENCE_KEY_PREFIX")
                .map(|p| p.trim_matches('/').to_string())
                .unwrap_or_else(|| EVIDENCE_KEY_PREFIX.to_string()),
            submission_api_url: non_empty("SUBMISSION_API_URL"),
            submission_api_key: non_empty("SUBMISSION_API_KEY"),
            submission_dir: non_empty("SUBMISSION_DIR").map(PathBuf::from),
            watermark_font_path: non_empty("WATERMARK_FONT_PATH").map(PathBuf::from),
            watermark_timezone,
            watermark_jpeg_quality,
        };

        Ok(config)
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_bucket.is_none() {
                    return Err(anyhow::anyhow!("STORAGE_BACKEND=s3 requires S3_BUCKET"));
                }
                if self.s3_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "STORAGE_BACKEND=s3 requires S3_REGION or AWS_REGION"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() || self.local_storage_base_url.is_none() {
                    return Err(anyhow::anyhow!(
                        "STORAGE_BACKEND=local requires LOCAL_STORAGE_PATH and LOCAL_STORAGE_BASE_URL"
                    ));
                }
            }
        }

        if self.evidence_key_prefix.is_empty() || self.evidence_key_prefix.contains("..") {
            return Err(anyhow::anyhow!(
                "EVIDENCE_KEY_PREFIX must be a non-empty relative path"
            ));
        }

        if !(1..=100).contains(&self.watermark_jpeg_quality) {
            return Err(anyhow::anyhow!(
                "WATERMARK_JPEG_QUALITY must be between 1 and 100"
            ));
        }

        if let Some(url) = &self.submission_api_url {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(anyhow::anyhow!("SUBMISSION_API_URL must be an http(s) URL"));
            }
            if self.is_production() && url.starts_with("http://") {
                return Err(anyhow::anyhow!(
                    "SUBMISSION_API_URL must use https in production"
                ));
            }
        } else if self.submission_dir.is_none() {
            return Err(anyhow::anyhow!(
                "Either SUBMISSION_API_URL or SUBMISSION_DIR must be set"
            ));
        }

        Ok(())
    }
}
