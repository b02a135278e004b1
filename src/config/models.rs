use crate::humanize::ByteSize;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Storage provider type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageProvider {
    #[default]
    S3,
    /// Process-local buckets, for replaying events without AWS
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub provider: StorageProvider,
    /// Bucket receiving the CSV outputs; `FITSSTORE_BUCKET` overrides it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Custom S3-compatible endpoint (MinIO, LocalStack)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub allow_http: bool,
}

/// Where fetched objects are staged before parsing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScratchKind {
    #[default]
    File,
    Memory,
}

/// Header extraction settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractorConfig {
    #[serde(default = "default_max_object_bytes")]
    pub max_object_bytes: ByteSize,
    #[serde(default)]
    pub scratch: ScratchKind,
    /// Directory for file scratch areas; the system temp dir when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scratch_dir: Option<PathBuf>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_object_bytes: default_max_object_bytes(),
            scratch: ScratchKind::default(),
            scratch_dir: None,
        }
    }
}

fn default_max_object_bytes() -> ByteSize {
    ByteSize::mib(500)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line, for the function runtime's log stream
    #[default]
    Json,
    Pretty,
}

/// Telemetry configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelemetryConfig {
    #[serde(default)]
    pub log_format: LogFormat,
    /// `EnvFilter` directives, used when `RUST_LOG` is unset
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::default(),
            log_filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.storage.provider, StorageProvider::S3);
        assert!(config.storage.destination_bucket.is_none());
        assert_eq!(config.extractor.max_object_bytes.as_u64(), 500 * 1024 * 1024);
        assert_eq!(config.extractor.scratch, ScratchKind::File);
        assert_eq!(config.telemetry.log_format, LogFormat::Json);
        assert_eq!(config.telemetry.log_filter, "info");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
[storage]
destination_bucket = "fits-store"

[extractor]
scratch = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.destination_bucket.as_deref(), Some("fits-store"));
        assert_eq!(config.extractor.scratch, ScratchKind::Memory);
        assert_eq!(config.extractor.max_object_bytes, ByteSize::mib(500));
    }
}
