use super::models::{Config, ScratchKind};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("No destination bucket configured (set FITSSTORE_BUCKET)")]
    MissingDestinationBucket,

    #[error("extractor.max_object_bytes must be positive")]
    ZeroObjectLimit,

    #[error("Scratch directory {path} is not a directory")]
    InvalidScratchDir { path: String },

    #[error("Invalid log filter '{filter}': {reason}")]
    InvalidLogFilter { filter: String, reason: String },
}

/// Validate the entire configuration
pub fn validate(config: &Config) -> Result<(), ValidationError> {
    validate_storage(config)?;
    validate_extractor(config)?;
    validate_telemetry(config)?;
    Ok(())
}

fn validate_storage(config: &Config) -> Result<(), ValidationError> {
    config.destination_bucket().map(|_| ())
}

fn validate_extractor(config: &Config) -> Result<(), ValidationError> {
    if config.extractor.max_object_bytes.as_u64() == 0 {
        return Err(ValidationError::ZeroObjectLimit);
    }

    if config.extractor.scratch == ScratchKind::File {
        if let Some(dir) = &config.extractor.scratch_dir {
            if !dir.is_dir() {
                return Err(ValidationError::InvalidScratchDir {
                    path: dir.display().to_string(),
                });
            }
        }
    }

    Ok(())
}

fn validate_telemetry(config: &Config) -> Result<(), ValidationError> {
    EnvFilter::try_new(&config.telemetry.log_filter)
        .map(|_| ())
        .map_err(|e| ValidationError::InvalidLogFilter {
            filter: config.telemetry.log_filter.clone(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::humanize::ByteSize;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.storage.destination_bucket = Some("fits-store".to_string());
        config
    }

    #[test]
    fn test_valid_config() {
        assert!(validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_missing_destination_bucket() {
        let config = Config::default();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::MissingDestinationBucket)
        ));

        let mut config = valid_config();
        config.storage.destination_bucket = Some("   ".to_string());
        assert!(matches!(
            validate(&config),
            Err(ValidationError::MissingDestinationBucket)
        ));
    }

    #[test]
    fn test_validation_agrees_with_destination_lookup() {
        for bucket in [None, Some(""), Some(" \t"), Some("fits-store"), Some(" fits-store ")] {
            let mut config = valid_config();
            config.storage.destination_bucket = bucket.map(str::to_string);
            assert_eq!(
                validate(&config).is_ok(),
                config.destination_bucket().is_ok(),
                "bucket {bucket:?}"
            );
        }
    }

    #[test]
    fn test_zero_object_limit() {
        let mut config = valid_config();
        config.extractor.max_object_bytes = ByteSize(0);
        assert!(matches!(validate(&config), Err(ValidationError::ZeroObjectLimit)));
    }

    #[test]
    fn test_scratch_dir_must_exist() {
        let mut config = valid_config();
        config.extractor.scratch_dir = Some(PathBuf::from("/definitely/not/here"));
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidScratchDir { .. })
        ));

        let dir = TempDir::new().unwrap();
        config.extractor.scratch_dir = Some(dir.path().to_path_buf());
        assert!(validate(&config).is_ok());

        // Ignored for in-memory scratch
        config.extractor.scratch = ScratchKind::Memory;
        config.extractor.scratch_dir = Some(PathBuf::from("/definitely/not/here"));
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_log_filter() {
        let mut config = valid_config();
        config.telemetry.log_filter = "fitslake=notalevel".to_string();
        assert!(matches!(
            validate(&config),
            Err(ValidationError::InvalidLogFilter { .. })
        ));
    }
}
