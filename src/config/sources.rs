use super::models::Config;
use config::{ConfigError, Environment, File};
use std::env;
use std::path::PathBuf;

const CONFIG_ENV_VAR: &str = "FITSLAKE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/fitslake.toml";
const ENV_PREFIX: &str = "FITSLAKE";
const ENV_SEPARATOR: &str = "__";

/// Set by the deployment on the function; names the CSV output bucket
pub const DESTINATION_ENV_VAR: &str = "FITSSTORE_BUCKET";

/// Load configuration from multiple sources with priority:
/// 1. Defaults (embedded in structs)
/// 2. TOML file (if exists)
/// 3. Environment variables from .env file (via dotenvy)
/// 4. System environment variables
/// 5. `FITSSTORE_BUCKET` (highest priority)
pub fn load(path: Option<PathBuf>) -> Result<Config, ConfigError> {
    // Load .env file if it exists (ignore errors if file doesn't exist)
    let _ = dotenvy::dotenv();

    let config_path = path.unwrap_or_else(|| {
        env::var(CONFIG_ENV_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH))
    });

    let mut config = load_from_sources(config_path)?;
    apply_platform_env(&mut config, |name| env::var(name).ok());

    Ok(config)
}

/// Apply variables the hosting platform sets outside our prefix
pub(crate) fn apply_platform_env<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(bucket) = lookup(DESTINATION_ENV_VAR) {
        config.storage.destination_bucket = Some(bucket);
    }
}

/// Load configuration from a specific path and environment
/// Useful for testing with custom config files
pub fn load_from_sources(config_path: PathBuf) -> Result<Config, ConfigError> {
    let mut builder = config::Config::builder();

    if config_path.exists() {
        tracing::info!("Loading configuration from: {}", config_path.display());
        builder = builder.add_source(File::from(config_path).required(false));
    } else {
        tracing::debug!(
            "Configuration file not found at {}, using defaults and environment overrides",
            config_path.display()
        );
    }

    // FITSLAKE__EXTRACTOR__MAX_OBJECT_BYTES -> extractor.max_object_bytes
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator(ENV_SEPARATOR)
            .try_parsing(true),
    );

    let config = builder.build()?;
    config.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScratchKind;
    use crate::humanize::ByteSize;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_defaults_only() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nonexistent.toml");

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(config.extractor.max_object_bytes, ByteSize::mib(500));
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        fs::write(
            &config_path,
            r#"
[storage]
provider = "memory"
destination_bucket = "my-fits-datalake-fitsstore"

[extractor]
max_object_bytes = "64MB"
scratch = "memory"

[telemetry]
log_format = "pretty"
log_filter = "fitslake=debug"
            "#,
        )
        .unwrap();

        let config = load_from_sources(config_path).unwrap();
        assert_eq!(
            config.storage.destination_bucket.as_deref(),
            Some("my-fits-datalake-fitsstore")
        );
        assert_eq!(config.extractor.max_object_bytes, ByteSize::mib(64));
        assert_eq!(config.extractor.scratch, ScratchKind::Memory);
        assert_eq!(config.telemetry.log_filter, "fitslake=debug");
    }

    #[test]
    fn test_platform_variable_wins() {
        let mut config = Config::default();
        config.storage.destination_bucket = Some("from-file".to_string());

        apply_platform_env(&mut config, |name| {
            (name == DESTINATION_ENV_VAR).then(|| "from-platform".to_string())
        });
        assert_eq!(config.storage.destination_bucket.as_deref(), Some("from-platform"));

        apply_platform_env(&mut config, |_| None);
        assert_eq!(config.storage.destination_bucket.as_deref(), Some("from-platform"));
    }
}
