use std::path::Path;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::de::DeserializeOwned;

use crate::error::ConfigError;

/// Binds environment variables and an optional TOML file onto `T`.
/// Fields without `#[serde(default)]` are required: a missing or
/// mistyped value is a fatal [`ConfigError`]. Fields with a serde default
/// fall back to it when unset.
///
/// Environment variables are read with `prefix` stripped (e.g.
/// `BLINK_WORKER_POOL_SIZE` under prefix `BLINK_` binds to
/// `worker_pool_size`) and take priority over the file, mirroring the
/// usual "file ships the base, environment overrides for this
/// deployment" convention.
pub fn load<T: DeserializeOwned>(env_prefix: &str, file: Option<&Path>) -> Result<T, ConfigError> {
    let mut figment = Figment::new();
    if let Some(path) = file {
        figment = figment.merge(Toml::file(path));
    }
    figment = figment.merge(Env::prefixed(env_prefix).split("__"));
    figment.extract().map_err(ConfigError::Build)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Sample {
        worker_pool_size: usize,
        #[serde(default = "default_sync_interval")]
        sync_interval_secs: u64,
    }

    fn default_sync_interval() -> u64 {
        10
    }

    #[test]
    fn file_provides_required_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blink.toml");
        fs::write(&path, "worker_pool_size = 4\n").unwrap();

        let config: Sample = load("BLINK_TEST_", Some(&path)).unwrap();
        assert_eq!(config.worker_pool_size, 4);
        assert_eq!(config.sync_interval_secs, 10);
    }

    #[test]
    fn missing_required_field_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blink.toml");
        fs::write(&path, "sync_interval_secs = 5\n").unwrap();

        let result: Result<Sample, ConfigError> = load("BLINK_TEST_MISSING_", Some(&path));
        assert!(result.is_err());
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blink.toml");
        fs::write(&path, "worker_pool_size = 4\n").unwrap();

        std::env::set_var("BLINK_ENV_OVERRIDE_WORKER_POOL_SIZE", "9");
        let config: Sample = load("BLINK_ENV_OVERRIDE_", Some(&path)).unwrap();
        std::env::remove_var("BLINK_ENV_OVERRIDE_WORKER_POOL_SIZE");
        assert_eq!(config.worker_pool_size, 9);
    }
}
