//! Generator and process configuration.
//!
//! Settings are layered: built-in defaults, then an optional YAML file, then
//! `BATCHID_*` environment variables (a `.env` file is honored), then CLI
//! flags applied by the caller.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::AllocatorError;

/// Default number of ids reserved per store write.
pub const DEFAULT_BATCH_SIZE: u32 = 100;
/// Default number of optimistic writes tried per refill.
pub const DEFAULT_MAX_WRITE_ATTEMPTS: u32 = 25;

/// Tuning knobs of a [`crate::allocator::UniqueIdGenerator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Ids reserved per store write. Must be at least 1.
    pub batch_size: u32,
    /// Optimistic writes tried before giving up. Must be at least 1.
    pub max_write_attempts: u32,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self { batch_size: DEFAULT_BATCH_SIZE, max_write_attempts: DEFAULT_MAX_WRITE_ATTEMPTS }
    }
}

impl GeneratorConfig {
    /// Checks that every setting is in range.
    ///
    /// # Errors
    ///
    /// Returns [`AllocatorError::InvalidConfiguration`] naming the first bad setting.
    pub fn validate(&self) -> Result<(), AllocatorError> {
        if self.batch_size < 1 {
            return Err(AllocatorError::InvalidConfiguration {
                setting: "batch_size",
                value: i64::from(self.batch_size),
            });
        }
        if self.max_write_attempts < 1 {
            return Err(AllocatorError::InvalidConfiguration {
                setting: "max_write_attempts",
                value: i64::from(self.max_write_attempts),
            });
        }
        Ok(())
    }
}

/// Everything the `batchid` binary needs to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Directory holding one counter file per scope.
    pub store_dir: PathBuf,
    /// Fallback log filter when `RUST_LOG` is unset.
    pub log_level: String,
    /// Generator tuning.
    #[serde(flatten)]
    pub generator: GeneratorConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from(".batchid"),
            log_level: "warn".to_string(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl Settings {
    /// Loads settings from defaults, an optional YAML file and the environment.
    ///
    /// The file is `path` if given, otherwise `$BATCHID_CONFIG` if set.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or an
    /// environment override is not a number.
    pub fn load(path: Option<&Path>) -> Result<Self, String> {
        // A missing .env file is the normal case.
        let _ = dotenvy::dotenv();

        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("BATCHID_CONFIG").map(PathBuf::from));
        let mut settings = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        settings.apply_env(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Parses a YAML settings file. Missing keys keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {e}", path.display()))?;
        serde_yaml::from_str(&content)
            .map_err(|e| format!("Failed to parse config file {}: {e}", path.display()))
    }

    /// Applies `BATCHID_*` overrides looked up through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric override does not parse.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), String>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("BATCHID_STORE_DIR") {
            self.store_dir = PathBuf::from(dir);
        }
        if let Some(level) = lookup("BATCHID_LOG") {
            self.log_level = level;
        }
        if let Some(size) = lookup("BATCHID_BATCH_SIZE") {
            self.generator.batch_size = parse_override("BATCHID_BATCH_SIZE", &size)?;
        }
        if let Some(attempts) = lookup("BATCHID_MAX_WRITE_ATTEMPTS") {
            self.generator.max_write_attempts =
                parse_override("BATCHID_MAX_WRITE_ATTEMPTS", &attempts)?;
        }
        Ok(())
    }

    /// Checks the generator settings.
    ///
    /// # Errors
    ///
    /// Returns an error message naming the first invalid setting.
    pub fn validate(&self) -> Result<(), String> {
        self.generator.validate().map_err(|e| e.to_string())
    }
}

fn parse_override(key: &str, value: &str) -> Result<u32, String> {
    value.trim().parse().map_err(|e| format!("Invalid value for {key} ({value:?}): {e}"))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let settings = Settings::default();
        assert_eq!(settings.generator.batch_size, 100);
        assert_eq!(settings.generator.max_write_attempts, 25);
        assert_eq!(settings.store_dir, PathBuf::from(".batchid"));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn zero_values_fail_validation() {
        let config = GeneratorConfig { batch_size: 0, ..GeneratorConfig::default() };
        assert!(matches!(
            config.validate(),
            Err(AllocatorError::InvalidConfiguration { setting: "batch_size", .. })
        ));

        let config = GeneratorConfig { max_write_attempts: 0, ..GeneratorConfig::default() };
        assert!(matches!(
            config.validate(),
            Err(AllocatorError::InvalidConfiguration { setting: "max_write_attempts", .. })
        ));
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let dir = std::env::temp_dir().join(format!("batchid_config_{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("batchid.yaml");
        std::fs::write(&path, "store_dir: /var/lib/ids\nbatch_size: 500\n").unwrap();

        let settings = Settings::from_file(&path).unwrap();
        assert_eq!(settings.store_dir, PathBuf::from("/var/lib/ids"));
        assert_eq!(settings.generator.batch_size, 500);
        assert_eq!(settings.generator.max_write_attempts, 25);
        assert_eq!(settings.log_level, "warn");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unreadable_file_reports_path() {
        let err = Settings::from_file(Path::new("/nonexistent/batchid.yaml")).unwrap_err();
        assert!(err.contains("/nonexistent/batchid.yaml"));
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("BATCHID_STORE_DIR", "/tmp/ids"),
            ("BATCHID_BATCH_SIZE", "7"),
            ("BATCHID_MAX_WRITE_ATTEMPTS", " 3 "),
            ("BATCHID_LOG", "debug"),
        ]
        .into_iter()
        .collect();

        let mut settings = Settings::default();
        settings.apply_env(|key| env.get(key).map(|v| (*v).to_string())).unwrap();

        assert_eq!(settings.store_dir, PathBuf::from("/tmp/ids"));
        assert_eq!(settings.generator, GeneratorConfig { batch_size: 7, max_write_attempts: 3 });
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn non_numeric_override_is_rejected() {
        let mut settings = Settings::default();
        let err = settings
            .apply_env(|key| (key == "BATCHID_BATCH_SIZE").then(|| "lots".to_string()))
            .unwrap_err();
        assert!(err.contains("BATCHID_BATCH_SIZE"));
        assert_eq!(settings.generator.batch_size, 100);
    }
}
