use crate::domain::SeederConfig;
use crate::ports::ConfigProvider;

// ============================================================================
// StaticConfigProvider - Hardcoded config for testing/development
// ============================================================================

/// Static configuration provider with in-code values.
///
/// Useful for testing and development. For production, use `TomlConfigProvider`.
#[derive(Debug, Clone, Default)]
pub struct StaticConfigProvider {
    config: SeederConfig,
}

impl StaticConfigProvider {
    /// Create with the default config and no seeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the seed list.
    #[must_use]
    pub fn with_seeds(mut self, seeds: Vec<String>) -> Self {
        self.config.crawler.seeds = seeds;
        self
    }

    /// Replace the whole config.
    #[must_use]
    pub fn with_config(mut self, config: SeederConfig) -> Self {
        self.config = config;
        self
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn get_seeder_config(&self) -> SeederConfig {
        self.config.clone()
    }
}

// ============================================================================
// TomlConfigProvider - Production Config Loading (requires "network" feature)
// ============================================================================

#[cfg(feature = "network")]
mod toml_config {
    use super::*;
    use crate::domain::InvalidConfig;
    use std::fs;
    use std::path::Path;
    use thiserror::Error;

    /// TOML-based configuration provider.
    ///
    /// Every section and field is optional; missing values take their
    /// defaults. The parsed config is validated before it is returned.
    ///
    /// # Config File Format
    ///
    /// ```toml
    /// [chain]
    /// magic = "f9beb4d9"
    /// default_port = 8333
    /// min_peer_version = 70001
    ///
    /// [crawler]
    /// workers = 24
    /// probe_networks = ["ipv4", "ipv6"]
    /// seeds = ["seed.example.org:8333"]
    ///
    /// [probe]
    /// response_timeout_secs = 30
    ///
    /// [policy]
    /// min_retry_secs = 1000
    ///
    /// [store]
    /// snapshot_path = "seeder.dat"
    /// dump_path = "seeder.dump"
    ///
    /// [log]
    /// level = "info"
    /// ```
    #[derive(Debug, Clone)]
    pub struct TomlConfigProvider {
        config: SeederConfig,
    }

    impl TomlConfigProvider {
        /// Load configuration from a TOML file.
        ///
        /// # Errors
        ///
        /// Returns error if the file cannot be read, parsed or validated.
        pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
            let content = fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io {
                path: path.as_ref().display().to_string(),
                error: e.to_string(),
            })?;

            Self::parse(&content)
        }

        /// Parse configuration from a TOML string.
        pub fn parse(content: &str) -> Result<Self, ConfigError> {
            let config: SeederConfig =
                toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
            config.validate()?;
            Ok(Self { config })
        }

        /// The parsed config.
        pub fn config(&self) -> &SeederConfig {
            &self.config
        }
    }

    impl ConfigProvider for TomlConfigProvider {
        fn get_seeder_config(&self) -> SeederConfig {
            self.config.clone()
        }
    }

    /// Errors that can occur during config loading.
    #[derive(Debug, Clone, Error)]
    pub enum ConfigError {
        /// File I/O error.
        #[error("Failed to read {path}: {error}")]
        Io {
            /// Path of the file that failed to load.
            path: String,
            /// Error message from the I/O operation.
            error: String,
        },
        /// TOML parsing error.
        #[error("Failed to parse config: {0}")]
        Parse(String),
        /// Parsed but out of range.
        #[error(transparent)]
        Invalid(#[from] InvalidConfig),
    }
}

#[cfg(feature = "network")]
pub use toml_config::{ConfigError, TomlConfigProvider};
