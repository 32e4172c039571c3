use crate::search::SearchConfig;
use serde::{Deserialize, Serialize};

/// Environment variable naming an optional configuration file
pub const CONFIG_PATH_ENV: &str = "WIKI_SEARCH_CONFIG";

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Search subsystem configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, config::ConfigError> {
        let config_path =
            std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| "config/wiki-search.toml".to_string());
        Self::load_from(&config_path)
    }

    /// Load configuration, layering the given file over the built-in defaults
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                include_str!("../config/default.toml"),
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(config_path).required(false))
            // Override with environment variables (prefix: WIKI_SEARCH_)
            .add_source(
                config::Environment::with_prefix("WIKI_SEARCH")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_defaults_parse() {
        let config = Config::load_from("does/not/exist").unwrap();
        assert_eq!(config.search.provider, "tantivy");
        assert!(config.search.legacy_full_text_engine.is_none());
        assert_eq!(config.observability.log_level, "info");
        assert!(config.search.validate().is_ok());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("override.toml");
        std::fs::write(
            &path,
            "[search]\nprovider = \"basic\"\nlegacy_full_text_engine = \"yes\"\n",
        )
        .unwrap();

        let config = Config::load_from(path.to_str().unwrap()).unwrap();
        assert_eq!(config.search.provider, "basic");
        assert_eq!(config.search.legacy_full_text_engine.as_deref(), Some("yes"));
        assert_eq!(config.search.max_results, 1000);
    }
}
