//! Layered analysis settings: defaults, TOML file, environment, CLI flags

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::Level;

use crate::category::CategoryRanking;
use crate::ranking::DEFAULT_TOP_K;

pub const DEFAULT_CONFIG_FILE: &str = "orderscope.toml";

#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisConfig {
    pub categories: CategoryRanking,
    pub customers: CustomerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CustomerConfig {
    pub top_k: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub candidate_pool: Option<usize>,
    pub top_categories: Option<usize>,
    pub top_k: Option<usize>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            categories: CategoryRanking::default(),
            customers: CustomerConfig {
                top_k: DEFAULT_TOP_K,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: LogFormat::Compact,
            },
        }
    }
}

impl LoggingConfig {
    /// Parsed `level`, e.g. `info` or `DEBUG`
    pub fn max_level(&self) -> Result<Level, ConfigError> {
        self.level.trim().parse::<Level>().map_err(|_| {
            ConfigError::Validation(format!(
                "unsupported log level `{}` (expected trace|debug|info|warn|error)",
                self.level
            ))
        })
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigPatch {
    categories: Option<CategoriesPatch>,
    customers: Option<CustomersPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CategoriesPatch {
    candidate_pool: Option<usize>,
    top_n: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct CustomersPatch {
    top_k: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

impl AnalysisConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(path) = resolve_config_path(options.config_path.as_deref()) {
            config.apply_patch(read_patch(&path)?);
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML document on top of the defaults, without env or CLI layers
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let patch: ConfigPatch = toml::from_str(raw).map_err(|source| ConfigError::ParseFile {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        let mut config = Self::default();
        config.apply_patch(patch);
        config.validate()?;
        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(categories) = patch.categories {
            if let Some(candidate_pool) = categories.candidate_pool {
                self.categories.candidate_pool = candidate_pool;
            }
            if let Some(top_n) = categories.top_n {
                self.categories.top_n = top_n;
            }
        }

        if let Some(customers) = patch.customers {
            if let Some(top_k) = customers.top_k {
                self.customers.top_k = top_k;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ORDERSCOPE_CANDIDATE_POOL") {
            self.categories.candidate_pool = parse_usize("ORDERSCOPE_CANDIDATE_POOL", &value)?;
        }
        if let Some(value) = read_env("ORDERSCOPE_TOP_CATEGORIES") {
            self.categories.top_n = parse_usize("ORDERSCOPE_TOP_CATEGORIES", &value)?;
        }
        if let Some(value) = read_env("ORDERSCOPE_TOP_K") {
            self.customers.top_k = parse_usize("ORDERSCOPE_TOP_K", &value)?;
        }
        if let Some(value) = read_env("ORDERSCOPE_LOG_LEVEL") {
            self.logging.level = value;
        }
        if let Some(value) = read_env("ORDERSCOPE_LOG_FORMAT") {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(candidate_pool) = overrides.candidate_pool {
            self.categories.candidate_pool = candidate_pool;
        }
        if let Some(top_n) = overrides.top_categories {
            self.categories.top_n = top_n;
        }
        if let Some(top_k) = overrides.top_k {
            self.customers.top_k = top_k;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.categories.candidate_pool == 0 {
            return Err(ConfigError::Validation(
                "categories.candidate_pool must be at least 1".to_string(),
            ));
        }
        if self.categories.top_n == 0 {
            return Err(ConfigError::Validation(
                "categories.top_n must be at least 1".to_string(),
            ));
        }
        if self.customers.top_k == 0 {
            return Err(ConfigError::Validation(
                "customers.top_k must be at least 1".to_string(),
            ));
        }
        self.logging.max_level()?;
        Ok(())
    }
}

fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_FILE);
            default.exists().then_some(default)
        }
    }
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::ParseFile {
        path: path.to_path_buf(),
        source,
    })
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvOverride {
            key: key.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.categories.candidate_pool, 15);
        assert_eq!(config.categories.top_n, 10);
        assert_eq!(config.customers.top_k, 5);
        assert_eq!(config.logging.format, LogFormat::Compact);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_patch_keeps_unset_defaults() {
        let config = AnalysisConfig::from_toml_str(
            r#"
            [categories]
            top_n = 15

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.categories.top_n, 15);
        assert_eq!(config.categories.candidate_pool, 15);
        assert_eq!(config.customers.top_k, 5);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let result = AnalysisConfig::from_toml_str("[categories]\ntop = 3\n");
        assert!(matches!(result, Err(ConfigError::ParseFile { .. })));
    }

    #[test]
    fn test_zero_limits_fail_validation() {
        let result = AnalysisConfig::from_toml_str("[customers]\ntop_k = 0\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_unknown_log_level_fails_validation() {
        let result = AnalysisConfig::from_toml_str("[logging]\nlevel = \"loud\"\n");
        assert!(matches!(result, Err(ConfigError::Validation(message)) if message.contains("loud")));

        let result = AnalysisConfig::from_toml_str("[logging]\nlevel = \"\"\n");
        assert!(matches!(result, Err(ConfigError::Validation(_))));

        let config = AnalysisConfig::from_toml_str("[logging]\nlevel = \"WARN\"\n").unwrap();
        assert_eq!(config.logging.max_level().unwrap(), Level::WARN);
    }

    #[test]
    fn test_load_from_file_then_cli_overrides() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[categories]\ncandidate_pool = 8\ntop_n = 6").unwrap();

        let config = AnalysisConfig::load(LoadOptions {
            config_path: Some(file.path().to_path_buf()),
            overrides: ConfigOverrides {
                top_categories: Some(3),
                log_level: Some("debug".to_string()),
                ..ConfigOverrides::default()
            },
        })
        .unwrap();

        assert_eq!(config.categories.candidate_pool, 8);
        assert_eq!(config.categories.top_n, 3);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = AnalysisConfig::load(LoadOptions {
            config_path: Some(PathBuf::from("/nonexistent/orderscope.toml")),
            overrides: ConfigOverrides::default(),
        });
        assert!(matches!(result, Err(ConfigError::ReadFile { .. })));
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!(" Pretty ".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
        assert!(parse_usize("ORDERSCOPE_TOP_K", "five").is_err());
    }
}
