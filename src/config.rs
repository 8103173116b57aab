use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default delay between checks of the data file while watching.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory holding the shopping document and the session
    pub data_dir: ConfigValue<PathBuf>,
    /// How often `watch` looks for changes from other processes
    pub poll_interval_ms: ConfigValue<u64>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    poll_interval_ms: Option<u64>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_with_env(config_path, |key| std::env::var(key).ok())
    }

    fn load_with_env(
        config_path: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut data_dir = ConfigValue::new(Self::default_data_dir(), ConfigSource::Default);
        let mut poll_interval_ms =
            ConfigValue::new(DEFAULT_POLL_INTERVAL_MS, ConfigSource::Default);
        let mut config_file = None;

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            if let Some(dir) = file_config.data_dir {
                data_dir = ConfigValue::new(resolve_relative(&path, dir), ConfigSource::File);
            }
            if let Some(ms) = file_config.poll_interval_ms {
                poll_interval_ms = ConfigValue::new(ms, ConfigSource::File);
            }
            config_file = Some(path);
        }

        if let Some(dir) = env("SHOPLIST_DATA_DIR") {
            data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Some(ms) = env("SHOPLIST_POLL_MS") {
            let ms = ms
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidValue("SHOPLIST_POLL_MS".to_string(), ms))?;
            poll_interval_ms = ConfigValue::new(ms, ConfigSource::Environment);
        }

        if poll_interval_ms.value == 0 {
            return Err(ConfigError::InvalidValue(
                "poll_interval_ms".to_string(),
                "0".to_string(),
            ));
        }

        Ok(Self {
            data_dir,
            poll_interval_ms,
            config_file,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/shoplist/
    /// - macOS: ~/Library/Application Support/shoplist/
    /// - Windows: %APPDATA%/shoplist/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shoplist")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/shoplist/
    /// - macOS: ~/Library/Application Support/shoplist/
    /// - Windows: %APPDATA%/shoplist/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("shoplist")
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

/// Resolves a relative path against the config file's directory.
fn resolve_relative(config_path: &Path, dir: PathBuf) -> PathBuf {
    if dir.is_relative() {
        config_path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
    } else {
        dir
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    /// Setting name and the rejected value
    InvalidValue(String, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(key, value) => {
                write!(f, "Invalid value for {}: '{}'", key, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_defaults_without_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load_with_env(Some(config_path), no_env).unwrap();
        assert!(config.data_dir.value.ends_with("shoplist"));
        assert_eq!(config.data_dir.source, ConfigSource::Default);
        assert_eq!(config.poll_interval_ms.value, DEFAULT_POLL_INTERVAL_MS);
        assert!(config.config_file.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "data_dir: /custom/shoplist").unwrap();
        writeln!(file, "poll_interval_ms: 250").unwrap();

        let config = Config::load_with_env(Some(config_path.clone()), no_env).unwrap();
        assert_eq!(config.data_dir.value, PathBuf::from("/custom/shoplist"));
        assert_eq!(config.data_dir.source, ConfigSource::File);
        assert_eq!(config.poll_interval_ms.value, 250);
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_relative_data_dir_resolves_against_config_dir() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "data_dir: data\n").unwrap();

        let config = Config::load_with_env(Some(config_path), no_env).unwrap();
        assert_eq!(config.data_dir.value, temp_dir.path().join("data"));
    }

    #[test]
    fn test_env_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "data_dir: /from/file\npoll_interval_ms: 250\n").unwrap();

        let env = |key: &str| match key {
            "SHOPLIST_DATA_DIR" => Some("/from/env".to_string()),
            "SHOPLIST_POLL_MS" => Some("1000".to_string()),
            _ => None,
        };
        let config = Config::load_with_env(Some(config_path), env).unwrap();
        assert_eq!(config.data_dir.value, PathBuf::from("/from/env"));
        assert_eq!(config.data_dir.source, ConfigSource::Environment);
        assert_eq!(config.poll_interval_ms.value, 1000);
        assert_eq!(config.poll_interval_ms.source, ConfigSource::Environment);
    }

    #[test]
    fn test_invalid_poll_interval() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("missing.yaml");

        let env = |key: &str| (key == "SHOPLIST_POLL_MS").then(|| "soon".to_string());
        let err = Config::load_with_env(Some(config_path.clone()), env).unwrap_err();
        assert!(err.to_string().contains("SHOPLIST_POLL_MS"));

        let env = |key: &str| (key == "SHOPLIST_POLL_MS").then(|| "0".to_string());
        assert!(Config::load_with_env(Some(config_path), env).is_err());
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let err = Config::load_with_env(Some(config_path), no_env).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
