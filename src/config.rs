//! Watchdog configuration.
//!
//! `Settings` is the host-facing shape, read from a JSON file with serde.
//! `WatchdogConfig` is the immutable configuration the watchdog is built
//! from; it is derived from `Settings` once at startup.

use crate::notification::{parse_properties, Level};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Template used when the host does not provide one.
pub const DEFAULT_TEMPLATE: &str = "Timeout {subject} occurred";

/// Subject name used when the host does not provide a title.
pub const DEFAULT_TITLE: &str = "idlewatch";

/// Environment variable overriding the settings file location.
pub const CONFIG_ENV_VAR: &str = "IDLEWATCH_CONFIG";

/// How the reference host delivers notifications.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputKind {
    /// Through the `tracing` subscriber.
    #[default]
    Log,
    /// As JSON lines on stdout.
    Json,
}

/// Host settings as stored in the settings file.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Quiet period in whole seconds. Any value below 1 disables the watchdog.
    pub timeout: i64,

    /// Keep firing every `timeout` seconds while no activity arrives.
    #[serde(default)]
    pub repeat: bool,

    #[serde(default = "default_template")]
    pub template: String,

    /// Extra properties, one `key=value` per line.
    #[serde(default)]
    pub properties: String,

    #[serde(default)]
    pub level: Level,

    /// Name substituted into the template.
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default)]
    pub output: OutputKind,
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

impl Settings {
    /// Settings for the given timeout with every optional key defaulted.
    pub fn with_timeout(timeout: i64) -> Self {
        Self {
            timeout,
            repeat: false,
            template: default_template(),
            properties: String::new(),
            level: Level::default(),
            title: default_title(),
            output: OutputKind::default(),
        }
    }

    /// Parses settings from JSON text.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Reads settings from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        tracing::info!(path = ?path, "Loading settings");
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&text)
    }

    /// Resolves the settings file location.
    ///
    /// An explicit path wins, then `IDLEWATCH_CONFIG`, then
    /// `<config dir>/idlewatch/settings.json`.
    pub fn resolve_path(explicit: Option<PathBuf>) -> PathBuf {
        explicit
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
            .unwrap_or_else(Self::default_path)
    }

    /// Returns the default settings path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("idlewatch")
            .join("settings.json")
    }

    /// Converts to the watchdog's immutable configuration.
    pub fn to_watchdog_config(&self) -> Result<WatchdogConfig, ConfigError> {
        let interval = if self.timeout < 1 {
            Duration::ZERO
        } else {
            Duration::from_secs(self.timeout as u64)
        };

        WatchdogConfig::new(
            interval,
            self.repeat,
            &self.template,
            &self.properties,
            self.level,
            &self.title,
        )
    }
}

/// Immutable watchdog configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchdogConfig {
    /// Quiet period before firing. Zero keeps the watchdog inert.
    pub interval: Duration,
    pub repeat: bool,
    pub message_template: String,
    /// Parsed `key=value` pairs, in file order.
    pub properties: Vec<(String, String)>,
    pub level: Level,
    pub subject: String,
}

impl WatchdogConfig {
    /// Builds a configuration, parsing the raw `properties` text.
    ///
    /// Fails if the template is empty.
    pub fn new(
        interval: Duration,
        repeat: bool,
        message_template: &str,
        properties: &str,
        level: Level,
        subject: &str,
    ) -> Result<Self, ConfigError> {
        if message_template.trim().is_empty() {
            return Err(ConfigError::EmptyTemplate);
        }

        Ok(Self {
            interval,
            repeat,
            message_template: message_template.to_string(),
            properties: parse_properties(properties),
            level,
            subject: subject.to_string(),
        })
    }

    /// Whether the watchdog can ever arm.
    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    InvalidLevel(String),
    EmptyTemplate,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "Failed to read settings: {}", e),
            ConfigError::Parse(e) => write!(f, "Invalid settings: {}", e),
            ConfigError::InvalidLevel(name) => write!(
                f,
                "Unknown level '{}', expected one of Verbose, Debug, Information, Warning, Error, Fatal",
                name
            ),
            ConfigError::EmptyTemplate => write!(f, "Message template must not be empty"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_defaults() {
        let settings = Settings::from_json(r#"{ "timeout": 30 }"#).unwrap();

        assert_eq!(settings.timeout, 30);
        assert!(!settings.repeat);
        assert_eq!(settings.template, DEFAULT_TEMPLATE);
        assert!(settings.properties.is_empty());
        assert_eq!(settings.level, Level::Information);
        assert_eq!(settings.title, DEFAULT_TITLE);
        assert_eq!(settings.output, OutputKind::Log);
    }

    #[test]
    fn test_settings_full() {
        let settings = Settings::from_json(
            r#"{
                "timeout": 5,
                "repeat": true,
                "template": "No heartbeat from {app}",
                "properties": "env=prod\nteam=ops",
                "level": "warning",
                "title": "billing",
                "output": "json"
            }"#,
        )
        .unwrap();

        let config = settings.to_watchdog_config().unwrap();
        assert_eq!(config.interval, Duration::from_secs(5));
        assert!(config.repeat);
        assert_eq!(config.message_template, "No heartbeat from {app}");
        assert_eq!(config.level, Level::Warning);
        assert_eq!(config.subject, "billing");
        assert_eq!(config.properties.len(), 2);
        assert_eq!(settings.output, OutputKind::Json);
    }

    #[test]
    fn test_timeout_below_one_disables() {
        for timeout in [0, -1, -3600] {
            let config = Settings::with_timeout(timeout).to_watchdog_config().unwrap();
            assert!(config.interval.is_zero());
            assert!(!config.is_enabled());
        }
        assert!(Settings::with_timeout(1)
            .to_watchdog_config()
            .unwrap()
            .is_enabled());
    }

    #[test]
    fn test_timeout_is_required() {
        let err = Settings::from_json(r#"{ "repeat": true }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_unknown_level_rejected() {
        let err = Settings::from_json(r#"{ "timeout": 5, "level": "loud" }"#).unwrap_err();
        assert!(err.to_string().contains("loud"));
    }

    #[test]
    fn test_empty_template_rejected() {
        let mut settings = Settings::with_timeout(5);
        settings.template = "   ".to_string();
        assert!(matches!(
            settings.to_watchdog_config(),
            Err(ConfigError::EmptyTemplate)
        ));
    }

    #[test]
    fn test_explicit_path_wins() {
        let path = PathBuf::from("/tmp/custom.json");
        assert_eq!(Settings::resolve_path(Some(path.clone())), path);
    }

    #[test]
    fn test_env_var_used_without_explicit_path() {
        // Only this test touches the variable
        std::env::set_var(CONFIG_ENV_VAR, "/tmp/idlewatch-env.json");
        let resolved = Settings::resolve_path(None);
        let explicit = Settings::resolve_path(Some(PathBuf::from("/tmp/cli.json")));
        std::env::remove_var(CONFIG_ENV_VAR);

        assert_eq!(resolved, PathBuf::from("/tmp/idlewatch-env.json"));
        assert_eq!(explicit, PathBuf::from("/tmp/cli.json"));
    }

    #[test]
    fn test_default_path_file_name() {
        let path = Settings::default_path();
        assert!(path.ends_with("idlewatch/settings.json"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Settings::load(Path::new("/nonexistent/idlewatch/settings.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
