//! Data types for timeout notifications.

use crate::config::ConfigError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Severity attached to an emitted notification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Level {
    Verbose,
    Debug,
    #[default]
    Information,
    Warning,
    Error,
    Fatal,
}

impl Level {
    /// All levels, from least to most severe.
    pub const ALL: [Level; 6] = [
        Level::Verbose,
        Level::Debug,
        Level::Information,
        Level::Warning,
        Level::Error,
        Level::Fatal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Verbose => "Verbose",
            Level::Debug => "Debug",
            Level::Information => "Information",
            Level::Warning => "Warning",
            Level::Error => "Error",
            Level::Fatal => "Fatal",
        }
    }

    /// Closest `tracing` level. `Fatal` has no counterpart and maps to `ERROR`.
    pub fn to_tracing(self) -> tracing::Level {
        match self {
            Level::Verbose => tracing::Level::TRACE,
            Level::Debug => tracing::Level::DEBUG,
            Level::Information => tracing::Level::INFO,
            Level::Warning => tracing::Level::WARN,
            Level::Error | Level::Fatal => tracing::Level::ERROR,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = ConfigError;

    /// Parses a level name, ignoring case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Level::ALL
            .into_iter()
            .find(|level| level.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::InvalidLevel(name.to_string()))
    }
}

impl<'de> Deserialize<'de> for Level {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}

/// A rendered timeout notification, handed to a sink once per fire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// When the notification was rendered.
    pub timestamp: DateTime<Utc>,

    pub level: Level,

    /// The unrendered message template.
    pub message_template: String,

    /// Name substituted into the template placeholder.
    pub subject: String,

    /// The template with its placeholder replaced by the subject.
    pub message: String,

    /// Extra properties attached to the notification.
    pub fields: BTreeMap<String, String>,
}
