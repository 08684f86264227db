//! Output sinks for rendered notifications.
//!
//! A sink receives each notification exactly once, fire-and-forget. Errors
//! are reported back to the watchdog, which logs them and moves on.

use super::types::{Level, Notification};
use std::io::Write;
use std::sync::{Mutex, PoisonError};

/// Destination for timeout notifications.
pub trait NotificationSink: Send + Sync {
    fn emit(&self, notification: &Notification) -> Result<(), SinkError>;
}

/// Writes notifications to the `tracing` subscriber at their own level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn emit(&self, notification: &Notification) -> Result<(), SinkError> {
        let subject = notification.subject.as_str();
        let fields = &notification.fields;
        let message = notification.message.as_str();

        match notification.level {
            Level::Verbose => tracing::trace!(subject, ?fields, "{message}"),
            Level::Debug => tracing::debug!(subject, ?fields, "{message}"),
            Level::Information => tracing::info!(subject, ?fields, "{message}"),
            Level::Warning => tracing::warn!(subject, ?fields, "{message}"),
            Level::Error | Level::Fatal => {
                tracing::error!(subject, ?fields, level = %notification.level, "{message}")
            }
        }
        Ok(())
    }
}

/// Serializes each notification as one JSON line.
pub struct JsonLinesSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> NotificationSink for JsonLinesSink<W> {
    fn emit(&self, notification: &Notification) -> Result<(), SinkError> {
        let line = serde_json::to_string(notification)
            .map_err(|e| SinkError::Serialization(e.to_string()))?;

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(writer, "{line}").map_err(|e| SinkError::Io(e.to_string()))?;
        writer.flush().map_err(|e| SinkError::Io(e.to_string()))
    }
}

/// Errors raised while delivering a notification.
#[derive(Debug)]
pub enum SinkError {
    Serialization(String),
    Io(String),
    Rejected(String),
}

impl std::fmt::Display for SinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SinkError::Serialization(e) => write!(f, "Serialization error: {}", e),
            SinkError::Io(e) => write!(f, "I/O error: {}", e),
            SinkError::Rejected(e) => write!(f, "Notification rejected: {}", e),
        }
    }
}

impl std::error::Error for SinkError {}
