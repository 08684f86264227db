//! idlewatch - timeout notifications for quiet activity streams.
//!
//! A [`Watchdog`] is re-armed by every activity event and emits a rendered
//! [`Notification`] to a [`NotificationSink`] once the stream has been quiet
//! for the configured interval.
//!
//! ```ignore
//! let config = Settings::load(&path)?.to_watchdog_config()?;
//! let watchdog = Watchdog::new(config, Arc::new(TracingSink))?;
//!
//! watchdog.notify(); // on every activity event
//! watchdog.shutdown(); // once, on teardown
//! ```

pub mod config;
pub mod notification;
pub mod watchdog;

pub use config::{ConfigError, OutputKind, Settings, WatchdogConfig};
pub use notification::{
    JsonLinesSink, Level, Notification, NotificationSink, SinkError, TracingSink,
};
pub use watchdog::{Watchdog, WatchdogState};
