//! Debouncing watchdog.
//!
//! Every activity event calls [`Watchdog::notify`], which pushes the timer
//! out by the configured interval. When the interval passes without another
//! event the timer fires and a rendered [`Notification`] is handed to the
//! sink.
//!
//! One mutex guards the timer handle and the `disposed` flag. The fire
//! callback takes it only to check `disposed`; rendering and delivery run
//! with the lock released, so a slow sink cannot stall `notify` or
//! `shutdown`. Every `shutdown` caller waits on the timer's drain, so none
//! returns while a delivery is still in flight.
//!
//! [`Notification`]: crate::notification::Notification

pub mod timer;

pub use timer::*;

use crate::config::WatchdogConfig;
use crate::notification::{render, NotificationSink};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Observable lifecycle state of a watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogState {
    /// Not armed; waiting for the next activity event.
    Idle,
    /// A firing is scheduled.
    Armed,
    /// Shut down. Terminal.
    Disposed,
}

struct Guarded {
    timer: Option<Arc<ScheduledTimer>>,
    disposed: bool,
}

/// A debounce timer that fires after a quiet period.
pub struct Watchdog {
    inner: Arc<Mutex<Guarded>>,
    config: Arc<WatchdogConfig>,
}

impl Watchdog {
    /// Creates an idle watchdog delivering to `sink`.
    ///
    /// Fails only if the timer thread cannot be spawned.
    pub fn new(config: WatchdogConfig, sink: Arc<dyn NotificationSink>) -> std::io::Result<Self> {
        let config = Arc::new(config);
        let inner = Arc::new(Mutex::new(Guarded {
            timer: None,
            disposed: false,
        }));

        let fire_inner = Arc::clone(&inner);
        let fire_config = Arc::clone(&config);
        let timer = ScheduledTimer::spawn("idlewatch-timer", move || {
            on_fire(&fire_inner, &fire_config, sink.as_ref());
        })?;

        lock(&inner).timer = Some(Arc::new(timer));

        tracing::info!(
            interval_ms = config.interval.as_millis() as u64,
            repeat = config.repeat,
            subject = %config.subject,
            enabled = config.is_enabled(),
            "Watchdog created"
        );

        Ok(Self { inner, config })
    }

    /// Records an activity event, re-arming the timer.
    ///
    /// No effect once shut down or when the interval is zero.
    pub fn notify(&self) {
        let guarded = lock(&self.inner);
        if guarded.disposed || !self.config.is_enabled() {
            tracing::trace!(disposed = guarded.disposed, "Activity ignored");
            return;
        }

        if let Some(timer) = &guarded.timer {
            let interval = self.config.interval;
            let period = self.config.repeat.then_some(interval);
            timer.change(interval, period);
            tracing::debug!(interval_ms = interval.as_millis() as u64, "Watchdog re-armed");
        }
    }

    /// Permanently disarms the watchdog.
    ///
    /// Blocks until an in-flight fire callback has finished, including when
    /// another thread is already shutting down. Idempotent. Called from
    /// inside the sink it returns without waiting on itself.
    pub fn shutdown(&self) {
        let (first, timer) = {
            let mut guarded = lock(&self.inner);
            let first = !guarded.disposed;
            guarded.disposed = true;
            (first, guarded.timer.clone())
        };

        let Some(timer) = timer else {
            return;
        };

        if first {
            timer.cancel();
        }
        let clean = timer.dispose();

        if first {
            if !clean {
                tracing::warn!("Timer worker ended abnormally during shutdown");
            }
            tracing::info!(subject = %self.config.subject, "Watchdog shut down");
        }
    }

    /// Current lifecycle state, read under the lock.
    pub fn state(&self) -> WatchdogState {
        let guarded = lock(&self.inner);
        if guarded.disposed {
            return WatchdogState::Disposed;
        }
        match &guarded.timer {
            Some(timer) if timer.is_pending() => WatchdogState::Armed,
            _ => WatchdogState::Idle,
        }
    }

    /// The configuration this watchdog was built with.
    pub fn config(&self) -> &WatchdogConfig {
        &self.config
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn lock(inner: &Mutex<Guarded>) -> MutexGuard<'_, Guarded> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Timer callback: decide under the lock, deliver without it.
fn on_fire(inner: &Mutex<Guarded>, config: &WatchdogConfig, sink: &dyn NotificationSink) {
    if lock(inner).disposed {
        tracing::trace!("Late fire after shutdown ignored");
        return;
    }

    let notification = render(
        &config.message_template,
        &config.subject,
        config.level,
        &config.properties,
    );
    tracing::debug!(subject = %config.subject, "Watchdog fired");

    if let Err(e) = sink.emit(&notification) {
        tracing::warn!(error = %e, subject = %config.subject, "Failed to deliver timeout notification");
    }
}
