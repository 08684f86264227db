//! Cancellable one-shot / recurring timer with a draining teardown.
//!
//! A `ScheduledTimer` owns a single worker thread that sleeps until the next
//! programmed firing and then invokes the callback. The worker only holds its
//! internal lock while deciding whether to fire, so `change` and `cancel`
//! never wait on a slow callback.
//!
//! `dispose` stops the worker and waits until it has exited. That exit is
//! the drain acknowledgment: once any `dispose` call returns, no callback is
//! running and none will ever run again.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

/// Next firing of the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Schedule {
    /// `None` when the deadline lies beyond what `Instant` can represent.
    due: Option<Instant>,
    /// `Some` for a recurring timer, `None` for a one-shot.
    period: Option<Duration>,
}

#[derive(Debug, Default)]
struct TimerState {
    schedule: Option<Schedule>,
    stopped: bool,
    /// Set by the worker as its very last action.
    exited: bool,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<TimerState>,
    wakeup: Condvar,
    drained: Condvar,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, TimerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks the worker as exited when dropped, including during unwinding.
struct ExitGuard<'a>(&'a Shared);

impl Drop for ExitGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().exited = true;
        self.0.drained.notify_all();
    }
}

/// A timer service backed by a dedicated thread.
pub struct ScheduledTimer {
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
    name: String,
}

impl ScheduledTimer {
    /// Spawns the worker thread. The timer starts disarmed.
    pub fn spawn<F>(name: &str, callback: F) -> std::io::Result<Self>
    where
        F: FnMut() + Send + 'static,
    {
        let shared = Arc::new(Shared::default());
        let worker_shared = Arc::clone(&shared);
        let worker_name = name.to_string();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_worker(&worker_shared, &worker_name, callback))?;

        tracing::debug!(timer = name, "Timer worker started");

        Ok(Self {
            shared,
            worker_id: handle.thread().id(),
            worker: Mutex::new(Some(handle)),
            name: name.to_string(),
        })
    }

    /// Programs the next firing `due` from now, replacing any pending one.
    ///
    /// With `period` set the timer keeps firing every `period` after the
    /// first firing until changed, cancelled or disposed. A delay too large
    /// to represent leaves the timer pending but never due.
    pub fn change(&self, due: Duration, period: Option<Duration>) {
        let mut state = self.shared.lock();
        if state.stopped {
            return;
        }
        state.schedule = Some(Schedule {
            due: Instant::now().checked_add(due),
            period: period.filter(|p| !p.is_zero()),
        });
        self.shared.wakeup.notify_one();
    }

    /// Clears the pending firing, if any.
    pub fn cancel(&self) {
        let mut state = self.shared.lock();
        state.schedule = None;
        self.shared.wakeup.notify_one();
    }

    /// Whether a firing is currently scheduled.
    pub fn is_pending(&self) -> bool {
        let state = self.shared.lock();
        !state.stopped && state.schedule.is_some()
    }

    /// Stops the timer and waits for an in-flight callback to complete.
    ///
    /// Safe to call more than once and from several threads; every caller
    /// waits for the worker to exit. When called from the worker thread (for
    /// example from inside the callback) the wait is skipped, since the
    /// in-flight callback is the caller. Returns `false` if the worker
    /// thread panicked.
    pub fn dispose(&self) -> bool {
        {
            let mut state = self.shared.lock();
            state.stopped = true;
            state.schedule = None;
            self.shared.wakeup.notify_all();
        }

        if thread::current().id() == self.worker_id {
            tracing::trace!(timer = %self.name, "Dispose called from timer thread, skipping wait");
            return true;
        }

        let mut state = self.shared.lock();
        while !state.exited {
            state = self
                .shared
                .drained
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
        }
        drop(state);

        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match handle.map(JoinHandle::join) {
            Some(Err(_)) => {
                tracing::error!(timer = %self.name, "Timer worker panicked");
                false
            }
            Some(Ok(())) => {
                tracing::debug!(timer = %self.name, "Timer worker stopped");
                true
            }
            None => true,
        }
    }
}

impl Drop for ScheduledTimer {
    fn drop(&mut self) {
        self.dispose();
    }
}

fn run_worker<F>(shared: &Shared, name: &str, callback: F)
where
    F: FnMut(),
{
    let _exit = ExitGuard(shared);
    // The callback is dropped inside `worker_loop`, before the exit is signalled
    worker_loop(shared, name, callback);
}

fn worker_loop<F>(shared: &Shared, name: &str, mut callback: F)
where
    F: FnMut(),
{
    let mut state = shared.lock();

    loop {
        if state.stopped {
            break;
        }

        let schedule = state.schedule;
        let (due, period) = match schedule {
            Some(Schedule {
                due: Some(due),
                period,
            }) => (due, period),
            _ => {
                state = shared
                    .wakeup
                    .wait(state)
                    .unwrap_or_else(PoisonError::into_inner);
                continue;
            }
        };

        let now = Instant::now();
        if now < due {
            let (guard, _) = shared
                .wakeup
                .wait_timeout(state, due - now)
                .unwrap_or_else(PoisonError::into_inner);
            state = guard;
            continue;
        }

        state.schedule = period.map(|period| Schedule {
            due: now.checked_add(period),
            period: Some(period),
        });

        drop(state);
        if panic::catch_unwind(AssertUnwindSafe(&mut callback)).is_err() {
            tracing::error!(timer = name, "Timer callback panicked");
        }
        state = shared.lock();
    }
}
