//! idlewatch - reference host for the watchdog.
//!
//! Every line read from stdin counts as one activity event. When stdin has
//! been quiet for the configured timeout a notification is written to the
//! log (or to stdout as JSON). EOF or Ctrl+C shuts the watchdog down.

use idlewatch::{JsonLinesSink, NotificationSink, OutputKind, Settings, TracingSink, Watchdog};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

#[derive(Debug, Clone, Copy)]
enum StopReason {
    EndOfInput,
    Interrupted,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logs go to stderr so JSON output on stdout stays clean
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("idlewatch=info")),
        )
        .init();

    let path = Settings::resolve_path(std::env::args_os().nth(1).map(PathBuf::from));
    let settings = Settings::load(&path)?;
    let config = settings.to_watchdog_config()?;

    eprintln!("🔧 Settings loaded from {}", path.display());
    if config.is_enabled() {
        eprintln!(
            "   ✓ Timeout {}s, repeat: {}, level: {}",
            config.interval.as_secs(),
            config.repeat,
            config.level
        );
    } else {
        eprintln!("   ⚠ Timeout below 1 second, watchdog disabled");
    }

    let sink: Arc<dyn NotificationSink> = match settings.output {
        OutputKind::Log => Arc::new(TracingSink),
        OutputKind::Json => Arc::new(JsonLinesSink::new(std::io::stdout())),
    };
    let watchdog = Arc::new(Watchdog::new(config, sink)?);

    let (stop_tx, stop_rx) = mpsc::channel::<StopReason>();

    let ctrlc_tx = stop_tx.clone();
    ctrlc::set_handler(move || {
        let _ = ctrlc_tx.send(StopReason::Interrupted);
    })?;

    let events = Arc::new(AtomicU64::new(0));
    let reader_events = Arc::clone(&events);
    let reader_watchdog = Arc::clone(&watchdog);
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            if let Err(e) = line {
                tracing::warn!(?e, "Failed to read activity from stdin");
                break;
            }
            reader_watchdog.notify();
            reader_events.fetch_add(1, Ordering::Relaxed);
        }
        let _ = stop_tx.send(StopReason::EndOfInput);
    });

    eprintln!("🎯 Watching stdin for activity (Ctrl+C to quit)");

    let reason = stop_rx.recv().unwrap_or(StopReason::EndOfInput);
    tracing::info!(?reason, "Stopping");

    watchdog.shutdown();

    eprintln!(
        "👋 Stopped after {} activity events",
        events.load(Ordering::Relaxed)
    );
    Ok(())
}
