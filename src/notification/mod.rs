//! Timeout notification rendering and delivery.
//!
//! Provides the notification record, the pure rendering step that turns
//! watchdog settings into a record, and the sinks that deliver it.

pub mod render;
pub mod sink;
pub mod types;

pub use render::*;
pub use sink::*;
pub use types::*;
