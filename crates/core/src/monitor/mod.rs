//! Background library monitor.
//!
//! Runs sync → classify → plan → apply on a fixed interval and records the
//! outcome in the store, the notification list, and metrics.

mod config;
mod runner;

pub use config::MonitorConfig;
pub use runner::{CycleReport, LibraryMonitor};
