//! Progress and status messages emitted by a session.
//!
//! The session reports what it is doing (logging in, executing a method,
//! renewing an expired session) through a [`Notifier`]. Library users get
//! [`TracingNotifier`] by default; the `edbo` binary uses [`ConsoleNotifier`]
//! to echo coloured lines to stderr.

use color_print::ceprintln;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, severity: Severity, message: &str);
}

/// Forwards every message to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Info => debug!("{}", message),
            Severity::Success => info!("{}", message),
            Severity::Warning => warn!("{}", message),
            Severity::Error => error!("{}", message),
        }
    }
}

/// Echoes messages to stderr, so stdout stays free for method results
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier {
    quiet: bool,
}

impl ConsoleNotifier {
    /// A quiet notifier only prints warnings and errors
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, severity: Severity, message: &str) {
        TracingNotifier.notify(severity, message);

        match severity {
            Severity::Info if !self.quiet => ceprintln!("{}", message),
            Severity::Success if !self.quiet => ceprintln!("<green>{}</green>", message),
            Severity::Warning => ceprintln!("<yellow>{}</yellow>", message),
            Severity::Error => ceprintln!("<red>{}</red>", message),
            _ => (),
        }
    }
}
