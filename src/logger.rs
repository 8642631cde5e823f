//! Pluggable diagnostics sink.
//!
//! The engine reports everything it does through a [`Logger`]. Severity
//! gating happens before the trait is called: INFO lines are emitted only
//! when the segment's effective `verbose` or `debug` level is positive,
//! DEBUG lines only when `debug` is positive, and item context is appended
//! to the message only when `verbose` exceeds 1. WARN and ERROR lines are
//! always emitted. A custom sink therefore only needs to record what it is
//! handed.
//!
//! The default [`TracingLogger`] forwards each severity to the matching
//! `tracing` macro with the segment path as a structured field.

/// A diagnostics sink receiving gated log lines from the engine.
///
/// `segment` is always the full path of the emitting segment.
pub trait Logger: Send + Sync {
    /// A terminating failure. The engine surfaces a matching error to the
    /// caller after this is reported.
    fn error(&self, segment: &str, message: &str);

    /// A reported problem that does not interrupt control flow.
    fn warn(&self, segment: &str, message: &str);

    /// Progress reporting, gated on `verbose > 0` or `debug > 0`.
    fn info(&self, segment: &str, message: &str);

    /// Internal detail, gated on `debug > 0`.
    fn debug(&self, segment: &str, message: &str);
}

/// Default logger backed by the `tracing` macros.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn error(&self, segment: &str, message: &str) {
        tracing::error!(segment = %segment, "{message}");
    }

    fn warn(&self, segment: &str, message: &str) {
        tracing::warn!(segment = %segment, "{message}");
    }

    fn info(&self, segment: &str, message: &str) {
        tracing::info!(segment = %segment, "{message}");
    }

    fn debug(&self, segment: &str, message: &str) {
        tracing::debug!(segment = %segment, "{message}");
    }
}
