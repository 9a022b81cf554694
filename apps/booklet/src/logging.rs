//! Logging sink handed to the pure layout code.
//!
//! Parsing, planning, and retrieval never reach for a global logger. Callers pass a
//! `&dyn LogSink`; the binary wires in `TracingSink`, tests record what was emitted.

/// Minimal logging interface threaded through every call that may report diagnostics.
pub trait LogSink: Send + Sync {
    fn warn(&self, message: &str);
    fn info(&self, message: &str);
    fn debug(&self, message: &str);
}

/// Forwards to the `tracing` subscriber installed by `main`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn warn(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn debug(&self, message: &str) {
        tracing::debug!("{message}");
    }
}

#[cfg(test)]
pub use recording::RecordingSink;
