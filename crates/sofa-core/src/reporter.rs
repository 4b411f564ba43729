//! Decouples pipeline control flow from how progress is displayed.
//!
//! The orchestrator calls these methods as stages run; it never formats output
//! itself. A terminal implementation lives in `sofa-cli`; tests use [`NullReporter`].

use std::sync::Arc;

/// Receives lifecycle callbacks from the pipeline orchestrator.
pub trait Reporter: Send + Sync {
    /// A stage ("Fetch", "Process", "Emit") is starting.
    fn stage_start(&self, stage: &str) {
        let _ = stage;
    }

    /// One source or step within a stage finished.
    fn source_done(&self, stage: &str, source: &str, outcome: &str) {
        let _ = (stage, source, outcome);
    }

    /// One source or step within a stage failed; the stage may still continue.
    fn source_failed(&self, stage: &str, source: &str, error: &str) {
        let _ = (stage, source, error);
    }

    /// A stage finished, with its elapsed time and whether it succeeded.
    fn stage_done(&self, stage: &str, elapsed: std::time::Duration, ok: bool) {
        let _ = (stage, elapsed, ok);
    }

    /// Informational message with no particular stage association.
    fn info(&self, message: &str) {
        let _ = message;
    }

    /// Non-fatal warning.
    fn warning(&self, message: &str) {
        let _ = message;
    }

    /// The whole run finished; print a final summary table.
    fn summary(&self, exit_code: i32) {
        let _ = exit_code;
    }
}

impl<T: Reporter + ?Sized> Reporter for Arc<T> {
    fn stage_start(&self, stage: &str) {
        (**self).stage_start(stage);
    }

    fn source_done(&self, stage: &str, source: &str, outcome: &str) {
        (**self).source_done(stage, source, outcome);
    }

    fn source_failed(&self, stage: &str, source: &str, error: &str) {
        (**self).source_failed(stage, source, error);
    }

    fn stage_done(&self, stage: &str, elapsed: std::time::Duration, ok: bool) {
        (**self).stage_done(stage, elapsed, ok);
    }

    fn info(&self, message: &str) {
        (**self).info(message);
    }

    fn warning(&self, message: &str) {
        (**self).warning(message);
    }

    fn summary(&self, exit_code: i32) {
        (**self).summary(exit_code);
    }
}

/// A reporter that discards every callback. Used in tests and library callers
/// that only want the return value, not progress output.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {}

/// A reporter that forwards every callback to `tracing`, for non-interactive runs.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn stage_start(&self, stage: &str) {
        tracing::info!(stage, "stage starting");
    }

    fn source_done(&self, stage: &str, source: &str, outcome: &str) {
        tracing::info!(stage, source, outcome, "source completed");
    }

    fn source_failed(&self, stage: &str, source: &str, error: &str) {
        tracing::warn!(stage, source, error, "source failed");
    }

    fn stage_done(&self, stage: &str, elapsed: std::time::Duration, ok: bool) {
        tracing::info!(stage, elapsed_ms = elapsed.as_millis() as u64, ok, "stage finished");
    }

    fn info(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{message}");
    }

    fn summary(&self, exit_code: i32) {
        tracing::info!(exit_code, "pipeline finished");
    }
}
