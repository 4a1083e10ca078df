//! Compensating-action bookkeeping for multi-store operations.
//!
//! The metadata store and the blob store are different systems, so a request
//! that touches both cannot lean on a database transaction. Instead each
//! committed step registers the action that undoes it; if a later step fails,
//! the registered actions run in reverse order. A compensation that itself
//! fails is logged with enough context for manual reconciliation and never
//! masks the original error.

use futures::future::BoxFuture;
use tracing::{error, info};

/// Outcome of a single compensating action.
pub type CompensationResult = Result<(), String>;

type CompensateFn = Box<dyn FnOnce() -> BoxFuture<'static, CompensationResult> + Send>;

/// An ordered list of compensating actions for steps already committed.
#[derive(Default)]
pub struct Saga {
    compensations: Vec<(String, CompensateFn)>,
}

impl Saga {
    /// Create an empty saga.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the action that undoes the step just committed.
    ///
    /// The label names the step in logs, e.g. `"delete attachment record
    /// 42/report.pdf"`.
    pub fn push_compensation<F>(&mut self, label: impl Into<String>, undo: F)
    where
        F: FnOnce() -> BoxFuture<'static, CompensationResult> + Send + 'static,
    {
        self.compensations.push((label.into(), Box::new(undo)));
    }

    /// Number of registered compensations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.compensations.len()
    }

    /// Whether no compensation is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.compensations.is_empty()
    }

    /// The whole operation succeeded; nothing left to undo.
    pub fn commit(mut self) {
        self.compensations.clear();
    }

    /// A later step failed: run every registered compensation in reverse
    /// order. Failures are logged at error severity with the original cause
    /// and do not stop the remaining compensations.
    pub async fn unwind(mut self, cause: &(dyn std::fmt::Display + Sync)) {
        for (label, undo) in self.compensations.drain(..).rev() {
            match undo().await {
                Ok(()) => info!(step = %label, "compensating action applied"),
                Err(e) => {
                    error!(
                        step = %label,
                        error = %e,
                        original_error = %cause,
                        "compensating action failed; manual reconciliation needed"
                    );
                }
            }
        }
    }
}
