//! Execution Context: per-invocation settings threaded through a run
use tracing::Span;

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub trace_id: String,
    /// Report what would change without touching the appliance
    pub check_mode: bool,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            check_mode: false,
        }
    }

    pub fn check_mode(mut self, enabled: bool) -> Self {
        self.check_mode = enabled;
        self
    }

    /// Span that tags every log line of the run with its trace id
    pub fn span(&self, operation: &'static str) -> Span {
        tracing::info_span!(
            "reconcile",
            operation,
            trace_id = %self.trace_id,
            check_mode = self.check_mode
        )
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}
