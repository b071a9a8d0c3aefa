//! Run identifier generation.

use uuid::Uuid;

/// Generates the identifiers that tie a pipeline invocation's log lines and
/// events together.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdGenerator;

impl IdGenerator {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// A fresh run id, e.g. `run-6f9d...`.
    #[must_use]
    pub fn generate_run_id(&self) -> String {
        format!("run-{}", Uuid::new_v4())
    }
}
