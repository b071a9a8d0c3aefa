//! Core identifiers for the lessonweave pipeline.
//!
//! This module defines [`Stage`], the identifier for each step of the
//! pipeline state machine. Stages name the runnable steps only; the terminal
//! "done" transition is handled by the runner itself and never appears in a
//! stage plan.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One named step in the pipeline state machine.
///
/// Stages are both routing-table entries (see
/// [`route_stages`](crate::runner::route_stages)) and the `stage` label on
/// [`status` events](crate::stream::StreamEvent::Status) emitted to callers.
///
/// # Examples
///
/// ```
/// use lessonweave::types::Stage;
///
/// assert_eq!(Stage::Retrieve.as_str(), "retrieve");
/// assert_eq!(serde_json::to_string(&Stage::Validate).unwrap(), "\"validate\"");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Conversational reply generation. Always runs first.
    Chat,
    /// Best-effort context lookup against the retrieval backend.
    Retrieve,
    /// Structured artifact drafting.
    Preview,
    /// Mathematical-correctness checking of the drafted artifact.
    Validate,
}

impl Stage {
    /// The wire label used in `status` events and logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Chat => "chat",
            Stage::Retrieve => "retrieve",
            Stage::Preview => "preview",
            Stage::Validate => "validate",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
