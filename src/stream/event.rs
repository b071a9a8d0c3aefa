//! The discriminated event protocol exposed to pipeline callers.

use serde::{Deserialize, Serialize};

use crate::state::ValidationOutcome;
use crate::types::Stage;

/// One event in the pipeline's output sequence.
///
/// Events serialize to one JSON object per line, discriminated by `type`.
/// A stream contains progress events (`status`, `token`, `preview`,
/// `validation`) followed by exactly one terminal event (`final` or
/// `error`). Events deliberately carry no wall-clock timestamps so that a
/// replay against deterministic collaborators yields a byte-identical
/// sequence.
///
/// # Wire shapes
///
/// ```json
/// {"type":"status","stage":"retrieve","detail":"found 2 sources"}
/// {"type":"token","text":"The "}
/// {"type":"preview","content":"Worksheet: ..."}
/// {"type":"validation","result":{"status":"valid"}}
/// {"type":"final","output":"Worksheet: ..."}
/// {"type":"error","message":"chat model unavailable"}
/// ```
///
/// # Examples
///
/// ```
/// use lessonweave::stream::StreamEvent;
/// use lessonweave::types::Stage;
///
/// let event = StreamEvent::status(Stage::Retrieve, "found 2 sources");
/// let line = event.to_json_line().unwrap();
/// assert_eq!(
///     line,
///     r#"{"type":"status","stage":"retrieve","detail":"found 2 sources"}"#
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A stage began work or reports coarse progress.
    Status { stage: Stage, detail: String },
    /// One chunk of the conversational reply as it is generated.
    Token { text: String },
    /// The completed artifact draft from the preview stage.
    Preview { content: String },
    /// The validation stage's outcome.
    Validation { result: ValidationOutcome },
    /// Terminal success event carrying the composed artifact.
    Final { output: String },
    /// Terminal failure event carrying a human-readable message.
    Error { message: String },
}

impl StreamEvent {
    pub fn status(stage: Stage, detail: impl Into<String>) -> Self {
        StreamEvent::Status {
            stage,
            detail: detail.into(),
        }
    }

    pub fn token(text: impl Into<String>) -> Self {
        StreamEvent::Token { text: text.into() }
    }

    pub fn preview(content: impl Into<String>) -> Self {
        StreamEvent::Preview {
            content: content.into(),
        }
    }

    pub fn validation(result: ValidationOutcome) -> Self {
        StreamEvent::Validation { result }
    }

    pub fn final_event(output: impl Into<String>) -> Self {
        StreamEvent::Final {
            output: output.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        StreamEvent::Error {
            message: message.into(),
        }
    }

    /// Returns true for the events that close a stream.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Final { .. } | StreamEvent::Error { .. })
    }

    /// The stage label for `status` events, `None` otherwise.
    #[must_use]
    pub fn status_stage(&self) -> Option<Stage> {
        match self {
            StreamEvent::Status { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Serializes this event as one compact newline-free JSON object,
    /// suitable for newline-delimited transport.
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
