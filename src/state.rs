//! State model for the lessonweave pipeline.
//!
//! One [`PipelineState`] is created per pipeline invocation from the caller's
//! [`PipelineRequest`], threaded through every stage, and discarded after the
//! terminal event is emitted. Agents never mutate state in place: each stage
//! returns a [`StatePatch`] and the runner produces a new snapshot by merging
//! the patch onto the previous one ([`PipelineState::apply`]).
//!
//! # Merge semantics
//!
//! - `messages` in a patch are **appended** to the history.
//! - Every other `Some` field **overwrites** the previous value.
//! - `None` fields persist the previous value.
//!
//! # Examples
//!
//! ```
//! use lessonweave::state::{PipelineRequest, PipelineState, StatePatch, Mode};
//! use lessonweave::message::Message;
//!
//! let request = PipelineRequest::builder("Explain derivatives")
//!     .mode(Mode::Student)
//!     .build();
//! let state = PipelineState::from_request(&request);
//! assert_eq!(state.messages.len(), 1); // the new user turn
//!
//! let patch = StatePatch::new()
//!     .with_chat_output("A derivative measures instantaneous change.")
//!     .with_messages(vec![Message::assistant(
//!         "A derivative measures instantaneous change.",
//!     )]);
//! let state = state.apply(patch);
//! assert_eq!(state.messages.len(), 2);
//! assert!(state.chat_output.is_some());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Audience mode for a pipeline run.
///
/// Selects agent routing and prompt tone: student mode favors step-by-step
/// explanation, teacher mode favors classroom-ready material and always
/// triggers context retrieval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Student,
    Teacher,
}

impl Mode {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Student => "student",
            Mode::Teacher => "teacher",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Content-generation settings supplied by the caller.
///
/// All fields are required, free-form strings; the core does not enforce
/// numeric ranges or vocabularies (that validation belongs to the caller).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentSettings {
    /// Kind of artifact to draft, e.g. "worksheet" or "explanation".
    pub content_type: String,
    /// Target grade level, e.g. "6th grade".
    pub grade_level: String,
    /// Desired artifact length, e.g. "short" or "two pages".
    pub length: String,
    /// Voice for generated text, e.g. "encouraging".
    pub tone: String,
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            content_type: "explanation".to_string(),
            grade_level: "middle school".to_string(),
            length: "medium".to_string(),
            tone: "encouraging".to_string(),
        }
    }
}

impl ContentSettings {
    #[must_use]
    pub fn new(content_type: &str, grade_level: &str, length: &str, tone: &str) -> Self {
        Self {
            content_type: content_type.to_string(),
            grade_level: grade_level.to_string(),
            length: length.to_string(),
            tone: tone.to_string(),
        }
    }
}

/// A ranked snippet returned by the retrieval backend.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContextSnippet {
    /// Identifier of the source document or corpus entry.
    pub source: String,
    /// Snippet text.
    pub text: String,
    /// Backend relevance score; higher is more relevant.
    pub score: f32,
}

impl ContextSnippet {
    #[must_use]
    pub fn new(source: &str, text: &str, score: f32) -> Self {
        Self {
            source: source.to_string(),
            text: text.to_string(),
            score,
        }
    }
}

/// A single mathematical issue found in a drafted artifact.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathFinding {
    /// Description of the problem, e.g. "3 × 4 stated as 14".
    pub detail: String,
    /// Where the issue appears, e.g. "problem 3".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Suggested correction, when the checker can produce one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correction: Option<String>,
}

impl MathFinding {
    #[must_use]
    pub fn new(detail: &str) -> Self {
        Self {
            detail: detail.to_string(),
            location: None,
            correction: None,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: &str) -> Self {
        self.location = Some(location.to_string());
        self
    }

    #[must_use]
    pub fn with_correction(mut self, correction: &str) -> Self {
        self.correction = Some(correction.to_string());
        self
    }
}

/// Outcome of the validation stage, carried as data in the state.
///
/// `ValidationError` means the checker itself failed (an internal failure,
/// not a content problem); it never aborts the pipeline.
///
/// # Serialized form
///
/// ```json
/// {"status": "errors_found", "errors": [...], "suggestions": [...]}
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ValidationOutcome {
    Valid,
    ErrorsFound {
        errors: Vec<MathFinding>,
        suggestions: Vec<String>,
    },
    ValidationError {
        message: String,
    },
}

impl ValidationOutcome {
    /// Returns true when the artifact passed validation cleanly.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }
}

/// Caller request that seeds a pipeline invocation.
///
/// The core assumes `question` is non-empty; empty input is rejected by the
/// surrounding transport layer before the pipeline starts.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineRequest {
    /// The current turn's raw text.
    pub question: String,
    /// Prior conversation turns, oldest first.
    pub history: Vec<Message>,
    /// Audience mode.
    pub mode: Mode,
    /// Whether the caller wants the full preview + validation pipeline.
    pub structured_output: bool,
    /// Content-generation settings.
    pub settings: ContentSettings,
    /// Persistence thread identifier, opaque to the core.
    pub thread_id: Option<String>,
    /// Caller identifier, opaque to the core.
    pub user_id: Option<String>,
    /// Degraded single-stage mode: chat only, no preview/validation.
    pub fallback: bool,
}

impl PipelineRequest {
    /// Starts a builder for a request with the given question.
    #[must_use]
    pub fn builder(question: &str) -> PipelineRequestBuilder {
        PipelineRequestBuilder::new(question)
    }
}

/// Fluent builder for [`PipelineRequest`].
///
/// # Examples
///
/// ```
/// use lessonweave::state::{ContentSettings, Mode, PipelineRequest};
/// use lessonweave::message::Message;
///
/// let request = PipelineRequest::builder("Make a worksheet on fractions")
///     .mode(Mode::Teacher)
///     .structured_output(true)
///     .settings(ContentSettings::new("worksheet", "4th grade", "short", "playful"))
///     .history(vec![Message::user("We covered halves last week.")])
///     .thread_id("thread-42")
///     .build();
///
/// assert!(request.structured_output);
/// assert_eq!(request.history.len(), 1);
/// ```
#[derive(Clone, Debug)]
pub struct PipelineRequestBuilder {
    question: String,
    history: Vec<Message>,
    mode: Mode,
    structured_output: bool,
    settings: ContentSettings,
    thread_id: Option<String>,
    user_id: Option<String>,
    fallback: bool,
}

impl PipelineRequestBuilder {
    fn new(question: &str) -> Self {
        Self {
            question: question.to_string(),
            history: Vec::new(),
            mode: Mode::default(),
            structured_output: false,
            settings: ContentSettings::default(),
            thread_id: None,
            user_id: None,
            fallback: false,
        }
    }

    #[must_use]
    pub fn history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn structured_output(mut self, structured_output: bool) -> Self {
        self.structured_output = structured_output;
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: ContentSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn thread_id(mut self, thread_id: &str) -> Self {
        self.thread_id = Some(thread_id.to_string());
        self
    }

    #[must_use]
    pub fn user_id(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    #[must_use]
    pub fn fallback(mut self, fallback: bool) -> Self {
        self.fallback = fallback;
        self
    }

    #[must_use]
    pub fn build(self) -> PipelineRequest {
        PipelineRequest {
            question: self.question,
            history: self.history,
            mode: self.mode,
            structured_output: self.structured_output,
            settings: self.settings,
            thread_id: self.thread_id,
            user_id: self.user_id,
            fallback: self.fallback,
        }
    }
}

/// The shared state record threaded through every pipeline stage.
///
/// Exactly one of `final_output` / `error` is set by the time the terminal
/// event is emitted. `validation` is only meaningful once `preview_content`
/// is set.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineState {
    /// Conversation turns, append-only; includes the current user turn.
    pub messages: Vec<Message>,
    /// Persistence thread identifier, opaque to the core.
    pub thread_id: Option<String>,
    /// Caller identifier, opaque to the core.
    pub user_id: Option<String>,
    /// Audience mode for this run.
    pub mode: Mode,
    /// Content-generation settings for this run.
    pub settings: ContentSettings,
    /// The current turn's raw question text.
    pub user_input: String,
    /// Conversational reply produced by the chat stage.
    pub chat_output: Option<String>,
    /// Snippets produced by the retrieval stage; `Some(vec![])` after a
    /// best-effort lookup that found nothing, `None` if retrieval never ran.
    pub retrieved_context: Option<Vec<ContextSnippet>>,
    /// Drafted artifact text produced by the preview stage.
    pub preview_content: Option<String>,
    /// Validation outcome; meaningful only once `preview_content` is set.
    pub validation: Option<ValidationOutcome>,
    /// The artifact handed back to the caller on success.
    pub final_output: Option<String>,
    /// Terminal error message; presence short-circuits remaining stages.
    pub error: Option<String>,
}

impl PipelineState {
    /// Seeds run state from a caller request.
    ///
    /// The new user turn is appended to the supplied history; it is the only
    /// mutation the conversation sees during a run besides the assistant
    /// reply appended by the chat stage's patch.
    #[must_use]
    pub fn from_request(request: &PipelineRequest) -> Self {
        let mut messages = request.history.clone();
        messages.push(Message::user(&request.question));
        Self {
            messages,
            thread_id: request.thread_id.clone(),
            user_id: request.user_id.clone(),
            mode: request.mode,
            settings: request.settings.clone(),
            user_input: request.question.clone(),
            chat_output: None,
            retrieved_context: None,
            preview_content: None,
            validation: None,
            final_output: None,
            error: None,
        }
    }

    /// Merges a stage patch onto this snapshot, producing the next snapshot.
    ///
    /// Patch messages are appended; every other `Some` field overwrites;
    /// unspecified fields persist.
    #[must_use]
    pub fn apply(mut self, patch: StatePatch) -> Self {
        if let Some(new_messages) = patch.messages {
            self.messages.extend(new_messages);
        }
        if let Some(chat_output) = patch.chat_output {
            self.chat_output = Some(chat_output);
        }
        if let Some(retrieved_context) = patch.retrieved_context {
            self.retrieved_context = Some(retrieved_context);
        }
        if let Some(preview_content) = patch.preview_content {
            self.preview_content = Some(preview_content);
        }
        if let Some(validation) = patch.validation {
            self.validation = Some(validation);
        }
        if let Some(error) = patch.error {
            self.error = Some(error);
        }
        self
    }

    /// Composes the terminal artifact, preferring the drafted preview over
    /// the conversational reply when both exist.
    #[must_use]
    pub fn compose_final_output(&self) -> Option<String> {
        self.preview_content
            .clone()
            .or_else(|| self.chat_output.clone())
    }
}

/// Partial state update returned by one agent stage.
///
/// All fields are optional so each agent touches only the state it owns;
/// the runner merges patches via [`PipelineState::apply`].
///
/// # Examples
///
/// ```
/// use lessonweave::state::{StatePatch, ValidationOutcome};
///
/// let patch = StatePatch::new()
///     .with_preview_content("Worksheet: Derivatives\n1) d/dx x^2 = ?")
///     .with_validation(ValidationOutcome::Valid);
/// assert!(patch.preview_content.is_some());
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatePatch {
    /// Messages to append to the conversation history.
    pub messages: Option<Vec<Message>>,
    /// Conversational reply text.
    pub chat_output: Option<String>,
    /// Retrieved context snippets (possibly empty on best-effort failure).
    pub retrieved_context: Option<Vec<ContextSnippet>>,
    /// Drafted artifact text.
    pub preview_content: Option<String>,
    /// Validation outcome.
    pub validation: Option<ValidationOutcome>,
    /// Terminal error message for a failed stage.
    pub error: Option<String>,
}

impl StatePatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_messages(mut self, messages: Vec<Message>) -> Self {
        self.messages = Some(messages);
        self
    }

    #[must_use]
    pub fn with_chat_output(mut self, chat_output: impl Into<String>) -> Self {
        self.chat_output = Some(chat_output.into());
        self
    }

    #[must_use]
    pub fn with_retrieved_context(mut self, retrieved_context: Vec<ContextSnippet>) -> Self {
        self.retrieved_context = Some(retrieved_context);
        self
    }

    #[must_use]
    pub fn with_preview_content(mut self, preview_content: impl Into<String>) -> Self {
        self.preview_content = Some(preview_content.into());
        self
    }

    #[must_use]
    pub fn with_validation(mut self, validation: ValidationOutcome) -> Self {
        self.validation = Some(validation);
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Returns true when the patch carries no changes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_none()
            && self.chat_output.is_none()
            && self.retrieved_context.is_none()
            && self.preview_content.is_none()
            && self.validation.is_none()
            && self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> PipelineRequest {
        PipelineRequest::builder("Explain derivatives")
            .history(vec![
                Message::user("What did we cover last time?"),
                Message::assistant("We reviewed limits."),
            ])
            .build()
    }

    #[test]
    fn from_request_appends_user_turn() {
        let state = PipelineState::from_request(&request());
        assert_eq!(state.messages.len(), 3);
        let last = state.messages.last().expect("user turn");
        assert!(last.has_role(Message::USER));
        assert_eq!(last.content, "Explain derivatives");
        assert_eq!(state.user_input, "Explain derivatives");
        assert!(state.chat_output.is_none());
        assert!(state.error.is_none());
    }

    #[test]
    fn apply_appends_messages_and_overwrites_scalars() {
        let state = PipelineState::from_request(&request());
        let patch = StatePatch::new()
            .with_messages(vec![Message::assistant("A derivative is a rate of change.")])
            .with_chat_output("A derivative is a rate of change.");
        let next = state.apply(patch);

        assert_eq!(next.messages.len(), 4);
        assert_eq!(
            next.chat_output.as_deref(),
            Some("A derivative is a rate of change.")
        );

        // A later patch overwrites scalar fields without touching the rest.
        let next = next.apply(StatePatch::new().with_chat_output("Revised reply."));
        assert_eq!(next.chat_output.as_deref(), Some("Revised reply."));
        assert_eq!(next.messages.len(), 4);
    }

    #[test]
    fn apply_preserves_unspecified_fields() {
        let state = PipelineState::from_request(&request())
            .apply(StatePatch::new().with_chat_output("reply"))
            .apply(StatePatch::new().with_retrieved_context(vec![ContextSnippet::new(
                "textbook",
                "The derivative of x^2 is 2x.",
                0.9,
            )]));

        assert_eq!(state.chat_output.as_deref(), Some("reply"));
        assert_eq!(state.retrieved_context.as_ref().map(Vec::len), Some(1));

        let state = state.apply(StatePatch::new());
        assert_eq!(state.chat_output.as_deref(), Some("reply"));
        assert_eq!(state.retrieved_context.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn compose_final_prefers_preview_over_chat() {
        let state = PipelineState::from_request(&request())
            .apply(StatePatch::new().with_chat_output("chat reply"));
        assert_eq!(state.compose_final_output().as_deref(), Some("chat reply"));

        let state = state.apply(StatePatch::new().with_preview_content("worksheet draft"));
        assert_eq!(
            state.compose_final_output().as_deref(),
            Some("worksheet draft")
        );
    }

    #[test]
    fn validation_outcome_serialization() {
        let outcome = ValidationOutcome::ErrorsFound {
            errors: vec![
                MathFinding::new("3 × 4 stated as 14")
                    .with_location("problem 2")
                    .with_correction("3 × 4 = 12"),
            ],
            suggestions: vec!["Re-check the multiplication table.".to_string()],
        };
        let json = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(json["status"], "errors_found");
        assert_eq!(json["errors"][0]["location"], "problem 2");

        let internal = ValidationOutcome::ValidationError {
            message: "checker unavailable".to_string(),
        };
        let json = serde_json::to_value(&internal).expect("serialize");
        assert_eq!(json["status"], "validation_error");

        let valid = serde_json::to_value(ValidationOutcome::Valid).expect("serialize");
        assert_eq!(valid["status"], "valid");
    }

    #[test]
    fn empty_patch_is_empty() {
        assert!(StatePatch::new().is_empty());
        assert!(!StatePatch::new().with_error("boom").is_empty());
    }
}
