//! Agent execution framework for the lessonweave pipeline.
//!
//! This module provides the core abstractions for pipeline stages: the
//! [`Agent`] trait, the execution context agents use to emit progress
//! events, and the error types the runner converts into the terminal error
//! path. The four stage implementations live in the submodules:
//! [`chat`], [`retriever`], [`preview`], and [`validation`].

// Standard library and external crates
use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

// Internal crate modules
use crate::state::{PipelineState, StatePatch};
use crate::stream::StreamEvent;
use crate::types::Stage;

pub mod chat;
pub mod preview;
pub mod retriever;
pub mod validation;

pub use chat::{ChatAgent, ChatModel, ChatPrompt, ModelError, TokenStream};
pub use preview::PreviewAgent;
pub use retriever::{ContextRetriever, RetrievalError, RetrieverAgent};
pub use validation::{CheckerError, MathChecker, MathVerdict, ValidationAgent};

// ============================================================================
// Core Trait
// ============================================================================

/// Core trait defining one pipeline stage.
///
/// An agent receives an immutable snapshot of the run's state plus an
/// execution context, performs its work, and returns the partial state
/// update the runner merges before the next stage.
///
/// # Design Principles
///
/// - **Stateless**: agents hold collaborators (model, retriever, checker),
///   never per-run state; the snapshot is the only input.
/// - **Observable**: progress is emitted through the context, not returned.
/// - **Contained**: an agent's own failure is returned as `Err(AgentError)`
///   and converted by the runner into the single terminal `error` event —
///   it never escapes the event surface.
///
/// # Error Handling
///
/// Two distinct channels exist for "something went wrong":
/// 1. **Stage execution failure** — return `Err(AgentError)`; the runner
///    stops the pipeline with one `error` event.
/// 2. **Domain findings** — carried as data in the patch (for example a
///    [`ValidationOutcome`](crate::state::ValidationOutcome)); the pipeline
///    continues.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use lessonweave::agents::{Agent, AgentContext, AgentError};
/// use lessonweave::state::{PipelineState, StatePatch};
///
/// struct AnnotatingAgent;
///
/// #[async_trait]
/// impl Agent for AnnotatingAgent {
///     async fn run(
///         &self,
///         snapshot: PipelineState,
///         ctx: AgentContext,
///     ) -> Result<StatePatch, AgentError> {
///         ctx.emit_status(format!("looking at: {}", snapshot.user_input))?;
///         Ok(StatePatch::new())
///     }
/// }
/// ```
#[async_trait]
pub trait Agent: Send + Sync {
    /// Execute this stage against the given state snapshot.
    async fn run(
        &self,
        snapshot: PipelineState,
        ctx: AgentContext,
    ) -> Result<StatePatch, AgentError>;
}

// ============================================================================
// Execution Context
// ============================================================================

/// Execution context passed to agents during a pipeline run.
///
/// Carries the stage identity and run id, and the sending half of the run's
/// event channel. Emitted events are enriched with the stage label so the
/// caller-visible stream needs no further translation.
#[derive(Clone, Debug)]
pub struct AgentContext {
    /// The stage this agent is executing as.
    pub stage: Stage,
    /// Identifier of the surrounding pipeline invocation.
    pub run_id: String,
    events: flume::Sender<StreamEvent>,
}

impl AgentContext {
    pub(crate) fn new(stage: Stage, run_id: String, events: flume::Sender<StreamEvent>) -> Self {
        Self {
            stage,
            run_id,
            events,
        }
    }

    /// Emit a stage-scoped status event.
    pub fn emit_status(&self, detail: impl Into<String>) -> Result<(), EmitError> {
        self.send(StreamEvent::status(self.stage, detail))
    }

    /// Emit one chunk of generated reply text.
    pub fn emit_token(&self, text: impl Into<String>) -> Result<(), EmitError> {
        self.send(StreamEvent::token(text))
    }

    fn send(&self, event: StreamEvent) -> Result<(), EmitError> {
        self.events
            .send(event)
            .map_err(|_| EmitError::Disconnected)
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Errors raised when emitting through an [`AgentContext`].
///
/// The only failure mode is a dropped consumer: the runner interprets it as
/// cancellation and stops scheduling stages rather than surfacing an error
/// event nobody would receive.
#[derive(Debug, Error, Diagnostic)]
pub enum EmitError {
    /// The event stream's consumer disconnected.
    #[error("failed to emit event: stream consumer disconnected")]
    #[diagnostic(
        code(lessonweave::agent::consumer_disconnected),
        help("The caller stopped consuming the event stream; the run will stop.")
    )]
    Disconnected,
}

/// Errors that can occur during agent execution.
///
/// `AgentError` represents failures of the stage itself. Domain findings
/// (validation issues, empty retrieval results) are never errors — they are
/// carried in the patch as data.
#[derive(Debug, Error, Diagnostic)]
pub enum AgentError {
    /// Expected input data is missing from the state snapshot.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(lessonweave::agent::missing_input),
        help("Check that the previous stage produced the required data.")
    )]
    MissingInput { what: &'static str },

    /// An external collaborator (model, backend) failed.
    #[error("provider error ({provider}): {message}")]
    #[diagnostic(code(lessonweave::agent::provider))]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// Event emission failed because the consumer disconnected.
    #[error(transparent)]
    #[diagnostic(code(lessonweave::agent::emit))]
    Emit(#[from] EmitError),
}

impl AgentError {
    /// Returns true when this error means the caller went away, which the
    /// runner treats as cancellation rather than a pipeline error.
    #[must_use]
    pub fn is_cancellation(&self) -> bool {
        matches!(self, AgentError::Emit(_))
    }
}
