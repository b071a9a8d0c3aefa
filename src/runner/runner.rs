//! The pipeline runner: a sequential state machine over agent stages.
//!
//! The runner resolves the stage plan for a request, drives each agent in
//! order, merges every returned patch into the running state snapshot, and
//! converts internal progress into the caller-visible event stream. Exactly
//! one terminal event (`final` xor `error`) closes every stream.

use std::sync::Arc;
use std::time::Duration;

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::instrument;

use crate::agents::retriever::DEFAULT_TOP_K;
use crate::agents::{
    Agent, AgentContext, ChatAgent, ChatModel, ContextRetriever, MathChecker, PreviewAgent,
    RetrieverAgent, ValidationAgent,
};
use crate::runner::routing::route_request;
use crate::state::{PipelineRequest, PipelineState, StatePatch};
use crate::stream::{EventStream, InvocationHandle, StreamEvent};
use crate::types::Stage;
use crate::utils::id_generator::IdGenerator;

/// Runtime knobs for a [`PipelineRunner`].
///
/// `stage_timeout` is a policy hook: when set, a stage exceeding it is
/// converted to the same error path as any other stage failure. The core
/// mandates no specific duration.
#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// Per-stage wall-clock limit; `None` disables timeouts.
    pub stage_timeout: Option<Duration>,
    /// Snippet count requested from the retrieval backend.
    pub retrieval_top_k: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            stage_timeout: None,
            retrieval_top_k: DEFAULT_TOP_K,
        }
    }
}

impl RunnerConfig {
    /// Resolves configuration from the environment (honoring a `.env` file):
    /// `LESSONWEAVE_STAGE_TIMEOUT_MS` and `LESSONWEAVE_RETRIEVAL_TOP_K`.
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let stage_timeout = std::env::var("LESSONWEAVE_STAGE_TIMEOUT_MS")
            .ok()
            .and_then(|raw| raw.parse::<u64>().ok())
            .map(Duration::from_millis);
        let retrieval_top_k = std::env::var("LESSONWEAVE_RETRIEVAL_TOP_K")
            .ok()
            .and_then(|raw| raw.parse::<usize>().ok())
            .unwrap_or(DEFAULT_TOP_K);
        Self {
            stage_timeout,
            retrieval_top_k,
        }
    }

    #[must_use]
    pub fn with_stage_timeout(mut self, stage_timeout: Duration) -> Self {
        self.stage_timeout = Some(stage_timeout);
        self
    }

    #[must_use]
    pub fn with_retrieval_top_k(mut self, retrieval_top_k: usize) -> Self {
        self.retrieval_top_k = retrieval_top_k;
        self
    }
}

/// Errors reported when building a [`PipelineRunner`].
#[derive(Debug, Error, Diagnostic)]
pub enum CompileError {
    /// Every stage plan starts with chat, so a chat agent is mandatory.
    #[error("chat agent is required but not registered")]
    #[diagnostic(
        code(lessonweave::runner::missing_chat_agent),
        help("Register one with add_agent(Stage::Chat, ..) before compiling.")
    )]
    MissingChatAgent,
}

/// Infrastructure errors from driving a pipeline invocation.
///
/// Stage execution failures are *not* represented here: they are recorded on
/// the final [`PipelineState::error`] and surfaced as the terminal `error`
/// event, per the failure policy.
#[derive(Debug, Error, Diagnostic)]
pub enum RunnerError {
    /// The event consumer disconnected; remaining stages were skipped.
    #[error("pipeline cancelled: event consumer disconnected")]
    #[diagnostic(code(lessonweave::runner::cancelled))]
    Cancelled,

    /// The spawned pipeline task failed to join.
    #[error("pipeline task join error: {0}")]
    #[diagnostic(code(lessonweave::runner::join))]
    Join(#[from] JoinError),
}

/// Builder for a [`PipelineRunner`] with explicit agent registration.
///
/// # Examples
///
/// ```no_run
/// use lessonweave::runner::{PipelineRunner, RunnerConfig};
/// use lessonweave::types::Stage;
/// # fn example(chat: impl lessonweave::agents::Agent + 'static)
/// #     -> Result<(), lessonweave::runner::CompileError> {
/// let runner = PipelineRunner::builder()
///     .add_agent(Stage::Chat, chat)
///     .with_config(RunnerConfig::default())
///     .compile()?;
/// # Ok(())
/// # }
/// ```
pub struct PipelineBuilder {
    agents: FxHashMap<Stage, Arc<dyn Agent>>,
    config: RunnerConfig,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            agents: FxHashMap::default(),
            config: RunnerConfig::default(),
        }
    }

    /// Registers an agent for a stage, replacing any previous registration.
    #[must_use]
    pub fn add_agent(mut self, stage: Stage, agent: impl Agent + 'static) -> Self {
        self.agents.insert(stage, Arc::new(agent));
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the registration and produces a runner.
    pub fn compile(self) -> Result<PipelineRunner, CompileError> {
        if !self.agents.contains_key(&Stage::Chat) {
            return Err(CompileError::MissingChatAgent);
        }
        Ok(PipelineRunner {
            agents: self.agents,
            config: self.config,
        })
    }
}

/// Drives pipeline invocations: one state snapshot chain per request, stages
/// strictly sequential, no shared mutable state across invocations.
///
/// The runner is cheap to clone (agents are `Arc`-shared); concurrent
/// requests each call an `invoke*` method on their own clone or shared
/// reference.
#[derive(Clone)]
pub struct PipelineRunner {
    agents: FxHashMap<Stage, Arc<dyn Agent>>,
    config: RunnerConfig,
}

impl PipelineRunner {
    /// Starts an empty builder for custom agent registration.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Wires the standard four agents from their collaborators.
    #[must_use]
    pub fn from_collaborators(
        model: Arc<dyn ChatModel>,
        retriever: Arc<dyn ContextRetriever>,
        checker: Arc<dyn MathChecker>,
    ) -> Self {
        Self::from_collaborators_with_config(model, retriever, checker, RunnerConfig::default())
    }

    /// Wires the standard four agents with explicit runner configuration.
    #[must_use]
    pub fn from_collaborators_with_config(
        model: Arc<dyn ChatModel>,
        retriever: Arc<dyn ContextRetriever>,
        checker: Arc<dyn MathChecker>,
        config: RunnerConfig,
    ) -> Self {
        let mut agents: FxHashMap<Stage, Arc<dyn Agent>> = FxHashMap::default();
        agents.insert(Stage::Chat, Arc::new(ChatAgent::new(model.clone())));
        agents.insert(
            Stage::Retrieve,
            Arc::new(RetrieverAgent::new(retriever).with_top_k(config.retrieval_top_k)),
        );
        agents.insert(Stage::Preview, Arc::new(PreviewAgent::new(model)));
        agents.insert(Stage::Validate, Arc::new(ValidationAgent::new(checker)));
        Self { agents, config }
    }

    #[must_use]
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Drives one invocation, emitting events into the supplied sender.
    ///
    /// This is the low-level entry point for callers that own their channel
    /// wiring; most callers want [`invoke`](Self::invoke) or
    /// [`invoke_streaming`](Self::invoke_streaming).
    ///
    /// Returns the final state (with exactly one of `final_output` / `error`
    /// set) or [`RunnerError::Cancelled`] if the consumer disconnected
    /// mid-run.
    #[instrument(skip_all)]
    pub async fn run_with_events(
        &self,
        request: PipelineRequest,
        events: flume::Sender<StreamEvent>,
    ) -> Result<PipelineState, RunnerError> {
        let run_id = IdGenerator::new().generate_run_id();
        let plan = route_request(&request);
        tracing::debug!(
            run_id = %run_id,
            ?plan,
            mode = %request.mode,
            structured_output = request.structured_output,
            fallback = request.fallback,
            "stage plan resolved"
        );

        let mut state = PipelineState::from_request(&request);

        for stage in plan {
            if events
                .send(StreamEvent::status(stage, stage_lead_in(stage)))
                .is_err()
            {
                tracing::debug!(run_id = %run_id, stage = %stage, "consumer disconnected; stopping");
                return Err(RunnerError::Cancelled);
            }

            let patch = self.run_stage(stage, &state, &run_id, &events).await?;

            state = state.apply(patch);

            // Any stage error is terminal: one error event, no further stages.
            if let Some(message) = state.error.clone() {
                let _ = events.send(StreamEvent::error(message));
                return Ok(state);
            }

            match stage {
                Stage::Preview => {
                    if let Some(content) = &state.preview_content
                        && events.send(StreamEvent::preview(content.clone())).is_err()
                    {
                        return Err(RunnerError::Cancelled);
                    }
                }
                Stage::Validate => {
                    if let Some(result) = &state.validation
                        && events
                            .send(StreamEvent::validation(result.clone()))
                            .is_err()
                    {
                        return Err(RunnerError::Cancelled);
                    }
                }
                Stage::Chat | Stage::Retrieve => {}
            }
        }

        match state.compose_final_output() {
            Some(output) => {
                state.final_output = Some(output.clone());
                tracing::debug!(run_id = %run_id, chars = output.len(), "pipeline completed");
                let _ = events.send(StreamEvent::final_event(output));
            }
            None => {
                let message = "pipeline completed without producing output".to_string();
                tracing::error!(run_id = %run_id, "{message}");
                state.error = Some(message.clone());
                let _ = events.send(StreamEvent::error(message));
            }
        }

        Ok(state)
    }

    /// Runs a single stage, containing agent failures to an error patch.
    async fn run_stage(
        &self,
        stage: Stage,
        state: &PipelineState,
        run_id: &str,
        events: &flume::Sender<StreamEvent>,
    ) -> Result<StatePatch, RunnerError> {
        let Some(agent) = self.agents.get(&stage) else {
            return Ok(StatePatch::new().with_error(format!(
                "no agent registered for stage: {stage}"
            )));
        };

        let ctx = AgentContext::new(stage, run_id.to_string(), events.clone());
        let stage_future = agent.run(state.clone(), ctx);

        let result = match self.config.stage_timeout {
            Some(limit) => match tokio::time::timeout(limit, stage_future).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::error!(run_id = %run_id, stage = %stage, ?limit, "stage timed out");
                    return Ok(StatePatch::new().with_error(format!(
                        "stage {stage} timed out after {}ms",
                        limit.as_millis()
                    )));
                }
            },
            None => stage_future.await,
        };

        match result {
            Ok(patch) => Ok(patch),
            Err(err) if err.is_cancellation() => {
                tracing::debug!(run_id = %run_id, stage = %stage, "consumer disconnected mid-stage");
                Err(RunnerError::Cancelled)
            }
            Err(err) => {
                tracing::error!(run_id = %run_id, stage = %stage, error = %err, "stage failed");
                Ok(StatePatch::new().with_error(err.to_string()))
            }
        }
    }

    /// Runs the pipeline to completion, draining events to `tracing`.
    ///
    /// The returned state carries exactly one of `final_output` / `error`.
    pub async fn invoke(&self, request: PipelineRequest) -> Result<PipelineState, RunnerError> {
        let (tx, rx) = flume::unbounded();
        let drain = tokio::spawn(async move {
            while let Ok(event) = rx.recv_async().await {
                tracing::debug!(target: "lessonweave::events", ?event, "pipeline event");
            }
        });
        let result = self.run_with_events(request, tx).await;
        let _ = drain.await;
        result
    }

    /// Spawns the pipeline and returns a handle plus the event stream.
    ///
    /// Dropping the handle aborts the run; dropping the stream makes the
    /// runner observe the disconnect and stop after the in-flight stage.
    #[must_use]
    pub fn invoke_streaming(&self, request: PipelineRequest) -> (InvocationHandle, EventStream) {
        let (tx, rx) = flume::unbounded();
        let runner = self.clone();
        let join = tokio::spawn(async move { runner.run_with_events(request, tx).await });
        (InvocationHandle::new(join), EventStream::new(rx))
    }

    /// Runs to completion and hands back the buffered event channel, for
    /// callers that want both the outcome and the full event record.
    pub async fn invoke_with_channel(
        &self,
        request: PipelineRequest,
    ) -> (
        Result<PipelineState, RunnerError>,
        flume::Receiver<StreamEvent>,
    ) {
        let (tx, rx) = flume::unbounded();
        let result = self.run_with_events(request, tx).await;
        (result, rx)
    }
}

/// Caller-facing status detail emitted when a stage begins.
fn stage_lead_in(stage: Stage) -> &'static str {
    match stage {
        Stage::Chat => "composing reply",
        Stage::Retrieve => "searching reference material",
        Stage::Preview => "drafting artifact",
        Stage::Validate => "checking mathematical correctness",
    }
}
