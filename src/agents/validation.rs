//! Validation stage: mathematical-correctness checking.
//!
//! Runs the math checker over the drafted artifact and records the outcome
//! as data. Checker findings are not pipeline errors; even an internal
//! checker failure only becomes a `validation_error` outcome on the state —
//! the run still reaches its `final` event.

use std::sync::Arc;

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::agents::{Agent, AgentContext, AgentError};
use crate::state::{MathFinding, PipelineState, StatePatch, ValidationOutcome};

/// Errors surfaced by a [`MathChecker`] implementation.
///
/// These describe failures of the checker itself, never content findings.
#[derive(Debug, Error, Diagnostic)]
pub enum CheckerError {
    /// The checker backend could not be reached.
    #[error("math checker unavailable: {0}")]
    #[diagnostic(code(lessonweave::checker::unavailable))]
    Unavailable(String),

    /// The checker failed while analyzing the content.
    #[error("math checker failed: {0}")]
    #[diagnostic(code(lessonweave::checker::internal))]
    Internal(String),
}

/// What the checker concluded about the content it analyzed.
///
/// A separate type from [`ValidationOutcome`] so a checker cannot claim the
/// `validation_error` state — that variant is reserved for the agent
/// observing a checker failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MathVerdict {
    /// No mathematical issues found.
    Valid,
    /// Specific issues, with optional locations/corrections and suggestions.
    Issues {
        findings: Vec<MathFinding>,
        suggestions: Vec<String>,
    },
}

/// Seam to the mathematical-correctness checker.
#[async_trait]
pub trait MathChecker: Send + Sync {
    async fn check(&self, content: &str) -> Result<MathVerdict, CheckerError>;
}

/// The validation stage, run only when structured output was requested.
pub struct ValidationAgent {
    checker: Arc<dyn MathChecker>,
}

impl ValidationAgent {
    pub fn new(checker: Arc<dyn MathChecker>) -> Self {
        Self { checker }
    }
}

#[async_trait]
impl Agent for ValidationAgent {
    async fn run(
        &self,
        snapshot: PipelineState,
        ctx: AgentContext,
    ) -> Result<StatePatch, AgentError> {
        let content = snapshot
            .preview_content
            .as_deref()
            .ok_or(AgentError::MissingInput {
                what: "preview_content",
            })?;

        let outcome = match self.checker.check(content).await {
            Ok(MathVerdict::Valid) => ValidationOutcome::Valid,
            Ok(MathVerdict::Issues {
                findings,
                suggestions,
            }) => {
                tracing::debug!(
                    run_id = %ctx.run_id,
                    findings = findings.len(),
                    "math issues found in draft"
                );
                ValidationOutcome::ErrorsFound {
                    errors: findings,
                    suggestions,
                }
            }
            Err(err) => {
                tracing::warn!(
                    run_id = %ctx.run_id,
                    error = %err,
                    "math checker failed; surfacing as validation_error"
                );
                ValidationOutcome::ValidationError {
                    message: err.to_string(),
                }
            }
        };

        Ok(StatePatch::new().with_validation(outcome))
    }
}
