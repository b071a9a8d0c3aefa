//! Retrieval stage: best-effort context lookup.
//!
//! Retrieval enriches the preview draft with ranked reference snippets. It
//! is deliberately soft: a backend failure or an empty result set patches
//! `retrieved_context` to an empty sequence and the pipeline proceeds — a
//! missing corpus must never cost the caller their artifact.

use std::sync::Arc;

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::agents::{Agent, AgentContext, AgentError};
use crate::state::{ContextSnippet, PipelineState, StatePatch};

/// Default number of snippets requested from the backend.
pub const DEFAULT_TOP_K: usize = 4;

/// Errors surfaced by a [`ContextRetriever`] implementation.
#[derive(Debug, Error, Diagnostic)]
pub enum RetrievalError {
    /// The backend could not be reached.
    #[error("retrieval backend unavailable: {0}")]
    #[diagnostic(code(lessonweave::retrieval::unavailable))]
    Unavailable(String),

    /// The backend rejected or failed the query.
    #[error("retrieval query failed: {0}")]
    #[diagnostic(code(lessonweave::retrieval::query))]
    Query(String),
}

/// Seam to the content-retrieval backend: ranked snippets for a query.
#[async_trait]
pub trait ContextRetriever: Send + Sync {
    async fn retrieve(
        &self,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<ContextSnippet>, RetrievalError>;
}

/// The retrieval stage, invoked when routing decides external context is
/// needed (teacher mode or structured output).
pub struct RetrieverAgent {
    retriever: Arc<dyn ContextRetriever>,
    top_k: usize,
}

impl RetrieverAgent {
    pub fn new(retriever: Arc<dyn ContextRetriever>) -> Self {
        Self {
            retriever,
            top_k: DEFAULT_TOP_K,
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        // top_k of zero would make every lookup trivially empty.
        self.top_k = top_k.max(1);
        self
    }
}

#[async_trait]
impl Agent for RetrieverAgent {
    async fn run(
        &self,
        snapshot: PipelineState,
        ctx: AgentContext,
    ) -> Result<StatePatch, AgentError> {
        match self
            .retriever
            .retrieve(&snapshot.user_input, self.top_k)
            .await
        {
            Ok(snippets) => {
                if snippets.is_empty() {
                    ctx.emit_status("no matching sources found")?;
                } else {
                    let sources = snippets
                        .iter()
                        .map(|s| s.source.as_str())
                        .collect::<Vec<_>>()
                        .join(", ");
                    ctx.emit_status(format!("found {} sources: {sources}", snippets.len()))?;
                }
                Ok(StatePatch::new().with_retrieved_context(snippets))
            }
            Err(err) => {
                tracing::warn!(
                    run_id = %ctx.run_id,
                    error = %err,
                    "retrieval failed; continuing without context"
                );
                ctx.emit_status("context lookup unavailable; continuing without sources")?;
                Ok(StatePatch::new().with_retrieved_context(Vec::new()))
            }
        }
    }
}
