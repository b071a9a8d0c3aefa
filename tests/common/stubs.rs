//! Deterministic collaborator stubs for pipeline tests.

use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream as futures_stream;
use lessonweave::agents::{
    ChatModel, ChatPrompt, CheckerError, ContextRetriever, MathChecker, MathVerdict, ModelError,
    RetrievalError, TokenStream,
};
use lessonweave::state::{ContextSnippet, MathFinding};

/// Replies with a fixed chunk script regardless of prompt.
pub struct ScriptedModel {
    pub chunks: Vec<&'static str>,
}

impl ScriptedModel {
    pub fn new(chunks: Vec<&'static str>) -> Self {
        Self { chunks }
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn stream_chat(&self, _prompt: ChatPrompt) -> Result<TokenStream, ModelError> {
        let chunks: Vec<Result<String, ModelError>> = self
            .chunks
            .iter()
            .map(|chunk| Ok((*chunk).to_string()))
            .collect();
        Ok(futures_stream::iter(chunks).boxed())
    }
}

/// Fails every request before producing a stream.
pub struct FailingModel;

#[async_trait]
impl ChatModel for FailingModel {
    async fn stream_chat(&self, _prompt: ChatPrompt) -> Result<TokenStream, ModelError> {
        Err(ModelError::Unavailable("quota exhausted".to_string()))
    }
}

/// Opens a stream that never yields, for timeout tests.
pub struct StallingModel;

#[async_trait]
impl ChatModel for StallingModel {
    async fn stream_chat(&self, _prompt: ChatPrompt) -> Result<TokenStream, ModelError> {
        Ok(futures_stream::pending().boxed())
    }
}

/// Yields chunks with a delay between each, for cancellation tests.
pub struct SlowModel {
    pub chunks: usize,
    pub delay: Duration,
}

#[async_trait]
impl ChatModel for SlowModel {
    async fn stream_chat(&self, _prompt: ChatPrompt) -> Result<TokenStream, ModelError> {
        let chunks = self.chunks;
        let delay = self.delay;
        Ok(stream! {
            for i in 0..chunks {
                tokio::time::sleep(delay).await;
                yield Ok(format!("chunk-{i} "));
            }
        }
        .boxed())
    }
}

/// Returns a fixed snippet list, truncated to the requested `top_k`.
pub struct StaticRetriever {
    pub snippets: Vec<ContextSnippet>,
}

#[async_trait]
impl ContextRetriever for StaticRetriever {
    async fn retrieve(
        &self,
        _query: &str,
        top_k: usize,
    ) -> Result<Vec<ContextSnippet>, RetrievalError> {
        Ok(self.snippets.iter().take(top_k).cloned().collect())
    }
}

/// Fails every lookup.
pub struct FailingRetriever;

#[async_trait]
impl ContextRetriever for FailingRetriever {
    async fn retrieve(
        &self,
        _query: &str,
        _top_k: usize,
    ) -> Result<Vec<ContextSnippet>, RetrievalError> {
        Err(RetrievalError::Unavailable(
            "index host unreachable".to_string(),
        ))
    }
}

/// Approves every draft.
pub struct ApprovingChecker;

#[async_trait]
impl MathChecker for ApprovingChecker {
    async fn check(&self, _content: &str) -> Result<MathVerdict, CheckerError> {
        Ok(MathVerdict::Valid)
    }
}

/// Reports one fixed finding for every draft.
pub struct FindingChecker;

#[async_trait]
impl MathChecker for FindingChecker {
    async fn check(&self, _content: &str) -> Result<MathVerdict, CheckerError> {
        Ok(MathVerdict::Issues {
            findings: vec![
                MathFinding::new("3 × 4 stated as 14")
                    .with_location("problem 2")
                    .with_correction("3 × 4 = 12"),
            ],
            suggestions: vec!["Re-check the multiplication facts.".to_string()],
        })
    }
}

/// Crashes on every check, for internal-failure tests.
pub struct BrokenChecker;

#[async_trait]
impl MathChecker for BrokenChecker {
    async fn check(&self, _content: &str) -> Result<MathVerdict, CheckerError> {
        Err(CheckerError::Internal("expression parser crashed".to_string()))
    }
}
