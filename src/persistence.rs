//! Persistence collaborator interfaces.
//!
//! The core never persists anything itself: one `PipelineState` chain lives
//! per invocation and is discarded after the terminal event. These traits
//! define the contract the surrounding service layer implements to save
//! conversations and drafted artifacts, plus the authentication-context seam
//! that yields a caller identity. An in-memory reference implementation is
//! provided for tests and single-process deployments.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::message::Message;
use crate::state::ValidationOutcome;

/// Errors surfaced by a [`ConversationStore`] implementation.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    /// The backing service could not be reached.
    #[error("store unavailable: {0}")]
    #[diagnostic(code(lessonweave::store::unavailable))]
    Unavailable(String),

    /// The operation was rejected or failed mid-flight.
    #[error("store operation failed: {0}")]
    #[diagnostic(code(lessonweave::store::operation))]
    Operation(String),
}

/// A drafted artifact as persisted alongside its thread.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StoredArtifact {
    /// The artifact text handed to the caller.
    pub content: String,
    /// Validation outcome recorded with the artifact, when validation ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationOutcome>,
    /// When the artifact was saved.
    pub saved_at: DateTime<Utc>,
}

impl StoredArtifact {
    #[must_use]
    pub fn new(content: &str, validation: Option<ValidationOutcome>) -> Self {
        Self {
            content: content.to_string(),
            validation,
            saved_at: Utc::now(),
        }
    }
}

/// Identity of the caller, as resolved by the authentication layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
    pub user_id: String,
}

/// Authentication-context seam: yields the current caller, or `None` for
/// anonymous invocations.
pub trait IdentityProvider: Send + Sync {
    fn current_identity(&self) -> Option<CallerIdentity>;
}

/// Contract for conversation and artifact persistence, keyed by thread id.
///
/// `upsert_thread` must be idempotent: replaying the same thread state is a
/// no-op, not a duplicate.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Creates or replaces the stored conversation for a thread.
    async fn upsert_thread(&self, thread_id: &str, messages: &[Message]) -> Result<(), StoreError>;

    /// Appends a drafted artifact to a thread's record.
    async fn save_artifact(
        &self,
        thread_id: &str,
        artifact: StoredArtifact,
    ) -> Result<(), StoreError>;

    /// Loads a thread's conversation, `None` if the thread is unknown.
    async fn load_thread(&self, thread_id: &str) -> Result<Option<Vec<Message>>, StoreError>;
}

#[derive(Clone, Debug, Default)]
struct ThreadRecord {
    messages: Vec<Message>,
    artifacts: Vec<StoredArtifact>,
}

/// In-memory [`ConversationStore`] for tests and single-process use.
#[derive(Default)]
pub struct InMemoryConversationStore {
    threads: Mutex<FxHashMap<String, ThreadRecord>>,
}

impl InMemoryConversationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of threads currently stored.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.lock().expect("store poisoned").len()
    }

    /// Artifacts saved for a thread, oldest first.
    #[must_use]
    pub fn artifacts(&self, thread_id: &str) -> Vec<StoredArtifact> {
        self.threads
            .lock()
            .expect("store poisoned")
            .get(thread_id)
            .map(|record| record.artifacts.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn upsert_thread(&self, thread_id: &str, messages: &[Message]) -> Result<(), StoreError> {
        let mut threads = self.threads.lock().expect("store poisoned");
        threads
            .entry(thread_id.to_string())
            .or_default()
            .messages = messages.to_vec();
        Ok(())
    }

    async fn save_artifact(
        &self,
        thread_id: &str,
        artifact: StoredArtifact,
    ) -> Result<(), StoreError> {
        let mut threads = self.threads.lock().expect("store poisoned");
        threads
            .entry(thread_id.to_string())
            .or_default()
            .artifacts
            .push(artifact);
        Ok(())
    }

    async fn load_thread(&self, thread_id: &str) -> Result<Option<Vec<Message>>, StoreError> {
        let threads = self.threads.lock().expect("store poisoned");
        Ok(threads.get(thread_id).map(|record| record.messages.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let store = InMemoryConversationStore::new();
        let messages = vec![
            Message::user("What is a prime?"),
            Message::assistant("A number with exactly two divisors."),
        ];

        store.upsert_thread("thread-1", &messages).await.unwrap();
        store.upsert_thread("thread-1", &messages).await.unwrap();

        assert_eq!(store.thread_count(), 1);
        let loaded = store.load_thread("thread-1").await.unwrap().unwrap();
        assert_eq!(loaded, messages);
    }

    #[tokio::test]
    async fn unknown_thread_loads_none() {
        let store = InMemoryConversationStore::new();
        assert!(store.load_thread("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn artifacts_append_in_order() {
        let store = InMemoryConversationStore::new();
        store
            .save_artifact("t", StoredArtifact::new("draft 1", None))
            .await
            .unwrap();
        store
            .save_artifact("t", StoredArtifact::new("draft 2", Some(ValidationOutcome::Valid)))
            .await
            .unwrap();

        let artifacts = store.artifacts("t");
        assert_eq!(artifacts.len(), 2);
        assert_eq!(artifacts[0].content, "draft 1");
        assert!(artifacts[1].validation.as_ref().is_some_and(|v| v.is_valid()));
    }
}
