//! Chat stage: conversational reply generation.
//!
//! The chat agent shapes a prompt from the run's mode, tone setting, and
//! conversation history, then streams the model's reply chunk by chunk.
//! Every chunk becomes a `token` event; the final patch sets `chat_output`
//! and appends the assistant turn to the conversation.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use miette::Diagnostic;
use thiserror::Error;

use crate::agents::{Agent, AgentContext, AgentError};
use crate::message::{Message, render_transcript};
use crate::state::{ContentSettings, Mode, PipelineState, StatePatch};

/// Lazily generated reply chunks from a chat model.
pub type TokenStream = BoxStream<'static, Result<String, ModelError>>;

/// Errors surfaced by a [`ChatModel`] implementation.
#[derive(Debug, Error, Diagnostic)]
pub enum ModelError {
    /// The model endpoint could not be reached or refused the request.
    #[error("model unavailable: {0}")]
    #[diagnostic(code(lessonweave::model::unavailable))]
    Unavailable(String),

    /// The reply stream broke off before completing.
    #[error("model stream interrupted: {0}")]
    #[diagnostic(code(lessonweave::model::interrupted))]
    Interrupted(String),
}

/// Prompt handed to a chat model: a system preamble plus the flattened
/// conversation transcript.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatPrompt {
    pub system: String,
    pub transcript: String,
}

/// Seam to the text-generation backend.
///
/// The pipeline never talks to a concrete model API; callers supply an
/// implementation (and tests supply a scripted one). A single trait serves
/// both the chat stage and the preview drafting stage.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Starts generating a reply for the prompt, yielding chunks lazily.
    async fn stream_chat(&self, prompt: ChatPrompt) -> Result<TokenStream, ModelError>;
}

/// The always-first pipeline stage: conversational reply generation.
pub struct ChatAgent {
    model: Arc<dyn ChatModel>,
}

impl ChatAgent {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

/// Builds the system preamble from mode and tone.
fn system_preamble(mode: Mode, settings: &ContentSettings) -> String {
    match mode {
        Mode::Student => format!(
            "You are a patient tutor helping a student. Explain step by step, \
             check understanding as you go, and keep a {} tone.",
            settings.tone
        ),
        Mode::Teacher => format!(
            "You are a curriculum assistant for an educator. Be precise and \
             classroom-ready, cite the ideas you rely on, and keep a {} tone.",
            settings.tone
        ),
    }
}

#[async_trait]
impl Agent for ChatAgent {
    async fn run(
        &self,
        snapshot: PipelineState,
        ctx: AgentContext,
    ) -> Result<StatePatch, AgentError> {
        let prompt = ChatPrompt {
            system: system_preamble(snapshot.mode, &snapshot.settings),
            transcript: render_transcript(&snapshot.messages),
        };

        let mut tokens =
            self.model
                .stream_chat(prompt)
                .await
                .map_err(|err| AgentError::Provider {
                    provider: "chat-model",
                    message: err.to_string(),
                })?;

        let mut reply = String::new();
        while let Some(chunk) = tokens.next().await {
            let chunk = chunk.map_err(|err| AgentError::Provider {
                provider: "chat-model",
                message: err.to_string(),
            })?;
            ctx.emit_token(chunk.as_str())?;
            reply.push_str(&chunk);
        }

        tracing::debug!(
            run_id = %ctx.run_id,
            chars = reply.len(),
            "chat reply complete"
        );

        Ok(StatePatch::new()
            .with_messages(vec![Message::assistant(&reply)])
            .with_chat_output(reply))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn student_preamble_mentions_tone_and_tutoring() {
        let settings = ContentSettings::new("explanation", "6th grade", "short", "playful");
        let preamble = system_preamble(Mode::Student, &settings);
        assert!(preamble.contains("tutor"));
        assert!(preamble.contains("playful"));
    }

    #[test]
    fn teacher_preamble_targets_educators() {
        let settings = ContentSettings::default();
        let preamble = system_preamble(Mode::Teacher, &settings);
        assert!(preamble.contains("educator"));
        assert!(preamble.contains(&settings.tone));
    }
}
