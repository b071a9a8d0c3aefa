//! Preview stage: structured artifact drafting.
//!
//! Consumes the chat reply and any retrieved context, and drafts the
//! structured artifact the caller asked for (worksheet, explanation, ...)
//! according to the content settings. Drafting progress is reported through
//! stage status events as the draft grows; the completed draft is emitted by
//! the runner as a `preview` event once the patch is merged.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;

use crate::agents::chat::{ChatModel, ChatPrompt};
use crate::agents::{Agent, AgentContext, AgentError};
use crate::state::{ContentSettings, ContextSnippet, PipelineState, StatePatch};

/// How many reply chunks pass between drafting-progress status events.
const DRAFT_PROGRESS_CHUNKS: usize = 8;

/// The artifact-drafting stage.
pub struct PreviewAgent {
    model: Arc<dyn ChatModel>,
}

impl PreviewAgent {
    pub fn new(model: Arc<dyn ChatModel>) -> Self {
        Self { model }
    }
}

/// Builds the drafting prompt from settings, the chat reply, and whatever
/// context retrieval produced.
fn drafting_prompt(
    settings: &ContentSettings,
    chat_output: &str,
    context: Option<&[ContextSnippet]>,
) -> ChatPrompt {
    let system = format!(
        "Draft a {} for {}. Target length: {}. Tone: {}. Use headed sections \
         and numbered problems where appropriate, and show work for every \
         computation.",
        settings.content_type, settings.grade_level, settings.length, settings.tone
    );

    let mut transcript = format!("Source reply:\n{chat_output}");
    if let Some(snippets) = context
        && !snippets.is_empty()
    {
        transcript.push_str("\n\nReference material:");
        for snippet in snippets {
            transcript.push_str(&format!("\n[{}] {}", snippet.source, snippet.text));
        }
    }

    ChatPrompt { system, transcript }
}

#[async_trait]
impl Agent for PreviewAgent {
    async fn run(
        &self,
        snapshot: PipelineState,
        ctx: AgentContext,
    ) -> Result<StatePatch, AgentError> {
        let chat_output = snapshot
            .chat_output
            .as_deref()
            .ok_or(AgentError::MissingInput {
                what: "chat_output",
            })?;

        let prompt = drafting_prompt(
            &snapshot.settings,
            chat_output,
            snapshot.retrieved_context.as_deref(),
        );

        let mut tokens =
            self.model
                .stream_chat(prompt)
                .await
                .map_err(|err| AgentError::Provider {
                    provider: "preview-model",
                    message: err.to_string(),
                })?;

        let mut draft = String::new();
        let mut chunks = 0usize;
        while let Some(chunk) = tokens.next().await {
            let chunk = chunk.map_err(|err| AgentError::Provider {
                provider: "preview-model",
                message: err.to_string(),
            })?;
            draft.push_str(&chunk);
            chunks += 1;
            if chunks % DRAFT_PROGRESS_CHUNKS == 0 {
                ctx.emit_status(format!(
                    "drafting {}: ~{} words",
                    snapshot.settings.content_type,
                    draft.split_whitespace().count()
                ))?;
            }
        }

        ctx.emit_status(format!(
            "draft complete ({} words)",
            draft.split_whitespace().count()
        ))?;

        Ok(StatePatch::new().with_preview_content(draft))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_carries_settings_and_reply() {
        let settings = ContentSettings::new("worksheet", "4th grade", "short", "playful");
        let prompt = drafting_prompt(&settings, "Fractions name parts of a whole.", None);
        assert!(prompt.system.contains("worksheet"));
        assert!(prompt.system.contains("4th grade"));
        assert!(prompt.transcript.contains("Fractions name parts of a whole."));
        assert!(!prompt.transcript.contains("Reference material"));
    }

    #[test]
    fn prompt_includes_retrieved_snippets() {
        let settings = ContentSettings::default();
        let snippets = vec![
            ContextSnippet::new("textbook", "A fraction is written a/b.", 0.9),
            ContextSnippet::new("syllabus", "Unit 3 covers fractions.", 0.7),
        ];
        let prompt = drafting_prompt(&settings, "reply", Some(&snippets));
        assert!(prompt.transcript.contains("[textbook] A fraction is written a/b."));
        assert!(prompt.transcript.contains("[syllabus]"));
    }

    #[test]
    fn empty_snippet_list_is_omitted() {
        let prompt = drafting_prompt(&ContentSettings::default(), "reply", Some(&[]));
        assert!(!prompt.transcript.contains("Reference material"));
    }
}
