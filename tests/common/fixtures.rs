//! Shared pipeline fixtures built from the deterministic stubs.

use std::sync::Arc;

use lessonweave::agents::{ChatModel, ContextRetriever, MathChecker};
use lessonweave::runner::{PipelineRunner, RunnerError};
use lessonweave::state::{
    ContentSettings, ContextSnippet, Mode, PipelineRequest, PipelineState,
};
use lessonweave::stream::StreamEvent;

use super::stubs::{ApprovingChecker, ScriptedModel, StaticRetriever};

/// The scripted reply used across scenario tests.
pub fn reply_chunks() -> Vec<&'static str> {
    vec!["The ", "derivative ", "of x^2 ", "is 2x."]
}

/// The full scripted reply as one string.
pub fn reply_text() -> String {
    reply_chunks().concat()
}

pub fn two_snippets() -> Vec<ContextSnippet> {
    vec![
        ContextSnippet::new("textbook", "The derivative of x^n is n·x^(n-1).", 0.92),
        ContextSnippet::new("syllabus", "Unit 4 introduces differentiation.", 0.67),
    ]
}

/// A runner wired with the standard deterministic collaborators.
pub fn scripted_runner() -> PipelineRunner {
    runner_with(
        Arc::new(ScriptedModel::new(reply_chunks())),
        Arc::new(StaticRetriever {
            snippets: two_snippets(),
        }),
        Arc::new(ApprovingChecker),
    )
}

pub fn runner_with(
    model: Arc<dyn ChatModel>,
    retriever: Arc<dyn ContextRetriever>,
    checker: Arc<dyn MathChecker>,
) -> PipelineRunner {
    PipelineRunner::from_collaborators(model, retriever, checker)
}

pub fn student_request(question: &str) -> PipelineRequest {
    PipelineRequest::builder(question)
        .mode(Mode::Student)
        .structured_output(false)
        .build()
}

pub fn teacher_request(question: &str) -> PipelineRequest {
    PipelineRequest::builder(question)
        .mode(Mode::Teacher)
        .structured_output(true)
        .settings(ContentSettings::new(
            "worksheet",
            "9th grade",
            "one page",
            "encouraging",
        ))
        .build()
}

/// Runs the pipeline to completion and returns the final state plus every
/// emitted event in order.
pub async fn run_collecting(
    runner: &PipelineRunner,
    request: PipelineRequest,
) -> (Result<PipelineState, RunnerError>, Vec<StreamEvent>) {
    let (result, receiver) = runner.invoke_with_channel(request).await;
    let events: Vec<StreamEvent> = receiver.drain().collect();
    (result, events)
}
