//! # Lessonweave: Staged Agent Orchestration for an Education Assistant
//!
//! Lessonweave turns a user question — plus conversation history, an
//! audience mode, and content-generation settings — into a streamed,
//! structured educational artifact. A sequential pipeline of agents
//! converses, retrieves reference context, drafts a preview document, and
//! validates its mathematical correctness, while the caller consumes a
//! newline-delimited event stream that ends in exactly one terminal event.
//!
//! ## Core Concepts
//!
//! - **State**: one immutable snapshot chain per invocation; agents return
//!   patches the runner merges ([`state`]).
//! - **Agents**: four stage implementations behind one trait, with provider
//!   seams for the model, retrieval backend, and math checker ([`agents`]).
//! - **Runner**: a data-driven routing table plus a sequential state machine
//!   with a contained failure policy ([`runner`]).
//! - **Stream**: the discriminated event protocol and the adapter that
//!   exposes a run as a finite, single-consumption sequence ([`stream`]).
//!
//! ## Quick Start
//!
//! A chat-only pipeline against a scripted model:
//!
//! ```
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use futures_util::{StreamExt, stream};
//! use lessonweave::agents::{ChatAgent, ChatModel, ChatPrompt, ModelError, TokenStream};
//! use lessonweave::runner::PipelineRunner;
//! use lessonweave::state::{Mode, PipelineRequest};
//! use lessonweave::stream::StreamEvent;
//! use lessonweave::types::Stage;
//!
//! struct ScriptedModel;
//!
//! #[async_trait]
//! impl ChatModel for ScriptedModel {
//!     async fn stream_chat(&self, _prompt: ChatPrompt) -> Result<TokenStream, ModelError> {
//!         let chunks = ["A derivative ", "measures instantaneous change."]
//!             .into_iter()
//!             .map(|chunk| Ok(chunk.to_string()));
//!         Ok(stream::iter(chunks).boxed())
//!     }
//! }
//!
//! fn main() {
//!     tokio::runtime::Builder::new_current_thread()
//!         .enable_all()
//!         .build()
//!         .unwrap()
//!         .block_on(async {
//!             let runner = PipelineRunner::builder()
//!                 .add_agent(Stage::Chat, ChatAgent::new(Arc::new(ScriptedModel)))
//!                 .compile()
//!                 .unwrap();
//!
//!             let request = PipelineRequest::builder("Explain derivatives")
//!                 .mode(Mode::Student)
//!                 .build();
//!
//!             let (handle, events) = runner.invoke_streaming(request);
//!             let events = events.collect_all().await;
//!             assert!(matches!(events.last(), Some(StreamEvent::Final { .. })));
//!
//!             let state = handle.join().await.unwrap();
//!             assert!(state.final_output.is_some());
//!         });
//! }
//! ```
//!
//! ## Event Protocol
//!
//! Callers consume one JSON object per line, discriminated by `type`:
//! `status`, `token`, `preview`, `validation`, then exactly one of `final`
//! or `error`. See [`stream::StreamEvent`] for wire shapes and
//! [`stream::EventStream::into_ndjson_lines`] for the transport adapter.
//!
//! ## Failure Policy
//!
//! - A stage's own failure (model outage, timeout) becomes the single
//!   terminal `error` event; no further stages run and nothing is retried.
//! - Retrieval failures are soft: empty context, pipeline proceeds.
//! - Validation findings — and even a broken checker — are data on the
//!   state, not pipeline errors; the run still reaches `final`.
//! - A disconnected consumer cancels the run promptly without any event.
//!
//! ## Module Guide
//!
//! - [`message`] - Conversation turn type and transcript helpers
//! - [`state`] - Request, state snapshot, and patch-merge types
//! - [`agents`] - Agent trait, the four stages, and provider seams
//! - [`runner`] - Routing table, runner, and configuration
//! - [`stream`] - Event protocol and streaming adapter
//! - [`persistence`] - Conversation/artifact store and identity interfaces
//! - [`telemetry`] - Tracing subscriber setup
//! - [`types`] - Stage identifiers

pub mod agents;
pub mod message;
pub mod persistence;
pub mod runner;
pub mod state;
pub mod stream;
pub mod telemetry;
pub mod types;
pub mod utils;
