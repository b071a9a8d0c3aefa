//! Streaming adapter: exposes one pipeline invocation as a finite,
//! forward-only event sequence.
//!
//! The adapter owns nothing but the receiving half of the run's event
//! channel. A new invocation creates a new runner task and a new stream;
//! streams are consumed exactly once, in emission order, and close after the
//! terminal event. Dropping the paired [`InvocationHandle`] aborts the run;
//! dropping the stream makes the runner observe a disconnected consumer and
//! stop scheduling further stages.

use futures_util::StreamExt;
use futures_util::stream::BoxStream;
use tokio::task::JoinHandle;

use crate::runner::RunnerError;
use crate::state::PipelineState;
use crate::stream::StreamEvent;

/// The receiving half of a pipeline invocation's event sequence.
///
/// Finite and not restartable: the stream ends after the single terminal
/// event, and a fresh invocation is required for a new sequence.
///
/// # Examples
///
/// ```no_run
/// use futures_util::StreamExt;
/// # async fn example(events: lessonweave::stream::EventStream) {
/// let mut lines = events.into_ndjson_lines();
/// while let Some(line) = lines.next().await {
///     println!("{line}");
/// }
/// # }
/// ```
pub struct EventStream {
    receiver: flume::Receiver<StreamEvent>,
}

impl EventStream {
    pub(crate) fn new(receiver: flume::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }

    /// Awaits the next event; `None` once the stream has closed.
    pub async fn recv(&mut self) -> Option<StreamEvent> {
        self.receiver.recv_async().await.ok()
    }

    /// Consumes the stream as an async [`Stream`](futures_util::Stream) of
    /// events.
    #[must_use]
    pub fn into_async_stream(self) -> BoxStream<'static, StreamEvent> {
        self.receiver.into_stream().boxed()
    }

    /// Consumes the stream as newline-delimited JSON lines, one event per
    /// line (without the trailing newline).
    #[must_use]
    pub fn into_ndjson_lines(self) -> BoxStream<'static, String> {
        self.receiver
            .into_stream()
            .filter_map(|event| async move {
                match event.to_json_line() {
                    Ok(line) => Some(line),
                    Err(err) => {
                        tracing::error!(error = %err, "failed to serialize stream event");
                        None
                    }
                }
            })
            .boxed()
    }

    /// Consumes the stream as a blocking iterator, for synchronous callers.
    #[must_use]
    pub fn into_blocking_iter(self) -> impl Iterator<Item = StreamEvent> {
        self.receiver.into_iter()
    }

    /// Drains the stream to completion and returns every event in order.
    pub async fn collect_all(self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.receiver.recv_async().await {
            events.push(event);
        }
        events
    }
}

/// Handle for a streaming pipeline invocation.
///
/// Dropping the handle aborts the run. Use [`join`](InvocationHandle::join)
/// to await graceful completion after the paired [`EventStream`] has emitted
/// its terminal event.
pub struct InvocationHandle {
    join_handle: Option<JoinHandle<Result<PipelineState, RunnerError>>>,
}

impl InvocationHandle {
    pub(crate) fn new(join_handle: JoinHandle<Result<PipelineState, RunnerError>>) -> Self {
        Self {
            join_handle: Some(join_handle),
        }
    }

    /// Aborts the underlying pipeline task. `join` will return a join error
    /// afterwards. Equivalent to dropping the handle.
    pub fn abort(&self) {
        if let Some(handle) = &self.join_handle {
            handle.abort();
        }
    }

    /// Returns true if the underlying pipeline task has completed or aborted.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join_handle
            .as_ref()
            .map(|h| h.is_finished())
            .unwrap_or(true)
    }

    /// Awaits the final pipeline state.
    pub async fn join(mut self) -> Result<PipelineState, RunnerError> {
        let handle = self
            .join_handle
            .take()
            .expect("join_handle already awaited");
        match handle.await {
            Ok(result) => result,
            Err(err) => Err(RunnerError::Join(err)),
        }
    }
}

impl Drop for InvocationHandle {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            handle.abort();
        }
    }
}
