//! Streaming protocol and adapter.
//!
//! [`StreamEvent`] is the discriminated event callers consume;
//! [`EventStream`] and [`InvocationHandle`] wrap a running invocation as a
//! single lazy, forward-only sequence with prompt cancellation.

mod adapter;
mod event;

pub use adapter::{EventStream, InvocationHandle};
pub use event::StreamEvent;
