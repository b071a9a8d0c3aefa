//! Event-sequence assertions shared across integration tests.

use lessonweave::stream::StreamEvent;
use lessonweave::types::Stage;

/// Asserts the sequence contains exactly one terminal event and that it is
/// the last event.
pub fn assert_single_terminal(events: &[StreamEvent]) {
    let terminal_count = events.iter().filter(|e| e.is_terminal()).count();
    assert_eq!(
        terminal_count, 1,
        "expected exactly one terminal event, got {terminal_count}: {events:?}"
    );
    assert!(
        events.last().is_some_and(StreamEvent::is_terminal),
        "terminal event must be last: {events:?}"
    );
}

/// The stages of all `status` events, in emission order.
pub fn status_stages(events: &[StreamEvent]) -> Vec<Stage> {
    events.iter().filter_map(StreamEvent::status_stage).collect()
}

/// Asserts that `stages` appear among the status events in the given
/// relative order.
pub fn assert_stage_order(events: &[StreamEvent], stages: &[Stage]) {
    let seen = status_stages(events);
    let mut position = 0usize;
    for stage in stages {
        match seen[position..].iter().position(|s| s == stage) {
            Some(offset) => position += offset + 1,
            None => panic!("stage {stage} missing or out of order in {seen:?}"),
        }
    }
}

/// Asserts no status/progress event for the given stage was emitted.
pub fn assert_stage_absent(events: &[StreamEvent], stage: Stage) {
    assert!(
        !status_stages(events).contains(&stage),
        "unexpected {stage} status in {events:?}"
    );
}

/// Concatenation of all `token` event text, i.e. the streamed reply.
pub fn streamed_reply(events: &[StreamEvent]) -> String {
    events
        .iter()
        .filter_map(|event| match event {
            StreamEvent::Token { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}
