//! Data-driven routing policy: which stages run for a given request.
//!
//! Routing is a pure function of the request's mode and options, decoupled
//! from the agents themselves so the table can be tested in isolation:
//!
//! - fallback mode runs chat only, regardless of other options (degraded
//!   operation when retrieval/validation backends are unavailable);
//! - chat always runs first;
//! - retrieval runs for teacher mode or when structured output is requested;
//! - preview and validation run only when structured output is requested.

use crate::state::{Mode, PipelineRequest};
use crate::types::Stage;

/// Computes the ordered stage list for a mode/options combination.
///
/// # Examples
///
/// ```
/// use lessonweave::runner::route_stages;
/// use lessonweave::state::Mode;
/// use lessonweave::types::Stage;
///
/// assert_eq!(route_stages(Mode::Student, false, false), vec![Stage::Chat]);
/// assert_eq!(
///     route_stages(Mode::Teacher, true, false),
///     vec![Stage::Chat, Stage::Retrieve, Stage::Preview, Stage::Validate],
/// );
/// // Fallback wins even when settings nominally request structured output.
/// assert_eq!(route_stages(Mode::Teacher, true, true), vec![Stage::Chat]);
/// ```
#[must_use]
pub fn route_stages(mode: Mode, structured_output: bool, fallback: bool) -> Vec<Stage> {
    if fallback {
        return vec![Stage::Chat];
    }

    let mut stages = vec![Stage::Chat];
    if mode == Mode::Teacher || structured_output {
        stages.push(Stage::Retrieve);
    }
    if structured_output {
        stages.push(Stage::Preview);
        stages.push(Stage::Validate);
    }
    stages
}

/// Routing entry point used by the runner.
#[must_use]
pub fn route_request(request: &PipelineRequest) -> Vec<Stage> {
    route_stages(request.mode, request.structured_output, request.fallback)
}
