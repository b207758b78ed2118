//! Completion protocols
//!
//! Per-type state machines that drive an activated activity to its
//! terminal state. All of them interrogate the live page and reuse the
//! shared click executor; none of them cache question state across
//! iterations.

mod abc;
mod poll;
mod quiz;
mod search;
mod state;
mod this_or_that;
mod url_reward;

pub use abc::AbcProtocol;
pub use poll::PollProtocol;
pub use quiz::QuizProtocol;
pub use search::SearchProtocol;
pub use state::{fetch_quiz_state, wait_for_refresh, QuizOption, QuizState};
pub use this_or_that::ThisOrThatProtocol;
pub use url_reward::UrlRewardProtocol;

use crate::click::{ClickExecutor, ClickFailure, ClickOutcome};
use crate::errors::EngineError;
use crate::page::PageDriver;

/// Shared click primitive for protocol-issued clicks.
pub(crate) async fn protocol_click(
    page: &dyn PageDriver,
    executor: &ClickExecutor,
    selector: &str,
) -> Result<(), EngineError> {
    match executor.attempt_click(page, selector).await {
        ClickOutcome::Success { .. } => Ok(()),
        ClickOutcome::Failure(ClickFailure::NotFound) => Err(EngineError::Page(
            crate::errors::PageError::ElementNotFound(selector.to_string()),
        )),
        ClickOutcome::Failure(reason) => Err(EngineError::ConvergenceFailed(format!(
            "click on {} failed: {}",
            selector, reason
        ))),
    }
}
