//! Binary-choice ("this or that") quiz protocol.
//!
//! Correctness of the pick is not observable from the page, so each round
//! takes one of the two rendered options at random and waits for the
//! answer-processed refresh before the next round. Round count comes from
//! the live quiz state, never from a local counter.

use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};

use super::state::{fetch_quiz_state, wait_for_refresh};
use super::protocol_click;
use crate::click::ClickExecutor;
use crate::delay;
use crate::errors::EngineError;
use crate::page::PageDriver;

const START_BUTTON: &str = "#rqStartQuiz";
const REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

pub struct ThisOrThatProtocol;

impl ThisOrThatProtocol {
    pub async fn run(
        page: &dyn PageDriver,
        executor: &ClickExecutor,
        title: &str,
    ) -> Result<(), EngineError> {
        if page
            .wait_for_selector(START_BUTTON, Duration::from_secs(3))
            .await
            .unwrap_or(false)
        {
            debug!("{}: clicking start button", title);
            protocol_click(page, executor, START_BUTTON).await?;
            delay::random_delay(1_500, 3_000).await;
        }

        let initial = fetch_quiz_state(page).await?;
        info!(
            "{}: {} rounds, {} already answered",
            title, initial.max_questions, initial.correctly_answered_count
        );

        for round in 0..initial.max_questions {
            let state = fetch_quiz_state(page).await?;
            if state.remaining_questions() == 0 {
                break;
            }

            let pick = rand::thread_rng().gen_range(0..2);
            debug!("{}: round {} picking option {}", title, round + 1, pick);
            protocol_click(page, executor, &format!("#rqAnswerOption{}", pick)).await?;

            if let Err(e) = wait_for_refresh(page, REFRESH_TIMEOUT).await {
                warn!("{}: aborting, {}", title, e);
                return Err(e);
            }
            delay::random_delay(1_000, 2_500).await;
        }

        info!("{}: finished", title);
        Ok(())
    }
}
