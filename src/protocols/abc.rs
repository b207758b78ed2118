//! Iterative multiple-choice ("ABC") quiz protocol.
//!
//! The page does not expose which answer is correct, so each cycle picks
//! a random rendered option, advances, and checks for the completion
//! marker. The loop is hard-capped; a quiz that never shows the marker is
//! reported as failed convergence instead of spinning.

use std::time::Duration;

use rand::Rng;
use serde_json::Value;
use tracing::{debug, info};

use super::protocol_click;
use crate::click::ClickExecutor;
use crate::delay;
use crate::errors::EngineError;
use crate::page::PageDriver;

const MAX_ITERATIONS: u32 = 15;
const COMPLETION_MARKER: &str = "#quizCompleteContainer";
const NEXT_CONTROL: &str = ".wk_button";

pub struct AbcProtocol;

impl AbcProtocol {
    pub async fn run(
        page: &dyn PageDriver,
        executor: &ClickExecutor,
        title: &str,
    ) -> Result<(), EngineError> {
        for iteration in 1..=MAX_ITERATIONS {
            if page
                .wait_for_selector(COMPLETION_MARKER, Duration::from_secs(2))
                .await
                .unwrap_or(false)
            {
                info!("{}: completed after {} iterations", title, iteration - 1);
                return Ok(());
            }

            let option_ids = Self::rendered_option_ids(page).await;
            if !option_ids.is_empty() {
                let pick = rand::thread_rng().gen_range(0..option_ids.len());
                debug!("{}: iteration {} picking {}", title, iteration, option_ids[pick]);
                protocol_click(page, executor, &format!("#{}", option_ids[pick])).await?;
                delay::random_delay(700, 1_800).await;
            }

            protocol_click(page, executor, NEXT_CONTROL).await?;
            delay::random_delay(1_000, 2_500).await;
        }

        Err(EngineError::ConvergenceFailed(format!(
            "{}: no completion marker after {} iterations",
            title, MAX_ITERATIONS
        )))
    }

    /// Ids of the currently rendered answer options; empty on any failure.
    async fn rendered_option_ids(page: &dyn PageDriver) -> Vec<String> {
        let script = r#"
            (function() {
                const ids = [];
                for (const el of document.querySelectorAll('.wk_OptionClickClass')) {
                    if (el.id) ids.push(el.id);
                }
                return ids;
            })()
        "#;

        match page.execute_js(script).await {
            Ok(Value::Array(values)) => values
                .into_iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect(),
            _ => Vec::new(),
        }
    }
}
