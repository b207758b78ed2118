//! Daily poll protocol.
//!
//! A poll is a single binary choice and awards its points for any answer,
//! so the pick is random and nothing is verified afterwards.

use rand::Rng;
use tracing::info;

use super::protocol_click;
use crate::click::ClickExecutor;
use crate::delay;
use crate::errors::EngineError;
use crate::page::PageDriver;

pub struct PollProtocol;

impl PollProtocol {
    pub async fn run(
        page: &dyn PageDriver,
        executor: &ClickExecutor,
        title: &str,
    ) -> Result<(), EngineError> {
        let choice: u8 = rand::thread_rng().gen_range(0..2);
        let selector = format!("#btoption{}", choice);

        delay::random_delay(1_000, 2_500).await;
        protocol_click(page, executor, &selector).await?;
        delay::random_delay(1_500, 3_000).await;

        info!("{}: poll answered (option {})", title, choice);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::mock::MockPage;
    use serde_json::json;

    #[tokio::test(start_paused = true)]
    async fn test_poll_issues_one_click_on_a_fixed_index_option() {
        let page = MockPage::new();
        page.set_default_js(json!({ "found": true, "width": 80.0, "height": 30.0,
                                     "hidden": false, "cx": 40.0, "cy": 15.0 }))
            .await;
        page.add_selector("#btoption0").await;
        page.add_selector("#btoption1").await;

        PollProtocol::run(page.as_ref(), &ClickExecutor::default(), "daily poll")
            .await
            .unwrap();

        let clicks = page.clicks.lock().await;
        assert_eq!(clicks.len(), 1);
        assert!(clicks[0] == "#btoption0" || clicks[0] == "#btoption1");
    }
}
