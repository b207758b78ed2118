//! Visit-only reward protocol.
//!
//! These activities credit on page load. The protocol dwells for a
//! humanized interval, then dismisses any confirmation prompt on a
//! best-effort basis; nothing here is fatal once the page is open.

use std::time::Duration;

use tracing::{debug, info};

use crate::delay;
use crate::errors::EngineError;
use crate::page::PageDriver;

/// Dismissable prompts seen on visit-reward destinations.
const DISMISS_SELECTORS: [&str; 3] = ["#bnp_btn_accept", ".rqNewsClose", "#id_close"];

pub struct UrlRewardProtocol;

impl UrlRewardProtocol {
    pub async fn run(page: &dyn PageDriver, title: &str) -> Result<(), EngineError> {
        info!("{}: dwelling on destination page", title);
        delay::random_delay(3_000, 6_000).await;

        for selector in DISMISS_SELECTORS {
            let present = page
                .wait_for_selector(selector, Duration::from_millis(500))
                .await
                .unwrap_or(false);
            if present {
                debug!("{}: dismissing {}", title, selector);
                let _ = page.click_element(selector, Duration::from_secs(2)).await;
                delay::random_delay(300, 800).await;
            }
        }

        Ok(())
    }
}
