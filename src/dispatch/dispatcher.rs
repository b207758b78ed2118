//! Per-activity resolution loop.
//!
//! Every activity is handled on a fresh acquisition of the latest tab, and
//! every failure is contained at single-activity granularity: one bad card
//! never aborts the rest of the list. The only errors that escape are
//! browser-level losses (no pages left to drive).

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::activity::{ActivityRecord, ProtocolKind, PunchCard};
use crate::click::{ClickExecutor, ClickOutcome};
use crate::config::DispatcherConfig;
use crate::delay;
use crate::errors::EngineError;
use crate::page::{BrowserDriver, PageDriver, PageRef};
use crate::protocols::{
    AbcProtocol, PollProtocol, QuizProtocol, SearchProtocol, ThisOrThatProtocol,
    UrlRewardProtocol,
};
use crate::queries::QueryTable;
use crate::selector::SelectorCandidateBuilder;

pub struct ActivityDispatcher {
    browser: Arc<dyn BrowserDriver>,
    config: DispatcherConfig,
    executor: ClickExecutor,
    queries: QueryTable,
}

impl ActivityDispatcher {
    pub fn new(browser: Arc<dyn BrowserDriver>, config: DispatcherConfig) -> Self {
        let executor = ClickExecutor::new(
            config.click_attempts,
            Duration::from_millis(config.click_timeout_ms),
        );
        Self {
            browser,
            config,
            executor,
            queries: QueryTable::default(),
        }
    }

    /// Load the remote query table if one is configured. A failed fetch
    /// leaves the table empty; search activities fall back to literal
    /// titles.
    pub async fn load_query_table(&mut self) {
        if let Some(url) = self.config.query_table_url.clone() {
            self.queries = QueryTable::fetch(&url).await;
            info!("query table ready ({} entries)", self.queries.len());
        }
    }

    pub async fn run_daily_set(&self, activities: &[ActivityRecord]) -> Result<(), EngineError> {
        info!("daily set: {} activities", activities.len());
        self.resolve_and_run(Self::without_hints(activities)).await
    }

    pub async fn run_more_promotions(
        &self,
        activities: &[ActivityRecord],
    ) -> Result<(), EngineError> {
        info!("more promotions: {} activities", activities.len());
        self.resolve_and_run(Self::without_hints(activities)).await
    }

    /// Complete punch cards child by child. Children get a card-specific
    /// locator hint tried ahead of the generic candidates.
    pub async fn run_punch_cards(&self, cards: &[PunchCard]) -> Result<(), EngineError> {
        for card in cards {
            if !card.parent_promotion.is_actionable() {
                debug!("punch card {} not actionable, skipping", card.parent_promotion.title);
                continue;
            }

            let batch: Vec<(ActivityRecord, Option<String>)> = card
                .child_promotions
                .iter()
                .filter(|child| child.is_actionable())
                .map(|child| {
                    let hint = (!child.name.is_empty()).then(|| {
                        format!(".punchcard_playCard a[href*=\"{}\"]", child.name)
                    });
                    (child.clone(), hint)
                })
                .collect();

            info!(
                "punch card {}: {} actionable children",
                card.parent_promotion.title,
                batch.len()
            );
            self.resolve_and_run(batch).await?;
        }
        Ok(())
    }

    fn without_hints(activities: &[ActivityRecord]) -> Vec<(ActivityRecord, Option<String>)> {
        activities
            .iter()
            .filter(|a| a.is_actionable())
            .map(|a| (a.clone(), None))
            .collect()
    }

    async fn resolve_and_run(
        &self,
        batch: Vec<(ActivityRecord, Option<String>)>,
    ) -> Result<(), EngineError> {
        for (activity, hint) in batch {
            let page = self.acquire_dashboard_page().await?;
            self.return_to_dashboard(page.as_ref()).await;

            let candidates = self
                .candidate_list(page.as_ref(), &activity, hint.as_deref())
                .await;

            let mut clicked = None;
            for selector in &candidates {
                match self.executor.attempt_click(page.as_ref(), selector).await {
                    ClickOutcome::Success { popup } => {
                        debug!("{}: activated via {}", activity.title, selector);
                        clicked = Some(popup);
                        break;
                    }
                    ClickOutcome::Failure(reason) => {
                        debug!("{}: candidate {} failed ({})", activity.title, selector, reason);
                    }
                }
            }

            let Some(popup) = clicked else {
                warn!(
                    "{}: no candidate activated ({} tried), skipping",
                    activity.title,
                    candidates.len()
                );
                self.cooldown().await;
                continue;
            };

            // Popup wins; otherwise the click may still have opened a new
            // tab, so the latest tab is re-acquired either way.
            let active: PageRef = match popup {
                Some(popup_page) => popup_page,
                None => self.browser.latest_page().await?,
            };

            if let Err(e) = self.run_protocol(active.as_ref(), &activity).await {
                error!("{}: aborted: {}", activity.title, e);
                if !Arc::ptr_eq(&active, &page) {
                    let _ = active.close().await;
                }
            } else {
                info!("{}: done", activity.title);
            }

            self.cooldown().await;
        }
        Ok(())
    }

    /// Latest-tab acquisition with the tab-leak guard: over the cap, the
    /// current tab is closed and the next-latest takes its place.
    async fn acquire_dashboard_page(&self) -> Result<PageRef, EngineError> {
        let mut page = self.browser.latest_page().await?;
        if self.browser.page_count().await? > self.config.max_open_tabs {
            warn!("tab cap exceeded, closing current tab");
            let _ = page.close().await;
            page = self.browser.latest_page().await?;
        }
        Ok(page)
    }

    /// Best-effort return navigation; being stranded elsewhere is logged,
    /// not fatal, since the candidate probes fail cleanly off-dashboard.
    async fn return_to_dashboard(&self, page: &dyn PageDriver) {
        let on_dashboard = matches!(
            page.current_url().await,
            Ok(url) if url.starts_with(&self.config.base_url)
        );
        if !on_dashboard {
            if let Err(e) = page.navigate(&self.config.base_url).await {
                warn!("return navigation to {} failed: {}", self.config.base_url, e);
            }
        }
    }

    async fn candidate_list(
        &self,
        page: &dyn PageDriver,
        activity: &ActivityRecord,
        hint: Option<&str>,
    ) -> Vec<String> {
        let mut selectors: Vec<String> = Vec::new();
        if let Some(hint) = hint {
            selectors.push(hint.to_string());
        }
        for candidate in
            SelectorCandidateBuilder::build(page, &activity.offer_id, &activity.name).await
        {
            if !selectors.contains(&candidate.selector) {
                selectors.push(candidate.selector);
            }
        }
        selectors.truncate(self.config.max_candidates_per_activity);
        selectors
    }

    async fn run_protocol(
        &self,
        page: &dyn PageDriver,
        activity: &ActivityRecord,
    ) -> Result<(), EngineError> {
        match activity.classify() {
            ProtocolKind::Poll => PollProtocol::run(page, &self.executor, &activity.title).await,
            ProtocolKind::Quiz => QuizProtocol::run(page, &self.executor, &activity.title).await,
            ProtocolKind::Abc => AbcProtocol::run(page, &self.executor, &activity.title).await,
            ProtocolKind::ThisOrThat => {
                ThisOrThatProtocol::run(page, &self.executor, &activity.title).await
            }
            ProtocolKind::UrlReward => UrlRewardProtocol::run(page, &activity.title).await,
            ProtocolKind::Search => {
                SearchProtocol::run(page, &self.executor, &self.queries, &activity.title).await
            }
            ProtocolKind::Unsupported => {
                warn!(
                    "{}: unsupported promotion shape, skipping",
                    activity.title
                );
                Ok(())
            }
        }
    }

    async fn cooldown(&self) {
        delay::random_delay(self.config.cooldown_min_ms, self.config.cooldown_max_ms).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::PromotionType;
    use crate::page::mock::{MockBrowser, MockPage};
    use serde_json::json;

    fn visible_probe() -> serde_json::Value {
        json!({ "found": true, "width": 200.0, "height": 60.0, "hidden": false,
                "cx": 100.0, "cy": 30.0 })
    }

    fn activity(promotion_type: PromotionType, max: i64) -> ActivityRecord {
        ActivityRecord {
            offer_id: "ENUS_offer_1".into(),
            name: "offer_1".into(),
            title: "Test offer".into(),
            promotion_type,
            point_progress_max: max,
            point_progress: 0,
            destination_url: "https://www.bing.com/".into(),
            complete: false,
            locked: false,
        }
    }

    fn dispatcher(page: Arc<MockPage>) -> ActivityDispatcher {
        let config = DispatcherConfig::default()
            .base_url("https://rewards.test/")
            .cooldown(10, 20);
        ActivityDispatcher::new(MockBrowser::new(page), config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_actionable_records_skip_resolution() {
        let page = MockPage::new();
        let dispatcher = dispatcher(page.clone());

        let mut done = activity(PromotionType::UrlReward, 10);
        done.complete = true;
        let mut locked = activity(PromotionType::UrlReward, 10);
        locked.locked = true;
        let zero = activity(PromotionType::UrlReward, 0);

        dispatcher
            .run_daily_set(&[done, locked, zero])
            .await
            .unwrap();

        // No locator work, no navigation, no scripts
        assert!(page.navigation_log().await.is_empty());
        assert!(page.js_log.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_activity_reaches_poll_protocol() {
        let page = MockPage::new();
        page.set_default_js(visible_probe()).await;
        let dispatcher = dispatcher(page.clone());

        let mut poll = activity(PromotionType::Quiz, 10);
        poll.destination_url = "https://www.bing.com/?PollScenarioId=77".into();

        dispatcher.run_daily_set(&[poll]).await.unwrap();

        // The poll protocol probed one of its two fixed options
        assert!(page.js_count("btoption").await >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unresolvable_activity_skipped_next_one_runs() {
        let page = MockPage::new();
        page.set_default_js(visible_probe()).await;
        // First activity: every candidate probe reports no element.
        // Cap is 5 candidates, each failing fast on one probe.
        page.on_js(
            "scrollIntoView",
            (0..5).map(|_| json!({ "found": false })).collect(),
        )
        .await;
        let dispatcher = dispatcher(page.clone());

        let first = activity(PromotionType::UrlReward, 10);
        let second = activity(PromotionType::UrlReward, 10);

        dispatcher.run_daily_set(&[first, second]).await.unwrap();

        // 5 fail-fast probes for the skipped activity plus the second
        // activity's successful first candidate
        assert_eq!(page.js_count("scrollIntoView").await, 6);
        assert_eq!(page.clicks.lock().await.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tab_cap_closes_current_tab() {
        let page = MockPage::new();
        page.set_default_js(visible_probe()).await;
        let browser = MockBrowser::new(page.clone());
        browser.set_page_count(5).await;

        let config = DispatcherConfig::default()
            .base_url("https://rewards.test/")
            .cooldown(10, 20);
        let dispatcher = ActivityDispatcher::new(browser, config);

        dispatcher
            .run_daily_set(&[activity(PromotionType::UrlReward, 10)])
            .await
            .unwrap();

        assert!(page.was_closed().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_off_dashboard_page_navigated_back() {
        let page = MockPage::new();
        page.set_default_js(visible_probe()).await;
        page.set_url("https://www.bing.com/search?q=elsewhere").await;
        let dispatcher = dispatcher(page.clone());

        dispatcher
            .run_daily_set(&[activity(PromotionType::UrlReward, 10)])
            .await
            .unwrap();

        assert_eq!(
            page.navigation_log().await.as_slice(),
            &["https://rewards.test/"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_punch_card_hint_tried_first() {
        let page = MockPage::new();
        page.set_default_js(visible_probe()).await;
        page.add_selector(".punchcard_playCard a[href*=\"step_1\"]")
            .await;
        let dispatcher = dispatcher(page.clone());

        let mut child = activity(PromotionType::UrlReward, 10);
        child.name = "step_1".into();
        let card = PunchCard {
            parent_promotion: activity(PromotionType::UrlReward, 30),
            child_promotions: vec![child],
        };

        dispatcher.run_punch_cards(&[card]).await.unwrap();

        let clicks = page.clicks.lock().await;
        assert_eq!(clicks[0], ".punchcard_playCard a[href*=\"step_1\"]");
    }
}
