//! Scripted in-memory driver used by unit tests.
//!
//! Scripts are matched by substring markers; each marker carries a queue of
//! canned responses so a probe can change its answer between attempts
//! (e.g. hidden on the first look, visible after overlay suppression).

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use super::driver::{BrowserDriver, PageDriver, PageRef};
use crate::errors::PageError;

#[derive(Default)]
pub struct MockPage {
    /// (marker, queued responses) checked in insertion order
    js_handlers: Mutex<Vec<(String, VecDeque<Value>)>>,
    /// Fallback for scripts with no matching handler
    default_js: Mutex<Value>,
    /// Every script executed, in order
    pub js_log: Mutex<Vec<String>>,
    /// Selectors that resolve to an element
    selectors: Mutex<HashSet<String>>,
    /// Selectors clicked through the interaction layer, in order
    pub clicks: Mutex<Vec<String>>,
    /// Interaction-layer clicks that fail before succeeding
    failing_clicks: Mutex<u32>,
    /// When set, pointer clicks error too
    fail_pointer: Mutex<bool>,
    /// Typed text, in order
    pub typed: Mutex<Vec<String>>,
    pub enter_presses: Mutex<u32>,
    navigations: Mutex<Vec<String>>,
    url: Mutex<String>,
    popup: Mutex<Option<PageRef>>,
    navigated_after_click: Mutex<bool>,
    closed: Mutex<bool>,
}

impl MockPage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            url: Mutex::new("https://rewards.test/".to_string()),
            ..Default::default()
        })
    }

    /// Queue responses for scripts containing `marker`.
    pub async fn on_js(&self, marker: &str, responses: Vec<Value>) {
        self.js_handlers
            .lock()
            .await
            .push((marker.to_string(), responses.into()));
    }

    /// Response for scripts with no matching handler.
    pub async fn set_default_js(&self, value: Value) {
        *self.default_js.lock().await = value;
    }

    /// Make `selector` resolvable (and clickable).
    pub async fn add_selector(&self, selector: &str) {
        self.selectors.lock().await.insert(selector.to_string());
    }

    /// Fail the next `n` interaction-layer clicks.
    pub async fn fail_next_clicks(&self, n: u32) {
        *self.failing_clicks.lock().await = n;
    }

    /// Make pointer clicks fail as well.
    pub async fn fail_pointer_clicks(&self, fail: bool) {
        *self.fail_pointer.lock().await = fail;
    }

    /// Return `popup` from the next armed popup wait.
    pub async fn set_popup(&self, popup: PageRef) {
        *self.popup.lock().await = Some(popup);
    }

    pub async fn set_url(&self, url: &str) {
        *self.url.lock().await = url.to_string();
    }

    pub async fn navigation_log(&self) -> Vec<String> {
        self.navigations.lock().await.clone()
    }

    pub async fn was_closed(&self) -> bool {
        *self.closed.lock().await
    }

    /// Count of executed scripts containing `marker`.
    pub async fn js_count(&self, marker: &str) -> usize {
        self.js_log
            .lock()
            .await
            .iter()
            .filter(|s| s.contains(marker))
            .count()
    }
}

#[async_trait]
impl PageDriver for MockPage {
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        self.navigations.lock().await.push(url.to_string());
        *self.url.lock().await = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> Result<String, PageError> {
        Ok(self.url.lock().await.clone())
    }

    async fn execute_js_with_timeout(
        &self,
        script: &str,
        _timeout: Duration,
    ) -> Result<Value, PageError> {
        self.js_log.lock().await.push(script.to_string());

        let mut handlers = self.js_handlers.lock().await;
        for (marker, queue) in handlers.iter_mut() {
            if script.contains(marker.as_str()) {
                if let Some(value) = queue.pop_front() {
                    return Ok(value);
                }
            }
        }
        Ok(self.default_js.lock().await.clone())
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        _timeout: Duration,
    ) -> Result<bool, PageError> {
        Ok(self.selectors.lock().await.contains(selector))
    }

    async fn click_element(&self, selector: &str, _timeout: Duration) -> Result<(), PageError> {
        if !self.selectors.lock().await.contains(selector) {
            return Err(PageError::ElementNotFound(selector.to_string()));
        }
        let mut failing = self.failing_clicks.lock().await;
        if *failing > 0 {
            *failing -= 1;
            return Err(PageError::JavaScriptError("click intercepted".into()));
        }
        self.clicks.lock().await.push(selector.to_string());
        Ok(())
    }

    async fn click_at(&self, x: f64, y: f64) -> Result<(), PageError> {
        if *self.fail_pointer.lock().await {
            return Err(PageError::JavaScriptError("pointer click rejected".into()));
        }
        self.clicks.lock().await.push(format!("@{},{}", x, y));
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<(), PageError> {
        self.typed.lock().await.push(text.to_string());
        Ok(())
    }

    async fn press_enter(&self) -> Result<(), PageError> {
        *self.enter_presses.lock().await += 1;
        Ok(())
    }

    async fn arm_popup_watch(&self) -> Result<(), PageError> {
        Ok(())
    }

    async fn wait_armed_popup(&self, _timeout: Duration) -> Result<Option<PageRef>, PageError> {
        Ok(self.popup.lock().await.take())
    }

    async fn wait_for_navigation(&self, _timeout: Duration) -> Result<bool, PageError> {
        Ok(*self.navigated_after_click.lock().await)
    }

    async fn close(&self) -> Result<(), PageError> {
        *self.closed.lock().await = true;
        Ok(())
    }
}

#[derive(Default)]
pub struct MockBrowser {
    latest: Mutex<Option<PageRef>>,
    count: Mutex<usize>,
}

impl MockBrowser {
    pub fn new(latest: PageRef) -> Arc<Self> {
        Arc::new(Self {
            latest: Mutex::new(Some(latest)),
            count: Mutex::new(1),
        })
    }

    pub async fn set_page_count(&self, count: usize) {
        *self.count.lock().await = count;
    }
}

#[async_trait]
impl BrowserDriver for MockBrowser {
    async fn latest_page(&self) -> Result<PageRef, PageError> {
        self.latest
            .lock()
            .await
            .clone()
            .ok_or_else(|| PageError::ConnectionLost("No open pages".into()))
    }

    async fn page_count(&self) -> Result<usize, PageError> {
        Ok(*self.count.lock().await)
    }
}
