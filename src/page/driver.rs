//! Driver trait contracts consumed by the engine.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::errors::PageError;

/// Shared handle to one page/tab.
pub type PageRef = Arc<dyn PageDriver>;

/// One browser tab. All waits are bounded; none of these methods may block
/// indefinitely.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate the tab to `url` and wait for the load to settle.
    async fn navigate(&self, url: &str) -> Result<(), PageError>;

    /// Current document URL.
    async fn current_url(&self) -> Result<String, PageError>;

    /// Run an in-page script and return its JSON result.
    async fn execute_js(&self, script: &str) -> Result<Value, PageError> {
        self.execute_js_with_timeout(script, Duration::from_secs(30))
            .await
    }

    /// Run an in-page script with an explicit timeout.
    async fn execute_js_with_timeout(
        &self,
        script: &str,
        timeout: Duration,
    ) -> Result<Value, PageError>;

    /// Poll for an element to attach to the DOM. Returns false on timeout
    /// rather than erroring; absence is a normal outcome here.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration)
        -> Result<bool, PageError>;

    /// Interaction-layer click with actionability checks and a timeout.
    async fn click_element(&self, selector: &str, timeout: Duration) -> Result<(), PageError>;

    /// Pointer click at viewport coordinates, bypassing element resolution.
    async fn click_at(&self, x: f64, y: f64) -> Result<(), PageError>;

    /// Type text into the currently focused element with humanized pacing.
    async fn type_text(&self, text: &str) -> Result<(), PageError>;

    /// Press Enter in the currently focused element.
    async fn press_enter(&self) -> Result<(), PageError>;

    /// Snapshot the current tab set so a subsequently opened tab can be
    /// recognized as a popup. Must be called before the triggering click.
    async fn arm_popup_watch(&self) -> Result<(), PageError>;

    /// Wait for a tab opened after the last [`arm_popup_watch`] call.
    /// Returns None when the timeout elapses without a new tab.
    async fn wait_armed_popup(&self, timeout: Duration) -> Result<Option<PageRef>, PageError>;

    /// Wait for a navigation away from the URL observed at call time.
    /// Returns false when the timeout elapses with no navigation.
    async fn wait_for_navigation(&self, timeout: Duration) -> Result<bool, PageError>;

    /// Close this tab.
    async fn close(&self) -> Result<(), PageError>;
}

/// Browser-level tab enumeration used by the dispatcher's tab-leak guard.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// The most recently opened tab; last-focused-tab-wins.
    async fn latest_page(&self) -> Result<PageRef, PageError>;

    /// Number of currently open tabs.
    async fn page_count(&self) -> Result<usize, PageError>;
}
