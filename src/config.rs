//! Dispatcher and click-executor tuning knobs.

use serde::{Deserialize, Serialize};

/// Configuration for one dispatch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatcherConfig {
    /// Expected starting URL for activity resolution (the rewards dashboard)
    pub base_url: String,
    /// Candidate locators tried per activity before skipping it
    pub max_candidates_per_activity: usize,
    /// Click attempts per candidate locator
    pub click_attempts: u32,
    /// Per-attempt click timeout in milliseconds
    pub click_timeout_ms: u64,
    /// Maximum simultaneously open tabs before the leak guard closes one
    pub max_open_tabs: usize,
    /// Cooldown after each activity, lower bound (ms)
    pub cooldown_min_ms: u64,
    /// Cooldown after each activity, upper bound (ms)
    pub cooldown_max_ms: u64,
    /// Remote query-table URL for search activities (optional)
    pub query_table_url: Option<String>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            base_url: "https://rewards.bing.com/".to_string(),
            max_candidates_per_activity: 5,
            click_attempts: 3,
            click_timeout_ms: 10_000,
            max_open_tabs: 3,
            cooldown_min_ms: 2_000,
            cooldown_max_ms: 5_000,
            query_table_url: None,
        }
    }
}

impl DispatcherConfig {
    /// Set the dashboard base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the per-candidate click attempt budget
    pub fn click_attempts(mut self, attempts: u32) -> Self {
        self.click_attempts = attempts;
        self
    }

    /// Set the per-activity cooldown range in milliseconds
    pub fn cooldown(mut self, min_ms: u64, max_ms: u64) -> Self {
        self.cooldown_min_ms = min_ms;
        self.cooldown_max_ms = max_ms;
        self
    }

    /// Set the remote query-table URL
    pub fn query_table_url(mut self, url: Option<String>) -> Self {
        self.query_table_url = url;
        self
    }
}
