//! Multi-strategy resilient click protocol.
//!
//! A single attempt walks: bounded attach wait, geometry/visibility probe,
//! overlay suppression, a strategy cascade, and a post-click wait on the
//! popup/navigation signals armed before the click. The outer loop retries
//! only transient failures with jittered backoff.

use std::fmt;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use super::overlay::OverlayManager;
use crate::delay;
use crate::page::{PageDriver, PageRef};

/// Why a click attempt (or the whole budget) failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickFailure {
    /// Locator resolved no element; pointless to retry this locator
    NotFound,
    /// Element exists but has no rendered area
    ZeroBoundingBox,
    /// Element hidden via style and no overlay could be suppressed
    CssHidden,
    /// Element visible but every click strategy failed
    ClickFailed,
    /// Retry budget exhausted
    MaxRetries,
}

impl ClickFailure {
    /// Only transient failures are worth another attempt at the same
    /// locator; a nonexistent element will not appear by retrying.
    pub fn is_retriable(&self) -> bool {
        matches!(self, ClickFailure::ClickFailed | ClickFailure::CssHidden)
    }
}

impl fmt::Display for ClickFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            ClickFailure::NotFound => "not-found",
            ClickFailure::ZeroBoundingBox => "zero-bounding-box",
            ClickFailure::CssHidden => "css-hidden",
            ClickFailure::ClickFailed => "click-failed",
            ClickFailure::MaxRetries => "max-retries",
        };
        f.write_str(reason)
    }
}

/// Result of [`ClickExecutor::attempt_click`].
pub enum ClickOutcome {
    Success { popup: Option<PageRef> },
    Failure(ClickFailure),
}

impl ClickOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ClickOutcome::Success { .. })
    }
}

impl fmt::Debug for ClickOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClickOutcome::Success { popup } => {
                write!(f, "Success {{ popup: {} }}", popup.is_some())
            }
            ClickOutcome::Failure(reason) => write!(f, "Failure({})", reason),
        }
    }
}

/// Geometry/visibility snapshot of the candidate element.
struct ElementProbe {
    width: f64,
    height: f64,
    hidden: bool,
    center_x: f64,
    center_y: f64,
}

enum AttemptResult {
    Clicked { popup: Option<PageRef> },
    Failed(ClickFailure),
}

/// Click strategies tried in order; first success wins.
#[derive(Debug, Clone, Copy)]
enum ClickStrategy {
    /// Interaction-layer click with actionability checks
    Interaction,
    /// Script-level forced click on the element
    ScriptClick,
    /// Pointer click at the element's center coordinates
    PointerCenter,
    /// Synthetic event sequence bypassing actionability entirely
    ForcedEvents,
}

const STRATEGY_CASCADE: [ClickStrategy; 4] = [
    ClickStrategy::Interaction,
    ClickStrategy::ScriptClick,
    ClickStrategy::PointerCenter,
    ClickStrategy::ForcedEvents,
];

pub struct ClickExecutor {
    max_attempts: u32,
    per_attempt_timeout: Duration,
}

impl Default for ClickExecutor {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            per_attempt_timeout: Duration::from_millis(10_000),
        }
    }
}

impl ClickExecutor {
    pub fn new(max_attempts: u32, per_attempt_timeout: Duration) -> Self {
        Self {
            max_attempts,
            per_attempt_timeout,
        }
    }

    /// Attempt to activate the element at `locator`, retrying transient
    /// failures up to the attempt budget.
    pub async fn attempt_click(&self, page: &dyn PageDriver, locator: &str) -> ClickOutcome {
        for attempt in 1..=self.max_attempts {
            match self.single_attempt(page, locator).await {
                AttemptResult::Clicked { popup } => {
                    return ClickOutcome::Success { popup };
                }
                AttemptResult::Failed(reason) if !reason.is_retriable() => {
                    debug!("click on {} failed ({}), not retrying", locator, reason);
                    return ClickOutcome::Failure(reason);
                }
                AttemptResult::Failed(reason) => {
                    debug!(
                        "click on {} failed ({}), attempt {}/{}",
                        locator, reason, attempt, self.max_attempts
                    );
                    if attempt < self.max_attempts {
                        tokio::time::sleep(delay::backoff_with_jitter(attempt, 250, 2_000)).await;
                    }
                }
            }
        }

        warn!("click budget exhausted for {}", locator);
        ClickOutcome::Failure(ClickFailure::MaxRetries)
    }

    async fn single_attempt(&self, page: &dyn PageDriver, locator: &str) -> AttemptResult {
        // Brief attach wait. Absence here is not fatal; the probe below
        // fails fast when the element truly is not there.
        let attach_wait = Duration::from_secs(3).min(self.per_attempt_timeout);
        let _ = page.wait_for_selector(locator, attach_wait).await;

        let probe = match Self::probe_element(page, locator).await {
            Some(probe) => probe,
            None => return AttemptResult::Failed(ClickFailure::NotFound),
        };

        if probe.width <= 0.0 || probe.height <= 0.0 {
            return AttemptResult::Failed(ClickFailure::ZeroBoundingBox);
        }

        let mut suppressed = 0;
        if probe.hidden {
            suppressed = OverlayManager::suppress_overlapping(page, locator).await;
            if suppressed == 0 {
                OverlayManager::restore_suppressed(page).await;
                return AttemptResult::Failed(ClickFailure::CssHidden);
            }
            // Something was obstructing; try the click anyway
        }

        // Both signals must be armed before the click: the popup or
        // navigation can land before any post-click wait starts.
        if let Err(e) = page.arm_popup_watch().await {
            debug!("popup watch arming failed: {}", e);
        }

        let clicked = self.run_cascade(page, locator, &probe).await;

        // Release suppression before evaluating the outcome, no matter
        // how the cascade went.
        if suppressed > 0 {
            OverlayManager::restore_suppressed(page).await;
        }

        if !clicked {
            return AttemptResult::Failed(ClickFailure::ClickFailed);
        }

        let popup = self.await_post_click_signals(page).await;
        AttemptResult::Clicked { popup }
    }

    /// Try each strategy in order; any strategy error is swallowed and the
    /// cascade moves on.
    async fn run_cascade(
        &self,
        page: &dyn PageDriver,
        locator: &str,
        probe: &ElementProbe,
    ) -> bool {
        for strategy in STRATEGY_CASCADE {
            let result = match strategy {
                ClickStrategy::Interaction => page
                    .click_element(locator, self.per_attempt_timeout)
                    .await
                    .is_ok(),
                ClickStrategy::ScriptClick => Self::script_click(page, locator).await,
                ClickStrategy::PointerCenter => {
                    page.click_at(probe.center_x, probe.center_y).await.is_ok()
                }
                ClickStrategy::ForcedEvents => Self::forced_event_click(page, locator).await,
            };

            if result {
                debug!("click on {} landed via {:?}", locator, strategy);
                return true;
            }
        }
        false
    }

    /// First-completed-wins wait on the two signals armed pre-click.
    /// Neither firing still counts as a successful click.
    async fn await_post_click_signals(&self, page: &dyn PageDriver) -> Option<PageRef> {
        let wait = Duration::from_secs(3).min(self.per_attempt_timeout);

        tokio::select! {
            biased;
            popup = page.wait_armed_popup(wait) => popup.unwrap_or(None),
            navigated = page.wait_for_navigation(wait) => {
                if matches!(navigated, Ok(true)) {
                    debug!("navigation detected after click");
                }
                None
            }
        }
    }

    async fn probe_element(page: &dyn PageDriver, locator: &str) -> Option<ElementProbe> {
        let script = format!(
            r#"
            (function() {{
                const el = document.querySelector("{sel}");
                if (!el) return {{ found: false }};
                el.scrollIntoView({{ block: 'center' }});
                const rect = el.getBoundingClientRect();
                const style = window.getComputedStyle(el);
                const hidden = style.display === 'none' ||
                               style.visibility === 'hidden' ||
                               parseFloat(style.opacity) === 0 ||
                               el.hasAttribute('hidden');
                return {{
                    found: true,
                    width: rect.width,
                    height: rect.height,
                    hidden: hidden,
                    cx: rect.left + rect.width / 2,
                    cy: rect.top + rect.height / 2
                }};
            }})()
        "#,
            sel = escape_for_js(locator),
        );

        let result = page.execute_js(&script).await.ok()?;
        if result.get("found").and_then(Value::as_bool) != Some(true) {
            return None;
        }

        Some(ElementProbe {
            width: result.get("width").and_then(Value::as_f64).unwrap_or(0.0),
            height: result.get("height").and_then(Value::as_f64).unwrap_or(0.0),
            hidden: result.get("hidden").and_then(Value::as_bool).unwrap_or(false),
            center_x: result.get("cx").and_then(Value::as_f64).unwrap_or(0.0),
            center_y: result.get("cy").and_then(Value::as_f64).unwrap_or(0.0),
        })
    }

    async fn script_click(page: &dyn PageDriver, locator: &str) -> bool {
        let script = format!(
            r#"
            (function() {{
                const el = document.querySelector("{sel}");
                if (!el) return false;
                el.click();
                return true;
            }})()
        "#,
            sel = escape_for_js(locator),
        );

        matches!(page.execute_js(&script).await, Ok(Value::Bool(true)))
    }

    async fn forced_event_click(page: &dyn PageDriver, locator: &str) -> bool {
        let script = format!(
            r#"
            (function() {{
                const el = document.querySelector("{sel}");
                if (!el) return false;
                for (const type of ['mouseover', 'mousedown', 'mouseup', 'click']) {{
                    el.dispatchEvent(new MouseEvent(type, {{ bubbles: true, cancelable: true }}));
                }}
                return true;
            }})()
        "#,
            sel = escape_for_js(locator),
        );

        matches!(page.execute_js(&script).await, Ok(Value::Bool(true)))
    }
}

fn escape_for_js(selector: &str) -> String {
    selector.replace('\\', "\\\\").replace('"', "\\\"")
}
