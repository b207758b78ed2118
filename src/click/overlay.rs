//! Temporary suppression of obstructing overlay elements.
//!
//! Suppression mutates live page state, so it follows a strict
//! acquire/release contract: every suppress call is paired with exactly
//! one restore before the next candidate is tried, on every exit path.
//! Hidden elements carry a marker attribute so restoration is exact.

use serde_json::Value;
use tracing::{debug, warn};

use crate::page::PageDriver;

/// Marker attribute tagging force-hidden overlays for restoration
const SUPPRESSION_MARKER: &str = "data-rwe-suppressed";

pub struct OverlayManager;

impl OverlayManager {
    /// Hide every positioned element whose box overlaps the target's box.
    ///
    /// Returns the number of elements hidden; 0 is a common, valid result.
    /// Infrastructure failures degrade to 0 ("assume not obstructed").
    pub async fn suppress_overlapping(page: &dyn PageDriver, target_selector: &str) -> usize {
        let script = format!(
            r#"
            (function() {{
                const target = document.querySelector("{sel}");
                if (!target) return 0;
                const box = target.getBoundingClientRect();
                if (box.width === 0 || box.height === 0) return 0;

                let hidden = 0;
                const all = document.querySelectorAll('*');
                for (const el of all) {{
                    if (el === target || el.contains(target) || target.contains(el)) continue;
                    const style = window.getComputedStyle(el);
                    if (!['fixed', 'absolute', 'sticky'].includes(style.position)) continue;
                    if (style.display === 'none' || style.visibility === 'hidden') continue;

                    const rect = el.getBoundingClientRect();
                    if (rect.width === 0 || rect.height === 0) continue;

                    const overlaps = rect.left < box.right && rect.right > box.left &&
                                     rect.top < box.bottom && rect.bottom > box.top;
                    if (!overlaps) continue;

                    el.setAttribute('{marker}', '1');
                    el.style.setProperty('display', 'none', 'important');
                    hidden++;
                }}
                return hidden;
            }})()
        "#,
            sel = target_selector.replace('\\', "\\\\").replace('"', "\\\""),
            marker = SUPPRESSION_MARKER,
        );

        match page.execute_js(&script).await {
            Ok(Value::Number(n)) => {
                let count = n.as_u64().unwrap_or(0) as usize;
                if count > 0 {
                    debug!("suppressed {} overlapping overlays", count);
                }
                count
            }
            Ok(_) => 0,
            Err(e) => {
                warn!("overlay suppression failed, assuming not obstructed: {}", e);
                0
            }
        }
    }

    /// Restore every element hidden by [`suppress_overlapping`].
    pub async fn restore_suppressed(page: &dyn PageDriver) {
        let script = format!(
            r#"
            (function() {{
                const tagged = document.querySelectorAll('[{marker}]');
                for (const el of tagged) {{
                    el.removeAttribute('{marker}');
                    el.style.removeProperty('display');
                }}
                return tagged.length;
            }})()
        "#,
            marker = SUPPRESSION_MARKER,
        );

        if let Err(e) = page.execute_js(&script).await {
            warn!("overlay restoration failed: {}", e);
        }
    }
}
