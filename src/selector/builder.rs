//! Ranked locator candidate generation.
//!
//! Dashboard cards carry structured attributes when the markup is healthy,
//! but the page regularly ships with missing or mangled identifiers. The
//! builder emits every plausible locator up front, from most to least
//! specific, and leaves existence checking to the click executor.

use serde_json::Value;
use tracing::{debug, warn};

use crate::page::PageDriver;

/// Clickable shape shared by reward cards
const POINT_LINK: &str = ".pointLink:not(.contentContainer .pointLink)";
/// Container scope for attribute-exact matches
const CARD_SCOPE: &str = "#more-activities";

/// Specificity tier a candidate was generated at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CandidateRank {
    ExactAttribute,
    AttributePrefix,
    AttributeSubstring,
    Heuristic,
    GenericFallback,
}

/// One locator to try, tagged with how it was derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorCandidate {
    pub selector: String,
    pub rank: CandidateRank,
}

impl SelectorCandidate {
    fn new(selector: impl Into<String>, rank: CandidateRank) -> Self {
        Self {
            selector: selector.into(),
            rank,
        }
    }
}

/// Builds the ordered, de-duplicated candidate list for one activity.
pub struct SelectorCandidateBuilder;

impl SelectorCandidateBuilder {
    /// Produce the candidate list. Never empty: generic fallbacks are
    /// always appended last.
    pub async fn build(
        page: &dyn PageDriver,
        offer_id: &str,
        name: &str,
    ) -> Vec<SelectorCandidate> {
        let mut candidates: Vec<SelectorCandidate> = Vec::new();

        if !offer_id.is_empty() {
            candidates.push(SelectorCandidate::new(
                format!(
                    "{} [data-bi-id=\"{}\"] {}",
                    CARD_SCOPE, offer_id, POINT_LINK
                ),
                CandidateRank::ExactAttribute,
            ));
            // Escaped variant survives ids containing CSS metacharacters
            candidates.push(SelectorCandidate::new(
                format!(
                    "{} [data-bi-id=\"{}\"] {}",
                    CARD_SCOPE,
                    escape_attribute_value(offer_id),
                    POINT_LINK
                ),
                CandidateRank::ExactAttribute,
            ));
        }

        if !name.is_empty() {
            candidates.push(SelectorCandidate::new(
                format!("[data-bi-id^=\"{}\"] {}", name, POINT_LINK),
                CandidateRank::AttributePrefix,
            ));
            candidates.push(SelectorCandidate::new(
                format!("[data-bi-id*=\"{}\"] {}", name, POINT_LINK),
                CandidateRank::AttributeSubstring,
            ));
        }

        for id in Self::heuristic_scan(page).await {
            candidates.push(SelectorCandidate::new(
                format!("#{} {}", id, POINT_LINK),
                CandidateRank::Heuristic,
            ));
        }

        candidates.push(SelectorCandidate::new(
            format!("{} {}", CARD_SCOPE, POINT_LINK),
            CandidateRank::GenericFallback,
        ));
        candidates.push(SelectorCandidate::new(
            POINT_LINK,
            CandidateRank::GenericFallback,
        ));

        dedup_preserving_order(candidates)
    }

    /// Scan the live DOM for card containers whose id matches the daily /
    /// gamification naming pattern. A failed scan yields an empty list,
    /// never an error.
    async fn heuristic_scan(page: &dyn PageDriver) -> Vec<String> {
        let script = format!(
            r#"
            (function() {{
                const ids = [];
                const links = document.querySelectorAll('{}');
                const pattern = /daily|gamification/i;
                for (const link of links) {{
                    let node = link.parentElement;
                    while (node && node !== document.body) {{
                        if (node.id && pattern.test(node.id) && !ids.includes(node.id)) {{
                            ids.push(node.id);
                            break;
                        }}
                        node = node.parentElement;
                    }}
                }}
                return ids;
            }})()
        "#,
            POINT_LINK
        );

        match page.execute_js(&script).await {
            Ok(Value::Array(values)) => {
                let ids: Vec<String> = values
                    .into_iter()
                    .filter_map(|v| v.as_str().map(|s| s.to_string()))
                    .collect();
                debug!("heuristic scan found {} container ids", ids.len());
                ids
            }
            Ok(_) => Vec::new(),
            Err(e) => {
                warn!("heuristic selector scan failed: {}", e);
                Vec::new()
            }
        }
    }
}

/// Backslash-escape CSS attribute-value metacharacters.
fn escape_attribute_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '\'' | ']' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn dedup_preserving_order(candidates: Vec<SelectorCandidate>) -> Vec<SelectorCandidate> {
    let mut seen = std::collections::HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(c.selector.clone()))
        .collect()
}
