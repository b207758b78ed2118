//! Activity data model.
//!
//! Records arrive already parsed from the dashboard extraction layer and
//! are treated as read-only: completion state is observed externally,
//! never written back here.

use serde::{Deserialize, Serialize};

/// Destination URL fragment identifying a poll-style quiz
const POLL_MARKER: &str = "pollscenarioid";
/// Activity name fragment identifying a search-execution reward
const EXPLORE_MARKER: &str = "exploreonbing";

/// Promotion type as reported by the dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromotionType {
    Quiz,
    #[serde(rename = "urlreward")]
    UrlReward,
    #[serde(untagged)]
    Other(String),
}

/// One rewardable task surfaced by the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    #[serde(default)]
    pub offer_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    pub promotion_type: PromotionType,
    #[serde(default)]
    pub point_progress_max: i64,
    #[serde(default)]
    pub point_progress: i64,
    #[serde(default)]
    pub destination_url: String,
    #[serde(default)]
    pub complete: bool,
    #[serde(default)]
    pub locked: bool,
}

/// Completion protocol selected for an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolKind {
    /// Single binary choice, any answer counts
    Poll,
    /// Standard multi-question quiz (single- and multi-answer questions)
    Quiz,
    /// Iterative random-choice quiz with a next control
    Abc,
    /// Binary forced-choice rounds
    ThisOrThat,
    /// Navigation already performed, only confirm/close remains
    UrlReward,
    /// Canned search-query execution
    Search,
    /// Unknown promotion type or shape, skipped with a warning
    Unsupported,
}

/// Multi-step activity chain: one parent promotion with child
/// sub-activities completed individually.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PunchCard {
    pub parent_promotion: ActivityRecord,
    #[serde(default)]
    pub child_promotions: Vec<ActivityRecord>,
}

impl ActivityRecord {
    /// Whether the dispatcher should attempt resolution at all.
    ///
    /// Completed, zero-value, and locked activities are filtered before any
    /// locator work happens.
    pub fn is_actionable(&self) -> bool {
        !self.complete && !self.locked && self.point_progress_max > 0
    }

    /// Select the completion protocol for this activity.
    pub fn classify(&self) -> ProtocolKind {
        match &self.promotion_type {
            PromotionType::Quiz => match self.point_progress_max {
                10 if self.destination_url.to_lowercase().contains(POLL_MARKER) => {
                    ProtocolKind::Poll
                }
                10 => ProtocolKind::Abc,
                50 => ProtocolKind::ThisOrThat,
                _ => ProtocolKind::Quiz,
            },
            PromotionType::UrlReward => {
                let name = self.name.to_lowercase();
                let dest = self.destination_url.to_lowercase();
                if name.contains(EXPLORE_MARKER) || dest.contains("?q=") || dest.contains("requ=")
                {
                    ProtocolKind::Search
                } else {
                    ProtocolKind::UrlReward
                }
            }
            PromotionType::Other(_) => ProtocolKind::Unsupported,
        }
    }
}
