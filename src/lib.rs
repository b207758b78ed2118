//! Rewards engine
//!
//! A resilient UI-interaction engine that drives reward activities on a
//! hostile, frequently-shifting dashboard to completion. Locators are
//! generated in ranked tiers, clicks go through a multi-strategy executor
//! with overlay suppression and popup/navigation arming, and per-type
//! completion protocols take the opened activity to its terminal state.
//!
//! Failures are contained at single-activity granularity: the dispatcher
//! always finishes the list it was given.

pub mod activity;
pub mod click;
pub mod config;
pub mod delay;
pub mod dispatch;
pub mod errors;
pub mod page;
pub mod protocols;
pub mod queries;
pub mod selector;

pub use activity::{ActivityRecord, PromotionType, ProtocolKind, PunchCard};
pub use click::{ClickExecutor, ClickFailure, ClickOutcome, OverlayManager};
pub use config::DispatcherConfig;
pub use dispatch::ActivityDispatcher;
pub use errors::{EngineError, PageError};
pub use page::{BrowserDriver, CdpBrowser, CdpBrowserConfig, CdpPage, PageDriver, PageRef};
pub use queries::QueryTable;
pub use selector::{CandidateRank, SelectorCandidate, SelectorCandidateBuilder};
