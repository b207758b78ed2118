//! Resilient click execution

mod executor;
mod overlay;

pub use executor::{ClickExecutor, ClickFailure, ClickOutcome};
pub use overlay::OverlayManager;
