//! Engine error types

use thiserror::Error;

/// Page/tab-level errors surfaced by a [`crate::page::PageDriver`]
#[derive(Error, Debug)]
pub enum PageError {
    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("JavaScript error: {0}")]
    JavaScriptError(String),

    #[error("Connection lost: {0}")]
    ConnectionLost(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),
}

/// Activity-level errors produced by dispatcher and completion protocols
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Refresh signal never appeared: {0}")]
    RefreshSignalMissing(String),

    #[error("Protocol failed to converge: {0}")]
    ConvergenceFailed(String),

    #[error("Quiz state unavailable: {0}")]
    QuizStateUnavailable(String),

    #[error(transparent)]
    Page(#[from] PageError),
}

impl From<PageError> for String {
    fn from(err: PageError) -> String {
        err.to_string()
    }
}
