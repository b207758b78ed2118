//! Page/tab abstraction
//!
//! The engine drives every DOM interaction through the [`PageDriver`] and
//! [`BrowserDriver`] traits so protocols stay testable without a live
//! browser. The production implementation is CDP-backed.

mod cdp;
mod driver;

#[cfg(test)]
pub(crate) mod mock;

pub use cdp::{CdpBrowser, CdpBrowserConfig, CdpPage};
pub use driver::{BrowserDriver, PageDriver, PageRef};
