//! Activity resolution and protocol dispatch.

mod dispatcher;

pub use dispatcher::ActivityDispatcher;
