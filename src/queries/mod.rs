//! Canned search-query lookup.

mod table;

pub use table::{normalize_title, QueryTable, QueryTableEntry};
