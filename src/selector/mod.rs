//! Locator candidate generation

mod builder;

pub use builder::{CandidateRank, SelectorCandidate, SelectorCandidateBuilder};
