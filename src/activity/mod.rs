//! Activity records and protocol classification

mod types;

pub use types::{ActivityRecord, PromotionType, ProtocolKind, PunchCard};
