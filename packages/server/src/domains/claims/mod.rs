//! Claim store: audited claim cards, their sources and tags, the
//! verified source library, and agent configuration.

pub mod models;
pub mod reset;

pub use models::*;
pub use reset::{reset_generated_content, ResetSummary};
