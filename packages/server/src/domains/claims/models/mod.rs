pub mod agent_prompt;
pub mod claim_card;
pub mod enums;
pub mod source;
pub mod tags;
pub mod verified_source;

pub use agent_prompt::AgentPrompt;
pub use claim_card::{AuditFilters, ClaimCard, ClaimCardDetail, NewClaimCard};
pub use enums::{
    verdict_matches_prose, ClaimTypeCategory, ConfidenceLevel, SourceType, Verdict,
};
pub use source::{NewSource, Source};
pub use tags::{ApologeticsTag, CategoryTag};
pub use verified_source::{NewVerifiedSource, VerifiedSource};
