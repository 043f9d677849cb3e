//! Six-tier external source verification.

pub mod providers;
pub mod service;
pub mod types;

pub use service::SourceVerificationService;
pub use types::{
    ContentType, SourceDomain, SourceMetadata, VerificationMethod, VerificationOutcome,
    VerificationRequest, VerificationStatus,
};
