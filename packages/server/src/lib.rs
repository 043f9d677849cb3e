// Claim Audit Platform - API Core
//
// Audits factual claims through a sequential five-agent verification
// pipeline, caches audited results in a semantically indexed store, and
// reuses them via an intelligent router. Scheduled topic-to-article
// generation sits on top of the same pipeline.

pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
