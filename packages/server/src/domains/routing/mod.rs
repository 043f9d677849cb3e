//! Intelligent routing: exact-match reuse, contextual synthesis, or a
//! fresh pipeline run.

pub mod agent;
pub mod models;
pub mod service;

pub use agent::{decide_mode, RouterAgent, RouterError, RouterOutcome, EXACT_MATCH_THRESHOLD};
pub use models::{NewRouterDecision, RouterDecision, RoutingMode};
pub use service::{CandidateSummary, RouterService};
