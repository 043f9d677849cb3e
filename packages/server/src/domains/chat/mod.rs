//! Conversational surface: follow-up reformulation.

pub mod context_analyzer;

pub use context_analyzer::{ChatMessage, ContextAnalyzer};
