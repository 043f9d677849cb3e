//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod embeddings;
pub mod scheduled_tasks;
pub mod search;
pub mod sse;
pub mod stream_hub;
pub mod test_support;
pub mod traits;

pub use deps::ServerDeps;
pub use embeddings::{cosine_similarity, EmbeddingService, EMBEDDING_DIM};
pub use scheduled_tasks::GenerationScheduler;
pub use search::{NoopSearchService, TavilyClient};
pub use stream_hub::{ProgressEvent, StreamHub};
pub use traits::*;
