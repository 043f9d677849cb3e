//! Pipeline agents.
//!
//! Five sequential stages audit a claim (topic finder, source checker,
//! adversarial checker, writer, publisher); the decomposer and composer
//! bracket the pipeline during scheduled article generation. All share
//! the framework's load-config / prompt / parse / emit shape.

pub mod adversarial_checker;
pub mod composer;
pub mod decomposer;
pub mod framework;
pub mod publisher;
pub mod source_checker;
pub mod topic_finder;
pub mod writer;

pub use adversarial_checker::AdversarialChecker;
pub use composer::Composer;
pub use decomposer::Decomposer;
pub use framework::{Agent, AgentContext, AgentError, JsonMap};
pub use publisher::Publisher;
pub use source_checker::SourceChecker;
pub use topic_finder::TopicFinder;
pub use writer::Writer;
