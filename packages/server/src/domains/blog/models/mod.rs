pub mod blog_post;
pub mod topic_queue;

pub use blog_post::BlogPost;
pub use topic_queue::{ReviewStatus, TopicQueueEntry, TopicStatus};
