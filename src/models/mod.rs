mod article;
mod feedback;
mod topic;

pub use article::{Article, ArticleStub, IngestReport};
pub use feedback::Feedback;
pub use topic::{ProfileTopic, TopicProvenance};
