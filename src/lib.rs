//! Adaptive relevance engine for a personal news corpus.
//!
//! The crate maintains ingested articles in SQLite and learns which topics
//! the reader cares about from explicit ratings. Four pieces do the real
//! work: the advanced query surface ([`articles::ArticleQuery`]), the
//! relevance tiering pass ([`articles::tiering`]), keyword topic extraction
//! against the live profile ([`profile::extractor`]) and the feedback
//! learning loop ([`profile::ProfileManager`]). Feed fetching, AI analysis
//! and user interfaces live in external callers; this crate only stores
//! what they produce and answers their queries.

pub mod articles;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod feedback;
pub mod models;
pub mod profile;

pub use articles::{
    canonicalize_url, tier_articles, ArticleQuery, ArticleStore, PresentationHint, QueryResult,
    ReadStatus, SearchScope, SortOrder, Tier, TierCounts, TieredArticle, TieredResult,
};
pub use config::{Config, Interests};
pub use db::Database;
pub use engine::{Engine, RatingOutcome};
pub use error::{AppError, Result};
pub use feedback::{
    AiAccuracy, CorpusStats, FeedbackManager, FeedbackStats, LearningStats, RecentFeedback,
    SourcePreference,
};
pub use models::{Article, ArticleStub, Feedback, IngestReport, ProfileTopic, TopicProvenance};
pub use profile::{ProfileEvolution, ProfileManager, TopicAdjustment};
