use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Feedback;

/// A stored article. `summary`, `relevance_score` and `deep_analysis` are
/// written by the external analyzer after ingestion; an article missing a
/// summary or score is considered unanalyzed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub url: String,
    pub title: String,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub deep_analysis: Option<String>,
    pub source_name: String,
    pub published_date: Option<DateTime<Utc>>,
    pub fetched_date: DateTime<Utc>,
    pub relevance_score: Option<f64>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    /// Populated only by queries run with `include_feedback`, newest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feedback: Vec<Feedback>,
}

impl Article {
    pub fn has_deep_analysis(&self) -> bool {
        self.deep_analysis
            .as_deref()
            .is_some_and(|t| !t.trim().is_empty())
    }
}

/// Ingestion input: what a feed producer hands over for one article.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArticleStub {
    pub url: String,
    pub title: String,
    pub content: Option<String>,
    pub source_name: String,
    pub published_date: Option<DateTime<Utc>>,
}

/// Outcome of an ingestion batch. Duplicate URLs are absorbed, never errors.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct IngestReport {
    pub received: usize,
    pub inserted: usize,
    pub duplicates: usize,
}
