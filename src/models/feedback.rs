use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One user rating of an article. Immutable once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub id: i64,
    pub article_id: i64,
    /// 1..=5, enforced before insert and by a CHECK constraint.
    pub rating: i32,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}
