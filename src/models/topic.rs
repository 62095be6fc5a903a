use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a topic's current weight came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicProvenance {
    /// Declared by the user (config seeding or explicit profile edits).
    Explicit,
    /// Derived from feedback by the learning loop.
    Learned,
    /// Bulk edit applied by an external agent.
    AgentUpdated,
}

impl TopicProvenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::Learned => "learned",
            Self::AgentUpdated => "agent_updated",
        }
    }

    /// Lenient parse for values read back from the store.
    pub fn parse(s: &str) -> Self {
        match s {
            "explicit" => Self::Explicit,
            "agent_updated" => Self::AgentUpdated,
            _ => Self::Learned,
        }
    }
}

/// One row of the interest profile. `topic` is the primary key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileTopic {
    pub topic: String,
    /// Interest strength, always clamped to [0, 1].
    pub weight: f64,
    pub provenance: TopicProvenance,
    pub sample_count: i64,
    pub last_updated: DateTime<Utc>,
}
