pub mod extractor;

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::Serialize;

use crate::config::Interests;
use crate::db::{topic_from_row, Database};
use crate::error::{AppError, Result};
use crate::models::{ProfileTopic, TopicProvenance};

/// Weight assumed for a topic that does not exist yet when a delta arrives.
const BASE_WEIGHT: f64 = 0.5;
/// Learned topics at or above this weight count as emerging interests.
const EMERGING_THRESHOLD: f64 = 0.6;

/// One weight change produced by the learning loop.
#[derive(Debug, Clone, Serialize)]
pub struct TopicAdjustment {
    pub topic: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfileEvolution {
    pub total_topics: usize,
    pub explicit_count: usize,
    pub learned_count: usize,
    pub top_topics: Vec<(String, f64)>,
    pub emerging_topics: Vec<(String, f64)>,
}

/// Owns the interest profile: topic weights, bounded adjustments from
/// feedback, and the top-N / evolution views.
#[derive(Clone)]
pub struct ProfileManager {
    db: Database,
}

impl ProfileManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// The full profile, strongest interests first.
    pub async fn get_profile(&self) -> Result<Vec<ProfileTopic>> {
        let topics = self
            .db
            .conn()
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT topic, weight, provenance, sample_count, last_updated \
                     FROM reader_profile ORDER BY weight DESC",
                )?;
                let topics = stmt
                    .query_map([], |row| Ok(topic_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(topics)
            })
            .await?;
        Ok(topics)
    }

    pub async fn top_topics(&self, limit: usize) -> Result<Vec<(String, f64)>> {
        let mut profile = self.get_profile().await?;
        profile.truncate(limit);
        Ok(profile.into_iter().map(|t| (t.topic, t.weight)).collect())
    }

    /// Insert or overwrite a topic's weight (clamped to [0, 1]). Repeated
    /// identical calls only bump the sample count and timestamp.
    pub async fn set_topic_weight(
        &self,
        topic: String,
        weight: f64,
        provenance: TopicProvenance,
    ) -> Result<()> {
        let weight = weight.clamp(0.0, 1.0);
        self.db
            .conn()
            .call(move |conn| {
                upsert_topic(conn, &topic, weight, provenance.as_str())?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Add `delta` to a topic's weight and clamp to [0, 1], creating the
    /// topic at base weight 0.5 (provenance `learned`) if it is new.
    /// Returns the resulting weight.
    pub async fn adjust_topic_weight(&self, topic: String, delta: f64) -> Result<f64> {
        let weight = self
            .db
            .conn()
            .call(move |conn| {
                let tx = conn.transaction()?;
                let weight = adjust_weight(&tx, &topic, delta)?;
                tx.commit()?;
                Ok(weight)
            })
            .await?;
        Ok(weight)
    }

    /// Returns whether the topic existed.
    pub async fn remove_topic(&self, topic: String) -> Result<bool> {
        let deleted = self
            .db
            .conn()
            .call(move |conn| {
                let deleted = conn.execute("DELETE FROM reader_profile WHERE topic = ?1", params![topic])?;
                Ok(deleted > 0)
            })
            .await?;
        Ok(deleted)
    }

    /// Nudge the weights of every profile topic matched by the rated
    /// article's text. A missing article or an article matching no topics
    /// produces no adjustments: there is nothing to attribute the rating
    /// to, so the rating is deliberately not attributed at all.
    ///
    /// Concurrent callers adjusting the same topic race at row granularity;
    /// the last committed write wins.
    pub async fn learn_from_feedback(
        &self,
        article_id: i64,
        rating: i32,
    ) -> Result<Vec<TopicAdjustment>> {
        let delta = delta_for_rating(rating)?;

        let adjustments = self
            .db
            .conn()
            .call(move |conn| {
                let tx = conn.transaction()?;

                let article: Option<(String, Option<String>)> = tx
                    .query_row(
                        "SELECT title, content FROM articles WHERE id = ?1",
                        params![article_id],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()?;
                let Some((title, content)) = article else {
                    return Ok(Vec::new());
                };

                let topics: Vec<String> = {
                    let mut stmt = tx.prepare("SELECT topic FROM reader_profile")?;
                    let topics = stmt
                        .query_map([], |row| row.get(0))?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    topics
                };

                let matched =
                    extractor::extract_topics(&title, content.as_deref().unwrap_or(""), &topics);

                let mut adjustments = Vec::with_capacity(matched.len());
                for topic in matched {
                    let weight = adjust_weight(&tx, &topic, delta)?;
                    adjustments.push(TopicAdjustment { topic, weight });
                }

                tx.commit()?;
                Ok(adjustments)
            })
            .await?;

        tracing::debug!(
            "Learned from feedback on article {}: {} topic(s) adjusted by {:+.2}",
            article_id,
            adjustments.len(),
            delta
        );
        Ok(adjustments)
    }

    /// Snapshot of how the profile splits between declared and learned
    /// interests, with learned topics at weight >= 0.6 flagged as emerging.
    pub async fn evolution(&self) -> Result<ProfileEvolution> {
        let profile = self.get_profile().await?;

        let explicit_count = profile
            .iter()
            .filter(|t| t.provenance == TopicProvenance::Explicit)
            .count();
        let learned: Vec<&ProfileTopic> = profile
            .iter()
            .filter(|t| t.provenance == TopicProvenance::Learned)
            .collect();

        Ok(ProfileEvolution {
            total_topics: profile.len(),
            explicit_count,
            learned_count: learned.len(),
            top_topics: profile
                .iter()
                .take(5)
                .map(|t| (t.topic.clone(), t.weight))
                .collect(),
            emerging_topics: learned
                .iter()
                .filter(|t| t.weight >= EMERGING_THRESHOLD)
                .map(|t| (t.topic.clone(), t.weight))
                .collect(),
        })
    }

    /// Seed the profile from the configured interest lists, but only when
    /// the profile table is empty; an existing profile is never touched.
    pub async fn seed_from_interests(&self, interests: &Interests) -> Result<()> {
        let interests = interests.clone();
        self.db
            .conn()
            .call(move |conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM reader_profile", [], |row| row.get(0))?;
                if count > 0 {
                    return Ok(());
                }

                let tx = conn.transaction()?;
                for topic in &interests.topics {
                    upsert_topic(&tx, topic, interests.seed_weight(topic), "explicit")?;
                }
                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

/// Fixed symmetric rating-to-delta table.
fn delta_for_rating(rating: i32) -> Result<f64> {
    match rating {
        5 => Ok(0.10),
        4 => Ok(0.05),
        3 => Ok(0.00),
        2 => Ok(-0.05),
        1 => Ok(-0.10),
        other => Err(AppError::validation(
            "rating",
            format!("{other} is outside 1..=5"),
        )),
    }
}

fn upsert_topic(
    conn: &rusqlite::Connection,
    topic: &str,
    weight: f64,
    provenance: &str,
) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO reader_profile (topic, weight, provenance, sample_count, last_updated) \
         VALUES (?1, ?2, ?3, 1, ?4) \
         ON CONFLICT(topic) DO UPDATE SET \
             weight = excluded.weight, \
             provenance = excluded.provenance, \
             sample_count = sample_count + 1, \
             last_updated = excluded.last_updated",
        params![topic, weight, provenance, Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn adjust_weight(conn: &rusqlite::Connection, topic: &str, delta: f64) -> rusqlite::Result<f64> {
    let existing: Option<(f64, String)> = conn
        .query_row(
            "SELECT weight, provenance FROM reader_profile WHERE topic = ?1",
            params![topic],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .optional()?;

    // New topics start from the neutral base weight and are tagged learned;
    // existing topics keep their provenance.
    let (base, provenance) = match existing {
        Some((weight, provenance)) => (weight, provenance),
        None => (BASE_WEIGHT, "learned".to_string()),
    };

    let weight = (base + delta).clamp(0.0, 1.0);
    upsert_topic(conn, topic, weight, &provenance)?;
    Ok(weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_table_is_symmetric_around_three() {
        assert_eq!(delta_for_rating(5).unwrap(), 0.10);
        assert_eq!(delta_for_rating(4).unwrap(), 0.05);
        assert_eq!(delta_for_rating(3).unwrap(), 0.00);
        assert_eq!(delta_for_rating(2).unwrap(), -0.05);
        assert_eq!(delta_for_rating(1).unwrap(), -0.10);
    }

    #[test]
    fn out_of_range_ratings_are_rejected() {
        assert!(delta_for_rating(0).is_err());
        assert!(delta_for_rating(6).is_err());
    }
}
