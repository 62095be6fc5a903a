use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::Serialize;

use crate::db::{feedback_from_row, parse_datetime, Database};
use crate::error::{AppError, Result};
use crate::models::Feedback;

/// Sources need at least this many ratings before their average counts.
const SOURCE_PREFERENCE_FLOOR: i64 = 2;
/// Normalized rating vs. score gap beyond which a pair is a discrepancy.
const DISCREPANCY_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct FeedbackStats {
    pub total_feedback: i64,
    pub avg_rating: f64,
    pub positive_count: i64,
    pub negative_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourcePreference {
    pub source: String,
    pub avg_rating: f64,
    pub feedback_count: i64,
}

/// Recent feedback joined with the rated article, for review surfaces.
#[derive(Debug, Clone, Serialize)]
pub struct RecentFeedback {
    pub title: String,
    pub source: String,
    pub rating: i32,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Divergence between automated relevance scores and human ratings,
/// measured over feedback rows whose article carries a score.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AiAccuracy {
    pub total_discrepancies: i64,
    pub accuracy_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LearningStats {
    pub total_feedback_given: i64,
    pub average_rating: f64,
    pub positive_feedback: i64,
    pub negative_feedback: i64,
    pub current_threshold: f64,
    pub source_preferences: BTreeMap<String, f64>,
    pub ai_accuracy: AiAccuracy,
}

#[derive(Debug, Clone, Serialize)]
pub struct CorpusStats {
    pub total_articles: i64,
    pub unread_count: i64,
    pub relevant_count: i64,
    pub total_feedback: i64,
    pub avg_rating: f64,
    pub source_count: i64,
    pub articles_by_source: BTreeMap<String, i64>,
}

/// Records ratings and aggregates them into preference and accuracy views.
#[derive(Clone)]
pub struct FeedbackManager {
    db: Database,
}

impl FeedbackManager {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a rating for an article. The rating is validated and the
    /// article's existence checked before anything is written.
    pub async fn add_feedback(
        &self,
        article_id: i64,
        rating: i32,
        note: Option<String>,
    ) -> Result<i64> {
        if !(1..=5).contains(&rating) {
            return Err(AppError::validation(
                "rating",
                format!("{rating} is outside 1..=5"),
            ));
        }

        let id = self
            .db
            .conn()
            .call(move |conn| {
                let tx = conn.transaction()?;
                let exists: i64 = tx.query_row(
                    "SELECT COUNT(*) FROM articles WHERE id = ?1",
                    params![article_id],
                    |row| row.get(0),
                )?;
                if exists == 0 {
                    return Ok(None);
                }
                tx.execute(
                    "INSERT INTO feedback (article_id, rating, note, created_at) \
                     VALUES (?1, ?2, ?3, ?4)",
                    params![article_id, rating, note, Utc::now().to_rfc3339()],
                )?;
                let id = tx.last_insert_rowid();
                tx.commit()?;
                Ok(Some(id))
            })
            .await?;

        id.ok_or(AppError::ArticleNotFound(article_id))
    }

    /// All feedback for one article, newest first.
    pub async fn article_feedback(&self, article_id: i64) -> Result<Vec<Feedback>> {
        let feedback = self
            .db
            .conn()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, article_id, rating, note, created_at FROM feedback \
                     WHERE article_id = ?1 ORDER BY created_at DESC, id DESC",
                )?;
                let feedback = stmt
                    .query_map(params![article_id], |row| Ok(feedback_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(feedback)
            })
            .await?;
        Ok(feedback)
    }

    /// Recent feedback with article context, newest first.
    pub async fn recent_feedback(&self, limit: u32) -> Result<Vec<RecentFeedback>> {
        let feedback = self
            .db
            .conn()
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT a.title, a.source_name, f.rating, f.note, f.created_at \
                     FROM feedback f JOIN articles a ON f.article_id = a.id \
                     ORDER BY f.created_at DESC, f.id DESC LIMIT ?1",
                )?;
                let feedback = stmt
                    .query_map(params![limit], |row| {
                        Ok(RecentFeedback {
                            title: row.get(0)?,
                            source: row.get(1)?,
                            rating: row.get(2)?,
                            note: row.get(3)?,
                            created_at: row
                                .get::<_, String>(4)
                                .ok()
                                .and_then(|s| parse_datetime(&s))
                                .unwrap_or_else(Utc::now),
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(feedback)
            })
            .await?;
        Ok(feedback)
    }

    pub async fn feedback_stats(&self) -> Result<FeedbackStats> {
        let stats = self
            .db
            .conn()
            .call(|conn| {
                let stats = conn.query_row(
                    "SELECT COUNT(*), COALESCE(AVG(rating), 0.0), \
                     COALESCE(SUM(CASE WHEN rating >= 4 THEN 1 ELSE 0 END), 0), \
                     COALESCE(SUM(CASE WHEN rating <= 2 THEN 1 ELSE 0 END), 0) \
                     FROM feedback",
                    [],
                    |row| {
                        Ok(FeedbackStats {
                            total_feedback: row.get(0)?,
                            avg_rating: row.get(1)?,
                            positive_count: row.get(2)?,
                            negative_count: row.get(3)?,
                        })
                    },
                )?;
                Ok(stats)
            })
            .await?;
        Ok(stats)
    }

    /// Mean rating per source, restricted to sources with at least two
    /// feedback rows so a single rating cannot dominate.
    pub async fn source_preferences(&self) -> Result<Vec<SourcePreference>> {
        let preferences = self
            .db
            .conn()
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT a.source_name, AVG(f.rating), COUNT(*) AS feedback_count \
                     FROM feedback f JOIN articles a ON f.article_id = a.id \
                     GROUP BY a.source_name \
                     HAVING feedback_count >= ?1 \
                     ORDER BY AVG(f.rating) DESC",
                )?;
                let preferences = stmt
                    .query_map(params![SOURCE_PREFERENCE_FLOOR], |row| {
                        Ok(SourcePreference {
                            source: row.get(0)?,
                            avg_rating: row.get(1)?,
                            feedback_count: row.get(2)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(preferences)
            })
            .await?;
        Ok(preferences)
    }

    /// Learning progress report: aggregate feedback, per-source preference
    /// and how often the automated score disagrees with the human rating.
    pub async fn learning_stats(&self, current_threshold: f64) -> Result<LearningStats> {
        let stats = self.feedback_stats().await?;
        let preferences = self.source_preferences().await?;
        let accuracy = self.ai_accuracy().await?;

        Ok(LearningStats {
            total_feedback_given: stats.total_feedback,
            average_rating: stats.avg_rating,
            positive_feedback: stats.positive_count,
            negative_feedback: stats.negative_count,
            current_threshold,
            source_preferences: preferences
                .into_iter()
                .map(|p| (p.source, p.avg_rating))
                .collect(),
            ai_accuracy: accuracy,
        })
    }

    /// A feedback/article pair is a discrepancy when the stored score and
    /// the normalized rating (rating / 5) differ by more than 0.3. With no
    /// scored, rated articles at all, accuracy reads 1.0.
    pub async fn ai_accuracy(&self) -> Result<AiAccuracy> {
        let (total, discrepancies) = self
            .db
            .conn()
            .call(|conn| {
                let total: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM feedback f \
                     JOIN articles a ON f.article_id = a.id \
                     WHERE a.relevance_score IS NOT NULL",
                    [],
                    |row| row.get(0),
                )?;
                let discrepancies: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM feedback f \
                     JOIN articles a ON f.article_id = a.id \
                     WHERE a.relevance_score IS NOT NULL \
                     AND ABS(a.relevance_score - (f.rating / 5.0)) > ?1",
                    params![DISCREPANCY_THRESHOLD],
                    |row| row.get(0),
                )?;
                Ok((total, discrepancies))
            })
            .await?;

        let accuracy_rate = if total == 0 {
            1.0
        } else {
            1.0 - (discrepancies as f64 / total as f64)
        };
        Ok(AiAccuracy {
            total_discrepancies: discrepancies,
            accuracy_rate,
        })
    }

    /// Corpus-wide counters for status surfaces. `threshold` decides which
    /// articles count as relevant.
    pub async fn corpus_stats(&self, threshold: f64) -> Result<CorpusStats> {
        let stats = self
            .db
            .conn()
            .call(move |conn| {
                let (total_articles, unread_count, relevant_count) = conn.query_row(
                    "SELECT COUNT(*), \
                     COALESCE(SUM(CASE WHEN is_read = 0 THEN 1 ELSE 0 END), 0), \
                     COALESCE(SUM(CASE WHEN relevance_score >= ?1 THEN 1 ELSE 0 END), 0) \
                     FROM articles",
                    params![threshold],
                    |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
                )?;

                let (total_feedback, avg_rating) = conn.query_row(
                    "SELECT COUNT(*), COALESCE(AVG(rating), 0.0) FROM feedback",
                    [],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;

                let source_count: i64 = conn.query_row(
                    "SELECT COUNT(DISTINCT source_name) FROM articles",
                    [],
                    |row| row.get(0),
                )?;

                let mut stmt = conn.prepare(
                    "SELECT source_name, COUNT(*) FROM articles \
                     GROUP BY source_name ORDER BY COUNT(*) DESC",
                )?;
                let articles_by_source = stmt
                    .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                    .collect::<std::result::Result<BTreeMap<_, _>, _>>()?;

                Ok(CorpusStats {
                    total_articles,
                    unread_count,
                    relevant_count,
                    total_feedback,
                    avg_rating,
                    source_count,
                    articles_by_source,
                })
            })
            .await?;
        Ok(stats)
    }
}
