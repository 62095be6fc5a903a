pub mod query;
pub mod tiering;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use crate::db::{article_from_row, Database};
use crate::error::{AppError, Result};
use crate::models::{Article, ArticleStub, IngestReport};

pub use query::{ArticleQuery, QueryResult, ReadStatus, SearchScope, SortOrder};
pub use tiering::{tier_articles, PresentationHint, Tier, TierCounts, TieredArticle, TieredResult};

/// Strip query string and fragment so the same article fetched with
/// different tracking parameters deduplicates to one row. Unparsable
/// input passes through unchanged.
pub fn canonicalize_url(url: &str) -> String {
    match url::Url::parse(url) {
        Ok(mut parsed) => {
            parsed.set_query(None);
            parsed.set_fragment(None);
            parsed.to_string()
        }
        Err(_) => url.to_string(),
    }
}

/// Data access for the article corpus: ingestion, analyzer write-backs,
/// read-state transitions and the advanced query surface.
#[derive(Clone)]
pub struct ArticleStore {
    db: Database,
}

impl ArticleStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Ingest a batch of article stubs in one transaction. Duplicate URLs
    /// (after canonicalization) are silently skipped and never fail the
    /// batch.
    pub async fn ingest(
        &self,
        stubs: Vec<ArticleStub>,
        fetched_at: DateTime<Utc>,
    ) -> Result<IngestReport> {
        let received = stubs.len();
        let inserted = self
            .db
            .conn()
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut inserted = 0usize;
                {
                    let mut stmt = tx.prepare(
                        "INSERT OR IGNORE INTO articles \
                         (url, title, content, source_name, published_date, fetched_date) \
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    )?;
                    for stub in stubs {
                        inserted += stmt.execute(params![
                            canonicalize_url(&stub.url),
                            stub.title,
                            stub.content,
                            stub.source_name,
                            stub.published_date.map(|dt| dt.to_rfc3339()),
                            fetched_at.to_rfc3339(),
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(inserted)
            })
            .await?;

        let report = IngestReport {
            received,
            inserted,
            duplicates: received - inserted,
        };
        tracing::debug!(
            "Ingested {} articles ({} duplicates skipped)",
            report.inserted,
            report.duplicates
        );
        Ok(report)
    }

    pub async fn get_article(&self, id: i64) -> Result<Option<Article>> {
        let article = self
            .db
            .conn()
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM articles a WHERE a.id = ?1",
                    query::ARTICLE_COLUMNS
                ))?;
                let article = stmt
                    .query_row(params![id], |row| Ok(article_from_row(row)))
                    .optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }

    /// Write-back from the external analyzer: summary plus relevance score.
    pub async fn save_analysis(&self, id: i64, summary: String, relevance_score: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&relevance_score) {
            return Err(AppError::validation(
                "relevance_score",
                format!("{relevance_score} is outside [0.0, 1.0]"),
            ));
        }

        let changed = self
            .db
            .conn()
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE articles SET summary = ?1, relevance_score = ?2 WHERE id = ?3",
                    params![summary, relevance_score, id],
                )?;
                Ok(changed)
            })
            .await?;

        if changed == 0 {
            return Err(AppError::ArticleNotFound(id));
        }
        Ok(())
    }

    pub async fn save_deep_analysis(&self, id: i64, analysis_text: String) -> Result<()> {
        if analysis_text.trim().is_empty() {
            return Err(AppError::validation(
                "analysis_text",
                "deep analysis text must not be empty",
            ));
        }

        let changed = self
            .db
            .conn()
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE articles SET deep_analysis = ?1 WHERE id = ?2",
                    params![analysis_text, id],
                )?;
                Ok(changed)
            })
            .await?;

        if changed == 0 {
            return Err(AppError::ArticleNotFound(id));
        }
        Ok(())
    }

    /// The read flag only ever moves from unread to read.
    pub async fn mark_as_read(&self, id: i64) -> Result<()> {
        let changed = self
            .db
            .conn()
            .call(move |conn| {
                let changed =
                    conn.execute("UPDATE articles SET is_read = 1 WHERE id = ?1", params![id])?;
                Ok(changed)
            })
            .await?;

        if changed == 0 {
            return Err(AppError::ArticleNotFound(id));
        }
        Ok(())
    }

    /// Returns how many articles flipped from unread to read.
    pub async fn mark_all_as_read(&self) -> Result<usize> {
        let changed = self
            .db
            .conn()
            .call(|conn| {
                let changed = conn.execute("UPDATE articles SET is_read = 1 WHERE is_read = 0", [])?;
                Ok(changed)
            })
            .await?;
        Ok(changed)
    }

    /// Articles the external analyzer still has to process: missing either
    /// a summary or a relevance score, newest fetched first.
    pub async fn unanalyzed(&self) -> Result<Vec<Article>> {
        let articles = self
            .db
            .conn()
            .call(|conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM articles a \
                     WHERE a.summary IS NULL OR a.relevance_score IS NULL \
                     ORDER BY a.fetched_date DESC",
                    query::ARTICLE_COLUMNS
                ))?;
                let articles = stmt
                    .query_map([], |row| Ok(article_from_row(row)))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    /// Retention sweep: drop articles fetched more than `days` ago, along
    /// with their feedback rows. Returns the number of articles removed.
    pub async fn cleanup_old_articles(&self, days: u32) -> Result<usize> {
        let modifier = format!("-{days} days");
        let removed = self
            .db
            .conn()
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "DELETE FROM feedback WHERE article_id IN \
                     (SELECT id FROM articles WHERE date(fetched_date) < date('now', ?1))",
                    params![modifier],
                )?;
                let removed = tx.execute(
                    "DELETE FROM articles WHERE date(fetched_date) < date('now', ?1)",
                    params![modifier],
                )?;
                tx.commit()?;
                Ok(removed)
            })
            .await?;
        Ok(removed)
    }

    /// Run an advanced query. Read-only: never mutates read state.
    pub async fn query(&self, query: ArticleQuery) -> Result<QueryResult> {
        query::execute(&self.db, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonicalize_strips_query_and_fragment() {
        assert_eq!(
            canonicalize_url("https://example.com/article?utm_source=feed&token=123#comments"),
            "https://example.com/article"
        );
    }

    #[test]
    fn canonicalize_keeps_path_and_host() {
        assert_eq!(
            canonicalize_url("https://news.example.com/tech/story-42"),
            "https://news.example.com/tech/story-42"
        );
    }

    #[test]
    fn canonicalize_passes_unparsable_input_through() {
        assert_eq!(canonicalize_url("not a url"), "not a url");
    }
}
