mod schema;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use tokio_rusqlite::Connection;

use crate::error::Result;
use crate::models::{Article, Feedback, ProfileTopic, TopicProvenance};

use schema::SCHEMA;

/// Shared handle to the SQLite store. Cloning is cheap; all clones talk to
/// the same connection actor, so every operation sees the latest committed
/// state.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    pub async fn open(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;
        Self::init(conn).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::init(conn).await
    }

    async fn init(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

pub(crate) fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    // Try RFC3339 first (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Try SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    None
}

/// Column order must match `ARTICLE_COLUMNS` in the query module.
pub(crate) fn article_from_row(row: &Row) -> Article {
    Article {
        id: row.get(0).unwrap(),
        url: row.get(1).unwrap(),
        title: row.get(2).unwrap(),
        content: row.get(3).unwrap(),
        summary: row.get(4).unwrap(),
        deep_analysis: row.get(5).unwrap(),
        source_name: row.get(6).unwrap(),
        published_date: row
            .get::<_, Option<String>>(7)
            .unwrap()
            .and_then(|s| parse_datetime(&s)),
        fetched_date: row
            .get::<_, String>(8)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        relevance_score: row.get(9).unwrap(),
        is_read: row.get::<_, i64>(10).unwrap() != 0,
        created_at: row
            .get::<_, String>(11)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
        feedback: Vec::new(),
    }
}

pub(crate) fn feedback_from_row(row: &Row) -> Feedback {
    Feedback {
        id: row.get(0).unwrap(),
        article_id: row.get(1).unwrap(),
        rating: row.get(2).unwrap(),
        note: row.get(3).unwrap(),
        created_at: row
            .get::<_, String>(4)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    }
}

pub(crate) fn topic_from_row(row: &Row) -> ProfileTopic {
    ProfileTopic {
        topic: row.get(0).unwrap(),
        weight: row.get(1).unwrap(),
        provenance: TopicProvenance::parse(&row.get::<_, String>(2).unwrap()),
        sample_count: row.get(3).unwrap(),
        last_updated: row
            .get::<_, String>(4)
            .ok()
            .and_then(|s| parse_datetime(&s))
            .unwrap_or_else(Utc::now),
    }
}
