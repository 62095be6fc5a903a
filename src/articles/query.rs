use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use serde::{Deserialize, Serialize};

use crate::db::{article_from_row, feedback_from_row, Database};
use crate::error::Result;
use crate::models::{Article, Feedback};

pub(crate) const ARTICLE_COLUMNS: &str = "a.id, a.url, a.title, a.content, a.summary, a.deep_analysis, a.source_name, a.published_date, a.fetched_date, a.relevance_score, a.is_read, a.created_at";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadStatus {
    #[default]
    All,
    Read,
    Unread,
}

/// Which fields free-text search runs against. `All` is the union of the
/// three, OR-combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    #[default]
    All,
    Title,
    Content,
    Summary,
}

impl SearchScope {
    fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::All => &["a.title", "a.content", "a.summary"],
            Self::Title => &["a.title"],
            Self::Content => &["a.content"],
            Self::Summary => &["a.summary"],
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    RelevanceDesc,
    RelevanceAsc,
    PublishedDesc,
    PublishedAsc,
    FetchedDesc,
    FetchedAsc,
    Title,
    Source,
}

impl SortOrder {
    fn sql(&self) -> &'static str {
        match self {
            Self::RelevanceDesc => "a.relevance_score DESC NULLS LAST",
            Self::RelevanceAsc => "a.relevance_score ASC NULLS LAST",
            Self::PublishedDesc => "a.published_date DESC NULLS LAST",
            Self::PublishedAsc => "a.published_date ASC NULLS LAST",
            Self::FetchedDesc => "a.fetched_date DESC",
            Self::FetchedAsc => "a.fetched_date ASC",
            Self::Title => "a.title ASC",
            Self::Source => "a.source_name ASC, a.published_date DESC",
        }
    }
}

/// Advanced query configuration. Every filter is optional and all supplied
/// filters apply conjunctively; the default value matches the whole corpus.
///
/// Executing a query is strictly read-only; in particular it never touches
/// `is_read`; callers mark articles read explicitly.
#[derive(Debug, Clone, Default)]
pub struct ArticleQuery {
    pub read_status: ReadStatus,
    /// Case-insensitive substring match on source name. Takes precedence
    /// over `sources` when both are set.
    pub source: Option<String>,
    /// Exact source-name allow-list.
    pub sources: Option<Vec<String>>,
    /// Exact source-name deny-list, composable with the above.
    pub exclude_sources: Option<Vec<String>>,
    pub min_relevance: Option<f64>,
    pub max_relevance: Option<f64>,
    /// `Some(true)` requires a summary, `Some(false)` requires none.
    pub has_summary: Option<bool>,
    /// Published within the last N days.
    pub last_n_days: Option<i64>,
    pub published_after: Option<DateTime<Utc>>,
    pub published_before: Option<DateTime<Utc>>,
    pub fetched_after: Option<DateTime<Utc>>,
    pub fetched_before: Option<DateTime<Utc>>,
    /// Case-sensitive substring search over the fields chosen by `search_in`.
    pub search_query: Option<String>,
    pub search_in: SearchScope,
    /// Drops rows whose title or content contains this term.
    pub exclude_query: Option<String>,
    /// `Some(true)`: only articles with feedback; `Some(false)`: only without.
    pub with_feedback: Option<bool>,
    /// At least one feedback row with rating >= this value.
    pub min_rating: Option<f64>,
    /// Only articles with >= 3 feedback rows whose rating spread is >= 3.
    pub controversial: bool,
    pub sort_by: SortOrder,
    pub limit: Option<u32>,
    pub offset: u32,
    /// Attach each article's feedback rows (newest first) to the result.
    pub include_feedback: bool,
    /// Also return a source -> articles map.
    pub group_by_source: bool,
    /// Skip row materialization and return only the matching count.
    pub stats_only: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub articles: Vec<Article>,
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_source: Option<BTreeMap<String, Vec<Article>>>,
}

impl ArticleQuery {
    /// Compile the filter set to a WHERE fragment plus bound values. Values
    /// are always bound as parameters, never spliced into the SQL text.
    fn conditions(&self) -> (Vec<String>, Vec<Value>) {
        let mut conditions: Vec<String> = Vec::new();
        let mut params: Vec<Value> = Vec::new();

        match self.read_status {
            ReadStatus::All => {}
            ReadStatus::Read => conditions.push("a.is_read = 1".into()),
            ReadStatus::Unread => conditions.push("a.is_read = 0".into()),
        }

        if let Some(source) = &self.source {
            conditions.push("instr(lower(a.source_name), lower(?)) > 0".into());
            params.push(Value::from(source.clone()));
        } else if let Some(sources) = &self.sources {
            if sources.is_empty() {
                // An explicit empty allow-list matches nothing.
                conditions.push("1 = 0".into());
            } else {
                let placeholders = vec!["?"; sources.len()].join(", ");
                conditions.push(format!("a.source_name IN ({placeholders})"));
                params.extend(sources.iter().cloned().map(Value::from));
            }
        }

        if let Some(excluded) = &self.exclude_sources {
            if !excluded.is_empty() {
                let placeholders = vec!["?"; excluded.len()].join(", ");
                conditions.push(format!("a.source_name NOT IN ({placeholders})"));
                params.extend(excluded.iter().cloned().map(Value::from));
            }
        }

        if let Some(min) = self.min_relevance {
            conditions.push("a.relevance_score >= ?".into());
            params.push(Value::from(min));
        }
        if let Some(max) = self.max_relevance {
            conditions.push("a.relevance_score <= ?".into());
            params.push(Value::from(max));
        }

        if let Some(has_summary) = self.has_summary {
            if has_summary {
                conditions.push("a.summary IS NOT NULL".into());
            } else {
                conditions.push("a.summary IS NULL".into());
            }
        }

        if let Some(days) = self.last_n_days {
            conditions.push("date(a.published_date) >= date('now', ?)".into());
            params.push(Value::from(format!("-{days} days")));
        }
        if let Some(after) = self.published_after {
            conditions.push("a.published_date >= ?".into());
            params.push(Value::from(after.to_rfc3339()));
        }
        if let Some(before) = self.published_before {
            conditions.push("a.published_date <= ?".into());
            params.push(Value::from(before.to_rfc3339()));
        }
        if let Some(after) = self.fetched_after {
            conditions.push("a.fetched_date >= ?".into());
            params.push(Value::from(after.to_rfc3339()));
        }
        if let Some(before) = self.fetched_before {
            conditions.push("a.fetched_date <= ?".into());
            params.push(Value::from(before.to_rfc3339()));
        }

        if let Some(term) = &self.search_query {
            let mut matches: Vec<String> = Vec::new();
            for column in self.search_in.columns() {
                matches.push(format!("instr({column}, ?) > 0"));
                params.push(Value::from(term.clone()));
            }
            conditions.push(format!("({})", matches.join(" OR ")));
        }

        if let Some(term) = &self.exclude_query {
            conditions
                .push("(instr(a.title, ?) = 0 AND (a.content IS NULL OR instr(a.content, ?) = 0))".into());
            params.push(Value::from(term.clone()));
            params.push(Value::from(term.clone()));
        }

        // Feedback filters run as subqueries so that articles with several
        // feedback rows still come back exactly once.
        if let Some(with_feedback) = self.with_feedback {
            if with_feedback {
                conditions.push("EXISTS (SELECT 1 FROM feedback f WHERE f.article_id = a.id)".into());
            } else {
                conditions
                    .push("NOT EXISTS (SELECT 1 FROM feedback f WHERE f.article_id = a.id)".into());
            }
        }

        if let Some(min_rating) = self.min_rating {
            conditions.push(
                "EXISTS (SELECT 1 FROM feedback f WHERE f.article_id = a.id AND f.rating >= ?)"
                    .into(),
            );
            params.push(Value::from(min_rating));
        }

        if self.controversial {
            conditions.push(
                "a.id IN (SELECT article_id FROM feedback GROUP BY article_id \
                 HAVING COUNT(*) >= 3 AND MAX(rating) - MIN(rating) >= 3)"
                    .into(),
            );
        }

        (conditions, params)
    }

    fn to_count_sql(&self) -> (String, Vec<Value>) {
        let (conditions, params) = self.conditions();
        let mut sql = String::from("SELECT COUNT(*) FROM articles a");
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        (sql, params)
    }

    fn to_select_sql(&self) -> (String, Vec<Value>) {
        let (conditions, mut params) = self.conditions();
        let mut sql = format!("SELECT {ARTICLE_COLUMNS} FROM articles a");
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }

        sql.push_str(" ORDER BY ");
        sql.push_str(self.sort_by.sql());

        match (self.limit, self.offset) {
            (Some(limit), 0) => {
                sql.push_str(" LIMIT ?");
                params.push(Value::from(i64::from(limit)));
            }
            (Some(limit), offset) => {
                sql.push_str(" LIMIT ? OFFSET ?");
                params.push(Value::from(i64::from(limit)));
                params.push(Value::from(i64::from(offset)));
            }
            (None, offset) if offset > 0 => {
                // SQLite requires a LIMIT clause to use OFFSET.
                sql.push_str(" LIMIT -1 OFFSET ?");
                params.push(Value::from(i64::from(offset)));
            }
            (None, _) => {}
        }

        (sql, params)
    }
}

pub(crate) async fn execute(db: &Database, query: ArticleQuery) -> Result<QueryResult> {
    if query.stats_only {
        let (sql, params) = query.to_count_sql();
        let total = db
            .conn()
            .call(move |conn| {
                let count: i64 =
                    conn.query_row(&sql, rusqlite::params_from_iter(params), |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        return Ok(QueryResult {
            articles: Vec::new(),
            total: total as usize,
            by_source: None,
        });
    }

    let (sql, params) = query.to_select_sql();
    let include_feedback = query.include_feedback;

    let articles = db
        .conn()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut articles = stmt
                .query_map(rusqlite::params_from_iter(params), |row| {
                    Ok(article_from_row(row))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            if include_feedback && !articles.is_empty() {
                let placeholders = vec!["?"; articles.len()].join(", ");
                let mut stmt = conn.prepare(&format!(
                    "SELECT id, article_id, rating, note, created_at FROM feedback \
                     WHERE article_id IN ({placeholders}) ORDER BY created_at DESC, id DESC"
                ))?;
                let ids: Vec<Value> = articles.iter().map(|a| Value::from(a.id)).collect();
                let rows = stmt
                    .query_map(rusqlite::params_from_iter(ids), |row| {
                        Ok(feedback_from_row(row))
                    })?
                    .collect::<std::result::Result<Vec<Feedback>, _>>()?;

                let mut by_article: HashMap<i64, Vec<Feedback>> = HashMap::new();
                for feedback in rows {
                    by_article.entry(feedback.article_id).or_default().push(feedback);
                }
                for article in &mut articles {
                    if let Some(feedback) = by_article.remove(&article.id) {
                        article.feedback = feedback;
                    }
                }
            }

            Ok(articles)
        })
        .await?;

    let by_source = if query.group_by_source {
        let mut grouped: BTreeMap<String, Vec<Article>> = BTreeMap::new();
        for article in &articles {
            grouped
                .entry(article.source_name.clone())
                .or_default()
                .push(article.clone());
        }
        Some(grouped)
    } else {
        None
    };

    let total = articles.len();
    Ok(QueryResult {
        articles,
        total,
        by_source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_query_has_no_conditions() {
        let (conditions, params) = ArticleQuery::default().conditions();
        assert!(conditions.is_empty());
        assert!(params.is_empty());

        let (sql, _) = ArticleQuery::default().to_select_sql();
        assert!(!sql.contains("WHERE"));
        assert!(sql.ends_with("ORDER BY a.relevance_score DESC NULLS LAST"));
    }

    #[test]
    fn filters_are_conjunctive() {
        let query = ArticleQuery {
            read_status: ReadStatus::Unread,
            min_relevance: Some(0.5),
            has_summary: Some(true),
            ..Default::default()
        };
        let (sql, params) = query.to_select_sql();
        assert!(sql.contains("a.is_read = 0 AND a.relevance_score >= ? AND a.summary IS NOT NULL"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn source_substring_takes_precedence_over_allow_list() {
        let query = ArticleQuery {
            source: Some("verge".into()),
            sources: Some(vec!["The Verge".into()]),
            ..Default::default()
        };
        let (conditions, _) = query.conditions();
        assert_eq!(conditions.len(), 1);
        assert!(conditions[0].contains("instr(lower(a.source_name)"));
    }

    #[test]
    fn empty_allow_list_matches_nothing() {
        let query = ArticleQuery {
            sources: Some(Vec::new()),
            ..Default::default()
        };
        let (conditions, _) = query.conditions();
        assert_eq!(conditions, vec!["1 = 0".to_string()]);
    }

    #[test]
    fn search_scope_all_ors_three_fields() {
        let query = ArticleQuery {
            search_query: Some("quantum".into()),
            ..Default::default()
        };
        let (conditions, params) = query.conditions();
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].matches(" OR ").count(), 2);
        assert_eq!(params.len(), 3);

        let query = ArticleQuery {
            search_query: Some("quantum".into()),
            search_in: SearchScope::Title,
            ..Default::default()
        };
        let (conditions, params) = query.conditions();
        assert_eq!(conditions[0], "(instr(a.title, ?) > 0)");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn offset_without_limit_gets_unbounded_limit() {
        let query = ArticleQuery {
            offset: 20,
            ..Default::default()
        };
        let (sql, params) = query.to_select_sql();
        assert!(sql.ends_with("LIMIT -1 OFFSET ?"));
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn feedback_filters_use_subqueries() {
        let query = ArticleQuery {
            with_feedback: Some(true),
            min_rating: Some(4.0),
            controversial: true,
            ..Default::default()
        };
        let (sql, _) = query.to_select_sql();
        assert!(sql.contains("EXISTS (SELECT 1 FROM feedback"));
        assert!(sql.contains("HAVING COUNT(*) >= 3 AND MAX(rating) - MIN(rating) >= 3"));
        assert!(!sql.contains("JOIN"));
    }

    #[test]
    fn sort_orders_map_to_expected_sql() {
        assert_eq!(SortOrder::Title.sql(), "a.title ASC");
        assert_eq!(SortOrder::PublishedAsc.sql(), "a.published_date ASC NULLS LAST");
        assert_eq!(
            SortOrder::Source.sql(),
            "a.source_name ASC, a.published_date DESC"
        );
    }
}
