use serde::{Deserialize, Serialize};

use crate::models::Article;

/// Minimum effective score granted to articles carrying a deep analysis.
const DEEP_ANALYSIS_FLOOR: f64 = 0.75;
const HIGH_THRESHOLD: f64 = 0.7;
const MEDIUM_THRESHOLD: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationHint {
    Full,
    Compact,
    Minimal,
}

impl Tier {
    pub fn for_score(score: f64) -> Self {
        if score >= HIGH_THRESHOLD {
            Self::High
        } else if score >= MEDIUM_THRESHOLD {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn presentation_hint(&self) -> PresentationHint {
        match self {
            Self::High => PresentationHint::Full,
            Self::Medium => PresentationHint::Compact,
            Self::Low => PresentationHint::Minimal,
        }
    }
}

/// An article annotated with its derived presentation classification.
#[derive(Debug, Clone, Serialize)]
pub struct TieredArticle {
    #[serde(flatten)]
    pub article: Article,
    pub tier: Tier,
    pub presentation_hint: PresentationHint,
    pub has_deep_analysis: bool,
    /// Stored score (missing -> 0.0) after the deep-analysis floor.
    pub effective_score: f64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TierCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Tier view over a query result: the flat list plus the three tier lists.
/// The tiers are an exact partition of `articles`; classification never
/// drops a row.
#[derive(Debug, Clone, Serialize)]
pub struct TieredResult {
    pub articles: Vec<Article>,
    pub high: Vec<TieredArticle>,
    pub medium: Vec<TieredArticle>,
    pub low: Vec<TieredArticle>,
    pub tier_counts: TierCounts,
    pub total: usize,
}

/// Effective score used for tiering: articles carrying a deep analysis are
/// floored at 0.75 regardless of their stored score.
pub fn effective_score(article: &Article) -> f64 {
    let score = article.relevance_score.unwrap_or(0.0);
    if article.has_deep_analysis() {
        score.max(DEEP_ANALYSIS_FLOOR)
    } else {
        score
    }
}

pub fn classify(article: &Article) -> TieredArticle {
    let effective = effective_score(article);
    let tier = Tier::for_score(effective);
    TieredArticle {
        has_deep_analysis: article.has_deep_analysis(),
        effective_score: effective,
        tier,
        presentation_hint: tier.presentation_hint(),
        article: article.clone(),
    }
}

/// Partition a list of scored articles into the three presentation tiers.
/// Pure annotation pass: no I/O, input order preserved within each tier.
pub fn tier_articles(articles: Vec<Article>) -> TieredResult {
    let mut high = Vec::new();
    let mut medium = Vec::new();
    let mut low = Vec::new();

    for article in &articles {
        let tiered = classify(article);
        match tiered.tier {
            Tier::High => high.push(tiered),
            Tier::Medium => medium.push(tiered),
            Tier::Low => low.push(tiered),
        }
    }

    let tier_counts = TierCounts {
        high: high.len(),
        medium: medium.len(),
        low: low.len(),
    };
    let total = articles.len();

    TieredResult {
        articles,
        high,
        medium,
        low,
        tier_counts,
        total,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn article(id: i64, score: Option<f64>, deep_analysis: Option<&str>) -> Article {
        Article {
            id,
            url: format!("https://example.com/{id}"),
            title: format!("Article {id}"),
            content: None,
            summary: None,
            deep_analysis: deep_analysis.map(String::from),
            source_name: "Test Source".into(),
            published_date: None,
            fetched_date: Utc::now(),
            relevance_score: score,
            is_read: false,
            created_at: Utc::now(),
            feedback: Vec::new(),
        }
    }

    #[test]
    fn boundary_scores_land_in_expected_tiers() {
        assert_eq!(Tier::for_score(0.7), Tier::High);
        assert_eq!(Tier::for_score(0.699), Tier::Medium);
        assert_eq!(Tier::for_score(0.4), Tier::Medium);
        assert_eq!(Tier::for_score(0.399), Tier::Low);
        assert_eq!(Tier::for_score(0.0), Tier::Low);
        assert_eq!(Tier::for_score(1.0), Tier::High);
    }

    #[test]
    fn tiers_partition_the_input_exactly() {
        let articles = vec![
            article(1, Some(0.9), None),
            article(2, Some(0.7), None),
            article(3, Some(0.5), None),
            article(4, Some(0.4), None),
            article(5, Some(0.1), None),
            article(6, None, None),
        ];
        let result = tier_articles(articles);

        assert_eq!(result.total, 6);
        assert_eq!(result.tier_counts.high, 2);
        assert_eq!(result.tier_counts.medium, 2);
        assert_eq!(result.tier_counts.low, 2);

        let mut ids: Vec<i64> = result
            .high
            .iter()
            .chain(&result.medium)
            .chain(&result.low)
            .map(|t| t.article.id)
            .collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn deep_analysis_floors_low_scores_into_high() {
        let result = tier_articles(vec![article(1, Some(0.2), Some("long analysis text"))]);
        assert_eq!(result.tier_counts.high, 1);
        let tiered = &result.high[0];
        assert!(tiered.has_deep_analysis);
        assert_eq!(tiered.effective_score, 0.75);
        assert_eq!(tiered.presentation_hint, PresentationHint::Full);
    }

    #[test]
    fn deep_analysis_floor_never_lowers_a_score() {
        let result = tier_articles(vec![article(1, Some(0.9), Some("analysis"))]);
        assert_eq!(result.high[0].effective_score, 0.9);
    }

    #[test]
    fn blank_deep_analysis_gets_no_floor() {
        let result = tier_articles(vec![article(1, Some(0.2), Some("   "))]);
        assert_eq!(result.tier_counts.low, 1);
        assert!(!result.low[0].has_deep_analysis);
    }

    #[test]
    fn unscored_article_without_analysis_is_low() {
        let result = tier_articles(vec![article(1, None, None)]);
        assert_eq!(result.tier_counts.low, 1);
        assert_eq!(result.low[0].effective_score, 0.0);
        assert_eq!(result.low[0].presentation_hint, PresentationHint::Minimal);
    }
}
