use serde::Serialize;

use crate::articles::{tier_articles, ArticleQuery, ArticleStore, TieredResult};
use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::feedback::{CorpusStats, FeedbackManager, LearningStats};
use crate::profile::{ProfileManager, TopicAdjustment};

/// Result of recording a rating: the stored feedback row plus whatever the
/// learning loop adjusted. `adjustments` is empty when the article's text
/// matched no profile topic.
#[derive(Debug, Clone, Serialize)]
pub struct RatingOutcome {
    pub feedback_id: i64,
    pub adjustments: Vec<TopicAdjustment>,
}

/// Process-wide wiring: one store, one manager per concern, constructed
/// once and passed around explicitly.
pub struct Engine {
    config: Config,
    pub articles: ArticleStore,
    pub profile: ProfileManager,
    pub feedback: FeedbackManager,
}

impl Engine {
    /// Open the store named by the config and seed the profile from the
    /// configured interests if it is empty.
    pub async fn open(config: Config) -> Result<Self> {
        let db = Database::open(&config.db_path).await?;
        Self::with_database(config, db).await
    }

    /// Same as [`Engine::open`] but over an existing database handle
    /// (in-memory stores, tests).
    pub async fn with_database(config: Config, db: Database) -> Result<Self> {
        let profile = ProfileManager::new(db.clone());
        profile.seed_from_interests(&config.interests).await?;

        Ok(Self {
            articles: ArticleStore::new(db.clone()),
            feedback: FeedbackManager::new(db),
            profile,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn relevance_threshold(&self) -> f64 {
        self.config.relevance_threshold()
    }

    /// Validated in-memory update; persist with `config().save()` if the
    /// caller owns a config file.
    pub fn set_relevance_threshold(&mut self, threshold: f64) -> Result<()> {
        self.config.set_relevance_threshold(threshold)
    }

    /// Record a rating, then run the learning loop over the rated article.
    pub async fn rate_article(
        &self,
        article_id: i64,
        rating: i32,
        note: Option<String>,
    ) -> Result<RatingOutcome> {
        let feedback_id = self.feedback.add_feedback(article_id, rating, note).await?;
        let adjustments = self.profile.learn_from_feedback(article_id, rating).await?;
        Ok(RatingOutcome {
            feedback_id,
            adjustments,
        })
    }

    /// Run a query and classify the matches into presentation tiers.
    pub async fn tiered_query(&self, query: ArticleQuery) -> Result<TieredResult> {
        let result = self.articles.query(query).await?;
        Ok(tier_articles(result.articles))
    }

    pub async fn learning_stats(&self) -> Result<LearningStats> {
        self.feedback
            .learning_stats(self.config.relevance_threshold())
            .await
    }

    pub async fn corpus_stats(&self) -> Result<CorpusStats> {
        self.feedback
            .corpus_stats(self.config.relevance_threshold())
            .await
    }
}
