use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Score at or above which an article counts as relevant. Owned by the
    /// caller's configuration, read and written only through the validated
    /// accessors below.
    #[serde(default = "default_relevance_threshold")]
    relevance_threshold: f64,

    #[serde(default)]
    pub interests: Interests,
}

/// User-declared interests used to seed an empty profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Interests {
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub priorities: Priorities,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Priorities {
    #[serde(default)]
    pub high: Vec<String>,
    #[serde(default)]
    pub medium: Vec<String>,
    #[serde(default)]
    pub low: Vec<String>,
}

impl Interests {
    /// Seed weight for a topic based on its priority listing.
    pub fn seed_weight(&self, topic: &str) -> f64 {
        if self.priorities.high.iter().any(|t| t == topic) {
            0.8
        } else if self.priorities.medium.iter().any(|t| t == topic) {
            0.6
        } else if self.priorities.low.iter().any(|t| t == topic) {
            0.5
        } else {
            0.7
        }
    }
}

fn default_db_path() -> String {
    let data_dir = dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("newslens");
    std::fs::create_dir_all(&data_dir).ok();
    data_dir.join("news.db").to_string_lossy().to_string()
}

fn default_relevance_threshold() -> f64 {
    0.6
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            relevance_threshold: default_relevance_threshold(),
            interests: Interests::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            let content = std::fs::read_to_string(config_path)?;
            let config: Config = toml::from_str(&content)?;
            if !(0.0..=1.0).contains(&config.relevance_threshold) {
                return Err(AppError::Config(format!(
                    "relevance_threshold {} is outside [0.0, 1.0]",
                    config.relevance_threshold
                )));
            }
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(config_path)?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("newslens")
            .join("config.toml")
    }

    pub fn relevance_threshold(&self) -> f64 {
        self.relevance_threshold
    }

    /// Rejects values outside [0, 1] without changing anything.
    pub fn set_relevance_threshold(&mut self, threshold: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(AppError::validation(
                "relevance_threshold",
                format!("{threshold} is outside [0.0, 1.0]"),
            ));
        }
        self.relevance_threshold = threshold;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_setter_validates_range() {
        let mut config = Config::default();
        assert!(config.set_relevance_threshold(1.1).is_err());
        assert!(config.set_relevance_threshold(-0.1).is_err());
        assert_eq!(config.relevance_threshold(), 0.6);

        config.set_relevance_threshold(0.75).unwrap();
        assert_eq!(config.relevance_threshold(), 0.75);
    }

    #[test]
    fn seed_weights_follow_priority_lists() {
        let interests = Interests {
            topics: vec!["rust".into(), "golf".into(), "chess".into(), "opera".into()],
            priorities: Priorities {
                high: vec!["rust".into()],
                medium: vec!["golf".into()],
                low: vec!["chess".into()],
            },
        };
        assert_eq!(interests.seed_weight("rust"), 0.8);
        assert_eq!(interests.seed_weight("golf"), 0.6);
        assert_eq!(interests.seed_weight("chess"), 0.5);
        assert_eq!(interests.seed_weight("opera"), 0.7);
    }

    #[test]
    fn config_roundtrips_through_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.db_path = "test.db".into();
        config.set_relevance_threshold(0.4).unwrap();
        config.interests.topics = vec!["distributed systems".into()];
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.db_path, "test.db");
        assert_eq!(loaded.relevance_threshold(), 0.4);
        assert_eq!(loaded.interests.topics, vec!["distributed systems"]);
    }

    #[test]
    fn load_rejects_out_of_range_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "relevance_threshold = 2.5\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
