use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("article {0} not found")]
    ArticleNotFound(i64),

    #[error("invalid {field}: {message}")]
    Validation { field: &'static str, message: String },

    #[error("database error: {0}")]
    Database(#[from] tokio_rusqlite::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl AppError {
    pub(crate) fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
