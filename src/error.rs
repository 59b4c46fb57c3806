use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RecommendError>;

#[derive(Debug, Error)]
pub enum RecommendError {
    #[error("could not read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed table {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} is missing required column '{column}'")]
    MissingColumn { path: PathBuf, column: String },

    #[error("'{0}' isn't available for similarity right now, please pick another restaurant")]
    AnchorNotFound(String),

    #[error("not enough data: need at least {needed} rows, found {found}")]
    NotEnoughRows { needed: usize, found: usize },

    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),

    #[error("please enter a comment before submitting")]
    EmptyComment,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("geocoding failed: {0}")]
    Geocoding(String),

    #[error("select at least one aspect")]
    NoFeatures,
}

impl RecommendError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        Self::Csv {
            path: path.into(),
            source,
        }
    }
}
