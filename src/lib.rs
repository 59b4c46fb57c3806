//! Restaurant recommendations over small in-memory tables: category
//! similarity, sentiment ranking, proximity search and a feedback log.

pub mod boosting;
pub mod config;
pub mod dashboard;
pub mod dataset;
pub mod dishes;
pub mod error;
pub mod feedback;
pub mod geo;
pub mod insights;
pub mod presenter;
pub mod ranker;
pub mod rating;
pub mod recommender;
pub mod scoring;
pub mod states;
pub mod tfidf;
pub mod utils;

pub use error::{RecommendError, Result};
