// src/config.rs
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::dataset::Aspect;
use crate::dishes::DEFAULT_DISH_THRESHOLD;
use crate::error::{RecommendError, Result};
use crate::geo::{DEFAULT_NEARBY_LIMIT, DEFAULT_RADIUS_KM};
use crate::ranker::DEFAULT_TOP_N;
use crate::recommender::{RecommenderConfig, Strategy, DEFAULT_QUANTILE};

pub const API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataPaths {
    pub restaurants: PathBuf,
    pub sentiment: PathBuf,
    pub geo: PathBuf,
    pub dishes: PathBuf,
    pub states_dir: PathBuf,
    pub feedback: PathBuf,
}

impl Default for DataPaths {
    fn default() -> Self {
        Self {
            restaurants: PathBuf::from("data/raw/TripAdvisor_RestauarantRecommendation1.csv"),
            sentiment: PathBuf::from("data/final_sentiment_df.csv"),
            geo: PathBuf::from("data/df_with_lat_lon.csv"),
            dishes: PathBuf::from("data/Food Ingredients and Recipe Dataset with Image Name Mapping.csv"),
            states_dir: PathBuf::from("data"),
            feedback: PathBuf::from("data/raw/feedback.csv"),
        }
    }
}

/// Settings shared by every subcommand, read from an optional JSON file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataPaths,
    pub top_n: usize,
    pub quantile: f64,
    pub radius_km: f64,
    pub nearby_limit: usize,
    pub aspects: Vec<Aspect>,
    pub strategy: Strategy,
    pub sort_by_rating: bool,
    pub dish_threshold: f32,
    pub google_api_key: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data: DataPaths::default(),
            top_n: DEFAULT_TOP_N,
            quantile: DEFAULT_QUANTILE,
            radius_km: DEFAULT_RADIUS_KM,
            nearby_limit: DEFAULT_NEARBY_LIMIT,
            aspects: Aspect::ALL.to_vec(),
            strategy: Strategy::Classifier,
            sort_by_rating: false,
            dish_threshold: DEFAULT_DISH_THRESHOLD,
            google_api_key: None,
        }
    }
}

impl AppConfig {
    /// Defaults, overlaid with `path` when given. The API key environment
    /// variable wins over the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = fs::read_to_string(path).map_err(|e| RecommendError::io(path, e))?;
                let parsed: AppConfig = serde_json::from_str(&text).map_err(|e| {
                    RecommendError::InvalidConfig(format!("{}: {}", path.display(), e))
                })?;
                debug!(path = %path.display(), "loaded configuration file");
                parsed
            }
            None => AppConfig::default(),
        };

        if let Ok(key) = std::env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                config.google_api_key = Some(key);
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.recommender().validate()?;
        if self.radius_km.is_nan() || self.radius_km <= 0.0 {
            return Err(RecommendError::InvalidConfig(format!(
                "radius must be positive, got {}",
                self.radius_km
            )));
        }
        if self.nearby_limit == 0 {
            return Err(RecommendError::InvalidConfig("nearby_limit must be at least 1".to_string()));
        }
        if !(0.0..=1.0).contains(&self.dish_threshold) {
            return Err(RecommendError::InvalidConfig(format!(
                "dish threshold must be between 0 and 1, got {}",
                self.dish_threshold
            )));
        }
        Ok(())
    }

    pub fn recommender(&self) -> RecommenderConfig {
        RecommenderConfig {
            top_n: self.top_n,
            quantile: self.quantile,
            aspects: self.aspects.clone(),
            strategy: self.strategy,
            sort_by_rating: self.sort_by_rating,
            ..RecommenderConfig::default()
        }
    }
}
