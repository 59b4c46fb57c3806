use serde::Serialize;
use tracing::{debug, warn};

use crate::boosting::{BoostingParams, GradientBoostedClassifier};
use crate::dataset::Restaurant;
use crate::error::{RecommendError, Result};
use crate::tfidf::{TfIdfBuilder, Weighting};
use crate::utils::{compute_cosine_similarity, mean, quantile};

/// Cosine similarity of the anchor's category against every restaurant's,
/// using TF-IDF weighted category terms.
pub fn category_similarity(restaurants: &[Restaurant], anchor: usize) -> Result<Vec<f64>> {
    if restaurants.len() < 2 {
        return Err(RecommendError::NotEnoughRows {
            needed: 2,
            found: restaurants.len(),
        });
    }

    let mut builder = TfIdfBuilder::new().weighting(Weighting::TfIdf);
    for restaurant in restaurants {
        builder.add(restaurant.category_text());
    }
    let model = builder.build();
    debug!(rows = model.len(), terms = model.vocab_len(), "built category matrix");

    Ok(model.similarities(anchor).into_iter().map(f64::from).collect())
}

/// Cosine similarity between rows of numeric sentiment features.
pub fn sentiment_similarity(features: &[Vec<f64>], anchor: usize) -> Result<Vec<f64>> {
    if features.len() < 2 {
        return Err(RecommendError::NotEnoughRows {
            needed: 2,
            found: features.len(),
        });
    }
    let anchor_row = &features[anchor];
    Ok(features
        .iter()
        .map(|row| compute_cosine_similarity(anchor_row, row))
        .collect())
}

/// Mean of each row's aspect values.
pub fn composite_scores(features: &[Vec<f64>]) -> Vec<f64> {
    features
        .iter()
        .map(|row| mean(row).unwrap_or(0.0))
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuantileLabels {
    pub threshold: f64,
    pub labels: Vec<bool>,
}

impl QuantileLabels {
    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l).count()
    }

    pub fn is_single_class(&self) -> bool {
        let positives = self.positives();
        positives == 0 || positives == self.labels.len()
    }
}

/// Marks rows whose composite is at or above the `q` quantile as positive.
pub fn quantile_labels(composite: &[f64], q: f64) -> Result<QuantileLabels> {
    let threshold = quantile(composite, q).ok_or_else(|| {
        RecommendError::InvalidConfig(format!("cannot take quantile {} of {} rows", q, composite.len()))
    })?;
    let labels = composite.iter().map(|&c| c >= threshold).collect();
    Ok(QuantileLabels { threshold, labels })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ScoringMethod {
    /// Scores are the classifier's positive-class probabilities.
    Classifier { threshold: f64, positives: usize },
    /// Labels came out single-class; scores are the composites.
    CompositeFallback,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SupervisedScores {
    pub method: ScoringMethod,
    pub scores: Vec<f64>,
    pub composite: Vec<f64>,
}

/// Labels rows by the composite of `label_features` at quantile `q`, fits a
/// boosted classifier on `model_features` and scores every row with it.
/// A single-class label set skips the fit and scores by composite instead.
pub fn supervised_scores(
    label_features: &[Vec<f64>],
    model_features: &[Vec<f64>],
    q: f64,
    params: &BoostingParams,
) -> Result<SupervisedScores> {
    if label_features.is_empty() {
        return Err(RecommendError::NotEnoughRows { needed: 1, found: 0 });
    }
    let composite = composite_scores(label_features);
    let labels = quantile_labels(&composite, q)?;

    if labels.is_single_class() {
        warn!(
            threshold = labels.threshold,
            rows = composite.len(),
            "labels are single-class, ranking by composite score"
        );
        return Ok(SupervisedScores {
            method: ScoringMethod::CompositeFallback,
            scores: composite.clone(),
            composite,
        });
    }

    let model = GradientBoostedClassifier::fit(model_features, &labels.labels, params)?;
    let scores = model_features.iter().map(|row| model.predict_proba(row)).collect();

    Ok(SupervisedScores {
        method: ScoringMethod::Classifier {
            threshold: labels.threshold,
            positives: labels.positives(),
        },
        scores,
        composite,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restaurant(name: &str, category: &str) -> Restaurant {
        Restaurant {
            name: name.to_string(),
            category: Some(category.to_string()).filter(|c| !c.is_empty()),
            location: String::new(),
            bubbles: None,
            rating: None,
            review_count: None,
            comment: None,
            contact: None,
            url: None,
        }
    }

    #[test]
    fn identical_categories_are_fully_similar() {
        let rows = vec![restaurant("A", "Mexican, Latin"), restaurant("B", "Mexican, Latin")];
        let sims = category_similarity(&rows, 0).unwrap();
        assert!((sims[0] - 1.0).abs() < 1e-6);
        assert!((sims[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn single_row_cannot_be_compared() {
        let rows = vec![restaurant("A", "Pizza")];
        assert!(matches!(
            category_similarity(&rows, 0),
            Err(RecommendError::NotEnoughRows { needed: 2, found: 1 })
        ));
    }

    #[test]
    fn labels_follow_the_quantile() {
        // clear gap between the lower 7 and upper 3 composites
        let composite = [0.1, 0.12, 0.15, 0.18, 0.2, 0.22, 0.25, 0.8, 0.85, 0.9];
        let labels = quantile_labels(&composite, 0.7).unwrap();
        assert_eq!(
            labels.labels,
            vec![false, false, false, false, false, false, false, true, true, true]
        );
        assert_eq!(labels.positives(), 3);
        assert!(labels.threshold > 0.25 && labels.threshold <= 0.8);
    }

    #[test]
    fn composite_equal_to_threshold_is_positive() {
        let labels = quantile_labels(&[1.0, 2.0, 3.0], 0.5).unwrap();
        assert_eq!(labels.threshold, 2.0);
        assert_eq!(labels.labels, vec![false, true, true]);

        // 0.7 of eleven evenly spaced rows lands exactly on 7.0
        let composite: Vec<f64> = (0..=10).map(f64::from).collect();
        let labels = quantile_labels(&composite, 0.7).unwrap();
        assert!((labels.threshold - 7.0).abs() < 1e-12);
        assert_eq!(labels.positives(), 4);
    }

    #[test]
    fn classifier_ranks_top_tier_first() {
        let features: Vec<Vec<f64>> = (0..10)
            .map(|i| {
                let base = if i >= 7 { 0.8 } else { 0.1 + i as f64 * 0.02 };
                vec![base, base + 0.05]
            })
            .collect();
        let result = supervised_scores(&features, &features, 0.7, &BoostingParams::default()).unwrap();
        assert!(matches!(result.method, ScoringMethod::Classifier { positives: 3, .. }));
        for i in 0..10 {
            if i >= 7 {
                assert!(result.scores[i] > 0.5);
            } else {
                assert!(result.scores[i] < 0.5);
            }
        }
    }

    #[test]
    fn equal_composites_fall_back_to_plain_sort() {
        let features = vec![vec![0.5, 0.5]; 6];
        let result = supervised_scores(&features, &features, 0.7, &BoostingParams::default()).unwrap();
        assert_eq!(result.method, ScoringMethod::CompositeFallback);
        assert_eq!(result.scores, vec![0.5; 6]);
    }

    #[test]
    fn sentiment_similarity_of_self_is_one() {
        let features = vec![vec![0.2, 0.4], vec![0.9, 0.1]];
        let sims = sentiment_similarity(&features, 1).unwrap();
        assert!((sims[1] - 1.0).abs() < 1e-9);
        assert!(sims[0] < 1.0);
    }
}
