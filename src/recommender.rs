// src/recommender.rs
//! One parameterized recommender over both feature sources.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::boosting::BoostingParams;
use crate::dataset::{Aspect, Restaurant, SentimentRecord};
use crate::error::{RecommendError, Result};
use crate::ranker::{self, RankMode, Scored, DEFAULT_TOP_N};
use crate::scoring::{self, ScoringMethod};

pub const DEFAULT_QUANTILE: f64 = 0.70;
pub const QUANTILE_BAND: (f64, f64) = (0.50, 0.90);

/// How restaurants are ranked when there is no anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Descending sort by the selected aspects, first aspect first.
    AspectSort,
    /// Composite-quantile labels plus a boosted classifier.
    Classifier,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommenderConfig {
    pub top_n: usize,
    pub quantile: f64,
    pub aspects: Vec<Aspect>,
    pub strategy: Strategy,
    /// Re-sort content-similarity results by rating for display. Off by
    /// default, which keeps results in descending similarity.
    pub sort_by_rating: bool,
    pub boosting: BoostingParams,
}

impl Default for RecommenderConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            quantile: DEFAULT_QUANTILE,
            aspects: Aspect::ALL.to_vec(),
            strategy: Strategy::Classifier,
            sort_by_rating: false,
            boosting: BoostingParams::default(),
        }
    }
}

impl RecommenderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(RecommendError::InvalidConfig("top_n must be at least 1".to_string()));
        }
        let (lo, hi) = QUANTILE_BAND;
        if !(lo..=hi).contains(&self.quantile) {
            return Err(RecommendError::InvalidConfig(format!(
                "quantile must be between {} and {}, got {}",
                lo, hi, self.quantile
            )));
        }
        Ok(())
    }
}

/// A ranked row borrowed from the working set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranked<'a, T> {
    pub item: &'a T,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum RankingMethod {
    AspectSort,
    Classifier { threshold: f64, positives: usize },
    CompositeFallback,
}

impl From<ScoringMethod> for RankingMethod {
    fn from(method: ScoringMethod) -> Self {
        match method {
            ScoringMethod::Classifier { threshold, positives } => {
                RankingMethod::Classifier { threshold, positives }
            }
            ScoringMethod::CompositeFallback => RankingMethod::CompositeFallback,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentRanking<'a> {
    pub method: RankingMethod,
    pub results: Vec<Ranked<'a, SentimentRecord>>,
}

pub struct Recommender {
    config: RecommenderConfig,
}

impl Recommender {
    pub fn new(config: RecommenderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    /// Top-N restaurants whose categories are most like `anchor`'s. The
    /// anchor itself is never part of the result.
    pub fn similar_restaurants<'a>(
        &self,
        restaurants: &'a [Restaurant],
        anchor: &str,
    ) -> Result<Vec<Ranked<'a, Restaurant>>> {
        let anchor_index = restaurants
            .iter()
            .position(|r| r.name == anchor)
            .ok_or_else(|| RecommendError::AnchorNotFound(anchor.to_string()))?;

        let scores = scoring::category_similarity(restaurants, anchor_index)?;
        let mut ranked = ranker::rank(&scores, RankMode::ExcludeAnchor(anchor_index), self.config.top_n);
        if self.config.sort_by_rating {
            ranker::refine_by_quality(&mut ranked, |i| restaurants[i].rating);
        }

        info!(anchor, results = ranked.len(), "computed similar restaurants");
        Ok(borrow_ranked(restaurants, &ranked))
    }

    /// Top-N restaurants whose selected aspect scores point the same way as
    /// `anchor`'s. Rows missing any selected aspect are left out.
    pub fn similar_by_sentiment<'a>(
        &self,
        records: &'a [SentimentRecord],
        anchor: &str,
    ) -> Result<Vec<Ranked<'a, SentimentRecord>>> {
        let (rows, features) = self.complete_rows(records, &self.config.aspects)?;
        let anchor_index = rows
            .iter()
            .position(|r| r.name == anchor)
            .ok_or_else(|| RecommendError::AnchorNotFound(anchor.to_string()))?;

        let scores = scoring::sentiment_similarity(&features, anchor_index)?;
        let ranked = ranker::rank(&scores, RankMode::ExcludeAnchor(anchor_index), self.config.top_n);
        Ok(ranked
            .into_iter()
            .map(|s| Ranked {
                item: rows[s.index],
                score: s.score,
            })
            .collect())
    }

    /// Ranks every restaurant of the sentiment table by the configured
    /// strategy.
    pub fn rank_by_sentiment<'a>(&self, records: &'a [SentimentRecord]) -> Result<SentimentRanking<'a>> {
        match self.config.strategy {
            Strategy::AspectSort => {
                // a plain sort needs no complete rows; missing scores go last
                if self.config.aspects.is_empty() {
                    return Err(RecommendError::NoFeatures);
                }
                if records.is_empty() {
                    return Err(RecommendError::NotEnoughRows { needed: 1, found: 0 });
                }
                let keys: Vec<Vec<Option<f64>>> = records
                    .iter()
                    .map(|r| self.config.aspects.iter().map(|a| r.aspect(*a)).collect())
                    .collect();
                let order = ranker::rank_lexicographic(&keys, self.config.top_n);
                let results = order
                    .into_iter()
                    .map(|i| Ranked {
                        item: &records[i],
                        score: keys[i][0].unwrap_or(f64::NAN),
                    })
                    .collect();
                Ok(SentimentRanking {
                    method: RankingMethod::AspectSort,
                    results,
                })
            }
            Strategy::Classifier => {
                // labels come from the selected aspects, the model sees all of them
                let (rows, model_features) = self.complete_rows(records, &Aspect::ALL)?;
                let label_features: Vec<Vec<f64>> = rows
                    .iter()
                    .filter_map(|r| r.features(&self.config.aspects))
                    .collect();

                let supervised = scoring::supervised_scores(
                    &label_features,
                    &model_features,
                    self.config.quantile,
                    &self.config.boosting,
                )?;
                let ranked = ranker::rank_with_tiebreak(
                    &supervised.scores,
                    Some(&supervised.composite),
                    RankMode::All,
                    self.config.top_n,
                );
                Ok(SentimentRanking {
                    method: supervised.method.into(),
                    results: ranked
                        .into_iter()
                        .map(|s| Ranked {
                            item: rows[s.index],
                            score: s.score,
                        })
                        .collect(),
                })
            }
        }
    }

    fn complete_rows<'a>(
        &self,
        records: &'a [SentimentRecord],
        aspects: &[Aspect],
    ) -> Result<(Vec<&'a SentimentRecord>, Vec<Vec<f64>>)> {
        if self.config.aspects.is_empty() || aspects.is_empty() {
            return Err(RecommendError::NoFeatures);
        }
        let (rows, features): (Vec<&SentimentRecord>, Vec<Vec<f64>>) = records
            .iter()
            .filter_map(|r| r.features(aspects).map(|f| (r, f)))
            .unzip();
        if rows.len() != records.len() {
            debug!(
                dropped = records.len() - rows.len(),
                "dropped rows with missing aspect scores"
            );
        }
        if rows.is_empty() {
            return Err(RecommendError::NotEnoughRows { needed: 1, found: 0 });
        }
        Ok((rows, features))
    }
}

fn borrow_ranked<'a, T>(items: &'a [T], ranked: &[Scored]) -> Vec<Ranked<'a, T>> {
    ranked
        .iter()
        .map(|s| Ranked {
            item: &items[s.index],
            score: s.score,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restaurant(name: &str, category: &str, rating: Option<f32>) -> Restaurant {
        Restaurant {
            name: name.to_string(),
            category: Some(category.to_string()),
            location: String::new(),
            bubbles: None,
            rating,
            review_count: None,
            comment: None,
            contact: None,
            url: None,
        }
    }

    fn sentiment(name: &str, values: [Option<f64>; 4]) -> SentimentRecord {
        SentimentRecord {
            name: name.to_string(),
            url: None,
            food: values[0],
            price: values[1],
            service: values[2],
            ambiance: values[3],
        }
    }

    fn recommender(config: RecommenderConfig) -> Recommender {
        Recommender::new(config).unwrap()
    }

    #[test]
    fn quantile_outside_band_is_rejected() {
        let config = RecommenderConfig {
            quantile: 0.95,
            ..Default::default()
        };
        assert!(matches!(Recommender::new(config), Err(RecommendError::InvalidConfig(_))));
        let config = RecommenderConfig {
            top_n: 0,
            ..Default::default()
        };
        assert!(Recommender::new(config).is_err());
    }

    #[test]
    fn unknown_anchor_is_reported() {
        let rows = vec![restaurant("A", "Pizza", None), restaurant("B", "Pizza", None)];
        let err = recommender(Default::default())
            .similar_restaurants(&rows, "Z")
            .unwrap_err();
        assert!(matches!(err, RecommendError::AnchorNotFound(name) if name == "Z"));
    }

    #[test]
    fn default_config_keeps_descending_similarity() {
        let rows = vec![
            restaurant("Anchor", "Thai, Asian", None),
            restaurant("Close", "Thai, Asian", Some(4.0)),
            restaurant("Partial", "Asian, Noodles", Some(5.0)),
        ];
        let results = recommender(Default::default())
            .similar_restaurants(&rows, "Anchor")
            .unwrap();
        let names: Vec<&str> = results.iter().map(|r| r.item.name.as_str()).collect();
        assert_eq!(names, vec!["Close", "Partial"]);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn rating_refinement_reorders_results() {
        let rows = vec![
            restaurant("Anchor", "Thai, Asian", None),
            restaurant("Close", "Thai, Asian", Some(4.0)),
            restaurant("Partial", "Asian, Noodles", Some(5.0)),
        ];
        let plain = recommender(Default::default())
            .similar_restaurants(&rows, "Anchor")
            .unwrap();
        let names: Vec<&str> = plain.iter().map(|r| r.item.name.as_str()).collect();
        assert_eq!(names, vec!["Close", "Partial"]);

        let refined = recommender(RecommenderConfig {
            sort_by_rating: true,
            ..Default::default()
        })
        .similar_restaurants(&rows, "Anchor")
        .unwrap();
        let names: Vec<&str> = refined.iter().map(|r| r.item.name.as_str()).collect();
        assert_eq!(names, vec!["Partial", "Close"]);
    }

    #[test]
    fn aspect_sort_orders_by_selected_aspects() {
        let rows = vec![
            sentiment("A", [Some(0.5), Some(0.9), None, None]),
            sentiment("B", [Some(0.9), Some(0.1), None, None]),
            sentiment("C", [Some(0.5), Some(0.95), None, None]),
            sentiment("D", [None, Some(1.0), None, None]),
        ];
        let ranking = recommender(RecommenderConfig {
            aspects: vec![Aspect::Food, Aspect::Price],
            strategy: Strategy::AspectSort,
            ..Default::default()
        })
        .rank_by_sentiment(&rows)
        .unwrap();
        let names: Vec<&str> = ranking.results.iter().map(|r| r.item.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C", "A", "D"]);
        assert_eq!(ranking.method, RankingMethod::AspectSort);
        assert!(ranking.results[3].score.is_nan());
    }

    #[test]
    fn empty_aspect_selection_is_an_error() {
        let rows = vec![sentiment("A", [Some(0.5); 4])];
        let err = recommender(RecommenderConfig {
            aspects: vec![],
            ..Default::default()
        })
        .rank_by_sentiment(&rows)
        .unwrap_err();
        assert!(matches!(err, RecommendError::NoFeatures));
    }

    #[test]
    fn classifier_strategy_falls_back_on_flat_data() {
        let rows: Vec<SentimentRecord> = (0..5)
            .map(|i| sentiment(&format!("R{}", i), [Some(0.4); 4]))
            .collect();
        let ranking = recommender(Default::default()).rank_by_sentiment(&rows).unwrap();
        assert_eq!(ranking.method, RankingMethod::CompositeFallback);
        assert_eq!(ranking.results.len(), 5);
        assert_eq!(ranking.results[0].item.name, "R0");
    }

    #[test]
    fn sentiment_neighbours_exclude_the_anchor() {
        let rows = vec![
            sentiment("A", [Some(0.9), Some(0.1), Some(0.5), Some(0.5)]),
            sentiment("B", [Some(0.85), Some(0.15), Some(0.5), Some(0.45)]),
            sentiment("C", [Some(0.1), Some(0.9), Some(0.2), Some(0.1)]),
        ];
        let results = recommender(Default::default())
            .similar_by_sentiment(&rows, "A")
            .unwrap();
        let names: Vec<&str> = results.iter().map(|r| r.item.name.as_str()).collect();
        assert_eq!(names, vec!["B", "C"]);
    }
}
