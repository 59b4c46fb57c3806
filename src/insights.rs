// src/insights.rs
//! Aggregate views over the restaurant table: popular cuisines and the
//! states and cities with the strongest ratings.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use crate::dataset::Restaurant;

const TOP_CUISINES: usize = 10;
const TOP_CITIES: usize = 5;

/// State code from an address such as `"Austin, TX 78701"`: the first word of
/// the last comma-separated part.
pub fn state_of(address: &str) -> Option<String> {
    let last = address.rsplit(',').next()?;
    last.split_whitespace().next().map(str::to_string)
}

/// Everything before the state part, e.g. `"1 Main St, Austin"`.
pub fn city_of(address: &str) -> Option<String> {
    let (city, _) = address.rsplit_once(',')?;
    let city = city.trim();
    (!city.is_empty()).then(|| city.to_string())
}

/// Rating multiplied by review count, when both are known.
pub fn weighted_rating(r: &Restaurant) -> Option<f64> {
    Some(r.rating? as f64 * r.review_count? as f64)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Insights {
    pub top_cuisines: Vec<(String, usize)>,
    pub restaurants_per_state: Vec<(String, usize)>,
    pub best_restaurant_by_state: Vec<(String, f64)>,
    pub total_rating_by_state: Vec<(String, f64)>,
    pub top_cities: Vec<(String, f64)>,
}

fn sorted_counts(counts: HashMap<String, usize>, limit: usize) -> Vec<(String, usize)> {
    let mut counts: Vec<(String, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    counts.truncate(limit);
    counts
}

fn cuisine_counts(restaurants: &[Restaurant]) -> Vec<(String, usize)> {
    let mut full_types: HashMap<String, usize> = HashMap::new();
    for category in restaurants.iter().filter_map(|r| r.category.as_deref()) {
        *full_types.entry(category.trim().to_string()).or_insert(0) += 1;
    }
    // rows without a category take the most common full type string
    let fill = sorted_counts(full_types, 1).into_iter().next().map(|(t, _)| t);

    let mut counts: HashMap<String, usize> = HashMap::new();
    for category in restaurants
        .iter()
        .filter_map(|r| r.category.as_deref().or(fill.as_deref()))
    {
        for cuisine in category.split(',').map(str::trim).filter(|c| !c.is_empty()) {
            *counts.entry(cuisine.to_string()).or_insert(0) += 1;
        }
    }
    sorted_counts(counts, TOP_CUISINES)
}

pub fn compute(restaurants: &[Restaurant]) -> Insights {
    let mut per_state: HashMap<String, usize> = HashMap::new();
    let mut best: BTreeMap<String, f64> = BTreeMap::new();
    let mut total: BTreeMap<String, f64> = BTreeMap::new();
    let mut cities: HashMap<String, f64> = HashMap::new();

    for r in restaurants {
        let Some(state) = state_of(&r.location) else {
            continue;
        };
        *per_state.entry(state.clone()).or_insert(0) += 1;

        let Some(weighted) = weighted_rating(r) else {
            continue;
        };
        let max = best.entry(state.clone()).or_insert(f64::MIN);
        *max = f64::max(*max, weighted);
        *total.entry(state).or_insert(0.0) += weighted;
        if let Some(city) = city_of(&r.location) {
            *cities.entry(city).or_insert(0.0) += weighted;
        }
    }

    let mut top_cities: Vec<(String, f64)> = cities.into_iter().collect();
    top_cities.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    top_cities.truncate(TOP_CITIES);

    Insights {
        top_cuisines: cuisine_counts(restaurants),
        restaurants_per_state: sorted_counts(per_state, usize::MAX),
        best_restaurant_by_state: best.into_iter().collect(),
        total_rating_by_state: total.into_iter().collect(),
        top_cities,
    }
}

impl Insights {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "10 most popular types of cuisine:");
        for (cuisine, count) in &self.top_cuisines {
            let _ = writeln!(out, "  {:<30} {}", cuisine, count);
        }
        let _ = writeln!(out, "\nRestaurants per state:");
        for (state, count) in &self.restaurants_per_state {
            let _ = writeln!(out, "  {:<6} {}", state, count);
        }
        let _ = writeln!(out, "\nBest restaurant per state (weighted rating):");
        for (state, value) in &self.best_restaurant_by_state {
            let _ = writeln!(out, "  {:<6} {:.1}", state, value);
        }
        let _ = writeln!(out, "\nTotal weighted rating per state:");
        for (state, value) in &self.total_rating_by_state {
            let _ = writeln!(out, "  {:<6} {:.1}", state, value);
        }
        let _ = writeln!(out, "\nTop 5 cities for food:");
        for (city, value) in &self.top_cities {
            let _ = writeln!(out, "  {:<40} {:.1}", city, value);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restaurant(category: Option<&str>, location: &str, rating: f32, reviews: u32) -> Restaurant {
        Restaurant {
            name: location.to_string(),
            category: category.map(str::to_string),
            location: location.to_string(),
            bubbles: None,
            rating: Some(rating),
            review_count: Some(reviews),
            comment: None,
            contact: None,
            url: None,
        }
    }

    #[test]
    fn parses_state_and_city() {
        assert_eq!(state_of("1 Main St, Austin, TX 78701").as_deref(), Some("TX"));
        assert_eq!(city_of("1 Main St, Austin, TX 78701").as_deref(), Some("1 Main St, Austin"));
        assert_eq!(state_of(""), None);
        assert_eq!(city_of("TX 78701"), None);
    }

    #[test]
    fn aggregates_by_state_and_city() {
        let rows = vec![
            restaurant(Some("Pizza, Italian"), "Austin, TX 78701", 4.0, 100),
            restaurant(Some("Pizza"), "Dallas, TX 75201", 5.0, 10),
            restaurant(None, "Seattle, WA 98101", 4.5, 200),
        ];
        let insights = compute(&rows);

        assert_eq!(insights.top_cuisines[0], ("Pizza".to_string(), 3));
        assert_eq!(insights.restaurants_per_state[0], ("TX".to_string(), 2));
        assert_eq!(
            insights.best_restaurant_by_state,
            vec![("TX".to_string(), 400.0), ("WA".to_string(), 900.0)]
        );
        assert_eq!(insights.total_rating_by_state[0], ("TX".to_string(), 450.0));
        assert_eq!(insights.top_cities[0].0, "Seattle");
        assert!(insights.render().contains("Top 5 cities"));
    }

    #[test]
    fn blank_types_take_the_most_common_full_type() {
        let rows = vec![
            restaurant(Some("Sushi, Japanese"), "Austin, TX 78701", 4.0, 1),
            restaurant(Some("Sushi, Japanese"), "Austin, TX 78701", 4.0, 1),
            restaurant(Some("Ramen"), "Austin, TX 78701", 4.0, 1),
            restaurant(None, "Austin, TX 78701", 4.0, 1),
        ];
        let insights = compute(&rows);
        assert_eq!(
            insights.top_cuisines,
            vec![
                ("Japanese".to_string(), 3),
                ("Sushi".to_string(), 3),
                ("Ramen".to_string(), 1),
            ]
        );
    }
}
