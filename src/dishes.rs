// src/dishes.rs
//! Dish suggestions from a list of ingredients on hand.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::dataset::read_table;
use crate::error::Result;
use crate::tfidf::{TfIdfBuilder, Weighting};

pub const DEFAULT_DISH_THRESHOLD: f32 = 0.3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dish {
    #[serde(rename = "Title")]
    pub title: String,
    #[serde(rename = "Cleaned_Ingredients", default)]
    pub ingredients: String,
}

impl Dish {
    /// Splits the stored `['a', 'b']` list into display lines, dropping the
    /// "for serving" suffixes.
    pub fn ingredient_list(&self) -> Vec<String> {
        let raw = self.ingredients.trim();
        let raw = raw.strip_prefix('[').unwrap_or(raw);
        let raw = raw.strip_suffix(']').unwrap_or(raw);
        raw.split("', ")
            .map(|item| {
                item.trim()
                    .trim_matches(|c| c == '\'' || c == '"')
                    .replace("for serving", "")
                    .trim()
                    .to_string()
            })
            .filter(|item| !item.is_empty())
            .collect()
    }
}

pub fn load_dishes(path: &Path) -> Result<Vec<Dish>> {
    read_table(path, &["Title", "Cleaned_Ingredients"])
}

/// Dishes whose ingredient counts have cosine similarity of at least
/// `threshold` with `input`, in dataset order.
pub fn recommend_dishes<'a>(dishes: &'a [Dish], input: &str, threshold: f32) -> Vec<(&'a Dish, f32)> {
    if input.trim().is_empty() || dishes.is_empty() {
        return Vec::new();
    }

    let mut builder = TfIdfBuilder::new()
        .weighting(Weighting::TermFrequency)
        .remove_stop_words(false);
    for dish in dishes {
        builder.add(&dish.ingredients);
    }
    let model = builder.build();
    let query = model.transform(input);

    let matches: Vec<(&Dish, f32)> = dishes
        .iter()
        .enumerate()
        .filter_map(|(i, dish)| {
            let similarity = model.row(i).map(|row| query.cosine(row)).unwrap_or(0.0);
            (similarity >= threshold).then_some((dish, similarity))
        })
        .collect();
    debug!(candidates = dishes.len(), matches = matches.len(), "matched dishes");
    matches
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dish(title: &str, ingredients: &str) -> Dish {
        Dish {
            title: title.to_string(),
            ingredients: ingredients.to_string(),
        }
    }

    #[test]
    fn ingredient_list_is_cleaned() {
        let d = dish("Soup", "['1 onion', '2 carrots', 'bread for serving']");
        assert_eq!(d.ingredient_list(), vec!["1 onion", "2 carrots", "bread"]);
    }

    #[test]
    fn matches_by_ingredient_overlap() {
        let dishes = vec![
            dish("Fish and Chips", "['fish', 'potato', 'oil', 'salt']"),
            dish("Chocolate Cake", "['flour', 'sugar', 'cocoa', 'eggs']"),
            dish("Baked Fish", "['fish', 'lemon', 'salt', 'pepper']"),
        ];
        let found = recommend_dishes(&dishes, "fish, oil, potato, salt", DEFAULT_DISH_THRESHOLD);
        let titles: Vec<&str> = found.iter().map(|(d, _)| d.title.as_str()).collect();
        assert_eq!(titles, vec!["Fish and Chips", "Baked Fish"]);
        assert!((found[0].1 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn empty_input_matches_nothing() {
        let dishes = vec![dish("Toast", "['bread']")];
        assert!(recommend_dishes(&dishes, "  ", DEFAULT_DISH_THRESHOLD).is_empty());
    }
}
