// src/presenter.rs
//! Maps ranked results onto display-ready views and plain-text blocks.

use serde::Serialize;
use std::fmt::Write as _;

use crate::dataset::{Aspect, Restaurant};
use crate::feedback::FeedbackEntry;
use crate::geo::Nearby;
use crate::rating::{rating_badge, Stars};
use crate::recommender::{Ranked, RankingMethod, SentimentRanking};

const NO_COMMENT: &str = "(no comment)";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestaurantDetails {
    pub name: String,
    pub stars: String,
    pub badge: Option<&'static str>,
    pub comment: Option<String>,
    pub category: Option<String>,
    pub address: String,
    pub contact: Option<String>,
}

impl From<&Restaurant> for RestaurantDetails {
    fn from(r: &Restaurant) -> Self {
        let bubbles = r.bubbles.as_deref().unwrap_or("");
        RestaurantDetails {
            name: r.name.clone(),
            stars: Stars::from_bubbles(bubbles).render(),
            badge: rating_badge(bubbles),
            comment: r.comment.clone(),
            category: r.category.clone(),
            address: r.location.clone(),
            contact: r.contact.as_ref().map(|c| format!("Phone: {}", c)),
        }
    }
}

impl RestaurantDetails {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.name);
        let _ = writeln!(out, "  Rating:   {}", self.stars);
        if let Some(comment) = &self.comment {
            let _ = writeln!(out, "  Comments: {}", comment);
        }
        if let Some(category) = &self.category {
            let _ = writeln!(out, "  Category: {}", category);
        }
        if !self.address.is_empty() {
            let _ = writeln!(out, "  Address:  {}", self.address);
        }
        if let Some(contact) = &self.contact {
            let _ = writeln!(out, "  Contact:  {}", contact);
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackCard {
    pub index: usize,
    pub stars: String,
    pub comment: String,
}

impl FeedbackCard {
    pub fn new(index: usize, entry: &FeedbackEntry) -> Self {
        let comment = entry.comment.trim();
        FeedbackCard {
            index,
            stars: entry.stars().render(),
            comment: if comment.is_empty() {
                NO_COMMENT.to_string()
            } else {
                comment.to_string()
            },
        }
    }
}

pub fn feedback_cards(entries: &[(usize, FeedbackEntry)]) -> Vec<FeedbackCard> {
    entries.iter().map(|(i, e)| FeedbackCard::new(*i, e)).collect()
}

pub fn render_similar(anchor: &str, results: &[Ranked<'_, Restaurant>]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Top {} restaurants similar to {}:", results.len(), anchor);
    for (pos, r) in results.iter().enumerate() {
        let rating = r
            .item
            .rating
            .map(|v| format!("{:.1}", v))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{:>3}. {:<40} similarity {:.3}  rating {}",
            pos + 1,
            r.item.name,
            r.score,
            rating
        );
    }
    out
}

pub fn render_ranking(ranking: &SentimentRanking<'_>, aspects: &[Aspect]) -> String {
    let mut out = String::new();
    let how = match ranking.method {
        RankingMethod::AspectSort => "sorted by selected aspects".to_string(),
        RankingMethod::Classifier { threshold, positives } => format!(
            "classifier probability (top tier: composite >= {:.3}, {} rows)",
            threshold, positives
        ),
        RankingMethod::CompositeFallback => "composite score (all rows in one tier)".to_string(),
    };
    let _ = writeln!(out, "Displaying top {} restaurants, {}:", ranking.results.len(), how);
    for (pos, r) in ranking.results.iter().enumerate() {
        let aspect_values: Vec<String> = aspects
            .iter()
            .map(|a| match r.item.aspect(*a) {
                Some(v) => format!("{} {:.3}", a, v),
                None => format!("{} -", a),
            })
            .collect();
        let score = if r.score.is_finite() {
            format!("{:.3}", r.score)
        } else {
            "-".to_string()
        };
        let _ = writeln!(
            out,
            "{:>3}. {:<40} score {:>5}  {}  {}",
            pos + 1,
            r.item.name,
            score,
            aspect_values.join("  "),
            r.item.url.as_deref().unwrap_or("")
        );
    }
    out
}

pub fn render_nearby(address: &str, nearby: &[Nearby], radius_km: f64) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Selected location: {}", address);
    let _ = writeln!(out, "Top {} restaurants within {} km:", nearby.len(), radius_km);
    for n in nearby {
        let _ = writeln!(
            out,
            "  {:<40} {:>6.2} km  {}",
            n.restaurant.name, n.distance_km, n.restaurant.url
        );
    }
    out
}

pub fn render_feedback(cards: &[FeedbackCard]) -> String {
    if cards.is_empty() {
        return "No feedback yet.\n".to_string();
    }
    let mut out = String::new();
    for card in cards {
        let _ = writeln!(out, "[{}] {}  {}", card.index, card.stars, card.comment);
    }
    out
}
