// src/rating.rs
use regex::Regex;
use std::sync::OnceLock;

pub const MAX_RATING: u8 = 5;

const FULL_STAR: &str = "⭐";
const EMPTY_STAR: &str = "☆";

fn bubble_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)\s*of\s*5").expect("bubble pattern is valid"))
}

/// Parses a bubble string such as `"4.5 of 5 bubbles"` into its numeric value,
/// clamped to `0..=5`. Anything that doesn't follow the `<number> of 5`
/// pattern yields `None`.
pub fn parse_bubbles(text: &str) -> Option<f32> {
    let caps = bubble_pattern().captures(text)?;
    let value: f32 = caps.get(1)?.as_str().parse().ok()?;
    Some(value.clamp(0.0, MAX_RATING as f32))
}

/// Encodes an integer slider value the way the feedback log stores it.
pub fn to_bubbles(rating: u8) -> String {
    format!("{} of 5 bubbles", rating)
}

/// Star split for a rating. Half points are truncated, so 4.5 renders as
/// four full stars and one empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stars {
    pub full: u8,
    pub empty: u8,
}

impl Stars {
    pub fn from_score(score: f32) -> Self {
        let full = if score.is_finite() {
            score.trunc().clamp(0.0, MAX_RATING as f32) as u8
        } else {
            0
        };
        Self {
            full,
            empty: MAX_RATING - full,
        }
    }

    /// Malformed bubble text renders as zero stars rather than failing.
    pub fn from_bubbles(text: &str) -> Self {
        Self::from_score(parse_bubbles(text).unwrap_or(0.0))
    }

    pub fn render(&self) -> String {
        let mut out = FULL_STAR.repeat(self.full as usize);
        out.push_str(&EMPTY_STAR.repeat(self.empty as usize));
        out
    }
}

/// Badge image shown for the three bubble values the dataset actually uses.
pub fn rating_badge(bubbles: &str) -> Option<&'static str> {
    match bubbles.trim() {
        "4 of 5 bubbles" => Some("data/Ratings/Img4.0.png"),
        "4.5 of 5 bubbles" => Some("data/Ratings/Img4.5.png"),
        "5 of 5 bubbles" => Some("data/Ratings/Img5.0.png"),
        _ => None,
    }
}
