// src/dataset.rs
//! Table loading and schema normalization.
//!
//! Every optional column is resolved to a typed field here, once, so the
//! scoring and display code never has to ask whether a column exists.

use csv::ReaderBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

use crate::error::{RecommendError, Result};
use crate::geo::GeoPoint;
use crate::rating::parse_bubbles;

const NO_COMMENTS: &str = "No Comments";
const NOT_AVAILABLE: &str = "Not Available";

/// Reads a headed CSV file into typed rows, failing early when one of the
/// `required` columns is absent.
pub fn read_table<T: DeserializeOwned>(path: &Path, required: &[&str]) -> Result<Vec<T>> {
    let file = File::open(path).map_err(|e| RecommendError::io(path, e))?;
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(file);

    let headers = rdr.headers().map_err(|e| RecommendError::csv(path, e))?.clone();
    for column in required {
        if !headers.iter().any(|h| h == *column) {
            return Err(RecommendError::MissingColumn {
                path: path.to_path_buf(),
                column: column.to_string(),
            });
        }
    }

    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: T = result.map_err(|e| RecommendError::csv(path, e))?;
        rows.push(row);
    }
    debug!(path = %path.display(), rows = rows.len(), "loaded table");
    Ok(rows)
}

/// Keeps the first row for every name, preserving order.
pub fn dedup_by_name<T>(rows: Vec<T>, name: impl Fn(&T) -> &str) -> Vec<T> {
    let before = rows.len();
    let mut seen = HashSet::new();
    let kept: Vec<T> = rows
        .into_iter()
        .filter(|row| seen.insert(name(row).to_string()))
        .collect();
    if kept.len() != before {
        debug!(dropped = before - kept.len(), "removed duplicate names");
    }
    kept
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn unless_sentinel(value: Option<String>, sentinel: &str) -> Option<String> {
    non_empty(value).filter(|v| v != sentinel)
}

/// `"1,234 reviews"` -> 1234
fn parse_review_count(text: &str) -> Option<u32> {
    text.split_whitespace()
        .next()?
        .replace(',', "")
        .parse()
        .ok()
}

#[derive(Debug, Deserialize)]
struct RestaurantRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Street Address", default)]
    street_address: Option<String>,
    #[serde(rename = "Location", default)]
    location: Option<String>,
    #[serde(rename = "Type", default)]
    category: Option<String>,
    #[serde(rename = "Reviews", default)]
    reviews: Option<String>,
    #[serde(rename = "No of Reviews", default)]
    review_count: Option<String>,
    #[serde(rename = "Comments", default)]
    comments: Option<String>,
    #[serde(rename = "Contact Number", default)]
    contact: Option<String>,
    #[serde(rename = "Trip_advisor Url", default)]
    url: Option<String>,
}

/// A restaurant from the TripAdvisor export, with optional columns resolved.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Restaurant {
    pub name: String,
    /// Comma-joined cuisine list; `None` when the `Type` cell was blank.
    pub category: Option<String>,
    /// Street address and locality joined with ", ".
    pub location: String,
    pub bubbles: Option<String>,
    pub rating: Option<f32>,
    pub review_count: Option<u32>,
    pub comment: Option<String>,
    pub contact: Option<String>,
    pub url: Option<String>,
}

impl From<RestaurantRow> for Restaurant {
    fn from(row: RestaurantRow) -> Self {
        let location = [non_empty(row.street_address), non_empty(row.location)]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(", ");
        let bubbles = non_empty(row.reviews);
        let rating = bubbles.as_deref().and_then(parse_bubbles);

        Restaurant {
            name: row.name.trim().to_string(),
            category: non_empty(row.category),
            location,
            rating,
            bubbles,
            review_count: row.review_count.as_deref().and_then(parse_review_count),
            comment: unless_sentinel(row.comments, NO_COMMENTS),
            contact: unless_sentinel(row.contact, NOT_AVAILABLE),
            url: non_empty(row.url),
        }
    }
}

impl Restaurant {
    /// Category text used for vectorizing; blank categories become "".
    pub fn category_text(&self) -> &str {
        self.category.as_deref().unwrap_or("")
    }
}

/// Loads every row of a restaurant table, normalized but not filtered.
pub fn load_restaurants(path: &Path) -> Result<Vec<Restaurant>> {
    let rows: Vec<RestaurantRow> = read_table(path, &["Name"])?;
    Ok(rows.into_iter().map(Restaurant::from).collect())
}

/// Working set for content similarity: rows without a category are dropped
/// and names are made unique.
pub fn prepare_for_similarity(rows: Vec<Restaurant>) -> Vec<Restaurant> {
    let before = rows.len();
    let with_category: Vec<Restaurant> = rows.into_iter().filter(|r| r.category.is_some()).collect();
    if with_category.len() != before {
        warn!(
            dropped = before - with_category.len(),
            "dropped restaurants without a category"
        );
    }
    dedup_by_name(with_category, |r| r.name.as_str())
}

/// Per-aspect sentiment columns of the sentiment-scored dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Aspect {
    Food,
    Price,
    Service,
    Ambiance,
}

impl Aspect {
    pub const ALL: [Aspect; 4] = [Aspect::Food, Aspect::Price, Aspect::Service, Aspect::Ambiance];

    pub fn label(&self) -> &'static str {
        match self {
            Aspect::Food => "Food",
            Aspect::Price => "Price",
            Aspect::Service => "Service",
            Aspect::Ambiance => "Ambiance",
        }
    }

    pub fn column(&self) -> String {
        format!("Average {} Sentiment", self.label())
    }
}

impl fmt::Display for Aspect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Aspect {
    type Err = RecommendError;

    fn from_str(s: &str) -> Result<Self> {
        Aspect::ALL
            .into_iter()
            .find(|a| a.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RecommendError::InvalidConfig(format!("unknown aspect '{}'", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentRecord {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(rename = "Average Food Sentiment", default, deserialize_with = "csv::invalid_option")]
    pub food: Option<f64>,
    #[serde(rename = "Average Price Sentiment", default, deserialize_with = "csv::invalid_option")]
    pub price: Option<f64>,
    #[serde(rename = "Average Service Sentiment", default, deserialize_with = "csv::invalid_option")]
    pub service: Option<f64>,
    #[serde(rename = "Average Ambiance Sentiment", default, deserialize_with = "csv::invalid_option")]
    pub ambiance: Option<f64>,
}

impl SentimentRecord {
    pub fn aspect(&self, aspect: Aspect) -> Option<f64> {
        match aspect {
            Aspect::Food => self.food,
            Aspect::Price => self.price,
            Aspect::Service => self.service,
            Aspect::Ambiance => self.ambiance,
        }
    }

    /// Values for `aspects` in order, or `None` if any of them is missing.
    pub fn features(&self, aspects: &[Aspect]) -> Option<Vec<f64>> {
        aspects.iter().map(|a| self.aspect(*a)).collect()
    }
}

pub fn load_sentiment(path: &Path) -> Result<Vec<SentimentRecord>> {
    read_table(path, &["name"])
}

#[derive(Debug, Deserialize)]
struct GeoRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    longitude: Option<f64>,
    #[serde(rename = "URL", default)]
    url: Option<String>,
}

/// A restaurant with known coordinates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoRestaurant {
    pub name: String,
    pub point: GeoPoint,
    pub url: String,
}

pub fn search_url(name: &str) -> String {
    format!("https://www.google.com/search?q={}", name.replace(' ', "+"))
}

/// Loads the coordinates table, deduplicated by name. Rows without usable
/// coordinates are skipped.
pub fn load_geo(path: &Path) -> Result<Vec<GeoRestaurant>> {
    let rows: Vec<GeoRow> = read_table(path, &["Name", "latitude", "longitude"])?;
    let rows = dedup_by_name(rows, |r| r.name.as_str());

    let mut skipped = 0usize;
    let restaurants: Vec<GeoRestaurant> = rows
        .into_iter()
        .filter_map(|row| {
            let point = match (row.latitude, row.longitude) {
                (Some(lat), Some(lon)) => GeoPoint::new(lat, lon).ok(),
                _ => None,
            };
            let Some(point) = point else {
                skipped += 1;
                return None;
            };
            let url = non_empty(row.url).unwrap_or_else(|| search_url(&row.name));
            Some(GeoRestaurant {
                name: row.name,
                point,
                url,
            })
        })
        .collect();

    if skipped > 0 {
        warn!(skipped, "skipped restaurants without valid coordinates");
    }
    Ok(restaurants)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn restaurant_rows_are_normalized() {
        let file = write_csv(
            "Name,Street Address,Location,Type,Reviews,No of Reviews,Comments,Contact Number,Menu\n\
             Joe's,1 Main St,\"Austin, TX 78701\",\"BBQ, American\",4.5 of 5 bubbles,\"1,204 reviews\",No Comments,Not Available,Check The Website\n\
             Sal's,,\"Dallas, TX 75201\",Pizza,4 of 5 bubbles,87 reviews,Great crust,+1 214-555-0100,\n",
        );
        let rows = load_restaurants(file.path()).unwrap();
        assert_eq!(rows.len(), 2);

        let joes = &rows[0];
        assert_eq!(joes.location, "1 Main St, Austin, TX 78701");
        assert_eq!(joes.rating, Some(4.5));
        assert_eq!(joes.review_count, Some(1204));
        assert_eq!(joes.comment, None);
        assert_eq!(joes.contact, None);

        let sals = &rows[1];
        assert_eq!(sals.location, "Dallas, TX 75201");
        assert_eq!(sals.comment.as_deref(), Some("Great crust"));
        assert_eq!(sals.contact.as_deref(), Some("+1 214-555-0100"));
    }

    #[test]
    fn missing_name_column_is_reported() {
        let file = write_csv("Title,Type\nA,Pizza\n");
        let err = load_restaurants(file.path()).unwrap_err();
        assert!(matches!(err, RecommendError::MissingColumn { ref column, .. } if column == "Name"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_restaurants(Path::new("/definitely/not/here.csv")).unwrap_err();
        assert!(matches!(err, RecommendError::Io { .. }));
    }

    #[test]
    fn similarity_working_set_drops_blank_categories_and_duplicates() {
        let file = write_csv(
            "Name,Type\n\
             A,Pizza\n\
             B,\n\
             A,Sushi\n\
             C,Sushi\n",
        );
        let rows = prepare_for_similarity(load_restaurants(file.path()).unwrap());
        let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
        assert_eq!(rows[0].category_text(), "Pizza");
    }

    #[test]
    fn sentiment_rows_tolerate_bad_numbers() {
        let file = write_csv(
            "name,url,Average Food Sentiment,Average Price Sentiment,Average Service Sentiment,Average Ambiance Sentiment\n\
             A,http://a,0.9,0.1,0.5,0.4\n\
             B,,oops,0.2,,0.3\n",
        );
        let rows = load_sentiment(file.path()).unwrap();
        assert_eq!(rows[0].features(&Aspect::ALL), Some(vec![0.9, 0.1, 0.5, 0.4]));
        assert_eq!(rows[1].food, None);
        assert_eq!(rows[1].features(&[Aspect::Price, Aspect::Ambiance]), Some(vec![0.2, 0.3]));
        assert_eq!(rows[1].features(&[Aspect::Service]), None);
    }

    #[test]
    fn geo_rows_get_default_urls() {
        let file = write_csv(
            "Name,latitude,longitude\n\
             Blue Door,40.71,-74.00\n\
             Blue Door,41.0,-73.0\n\
             Nowhere,,\n",
        );
        let rows = load_geo(file.path()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].url, "https://www.google.com/search?q=Blue+Door");
        assert_eq!(rows[0].point.lat, 40.71);
    }

    #[test]
    fn aspects_parse_case_insensitively() {
        assert_eq!("food".parse::<Aspect>().unwrap(), Aspect::Food);
        assert_eq!(" Ambiance ".parse::<Aspect>().unwrap(), Aspect::Ambiance);
        assert!("taste".parse::<Aspect>().is_err());
        assert_eq!(Aspect::Service.column(), "Average Service Sentiment");
    }
}
