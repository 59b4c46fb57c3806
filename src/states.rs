// src/states.rs
//! Per-state restaurant tables for browsing without recommendations.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::dataset::{dedup_by_name, load_restaurants, Restaurant};
use crate::error::{RecommendError, Result};

pub const BROWSE_LIMIT: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum State {
    NewYork,
    NewJersey,
    California,
    Texas,
    Washington,
}

impl State {
    pub const ALL: [State; 5] = [
        State::NewYork,
        State::NewJersey,
        State::California,
        State::Texas,
        State::Washington,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            State::NewYork => "New York",
            State::NewJersey => "New Jersey",
            State::California => "California",
            State::Texas => "Texas",
            State::Washington => "Washington",
        }
    }

    /// `<root>/New York/New_York.csv`
    pub fn table_path(&self, root: &Path) -> PathBuf {
        let name = self.display_name();
        root.join(name).join(format!("{}.csv", name.replace(' ', "_")))
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for State {
    type Err = RecommendError;

    fn from_str(s: &str) -> Result<Self> {
        State::ALL
            .into_iter()
            .find(|st| st.display_name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RecommendError::InvalidConfig(format!("unknown state '{}'", s)))
    }
}

/// One state's restaurants, in file order.
pub struct StateCatalog {
    pub state: State,
    restaurants: Vec<Restaurant>,
}

impl StateCatalog {
    pub fn load(root: &Path, state: State) -> Result<Self> {
        let restaurants = load_restaurants(&state.table_path(root))?;
        Ok(Self { state, restaurants })
    }

    pub fn from_rows(state: State, restaurants: Vec<Restaurant>) -> Self {
        Self { state, restaurants }
    }

    /// The first `BROWSE_LIMIT` distinct names.
    pub fn browse_names(&self) -> Vec<&str> {
        let unique = dedup_by_name(self.restaurants.iter().collect(), |r: &&Restaurant| r.name.as_str());
        unique
            .into_iter()
            .take(BROWSE_LIMIT)
            .map(|r| r.name.as_str())
            .collect()
    }

    /// First row with this name.
    pub fn find(&self, name: &str) -> Option<&Restaurant> {
        self.restaurants.iter().find(|r| r.name == name)
    }

    pub fn restaurants(&self) -> &[Restaurant] {
        &self.restaurants
    }
}
