//! Statistics snapshot consumed by the layout engine.
//!
//! The snapshot arrives as a JSON document from the statistics service. Missing
//! substructure is tolerated: absent lists are empty and an absent average is 0.

use crate::error::{CardError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieRating {
    pub title: String,
    #[serde(default)]
    pub user_rating: f64,
    #[serde(default)]
    pub public_rating: f64,
    /// `user_rating - public_rating`; derived when the producer leaves it out.
    #[serde(default)]
    pub rating_difference: Option<f64>,
}

impl MovieRating {
    pub fn new(title: impl Into<String>, user_rating: f64, public_rating: f64) -> Self {
        Self {
            title: title.into(),
            user_rating,
            public_rating,
            rating_difference: Some(user_rating - public_rating),
        }
    }

    pub fn difference(&self) -> f64 {
        self.rating_difference
            .unwrap_or(self.user_rating - self.public_rating)
    }
}

/// Read-only rating statistics. Both lists arrive sorted by magnitude,
/// strongest first; consumers only ever select from the front.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsSnapshot {
    pub average_rating_difference: f64,
    /// Movies rated below the public average.
    pub overrated_movies: Vec<MovieRating>,
    /// Movies rated above the public average.
    pub underrated_movies: Vec<MovieRating>,
}

#[derive(Deserialize)]
struct StatsDocument {
    #[serde(default)]
    rating_stats: Option<RatingStats>,
}

#[derive(Deserialize, Default)]
struct RatingStats {
    #[serde(default)]
    average_rating_difference: Option<f64>,
    #[serde(default)]
    overrated_movies: Option<Vec<MovieRating>>,
    #[serde(default)]
    underrated_movies: Option<Vec<MovieRating>>,
}

impl StatsSnapshot {
    pub fn new(
        average_rating_difference: f64,
        overrated_movies: Vec<MovieRating>,
        underrated_movies: Vec<MovieRating>,
    ) -> Self {
        Self {
            average_rating_difference,
            overrated_movies,
            underrated_movies,
        }
    }

    /// Parses the statistics service document (`{"rating_stats": {...}}`).
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: StatsDocument = serde_json::from_str(json)
            .map_err(|e| CardError::InvalidSnapshot(format!("malformed stats document: {e}")))?;
        let stats = doc.rating_stats.unwrap_or_default();
        Ok(Self {
            average_rating_difference: stats.average_rating_difference.unwrap_or(0.0),
            overrated_movies: stats.overrated_movies.unwrap_or_default(),
            underrated_movies: stats.underrated_movies.unwrap_or_default(),
        })
    }

    /// Average difference with non-finite input folded to zero.
    pub fn average(&self) -> f64 {
        if self.average_rating_difference.is_finite() {
            self.average_rating_difference
        } else {
            0.0
        }
    }

    pub fn headline_overrated(&self) -> Option<&MovieRating> {
        self.overrated_movies.first()
    }

    pub fn headline_underrated(&self) -> Option<&MovieRating> {
        self.underrated_movies.first()
    }

    pub fn has_movies(&self) -> bool {
        !self.overrated_movies.is_empty() || !self.underrated_movies.is_empty()
    }
}
