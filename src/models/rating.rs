use serde::{Deserialize, Serialize};

use super::{MovieId, UserId};

/// One user's rating of one movie
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingEntry {
    pub user_id: UserId,
    pub movie_id: MovieId,
    pub rating: f64,
}

impl RatingEntry {
    pub fn new(user_id: i64, movie_id: i64, rating: f64) -> Self {
        Self {
            user_id: UserId(user_id),
            movie_id: MovieId(movie_id),
            rating,
        }
    }
}

/// Inclusive bounds for accepted rating values
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingScale {
    pub min: f64,
    pub max: f64,
}

impl Default for RatingScale {
    /// MovieLens half-star scale
    fn default() -> Self {
        Self { min: 0.5, max: 5.0 }
    }
}

impl RatingScale {
    pub fn contains(&self, rating: f64) -> bool {
        rating.is_finite() && rating >= self.min && rating <= self.max
    }
}
