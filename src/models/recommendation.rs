use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Movie, MovieId};
use crate::error::{AppError, AppResult};

/// Inclusive release-year window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub start: i32,
    pub end: i32,
}

/// Exclusion filters applied to candidate movies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecommendationFilters {
    /// Genre name, `"All"` or empty disables the filter
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub year_range: Option<YearRange>,
    /// Lower bound on the movie quality score
    #[serde(default)]
    pub min_rating: Option<f64>,
}

impl RecommendationFilters {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(range) = self.year_range {
            if range.start > range.end {
                return Err(AppError::InvalidInput(format!(
                    "Year range start {} is after end {}",
                    range.start, range.end
                )));
            }
        }

        if let Some(min_rating) = self.min_rating {
            if !min_rating.is_finite() || min_rating < 0.0 {
                return Err(AppError::InvalidInput(format!(
                    "Minimum rating must be a non-negative number, got {}",
                    min_rating
                )));
            }
        }

        Ok(())
    }

    /// The genre filter, if one is in effect
    pub fn active_genre(&self) -> Option<&str> {
        self.genre
            .as_deref()
            .map(str::trim)
            .filter(|g| !g.is_empty() && !g.eq_ignore_ascii_case("all"))
    }

    pub fn matches(&self, movie: &Movie) -> bool {
        if let Some(genre) = self.active_genre() {
            if !movie.has_genre(genre) {
                return false;
            }
        }

        if let Some(range) = self.year_range {
            match movie.year {
                Some(year) if year >= range.start && year <= range.end => {}
                _ => return false,
            }
        }

        if let Some(min_rating) = self.min_rating {
            if movie.quality < min_rating {
                return false;
            }
        }

        true
    }

    /// Stable textual form used in cache keys
    pub fn fingerprint(&self) -> String {
        let genre = self
            .active_genre()
            .map(str::to_lowercase)
            .unwrap_or_else(|| "all".to_string());
        let years = self
            .year_range
            .map(|r| format!("{}-{}", r.start, r.end))
            .unwrap_or_else(|| "any".to_string());
        let rating = self
            .min_rating
            .map(|r| r.to_string())
            .unwrap_or_else(|| "any".to_string());
        format!("{}:{}:{}", genre, years, rating)
    }
}

fn default_result_count() -> usize {
    10
}

/// Request for recommendations seeded by one or more movies
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRequest {
    pub seed_movies: Vec<MovieId>,
    #[serde(default)]
    pub filters: RecommendationFilters,
    #[serde(default = "default_result_count")]
    pub n: usize,
    /// Cap how many results may share a primary genre
    #[serde(default)]
    pub diversify: bool,
}

impl RecommendationRequest {
    pub fn new(seed_movies: Vec<MovieId>, n: usize) -> Self {
        Self {
            seed_movies,
            filters: RecommendationFilters::default(),
            n,
            diversify: false,
        }
    }

    pub fn cache_fingerprint(&self) -> String {
        let mut seeds: Vec<i64> = self.seed_movies.iter().map(|id| id.0).collect();
        seeds.sort_unstable();
        seeds.dedup();
        let seeds: Vec<String> = seeds.iter().map(|id| id.to_string()).collect();
        format!(
            "{}:{}:{}:{}",
            seeds.join(","),
            self.filters.fingerprint(),
            self.n,
            self.diversify
        )
    }
}

/// Similarity between a reference movie and another catalog movie
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityScore {
    pub movie_id: MovieId,
    /// In [0, 1]
    pub score: f64,
}

/// Per-signal contributions behind a composite score
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub content: f64,
    pub collaborative: f64,
    pub popularity: f64,
    pub rank_fusion: f64,
}

/// A ranked recommendation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieResult {
    pub movie_id: MovieId,
    pub title: String,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Ranked results plus the seeds that were not found in the catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Recommendations {
    pub results: Vec<MovieResult>,
    pub dropped_seeds: Vec<MovieId>,
}

/// Response body for recommendation endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub results: Vec<MovieResult>,
    pub dropped_seeds: Vec<MovieId>,
    pub generated_at: DateTime<Utc>,
}

impl From<Recommendations> for RecommendationResponse {
    fn from(recommendations: Recommendations) -> Self {
        Self {
            results: recommendations.results,
            dropped_seeds: recommendations.dropped_seeds,
            generated_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(genres: &[&str], year: Option<i32>, quality: f64) -> Movie {
        Movie::new(MovieId(1), "Heat", genres.iter().copied(), Vec::<String>::new(), year, 1.0, quality)
    }

    #[test]
    fn test_filters_match_genre_case_insensitive() {
        let filters = RecommendationFilters {
            genre: Some("drama".to_string()),
            ..Default::default()
        };
        assert!(filters.matches(&movie(&["Crime", "Drama"], None, 4.0)));
        assert!(!filters.matches(&movie(&["Comedy"], None, 4.0)));
    }

    #[test]
    fn test_filters_all_genre_disables_filter() {
        let filters = RecommendationFilters {
            genre: Some("All".to_string()),
            ..Default::default()
        };
        assert_eq!(filters.active_genre(), None);
        assert!(filters.matches(&movie(&["Comedy"], None, 1.0)));
    }

    #[test]
    fn test_filters_year_range_excludes_unknown_year() {
        let filters = RecommendationFilters {
            year_range: Some(YearRange { start: 2010, end: 2020 }),
            ..Default::default()
        };
        assert!(filters.matches(&movie(&[], Some(2010), 1.0)));
        assert!(filters.matches(&movie(&[], Some(2020), 1.0)));
        assert!(!filters.matches(&movie(&[], Some(2008), 1.0)));
        assert!(!filters.matches(&movie(&[], None, 1.0)));
    }

    #[test]
    fn test_filters_min_rating() {
        let filters = RecommendationFilters {
            min_rating: Some(3.5),
            ..Default::default()
        };
        assert!(filters.matches(&movie(&[], None, 3.5)));
        assert!(!filters.matches(&movie(&[], None, 3.4)));
    }

    #[test]
    fn test_filters_validate_rejects_inverted_years() {
        let filters = RecommendationFilters {
            year_range: Some(YearRange { start: 2020, end: 2010 }),
            ..Default::default()
        };
        assert!(matches!(filters.validate(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_request_defaults_from_json() {
        let request: RecommendationRequest =
            serde_json::from_str(r#"{"seed_movies": [1, 2]}"#).unwrap();
        assert_eq!(request.seed_movies, vec![MovieId(1), MovieId(2)]);
        assert_eq!(request.n, 10);
        assert!(!request.diversify);
        assert_eq!(request.filters, RecommendationFilters::default());
    }

    #[test]
    fn test_cache_fingerprint_ignores_seed_order() {
        let a = RecommendationRequest::new(vec![MovieId(3), MovieId(1)], 5);
        let b = RecommendationRequest::new(vec![MovieId(1), MovieId(3), MovieId(3)], 5);
        assert_eq!(a.cache_fingerprint(), b.cache_fingerprint());
        assert_eq!(a.cache_fingerprint(), "1,3:all:any:any:5:false");
    }
}
