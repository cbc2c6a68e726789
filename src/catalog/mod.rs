//! In-memory movie catalog and rating matrix, loaded once at start-up.

use std::collections::HashMap;

use crate::models::{Movie, MovieId, MovieRecord, RatingEntry, RatingScale};

pub mod ratings;

pub use ratings::RatingMatrix;

/// Immutable movie table in insertion order
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    movies: Vec<Movie>,
    index: HashMap<MovieId, usize>,
}

impl Catalog {
    /// Builds the catalog. Movies with a blank title are dropped and the
    /// first occurrence of a repeated id wins.
    pub fn new(movies: Vec<Movie>) -> Self {
        let mut kept = Vec::with_capacity(movies.len());
        let mut index = HashMap::with_capacity(movies.len());

        for movie in movies {
            if movie.title.is_empty() {
                tracing::warn!(movie_id = %movie.id, "Skipping movie without a title");
                continue;
            }
            if index.contains_key(&movie.id) {
                tracing::warn!(movie_id = %movie.id, title = %movie.title, "Skipping duplicate movie id");
                continue;
            }
            index.insert(movie.id, kept.len());
            kept.push(movie);
        }

        Self {
            movies: kept,
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.movies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movies.is_empty()
    }

    pub fn get(&self, id: MovieId) -> Option<&Movie> {
        self.index.get(&id).map(|&pos| &self.movies[pos])
    }

    pub fn contains(&self, id: MovieId) -> bool {
        self.index.contains_key(&id)
    }

    /// Insertion position, the deterministic tie-breaker for rankings
    pub fn position(&self, id: MovieId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Movie> {
        self.movies.iter()
    }

    fn into_movies(self) -> Vec<Movie> {
        self.movies
    }
}

/// Catalog plus ratings, ready to build engines from
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub catalog: Catalog,
    pub ratings: RatingMatrix,
}

impl Dataset {
    /// Validates raw records into a dataset.
    ///
    /// Movies without a quality score get their mean user rating (one decimal),
    /// movies without popularity get their rating count.
    pub fn assemble(
        records: Vec<MovieRecord>,
        entries: Vec<RatingEntry>,
        scale: RatingScale,
    ) -> Self {
        let record_count = records.len();
        let mut missing: HashMap<MovieId, (bool, bool)> = HashMap::new();
        let movies = records
            .into_iter()
            .map(|record| {
                missing
                    .entry(record.id)
                    .or_insert((record.popularity.is_none(), record.quality.is_none()));
                Movie::new(
                    record.id,
                    record.title,
                    record.genres,
                    record.keywords,
                    record.year,
                    record.popularity.unwrap_or(0.0),
                    record.quality.unwrap_or(0.0),
                )
            })
            .collect();

        let provisional = Catalog::new(movies);
        let ratings = RatingMatrix::build(&provisional, entries, scale);

        let mut filled = 0usize;
        let movies = provisional
            .into_movies()
            .into_iter()
            .map(|mut movie| {
                let (missing_popularity, missing_quality) =
                    missing.get(&movie.id).copied().unwrap_or((false, false));
                if missing_popularity {
                    movie.popularity = ratings.rating_count(movie.id) as f64;
                }
                if missing_quality {
                    if let Some(mean) = ratings.mean_rating(movie.id) {
                        movie.quality = (mean * 10.0).round() / 10.0;
                        filled += 1;
                    }
                }
                movie
            })
            .collect();
        let catalog = Catalog::new(movies);

        tracing::info!(
            records = record_count,
            movies = catalog.len(),
            ratings = ratings.len(),
            users = ratings.user_count(),
            quality_from_ratings = filled,
            "Dataset assembled"
        );

        Self { catalog, ratings }
    }
}
