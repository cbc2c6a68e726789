use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

use crate::{
    catalog::{Catalog, RatingMatrix},
    models::{MovieId, SimilarityScore, UserId},
};

/// Distance used to compare movie rating vectors
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    /// Cosine over raw ratings, unrated cells count as zero
    #[default]
    Cosine,
    /// Cosine over ratings centred on each movie's mean
    Pearson,
}

/// Item-item k-nearest-neighbours over the rating matrix
pub struct CollaborativeEngine {
    catalog: Arc<Catalog>,
    /// movie → (user, adjusted rating)
    item_vectors: HashMap<MovieId, Vec<(UserId, f64)>>,
    /// user → (movie, adjusted rating)
    user_vectors: HashMap<UserId, Vec<(MovieId, f64)>>,
    norms: HashMap<MovieId, f64>,
}

impl CollaborativeEngine {
    pub fn new(catalog: Arc<Catalog>, ratings: &RatingMatrix, metric: SimilarityMetric) -> Self {
        let mut item_vectors = HashMap::new();
        let mut user_vectors: HashMap<UserId, Vec<(MovieId, f64)>> = HashMap::new();
        let mut norms = HashMap::new();

        for movie in catalog.iter() {
            let raw = ratings.ratings_for_movie(movie.id);
            if raw.is_empty() {
                continue;
            }

            let offset = match metric {
                SimilarityMetric::Cosine => 0.0,
                SimilarityMetric::Pearson => {
                    raw.iter().map(|(_, r)| r).sum::<f64>() / raw.len() as f64
                }
            };
            let vector: Vec<(UserId, f64)> = raw
                .iter()
                .map(|&(user, rating)| (user, rating - offset))
                .collect();

            let norm = vector.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
            if norm == 0.0 {
                continue;
            }

            for &(user, value) in &vector {
                user_vectors.entry(user).or_default().push((movie.id, value));
            }
            norms.insert(movie.id, norm);
            item_vectors.insert(movie.id, vector);
        }

        tracing::debug!(
            rated_movies = item_vectors.len(),
            users = user_vectors.len(),
            metric = ?metric,
            "Collaborative rating vectors built"
        );

        Self {
            catalog,
            item_vectors,
            user_vectors,
            norms,
        }
    }

    /// Up to `k` movies most similar to `movie_id` by rating pattern.
    ///
    /// Only positive similarities are returned, sorted descending with
    /// catalog order breaking ties. Cold-start movies yield an empty list.
    pub fn neighbors(&self, movie_id: MovieId, k: usize) -> Vec<SimilarityScore> {
        let (Some(seed_vector), Some(&seed_norm)) =
            (self.item_vectors.get(&movie_id), self.norms.get(&movie_id))
        else {
            return Vec::new();
        };

        // Dot products only over co-rating users
        let mut dots: HashMap<MovieId, f64> = HashMap::new();
        for &(user, seed_value) in seed_vector {
            if let Some(rated) = self.user_vectors.get(&user) {
                for &(other, value) in rated {
                    if other != movie_id {
                        *dots.entry(other).or_default() += seed_value * value;
                    }
                }
            }
        }

        let mut scored: Vec<(usize, SimilarityScore)> = dots
            .into_iter()
            .filter_map(|(other, dot)| {
                let score = (dot / (seed_norm * self.norms.get(&other)?)).min(1.0);
                if score > 0.0 {
                    let pos = self.catalog.position(other)?;
                    Some((pos, SimilarityScore { movie_id: other, score }))
                } else {
                    None
                }
            })
            .collect();

        scored.sort_by(|(pa, a), (pb, b)| b.score.total_cmp(&a.score).then(pa.cmp(pb)));
        scored.truncate(k);
        scored.into_iter().map(|(_, s)| s).collect()
    }
}
