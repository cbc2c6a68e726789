use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

use crate::{
    catalog::{Catalog, RatingMatrix},
    models::{MovieId, SimilarityScore},
};

/// Vote-count percentile a movie must reach to enter the popular list
const QUALIFYING_QUANTILE: f64 = 0.9;

/// Popularity and quality signals over the catalog
pub struct PopularityEngine {
    catalog: Arc<Catalog>,
    max_popularity: f64,
    max_quality: f64,
    /// Bayesian-ranked movies first, then the rest by normalized score
    ranking: Vec<SimilarityScore>,
}

impl PopularityEngine {
    pub fn new(catalog: Arc<Catalog>, ratings: &RatingMatrix) -> Self {
        let max_popularity = catalog.iter().map(|m| m.popularity).fold(0.0, f64::max);
        let max_quality = catalog.iter().map(|m| m.quality).fold(0.0, f64::max);

        let mut engine = Self {
            catalog,
            max_popularity,
            max_quality,
            ranking: Vec::new(),
        };
        engine.ranking = engine.build_ranking(ratings);
        engine
    }

    /// Popularity and quality each scaled by their catalog maximum, averaged.
    /// Lies in [0, 1] and never decreases as the movie's popularity grows.
    pub fn normalized(&self, movie_id: MovieId) -> f64 {
        let Some(movie) = self.catalog.get(movie_id) else {
            return 0.0;
        };
        0.5 * ratio(movie.popularity, self.max_popularity)
            + 0.5 * ratio(movie.quality, self.max_quality)
    }

    /// The `n` most popular movies
    pub fn popular(&self, n: usize) -> &[SimilarityScore] {
        &self.ranking[..n.min(self.ranking.len())]
    }

    /// Weighted rating `v/(v+m)·R + m/(v+m)·C` over movies whose vote count
    /// reaches the 90th percentile, followed by the remaining catalog.
    fn build_ranking(&self, ratings: &RatingMatrix) -> Vec<SimilarityScore> {
        let mut stats: Vec<(MovieId, usize, f64)> = ratings.movie_stats().collect();
        stats.sort_by_key(|(movie_id, _, _)| *movie_id);
        let mut ranked: Vec<(usize, SimilarityScore)> = Vec::new();

        if !stats.is_empty() {
            let global_mean = stats.iter().map(|(_, _, mean)| mean).sum::<f64>() / stats.len() as f64;
            let mut counts: Vec<f64> = stats.iter().map(|(_, v, _)| *v as f64).collect();
            counts.sort_by(f64::total_cmp);
            let m = quantile(&counts, QUALIFYING_QUANTILE);

            for (movie_id, votes, mean) in &stats {
                let v = *votes as f64;
                if v < m {
                    continue;
                }
                let Some(pos) = self.catalog.position(*movie_id) else {
                    continue;
                };
                let score = v / (v + m) * mean + m / (v + m) * global_mean;
                ranked.push((pos, SimilarityScore { movie_id: *movie_id, score }));
            }
        }

        ranked.sort_by(|(pa, a), (pb, b)| by_score_then_position(a.score, *pa, b.score, *pb));

        let qualified: HashSet<MovieId> = ranked.iter().map(|(_, s)| s.movie_id).collect();
        let mut rest: Vec<(usize, SimilarityScore)> = self
            .catalog
            .iter()
            .enumerate()
            .filter(|(_, movie)| !qualified.contains(&movie.id))
            .map(|(pos, movie)| {
                (
                    pos,
                    SimilarityScore {
                        movie_id: movie.id,
                        score: self.normalized(movie.id),
                    },
                )
            })
            .collect();
        rest.sort_by(|(pa, a), (pb, b)| by_score_then_position(a.score, *pa, b.score, *pb));

        tracing::debug!(
            qualified = ranked.len(),
            remaining = rest.len(),
            "Popularity ranking built"
        );

        ranked.into_iter().chain(rest).map(|(_, s)| s).collect()
    }
}

fn ratio(value: f64, max: f64) -> f64 {
    if max > 0.0 {
        value / max
    } else {
        0.0
    }
}

fn by_score_then_position(a: f64, pa: usize, b: f64, pb: usize) -> Ordering {
    b.total_cmp(&a).then(pa.cmp(&pb))
}

/// Linear-interpolated quantile of sorted values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = q * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (rank - lo as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Movie, RatingEntry, RatingScale};

    fn movie(id: i64, popularity: f64, quality: f64) -> Movie {
        Movie::new(MovieId(id), format!("Movie {}", id), ["Drama"], Vec::<String>::new(), None, popularity, quality)
    }

    #[test]
    fn test_quantile_interpolates() {
        assert_eq!(quantile(&[1.0, 2.0, 3.0, 4.0, 5.0], 0.5), 3.0);
        assert!((quantile(&[0.0, 10.0], 0.9) - 9.0).abs() < 1e-12);
        assert_eq!(quantile(&[], 0.9), 0.0);
    }

    #[test]
    fn test_normalized_scales_by_catalog_max() {
        let catalog = Arc::new(Catalog::new(vec![movie(1, 50.0, 4.0), movie(2, 100.0, 8.0)]));
        let engine = PopularityEngine::new(catalog, &RatingMatrix::default());

        assert!((engine.normalized(MovieId(1)) - 0.5).abs() < 1e-12);
        assert!((engine.normalized(MovieId(2)) - 1.0).abs() < 1e-12);
        assert_eq!(engine.normalized(MovieId(3)), 0.0);
    }

    #[test]
    fn test_normalized_zero_max_is_zero() {
        let catalog = Arc::new(Catalog::new(vec![movie(1, 0.0, 0.0), movie(2, 0.0, 0.0)]));
        let engine = PopularityEngine::new(catalog, &RatingMatrix::default());
        assert_eq!(engine.normalized(MovieId(1)), 0.0);
    }

    #[test]
    fn test_normalized_is_monotonic_in_popularity() {
        let mut last = -1.0;
        for popularity in [0.0, 5.0, 20.0, 80.0, 200.0] {
            let catalog = Arc::new(Catalog::new(vec![movie(1, popularity, 3.0), movie(2, 100.0, 4.0)]));
            let score = PopularityEngine::new(catalog, &RatingMatrix::default()).normalized(MovieId(1));
            assert!(score >= last);
            last = score;
        }
    }

    #[test]
    fn test_popular_prefers_heavily_rated_movies() {
        let catalog = Arc::new(Catalog::new(vec![
            movie(1, 1.0, 1.0),
            movie(2, 1.0, 1.0),
            movie(3, 90.0, 5.0),
        ]));
        let mut entries = Vec::new();
        for user in 1..=10 {
            entries.push(RatingEntry::new(user, 2, 4.0));
        }
        entries.push(RatingEntry::new(1, 1, 5.0));
        let ratings = RatingMatrix::build(&catalog, entries, RatingScale::default());
        let engine = PopularityEngine::new(catalog, &ratings);

        let popular: Vec<MovieId> = engine.popular(3).iter().map(|s| s.movie_id).collect();
        // Only movie 2 reaches the vote threshold, the rest follow by normalized score
        assert_eq!(popular, vec![MovieId(2), MovieId(3), MovieId(1)]);
        assert_eq!(engine.popular(10).len(), 3);
    }

    #[test]
    fn test_popular_without_ratings_uses_normalized_order() {
        let catalog = Arc::new(Catalog::new(vec![movie(1, 10.0, 1.0), movie(2, 30.0, 1.0)]));
        let engine = PopularityEngine::new(catalog, &RatingMatrix::default());
        assert_eq!(engine.popular(1)[0].movie_id, MovieId(2));
    }
}
