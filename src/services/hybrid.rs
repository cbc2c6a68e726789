use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::{
    catalog::{Catalog, Dataset, RatingMatrix},
    error::{AppError, AppResult},
    models::{
        Movie, MovieId, MovieResult, RecommendationFilters, RecommendationRequest,
        Recommendations, ScoreBreakdown, SimilarityScore, UserId,
    },
    services::{
        collaborative::CollaborativeEngine, content::ContentEngine, popularity::PopularityEngine,
        settings::RecommenderSettings,
    },
};

/// Blends content, collaborative and popularity signals into one ranking
///
/// The composite score of a candidate c for seeds S is
///
/// ```text
/// weighted(c) = w_content·mean_s content_s(c)
///             + w_collab·mean_s collab_s(c)
///             + w_pop·popularity(c)
/// score(c)    = weighted(c) + rank_fusion_weight·rrf(c) / rrf_max
/// ```
///
/// where `rrf(c)` sums `1/(κ + rank)` over every per-seed list (content and
/// collaborative) in which c has a positive score, and `rrf_max` is the value
/// for a movie ranked first in all of them.
pub struct HybridRecommender {
    catalog: Arc<Catalog>,
    ratings: Arc<RatingMatrix>,
    content: ContentEngine,
    collaborative: CollaborativeEngine,
    popularity: PopularityEngine,
    settings: RecommenderSettings,
}

/// Signals gathered for one seed
struct SeedSignals {
    content: HashMap<MovieId, f64>,
    collaborative: HashMap<MovieId, f64>,
}

impl HybridRecommender {
    pub fn new(dataset: Dataset, settings: RecommenderSettings) -> AppResult<Self> {
        settings.validate()?;

        let catalog = Arc::new(dataset.catalog);
        let ratings = Arc::new(dataset.ratings);
        let content = ContentEngine::new(catalog.clone(), settings.genre_weight);
        let collaborative =
            CollaborativeEngine::new(catalog.clone(), &ratings, settings.similarity_metric);
        let popularity = PopularityEngine::new(catalog.clone(), &ratings);

        tracing::info!(
            movies = catalog.len(),
            ratings = ratings.len(),
            metric = ?settings.similarity_metric,
            "Hybrid recommender ready"
        );

        Ok(Self {
            catalog,
            ratings,
            content,
            collaborative,
            popularity,
            settings,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn movie(&self, movie_id: MovieId) -> AppResult<&Movie> {
        self.catalog
            .get(movie_id)
            .ok_or_else(|| AppError::NotFound(format!("Movie {} is not in the catalog", movie_id)))
    }

    /// Normalized popularity/quality term of a movie
    pub fn popularity_score(&self, movie_id: MovieId) -> f64 {
        self.popularity.normalized(movie_id)
    }

    /// Ranks movies for a set of seed movies
    pub fn recommend(&self, request: &RecommendationRequest) -> AppResult<Recommendations> {
        self.ensure_enough_movies()?;
        self.validate_count(request.n)?;
        request.filters.validate()?;

        if request.seed_movies.is_empty() {
            return Err(AppError::InvalidInput(
                "At least one seed movie is required".to_string(),
            ));
        }

        let mut unique: Vec<MovieId> = Vec::with_capacity(request.seed_movies.len());
        for id in &request.seed_movies {
            if !unique.contains(id) {
                unique.push(*id);
            }
        }
        if unique.len() > self.settings.max_seeds {
            return Err(AppError::InvalidInput(format!(
                "At most {} seed movies are allowed, got {}",
                self.settings.max_seeds,
                unique.len()
            )));
        }

        let (seeds, dropped): (Vec<MovieId>, Vec<MovieId>) =
            unique.into_iter().partition(|id| self.catalog.contains(*id));
        for movie_id in &dropped {
            tracing::warn!(movie_id = %movie_id, "Dropping seed movie missing from catalog");
        }
        if seeds.is_empty() {
            return Err(AppError::InvalidInput(
                "None of the seed movies exist in the catalog".to_string(),
            ));
        }

        let excluded: HashSet<MovieId> = seeds.iter().copied().collect();
        let results = self.rank(&seeds, &excluded, &request.filters, request.n, request.diversify)?;

        tracing::info!(
            seeds = seeds.len(),
            dropped = dropped.len(),
            results = results.len(),
            "Seeded recommendations ranked"
        );

        Ok(Recommendations {
            results,
            dropped_seeds: dropped,
        })
    }

    /// Ranks movies for a user, seeded by their favourite rated movies.
    ///
    /// Movies the user already rated are never returned. Users without
    /// ratings get the popularity ranking.
    pub fn recommend_for_user(
        &self,
        user_id: UserId,
        filters: &RecommendationFilters,
        n: usize,
        diversify: bool,
    ) -> AppResult<Recommendations> {
        self.ensure_enough_movies()?;
        self.validate_count(n)?;
        filters.validate()?;

        let seeds = self.ratings.top_rated_by(
            &self.catalog,
            user_id,
            self.settings.liked_rating_threshold,
            self.settings.max_seeds,
        );

        if seeds.is_empty() {
            tracing::info!(user_id = %user_id, "Cold-start user, ranking by popularity");
            return Ok(Recommendations {
                results: self.rank_by_popularity(filters, n, diversify),
                dropped_seeds: Vec::new(),
            });
        }

        let excluded: HashSet<MovieId> = self
            .ratings
            .ratings_by_user(user_id)
            .iter()
            .map(|(movie_id, _)| *movie_id)
            .collect();
        let results = self.rank(&seeds, &excluded, filters, n, diversify)?;

        tracing::info!(
            user_id = %user_id,
            seeds = seeds.len(),
            rated = excluded.len(),
            results = results.len(),
            "User recommendations ranked"
        );

        Ok(Recommendations {
            results,
            dropped_seeds: Vec::new(),
        })
    }

    /// The `n` movies most similar in content to `movie_id`
    pub fn similar(&self, movie_id: MovieId, n: usize) -> AppResult<Vec<MovieResult>> {
        self.validate_count(n)?;

        let similar = self.content.similar(movie_id)?;
        Ok(similar
            .into_iter()
            .take(n)
            .filter_map(|s| {
                let movie = self.catalog.get(s.movie_id)?;
                Some(MovieResult {
                    movie_id: s.movie_id,
                    title: movie.title.clone(),
                    score: s.score,
                    breakdown: ScoreBreakdown {
                        content: s.score,
                        ..Default::default()
                    },
                })
            })
            .collect())
    }

    /// The `n` most popular movies by Bayesian weighted rating
    pub fn popular(&self, n: usize) -> AppResult<Vec<MovieResult>> {
        self.validate_count(n)?;

        Ok(self
            .popularity
            .popular(n)
            .iter()
            .filter_map(|s| {
                let movie = self.catalog.get(s.movie_id)?;
                Some(MovieResult {
                    movie_id: s.movie_id,
                    title: movie.title.clone(),
                    score: s.score,
                    breakdown: ScoreBreakdown {
                        popularity: self.popularity.normalized(s.movie_id),
                        ..Default::default()
                    },
                })
            })
            .collect())
    }

    fn ensure_enough_movies(&self) -> AppResult<()> {
        if self.catalog.len() < 2 {
            return Err(AppError::InsufficientData(format!(
                "Recommendations need at least 2 movies, catalog has {}",
                self.catalog.len()
            )));
        }
        Ok(())
    }

    fn validate_count(&self, n: usize) -> AppResult<()> {
        if n == 0 || n > self.settings.max_results {
            return Err(AppError::InvalidInput(format!(
                "Result count must be between 1 and {}, got {}",
                self.settings.max_results, n
            )));
        }
        Ok(())
    }

    fn admits(&self, filters: &RecommendationFilters, movie_id: MovieId) -> bool {
        self.catalog
            .get(movie_id)
            .is_some_and(|movie| filters.matches(movie))
    }

    fn rank(
        &self,
        seeds: &[MovieId],
        excluded: &HashSet<MovieId>,
        filters: &RecommendationFilters,
        n: usize,
        diversify: bool,
    ) -> AppResult<Vec<MovieResult>> {
        let pool = n.saturating_mul(self.settings.candidate_pool_factor).max(n);
        let k = self.settings.neighbors.max(pool);
        let kappa = self.settings.rank_fusion_k;

        let mut signals: Vec<SeedSignals> = Vec::with_capacity(seeds.len());
        let mut fusion: HashMap<MovieId, f64> = HashMap::new();
        let mut candidates: HashSet<MovieId> = HashSet::new();

        for &seed in seeds {
            let content: Vec<SimilarityScore> = self
                .content
                .similar(seed)?
                .into_iter()
                .filter(|s| !excluded.contains(&s.movie_id))
                .collect();
            let collaborative: Vec<SimilarityScore> = self
                .collaborative
                .neighbors(seed, k.saturating_add(excluded.len()))
                .into_iter()
                .filter(|s| !excluded.contains(&s.movie_id))
                .take(k)
                .collect();

            for list in [&content, &collaborative] {
                // Rank fusion counts only entries that carry signal
                for (rank, entry) in list.iter().take_while(|s| s.score > 0.0).enumerate() {
                    *fusion.entry(entry.movie_id).or_default() += 1.0 / (kappa + (rank + 1) as f64);
                }
                candidates.extend(
                    list.iter()
                        .filter(|s| self.admits(filters, s.movie_id))
                        .take(pool)
                        .map(|s| s.movie_id),
                );
            }

            signals.push(SeedSignals {
                content: content.iter().map(|s| (s.movie_id, s.score)).collect(),
                collaborative: collaborative.iter().map(|s| (s.movie_id, s.score)).collect(),
            });
        }

        let seed_count = seeds.len() as f64;
        let fusion_max = (2.0 * seed_count) / (kappa + 1.0);
        let weights = self.settings.weights;

        let mut scored: Vec<(usize, f64, MovieResult)> = candidates
            .into_iter()
            .filter_map(|movie_id| {
                let pos = self.catalog.position(movie_id)?;
                let movie = self.catalog.get(movie_id)?;

                let content = signals
                    .iter()
                    .map(|s| s.content.get(&movie_id).copied().unwrap_or(0.0))
                    .sum::<f64>()
                    / seed_count;
                let collaborative = signals
                    .iter()
                    .map(|s| s.collaborative.get(&movie_id).copied().unwrap_or(0.0))
                    .sum::<f64>()
                    / seed_count;
                let popularity = self.popularity.normalized(movie_id);
                let rank_fusion = fusion.get(&movie_id).copied().unwrap_or(0.0) / fusion_max;

                let score = weights.content * content
                    + weights.collaborative * collaborative
                    + weights.popularity * popularity
                    + self.settings.rank_fusion_weight * rank_fusion;

                Some((
                    pos,
                    movie.popularity,
                    MovieResult {
                        movie_id,
                        title: movie.title.clone(),
                        score,
                        breakdown: ScoreBreakdown {
                            content,
                            collaborative,
                            popularity,
                            rank_fusion,
                        },
                    },
                ))
            })
            .collect();

        scored.sort_by(|(pa, popa, a), (pb, popb, b)| {
            b.score
                .total_cmp(&a.score)
                .then(popb.total_cmp(popa))
                .then(pa.cmp(pb))
        });

        let ranked: Vec<MovieResult> = scored.into_iter().map(|(_, _, r)| r).collect();
        Ok(self.finish(ranked, n, diversify))
    }

    /// Popular-list order, filtered, scored by the popularity term alone
    fn rank_by_popularity(
        &self,
        filters: &RecommendationFilters,
        n: usize,
        diversify: bool,
    ) -> Vec<MovieResult> {
        let weight = self.settings.weights.popularity;
        let ranked = self
            .popularity
            .popular(self.catalog.len())
            .iter()
            .filter_map(|s| self.catalog.get(s.movie_id))
            .filter(|movie| filters.matches(movie))
            .map(|movie| {
                let popularity = self.popularity_score(movie.id);
                MovieResult {
                    movie_id: movie.id,
                    title: movie.title.clone(),
                    score: weight * popularity,
                    breakdown: ScoreBreakdown {
                        popularity,
                        ..Default::default()
                    },
                }
            })
            .collect();
        self.finish(ranked, n, diversify)
    }

    fn finish(&self, ranked: Vec<MovieResult>, n: usize, diversify: bool) -> Vec<MovieResult> {
        if diversify {
            diversify_by_genre(&self.catalog, ranked, n)
        } else {
            let mut ranked = ranked;
            ranked.truncate(n);
            ranked
        }
    }
}

/// Caps how many results share a primary genre at max(2, n/2). Skipped
/// movies backfill any slots left over, in rank order.
fn diversify_by_genre(catalog: &Catalog, ranked: Vec<MovieResult>, n: usize) -> Vec<MovieResult> {
    let cap = (n / 2).max(2);
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut picked = Vec::with_capacity(n);
    let mut skipped = Vec::new();

    for result in ranked {
        if picked.len() >= n {
            break;
        }
        let genre = catalog
            .get(result.movie_id)
            .and_then(Movie::primary_genre)
            .map(str::to_lowercase);
        if let Some(genre) = genre {
            let count = counts.entry(genre).or_default();
            if *count >= cap {
                skipped.push(result);
                continue;
            }
            *count += 1;
        }
        picked.push(result);
    }

    let missing = n.saturating_sub(picked.len());
    picked.extend(skipped.into_iter().take(missing));
    picked
}
