use crate::{
    error::{AppError, AppResult},
    models::RatingScale,
    services::collaborative::SimilarityMetric,
};

/// Weights of the three signals in the composite score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreWeights {
    pub content: f64,
    pub collaborative: f64,
    pub popularity: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            content: 0.4,
            collaborative: 0.4,
            popularity: 0.2,
        }
    }
}

impl ScoreWeights {
    const TOLERANCE: f64 = 1e-6;

    /// Weights must be non-negative and sum to 1.0
    pub fn validate(&self) -> AppResult<()> {
        let weights = [self.content, self.collaborative, self.popularity];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(AppError::Configuration(format!(
                "Score weights must be non-negative, got {:?}",
                self
            )));
        }

        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > Self::TOLERANCE {
            return Err(AppError::Configuration(format!(
                "Score weights must sum to 1.0 (got {})",
                sum
            )));
        }
        Ok(())
    }
}

/// Tuning knobs for the hybrid recommender
#[derive(Debug, Clone, PartialEq)]
pub struct RecommenderSettings {
    pub weights: ScoreWeights,
    /// κ in 1/(κ + rank)
    pub rank_fusion_k: f64,
    /// Scale of the normalized rank-fusion boost added to the weighted score
    pub rank_fusion_weight: f64,
    /// Candidates taken per seed list, as a multiple of n
    pub candidate_pool_factor: usize,
    /// k for the collaborative nearest-neighbour lists
    pub neighbors: usize,
    pub similarity_metric: SimilarityMetric,
    pub genre_weight: f64,
    pub rating_scale: RatingScale,
    /// Ratings at or above this count as liked when seeding from a user
    pub liked_rating_threshold: f64,
    pub max_seeds: usize,
    pub max_results: usize,
}

impl Default for RecommenderSettings {
    fn default() -> Self {
        Self {
            weights: ScoreWeights::default(),
            rank_fusion_k: 60.0,
            rank_fusion_weight: 0.05,
            candidate_pool_factor: 3,
            neighbors: 50,
            similarity_metric: SimilarityMetric::Cosine,
            genre_weight: 3.0,
            rating_scale: RatingScale::default(),
            liked_rating_threshold: 4.0,
            max_seeds: 5,
            max_results: 100,
        }
    }
}

impl RecommenderSettings {
    pub fn validate(&self) -> AppResult<()> {
        self.weights.validate()?;

        if !self.rank_fusion_k.is_finite() || self.rank_fusion_k < 0.0 {
            return Err(AppError::Configuration(format!(
                "Rank fusion constant must be non-negative, got {}",
                self.rank_fusion_k
            )));
        }
        if !self.rank_fusion_weight.is_finite() || self.rank_fusion_weight < 0.0 {
            return Err(AppError::Configuration(format!(
                "Rank fusion weight must be non-negative, got {}",
                self.rank_fusion_weight
            )));
        }
        if self.candidate_pool_factor == 0 || self.max_seeds == 0 || self.max_results == 0 {
            return Err(AppError::Configuration(
                "Candidate pool factor, max seeds and max results must be positive".to_string(),
            ));
        }
        if !self.genre_weight.is_finite() || self.genre_weight <= 0.0 {
            return Err(AppError::Configuration(format!(
                "Genre weight must be positive, got {}",
                self.genre_weight
            )));
        }
        let scale = self.rating_scale;
        if !scale.min.is_finite() || !scale.max.is_finite() || scale.min >= scale.max {
            return Err(AppError::Configuration(format!(
                "Rating scale minimum {} must be below maximum {}",
                self.rating_scale.min, self.rating_scale.max
            )));
        }

        Ok(())
    }
}
