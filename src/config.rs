use serde::Deserialize;
use std::path::PathBuf;

use crate::{
    error::{AppError, AppResult},
    models::RatingScale,
    services::{RecommenderSettings, ScoreWeights, SimilarityMetric},
};

/// Where the catalog and ratings are loaded from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSourceKind {
    #[default]
    Csv,
    Postgres,
}

/// Application configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub catalog_source: CatalogSourceKind,

    #[serde(default = "default_movies_path")]
    pub movies_path: PathBuf,

    /// Optional ratings file; without it only content and popularity apply
    pub ratings_path: Option<PathBuf>,

    /// PostgreSQL connection URL, required for the postgres source
    pub database_url: Option<String>,

    /// Redis connection URL; result caching is off when unset
    pub redis_url: Option<String>,

    /// Seconds a cached recommendation stays valid
    #[serde(default = "default_cache_ttl")]
    pub recommendation_cache_ttl: u64,

    /// TMDB API key; start-up enrichment is skipped when unset
    pub tmdb_api_key: Option<String>,

    #[serde(default = "default_tmdb_api_url")]
    pub tmdb_api_url: String,

    #[serde(default = "default_enrichment_concurrency")]
    pub enrichment_concurrency: usize,

    #[serde(default = "default_content_weight")]
    pub content_weight: f64,

    #[serde(default = "default_collaborative_weight")]
    pub collaborative_weight: f64,

    #[serde(default = "default_popularity_weight")]
    pub popularity_weight: f64,

    #[serde(default = "default_rank_fusion_k")]
    pub rank_fusion_k: f64,

    #[serde(default = "default_rank_fusion_weight")]
    pub rank_fusion_weight: f64,

    #[serde(default = "default_candidate_pool_factor")]
    pub candidate_pool_factor: usize,

    #[serde(default = "default_neighbors")]
    pub neighbors: usize,

    #[serde(default)]
    pub similarity_metric: SimilarityMetric,

    #[serde(default = "default_genre_weight")]
    pub genre_weight: f64,

    #[serde(default = "default_rating_min")]
    pub rating_min: f64,

    #[serde(default = "default_rating_max")]
    pub rating_max: f64,

    #[serde(default = "default_liked_rating_threshold")]
    pub liked_rating_threshold: f64,

    #[serde(default = "default_max_seeds")]
    pub max_seeds: usize,

    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_movies_path() -> PathBuf {
    PathBuf::from("data/movies.csv")
}

fn default_cache_ttl() -> u64 {
    3600
}

fn default_tmdb_api_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_enrichment_concurrency() -> usize {
    8
}

fn default_content_weight() -> f64 {
    ScoreWeights::default().content
}

fn default_collaborative_weight() -> f64 {
    ScoreWeights::default().collaborative
}

fn default_popularity_weight() -> f64 {
    ScoreWeights::default().popularity
}

fn default_rank_fusion_k() -> f64 {
    RecommenderSettings::default().rank_fusion_k
}

fn default_rank_fusion_weight() -> f64 {
    RecommenderSettings::default().rank_fusion_weight
}

fn default_candidate_pool_factor() -> usize {
    RecommenderSettings::default().candidate_pool_factor
}

fn default_neighbors() -> usize {
    RecommenderSettings::default().neighbors
}

fn default_genre_weight() -> f64 {
    RecommenderSettings::default().genre_weight
}

fn default_rating_min() -> f64 {
    RatingScale::default().min
}

fn default_rating_max() -> f64 {
    RatingScale::default().max
}

fn default_liked_rating_threshold() -> f64 {
    RecommenderSettings::default().liked_rating_threshold
}

fn default_max_seeds() -> usize {
    RecommenderSettings::default().max_seeds
}

fn default_max_results() -> usize {
    RecommenderSettings::default().max_results
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }

    /// Build configuration from explicit `(NAME, value)` pairs
    pub fn from_vars<I, K, V>(vars: I) -> AppResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars = vars
            .into_iter()
            .map(|(k, v)| (k.into().to_uppercase(), v.into()));
        envy::from_iter::<_, Config>(vars)
            .map_err(|e| AppError::Configuration(format!("Failed to load config: {}", e)))
    }

    /// Validated recommender tuning
    pub fn recommender_settings(&self) -> AppResult<RecommenderSettings> {
        let settings = RecommenderSettings {
            weights: ScoreWeights {
                content: self.content_weight,
                collaborative: self.collaborative_weight,
                popularity: self.popularity_weight,
            },
            rank_fusion_k: self.rank_fusion_k,
            rank_fusion_weight: self.rank_fusion_weight,
            candidate_pool_factor: self.candidate_pool_factor,
            neighbors: self.neighbors,
            similarity_metric: self.similarity_metric,
            genre_weight: self.genre_weight,
            rating_scale: RatingScale {
                min: self.rating_min,
                max: self.rating_max,
            },
            liked_rating_threshold: self.liked_rating_threshold,
            max_seeds: self.max_seeds,
            max_results: self.max_results,
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
