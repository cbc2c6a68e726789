//! Movie metadata provider abstraction
//!
//! Catalog records often arrive without popularity, quality or release year.
//! A metadata provider looks those up in an external source (TMDB) during
//! start-up enrichment, before the catalog is frozen.

use serde::{Deserialize, Serialize};

use crate::error::AppResult;

pub mod tmdb;

pub use tmdb::TmdbProvider;

/// Metadata found for one movie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieMetadata {
    pub external_id: u64,
    pub title: String,
    pub popularity: Option<f64>,
    /// Average external vote on a 0-10 scale
    pub vote_average: Option<f64>,
    pub release_year: Option<i32>,
}

/// Trait for movie metadata providers
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Best match for a title, optionally narrowed by release year
    async fn search_movie(&self, title: &str, year: Option<i32>) -> AppResult<Option<MovieMetadata>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}
