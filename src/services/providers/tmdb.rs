use serde::Deserialize;
use std::time::Duration;

use crate::cached;
use crate::db::{Cache, CacheKey};
use crate::error::{AppError, AppResult};
use crate::services::providers::{MetadataProvider, MovieMetadata};

const SEARCH_CACHE_TTL: u64 = 4 * 3600;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// TMDB search API client
#[derive(Clone)]
pub struct TmdbProvider {
    http_client: reqwest::Client,
    api_key: String,
    api_url: String,
    cache: Option<Cache>,
}

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse {
    results: Vec<TmdbMovie>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovie {
    id: u64,
    title: String,
    popularity: Option<f64>,
    vote_average: Option<f64>,
    release_date: Option<String>,
}

impl From<TmdbMovie> for MovieMetadata {
    fn from(movie: TmdbMovie) -> Self {
        Self {
            external_id: movie.id,
            title: movie.title,
            popularity: movie.popularity,
            vote_average: movie.vote_average,
            release_year: movie.release_date.as_deref().and_then(release_year),
        }
    }
}

/// Year prefix of a `YYYY-MM-DD` date
fn release_year(date: &str) -> Option<i32> {
    date.get(..4)?.parse().ok()
}

impl TmdbProvider {
    pub fn new(api_key: String, api_url: String, cache: Option<Cache>) -> AppResult<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http_client,
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            cache,
        })
    }

    async fn fetch(&self, title: &str, year: Option<i32>) -> AppResult<Option<MovieMetadata>> {
        let url = format!("{}/search/movie", self.api_url);

        let mut query = vec![
            ("api_key", self.api_key.clone()),
            ("query", title.to_string()),
        ];
        if let Some(year) = year {
            query.push(("year", year.to_string()));
        }

        let response = self.http_client.get(&url).query(&query).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "TMDB API returned status {}: {}",
                status, body
            )));
        }

        let search: TmdbSearchResponse = response.json().await?;
        let found = search.results.into_iter().next().map(MovieMetadata::from);

        tracing::debug!(
            title = %title,
            year = ?year,
            found = found.is_some(),
            provider = "tmdb",
            "Movie search completed"
        );

        Ok(found)
    }
}

#[async_trait::async_trait]
impl MetadataProvider for TmdbProvider {
    async fn search_movie(&self, title: &str, year: Option<i32>) -> AppResult<Option<MovieMetadata>> {
        if title.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Search title cannot be empty".to_string(),
            ));
        }

        match &self.cache {
            Some(cache) => cached!(
                cache,
                CacheKey::TmdbSearch {
                    title: title.to_string(),
                    year,
                },
                SEARCH_CACHE_TTL,
                self.fetch(title, year)
            ),
            None => self.fetch(title, year).await,
        }
    }

    fn name(&self) -> &'static str {
        "tmdb"
    }
}
