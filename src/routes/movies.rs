use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::{
    db::CacheKey,
    error::AppResult,
    middleware::RequestContext,
    models::{Movie, MovieId, MovieResult},
    routes::AppState,
};

fn default_count() -> usize {
    10
}

#[derive(Debug, Deserialize)]
pub struct CountQuery {
    #[serde(default = "default_count")]
    pub n: usize,
}

/// Handler for a single catalog movie
pub async fn get_movie(
    State(state): State<AppState>,
    Path(movie_id): Path<i64>,
) -> AppResult<Json<Movie>> {
    let movie = state.recommender.movie(MovieId(movie_id))?;
    Ok(Json(movie.clone()))
}

/// Handler for content neighbours of a movie
pub async fn similar(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(movie_id): Path<i64>,
    Query(params): Query<CountQuery>,
) -> AppResult<Json<Vec<MovieResult>>> {
    let results = state.recommender.similar(MovieId(movie_id), params.n)?;

    tracing::info!(
        request_id = %context,
        movie_id = movie_id,
        results = results.len(),
        "Similar movies listed"
    );

    Ok(Json(results))
}

/// Handler for the popularity ranking
pub async fn popular(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Query(params): Query<CountQuery>,
) -> AppResult<Json<Vec<MovieResult>>> {
    let results = state
        .cached_or(CacheKey::Popular(params.n), || state.recommender.popular(params.n))
        .await?;

    tracing::info!(
        request_id = %context,
        results = results.len(),
        "Popular movies listed"
    );

    Ok(Json(results))
}
