use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use crate::{
    db::CacheKey,
    error::AppResult,
    middleware::RequestContext,
    models::{
        RecommendationFilters, RecommendationRequest, RecommendationResponse, UserId, YearRange,
    },
    routes::AppState,
};

/// Handler for seeded recommendations
pub async fn recommend(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    tracing::info!(
        request_id = %context,
        seeds = request.seed_movies.len(),
        n = request.n,
        diversify = request.diversify,
        "Processing recommendation request"
    );

    let key = CacheKey::Recommendation(request.cache_fingerprint());
    let recommendations = state
        .cached_or(key, || state.recommender.recommend(&request))
        .await?;

    tracing::info!(
        request_id = %context,
        results = recommendations.results.len(),
        dropped_seeds = recommendations.dropped_seeds.len(),
        "Recommendations completed"
    );

    Ok(Json(recommendations.into()))
}

fn default_count() -> usize {
    10
}

#[derive(Debug, Deserialize)]
pub struct UserRecommendationQuery {
    #[serde(default = "default_count")]
    pub n: usize,
    pub genre: Option<String>,
    pub min_year: Option<i32>,
    pub max_year: Option<i32>,
    pub min_rating: Option<f64>,
    #[serde(default)]
    pub diversify: bool,
}

impl UserRecommendationQuery {
    /// A single year bound leaves the other side open
    fn filters(&self) -> RecommendationFilters {
        let year_range = match (self.min_year, self.max_year) {
            (None, None) => None,
            (start, end) => Some(YearRange {
                start: start.unwrap_or(i32::MIN),
                end: end.unwrap_or(i32::MAX),
            }),
        };

        RecommendationFilters {
            genre: self.genre.clone(),
            year_range,
            min_rating: self.min_rating,
        }
    }
}

/// Handler for recommendations seeded by a user's ratings
pub async fn recommend_for_user(
    State(state): State<AppState>,
    Extension(context): Extension<RequestContext>,
    Path(user_id): Path<i64>,
    Query(params): Query<UserRecommendationQuery>,
) -> AppResult<Json<RecommendationResponse>> {
    tracing::info!(
        request_id = %context,
        user_id = user_id,
        n = params.n,
        "Processing user recommendation request"
    );

    let filters = params.filters();
    let key = CacheKey::UserRecommendation {
        user_id,
        fingerprint: format!("{}:{}:{}", filters.fingerprint(), params.n, params.diversify),
    };
    let recommendations = state
        .cached_or(key, || {
            state
                .recommender
                .recommend_for_user(UserId(user_id), &filters, params.n, params.diversify)
        })
        .await?;

    tracing::info!(
        request_id = %context,
        user_id = user_id,
        results = recommendations.results.len(),
        "User recommendations completed"
    );

    Ok(Json(recommendations.into()))
}
