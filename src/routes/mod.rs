use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    db::{Cache, CacheKey},
    error::AppResult,
    middleware::{make_request_span, request_context_middleware},
    services::HybridRecommender,
};

pub mod movies;
pub mod recommendations;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub recommender: Arc<HybridRecommender>,
    /// Result cache, absent when Redis is not configured
    pub cache: Option<Cache>,
    pub cache_ttl: u64,
}

impl AppState {
    pub fn new(recommender: Arc<HybridRecommender>, cache: Option<Cache>, cache_ttl: u64) -> Self {
        Self {
            recommender,
            cache,
            cache_ttl,
        }
    }

    /// Serves `key` from the cache when possible, otherwise computes and caches it.
    /// An unreachable cache is logged and bypassed.
    async fn cached_or<T, F>(&self, key: CacheKey, compute: F) -> AppResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> AppResult<T>,
    {
        let Some(cache) = &self.cache else {
            return compute();
        };

        match cache.get_from_cache(&key).await {
            Ok(Some(hit)) => Ok(hit),
            Ok(None) => {
                let value = compute()?;
                cache.set_in_background(&key, &value, self.cache_ttl);
                Ok(value)
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed, computing without cache");
                compute()
            }
        }
    }
}

/// Creates the application router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/v1", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(CorsLayer::permissive())
                .layer(middleware::from_fn(request_context_middleware))
                .layer(TraceLayer::new_for_http().make_span_with(make_request_span)),
        )
        .with_state(state)
}

/// API routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/recommendations", post(recommendations::recommend))
        .route(
            "/users/:user_id/recommendations",
            get(recommendations::recommend_for_user),
        )
        .route("/movies/popular", get(movies::popular))
        .route("/movies/:movie_id", get(movies::get_movie))
        .route("/movies/:movie_id/similar", get(movies::similar))
}

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let catalog = state.recommender.catalog();
    (
        StatusCode::OK,
        Json(json!({ "status": "healthy", "movies": catalog.len() })),
    )
}
