use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use std::sync::Arc;

use maverick_api::{
    catalog::Dataset,
    models::{MovieId, MovieRecord, RatingEntry, RatingScale},
    routes::{create_router, AppState},
    services::{HybridRecommender, RecommenderSettings},
};

fn record(id: i64, title: &str, genres: &[&str], keywords: &[&str], popularity: f64) -> MovieRecord {
    MovieRecord {
        id: MovieId(id),
        title: title.to_string(),
        genres: genres.iter().map(|g| g.to_string()).collect(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        year: None,
        popularity: Some(popularity),
        quality: None,
    }
}

fn catalog_records() -> Vec<MovieRecord> {
    vec![
        record(1, "Heat (1995)", &["Crime", "Thriller"], &["heist", "los angeles"], 40.0),
        record(2, "Ronin (1998)", &["Action", "Crime", "Thriller"], &["heist", "paris"], 25.0),
        record(3, "Toy Story (1995)", &["Animation", "Comedy"], &["toys"], 80.0),
        record(4, "The Town (2010)", &["Crime", "Drama"], &["heist", "boston"], 30.0),
        record(5, "Up (2009)", &["Animation", "Adventure"], &["balloon"], 60.0),
        record(6, "Collateral (2004)", &["Crime", "Thriller"], &["los angeles"], 35.0),
    ]
}

fn ratings() -> Vec<RatingEntry> {
    vec![
        RatingEntry::new(1, 1, 5.0),
        RatingEntry::new(1, 2, 4.5),
        RatingEntry::new(1, 4, 4.0),
        RatingEntry::new(2, 1, 4.0),
        RatingEntry::new(2, 6, 4.5),
        RatingEntry::new(3, 3, 5.0),
        RatingEntry::new(3, 5, 4.0),
    ]
}

fn server_for(records: Vec<MovieRecord>, entries: Vec<RatingEntry>) -> TestServer {
    let dataset = Dataset::assemble(records, entries, RatingScale::default());
    let recommender = HybridRecommender::new(dataset, RecommenderSettings::default()).unwrap();
    let state = AppState::new(Arc::new(recommender), None, 60);
    TestServer::new(create_router(state)).unwrap()
}

fn create_test_server() -> TestServer {
    server_for(catalog_records(), ratings())
}

fn result_ids(body: &Value) -> Vec<i64> {
    body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["movie_id"].as_i64().unwrap())
        .collect()
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server();
    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["movies"], 6);
}

#[tokio::test]
async fn test_request_id_generated_and_propagated() {
    let server = create_test_server();

    let response = server.get("/health").await;
    let generated = response.header("x-request-id");
    assert!(uuid::Uuid::parse_str(generated.to_str().unwrap()).is_ok());

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("abc-123"),
        )
        .await;
    assert_eq!(response.header("x-request-id"), "abc-123");
}

#[tokio::test]
async fn test_recommendations_for_seed() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "seed_movies": [1], "n": 3 }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let ids = result_ids(&body);
    assert_eq!(ids.len(), 3);
    assert!(!ids.contains(&1));
    assert!(body["dropped_seeds"].as_array().unwrap().is_empty());
    assert!(body["generated_at"].is_string());

    let scores: Vec<f64> = body["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["score"].as_f64().unwrap())
        .collect();
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    assert!(body["results"][0]["breakdown"]["content"].as_f64().unwrap() > 0.0);
}

#[tokio::test]
async fn test_recommendations_report_dropped_seeds() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "seed_movies": [1, 999], "n": 2 }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["dropped_seeds"], json!([999]));
}

#[tokio::test]
async fn test_recommendations_with_genre_filter() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({
            "seed_movies": [1],
            "n": 5,
            "filters": { "genre": "animation" }
        }))
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let mut ids = result_ids(&body);
    ids.sort();
    assert_eq!(ids, vec![3, 5]);
}

#[tokio::test]
async fn test_unknown_seed_only_is_bad_request() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "seed_movies": [999] }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("seed movies"));
}

#[tokio::test]
async fn test_too_many_seeds_is_bad_request() {
    let server = create_test_server();

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "seed_movies": [1, 2, 3, 4, 5, 6] }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_single_movie_catalog_is_unprocessable() {
    let server = server_for(
        vec![record(1, "Heat (1995)", &["Crime"], &[], 1.0)],
        Vec::new(),
    );

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "seed_movies": [1] }))
        .await;

    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_user_recommendations_exclude_rated_movies() {
    let server = create_test_server();

    let response = server
        .get("/api/v1/users/1/recommendations")
        .add_query_param("n", 3)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    let ids = result_ids(&body);
    assert!(!ids.is_empty());
    assert!(ids.iter().all(|id| ![1, 2, 4].contains(id)));
}

#[tokio::test]
async fn test_cold_start_user_gets_popular_movies() {
    let server = create_test_server();

    let response = server
        .get("/api/v1/users/42/recommendations")
        .add_query_param("n", 2)
        .await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(result_ids(&body).len(), 2);
    assert_eq!(body["results"][0]["breakdown"]["content"], 0.0);
}

#[tokio::test]
async fn test_inverted_year_range_is_bad_request() {
    let server = create_test_server();

    let response = server
        .get("/api/v1/users/1/recommendations")
        .add_query_param("min_year", 2010)
        .add_query_param("max_year", 1990)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_popular_movies() {
    let server = create_test_server();

    let response = server
        .get("/api/v1/movies/popular")
        .add_query_param("n", 4)
        .await;

    response.assert_status_ok();
    let body: Vec<Value> = response.json();
    assert_eq!(body.len(), 4);
}

#[tokio::test]
async fn test_zero_results_requested_is_bad_request() {
    let server = create_test_server();

    let response = server
        .get("/api/v1/movies/popular")
        .add_query_param("n", 0)
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_movie() {
    let server = create_test_server();

    let response = server.get("/api/v1/movies/1").await;

    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["title"], "Heat (1995)");
    assert_eq!(body["year"], 1995);
    assert_eq!(body["genres"], json!(["Crime", "Thriller"]));
}

#[tokio::test]
async fn test_unknown_movie_is_not_found() {
    let server = create_test_server();

    let response = server.get("/api/v1/movies/999").await;
    response.assert_status_not_found();

    let response = server.get("/api/v1/movies/999/similar").await;
    response.assert_status_not_found();
}

#[tokio::test]
async fn test_similar_movies() {
    let server = create_test_server();

    let response = server
        .get("/api/v1/movies/1/similar")
        .add_query_param("n", 2)
        .await;

    response.assert_status_ok();
    let body: Vec<Value> = response.json();
    assert_eq!(body.len(), 2);
    // Collateral shares both genres and a keyword with Heat
    assert_eq!(body[0]["movie_id"], 6);
    assert!(body.iter().all(|m| m["movie_id"] != 1));
}
