use std::sync::Arc;

use crate::{
    catalog::Dataset,
    error::{AppError, AppResult},
    models::{MovieRecord, RatingEntry, RatingScale},
    services::{enrich_records, providers::MetadataProvider},
};

/// Trait for catalog and rating sources
///
/// Implemented by the CSV file loader and the Postgres loader. Sources return
/// raw records; validation happens in [`Dataset::assemble`].
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogSource: Send + Sync {
    async fn load_movies(&self) -> AppResult<Vec<MovieRecord>>;

    async fn load_ratings(&self) -> AppResult<Vec<RatingEntry>>;

    /// Source name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Optional metadata lookup run between loading and assembly
pub struct Enrichment {
    pub provider: Arc<dyn MetadataProvider>,
    pub concurrency: usize,
}

/// Loads both tables from `source`, enriches the movies when asked and
/// assembles the dataset.
///
/// An empty movie table is rejected as a configuration problem.
pub async fn load_dataset(
    source: &dyn CatalogSource,
    scale: RatingScale,
    enrichment: Option<Enrichment>,
) -> AppResult<Dataset> {
    let mut records = source.load_movies().await?;
    if records.is_empty() {
        return Err(AppError::Configuration(format!(
            "Catalog source '{}' returned no movies",
            source.name()
        )));
    }

    if let Some(enrichment) = enrichment {
        enrich_records(
            enrichment.provider,
            &mut records,
            enrichment.concurrency,
            scale.max,
        )
        .await;
    }

    let entries = source.load_ratings().await?;

    tracing::info!(
        source = source.name(),
        movies = records.len(),
        ratings = entries.len(),
        "Catalog source loaded"
    );

    Ok(Dataset::assemble(records, entries, scale))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MovieId;
    use crate::services::providers::{MockMetadataProvider, MovieMetadata};

    #[tokio::test]
    async fn test_load_dataset_assembles_records() {
        let mut source = MockCatalogSource::new();
        source.expect_load_movies().returning(|| {
            Ok(vec![MovieRecord {
                id: MovieId(1),
                title: "Heat (1995)".to_string(),
                genres: vec!["Crime".to_string()],
                ..Default::default()
            }])
        });
        source
            .expect_load_ratings()
            .returning(|| Ok(vec![RatingEntry::new(1, 1, 4.5), RatingEntry::new(1, 9, 3.0)]));
        source.expect_name().return_const("mock");

        let dataset = load_dataset(&source, RatingScale::default(), None).await.unwrap();
        assert_eq!(dataset.catalog.len(), 1);
        assert_eq!(dataset.ratings.len(), 1);
        assert_eq!(dataset.ratings.discarded(), 1);
    }

    #[tokio::test]
    async fn test_empty_movie_table_rejected() {
        let mut source = MockCatalogSource::new();
        source.expect_load_movies().returning(|| Ok(Vec::new()));
        source.expect_load_ratings().never();
        source.expect_name().return_const("mock");

        let result = load_dataset(&source, RatingScale::default(), None).await;
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_enrichment_runs_before_assembly() {
        let mut source = MockCatalogSource::new();
        source.expect_load_movies().returning(|| {
            Ok(vec![MovieRecord {
                id: MovieId(1),
                title: "Heat".to_string(),
                ..Default::default()
            }])
        });
        source.expect_load_ratings().returning(|| Ok(Vec::new()));
        source.expect_name().return_const("mock");

        let mut provider = MockMetadataProvider::new();
        provider.expect_search_movie().returning(|title, _| {
            Ok(Some(MovieMetadata {
                external_id: 949,
                title: title.to_string(),
                popularity: Some(30.0),
                vote_average: Some(8.0),
                release_year: Some(1995),
            }))
        });
        provider.expect_name().return_const("mock");

        let enrichment = Enrichment {
            provider: Arc::new(provider),
            concurrency: 2,
        };
        let dataset = load_dataset(&source, RatingScale::default(), Some(enrichment))
            .await
            .unwrap();

        let heat = dataset.catalog.get(MovieId(1)).unwrap();
        assert_eq!(heat.year, Some(1995));
        assert_eq!(heat.popularity, 30.0);
        assert_eq!(heat.quality, 4.0);
    }
}
