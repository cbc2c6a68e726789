use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::{
    error::AppError,
    models::{parse_title_year, strip_title_year, MovieRecord},
    services::providers::{MetadataProvider, MovieMetadata},
};

/// External votes are on a 0-10 scale
const EXTERNAL_VOTE_MAX: f64 = 10.0;

/// Outcome of an enrichment pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichmentSummary {
    pub looked_up: usize,
    pub enriched: usize,
    pub failed: usize,
}

fn needs_enrichment(record: &MovieRecord) -> bool {
    record.popularity.is_none() || record.quality.is_none() || record.year.is_none()
}

/// Fills missing fields of `record` from `metadata`, never overwriting
/// values the record already carries. Returns true if anything changed.
fn apply_metadata(record: &mut MovieRecord, metadata: &MovieMetadata, rating_max: f64) -> bool {
    let mut changed = false;

    if record.popularity.is_none() {
        if let Some(popularity) = metadata.popularity.filter(|p| p.is_finite()) {
            record.popularity = Some(popularity);
            changed = true;
        }
    }
    if record.quality.is_none() {
        if let Some(vote) = metadata.vote_average.filter(|v| v.is_finite() && *v > 0.0) {
            // rescale to the local rating scale, one decimal
            let quality = vote / EXTERNAL_VOTE_MAX * rating_max;
            record.quality = Some((quality * 10.0).round() / 10.0);
            changed = true;
        }
    }
    if record.year.is_none() && metadata.release_year.is_some() {
        record.year = metadata.release_year;
        changed = true;
    }

    changed
}

/// Looks up every record missing popularity, quality or year and fills the
/// gaps in place.
///
/// At most `concurrency` lookups run at once. A failed lookup is logged and
/// the record is left as it was.
pub async fn enrich_records(
    provider: Arc<dyn MetadataProvider>,
    records: &mut [MovieRecord],
    concurrency: usize,
    rating_max: f64,
) -> EnrichmentSummary {
    // A `(YYYY)` title suffix counts as a known year and narrows the search
    for record in records.iter_mut() {
        if record.year.is_none() {
            record.year = parse_title_year(&record.title);
        }
    }

    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = Vec::new();

    for (index, record) in records.iter().enumerate() {
        if !needs_enrichment(record) {
            continue;
        }

        let provider = provider.clone();
        let semaphore = semaphore.clone();
        let title = strip_title_year(&record.title).to_string();
        let year = record.year;

        let task = tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| AppError::Internal(e.to_string()))?;
            provider.search_movie(&title, year).await
        });
        tasks.push((index, task));
    }

    let mut summary = EnrichmentSummary {
        looked_up: tasks.len(),
        ..Default::default()
    };

    tracing::info!(
        lookups = summary.looked_up,
        concurrency = concurrency,
        provider = provider.name(),
        "Enriching catalog metadata"
    );

    for (index, task) in tasks {
        let record = &mut records[index];
        match task.await {
            Ok(Ok(Some(metadata))) => {
                if apply_metadata(record, &metadata, rating_max) {
                    summary.enriched += 1;
                }
            }
            Ok(Ok(None)) => {
                tracing::debug!(movie_id = %record.id, title = %record.title, "No metadata match");
            }
            Ok(Err(e)) => {
                summary.failed += 1;
                tracing::warn!(movie_id = %record.id, title = %record.title, error = %e, "Metadata lookup failed");
            }
            Err(e) => {
                summary.failed += 1;
                tracing::warn!(movie_id = %record.id, error = %e, "Metadata lookup task panicked");
            }
        }
    }

    tracing::info!(
        looked_up = summary.looked_up,
        enriched = summary.enriched,
        failed = summary.failed,
        "Catalog enrichment finished"
    );

    summary
}
