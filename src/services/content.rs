use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::{
    catalog::Catalog,
    error::{AppError, AppResult},
    models::{MovieId, SimilarityScore},
};

/// Sparse multi-hot feature vector with its precomputed norm
#[derive(Debug, Clone, Default)]
struct FeatureVector {
    /// (feature id, weight), sorted by feature id
    entries: Vec<(u32, f64)>,
    norm: f64,
}

impl FeatureVector {
    fn cosine(&self, other: &FeatureVector) -> f64 {
        if self.norm == 0.0 || other.norm == 0.0 {
            return 0.0;
        }

        let (mut i, mut j, mut dot) = (0, 0, 0.0);
        while i < self.entries.len() && j < other.entries.len() {
            let (fa, wa) = self.entries[i];
            let (fb, wb) = other.entries[j];
            match fa.cmp(&fb) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    dot += wa * wb;
                    i += 1;
                    j += 1;
                }
            }
        }

        (dot / (self.norm * other.norm)).clamp(0.0, 1.0)
    }
}

/// Genre/keyword cosine similarity between catalog movies
pub struct ContentEngine {
    catalog: Arc<Catalog>,
    vectors: Vec<FeatureVector>,
}

impl ContentEngine {
    /// Encodes every catalog movie. Genre features weigh `genre_weight`,
    /// keyword features weigh 1.
    pub fn new(catalog: Arc<Catalog>, genre_weight: f64) -> Self {
        let mut vocabulary: HashMap<String, u32> = HashMap::new();
        let mut vectors = Vec::with_capacity(catalog.len());

        for movie in catalog.iter() {
            let mut features: BTreeMap<u32, f64> = BTreeMap::new();
            let genres = movie
                .genres
                .iter()
                .map(|g| (format!("genre:{}", g.to_lowercase()), genre_weight));
            let keywords = movie
                .keywords
                .iter()
                .map(|k| (format!("keyword:{}", k), 1.0));

            for (name, weight) in genres.chain(keywords) {
                let next_id = vocabulary.len() as u32;
                let id = *vocabulary.entry(name).or_insert(next_id);
                features.insert(id, weight);
            }

            let norm = features.values().map(|w| w * w).sum::<f64>().sqrt();
            vectors.push(FeatureVector {
                entries: features.into_iter().collect(),
                norm,
            });
        }

        tracing::debug!(
            movies = vectors.len(),
            features = vocabulary.len(),
            "Content feature vectors built"
        );

        Self { catalog, vectors }
    }

    /// Every other catalog movie ranked by similarity to `movie_id`.
    /// Equal scores keep catalog order.
    pub fn similar(&self, movie_id: MovieId) -> AppResult<Vec<SimilarityScore>> {
        if self.catalog.len() < 2 {
            return Err(AppError::InsufficientData(format!(
                "Content similarity needs at least 2 movies, catalog has {}",
                self.catalog.len()
            )));
        }

        let pos = self
            .catalog
            .position(movie_id)
            .ok_or_else(|| AppError::NotFound(format!("Movie {} is not in the catalog", movie_id)))?;
        let seed = &self.vectors[pos];

        let mut scores: Vec<SimilarityScore> = self
            .catalog
            .iter()
            .zip(&self.vectors)
            .enumerate()
            .filter(|(i, _)| *i != pos)
            .map(|(_, (movie, vector))| SimilarityScore {
                movie_id: movie.id,
                score: seed.cosine(vector),
            })
            .collect();

        // Stable sort
        scores.sort_by(|a, b| b.score.total_cmp(&a.score));
        Ok(scores)
    }
}
