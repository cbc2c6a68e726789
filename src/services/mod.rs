pub mod collaborative;
pub mod content;
pub mod enrichment;
pub mod hybrid;
pub mod popularity;
pub mod providers;
pub mod settings;

pub use collaborative::{CollaborativeEngine, SimilarityMetric};
pub use content::ContentEngine;
pub use enrichment::{enrich_records, EnrichmentSummary};
pub use hybrid::HybridRecommender;
pub use popularity::PopularityEngine;
pub use settings::{RecommenderSettings, ScoreWeights};
