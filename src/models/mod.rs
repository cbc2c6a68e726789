mod movie;
mod rating;
mod recommendation;

pub use movie::{
    parse_title_year, split_tags, strip_title_year, Movie, MovieId, MovieRecord, UserId,
};
pub use rating::{RatingEntry, RatingScale};
pub use recommendation::{
    MovieResult, RecommendationFilters, RecommendationRequest, RecommendationResponse,
    Recommendations, ScoreBreakdown, SimilarityScore, YearRange,
};
