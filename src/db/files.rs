use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::{
    db::source::CatalogSource,
    error::{AppError, AppResult},
    models::{split_tags, MovieId, MovieRecord, RatingEntry},
};

/// Loads the catalog from `movies.csv` / `ratings.csv` style files
#[derive(Debug, Clone)]
pub struct FileCatalogSource {
    movies_path: PathBuf,
    ratings_path: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct MovieRow {
    #[serde(rename = "movieId")]
    movie_id: i64,
    title: String,
    #[serde(default)]
    genres: Option<String>,
    #[serde(default)]
    keywords: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    year: Option<i32>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    popularity: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    quality: Option<f64>,
}

impl From<MovieRow> for MovieRecord {
    fn from(row: MovieRow) -> Self {
        Self {
            id: MovieId(row.movie_id),
            title: row.title,
            genres: row.genres.as_deref().map(split_tags).unwrap_or_default(),
            keywords: row.keywords.as_deref().map(split_tags).unwrap_or_default(),
            year: row.year,
            popularity: row.popularity,
            quality: row.quality,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RatingRow {
    #[serde(rename = "userId")]
    user_id: i64,
    #[serde(rename = "movieId")]
    movie_id: i64,
    rating: f64,
}

impl FileCatalogSource {
    /// Ratings are optional; without them the collaborative signal is empty.
    pub fn new(movies_path: impl Into<PathBuf>, ratings_path: Option<PathBuf>) -> Self {
        Self {
            movies_path: movies_path.into(),
            ratings_path,
        }
    }

    fn read_rows<T, R>(path: &Path) -> AppResult<Vec<R>>
    where
        T: serde::de::DeserializeOwned,
        R: From<T>,
    {
        tracing::info!(path = %path.display(), "Reading CSV file");

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)?;

        let mut rows = Vec::new();
        for (line, result) in reader.deserialize::<T>().enumerate() {
            let row = result.map_err(|e| {
                tracing::error!(path = %path.display(), row = line + 1, error = %e, "Malformed CSV row");
                AppError::from(e)
            })?;
            rows.push(R::from(row));
        }
        Ok(rows)
    }
}

impl From<RatingRow> for RatingEntry {
    fn from(row: RatingRow) -> Self {
        RatingEntry::new(row.user_id, row.movie_id, row.rating)
    }
}

#[async_trait::async_trait]
impl CatalogSource for FileCatalogSource {
    async fn load_movies(&self) -> AppResult<Vec<MovieRecord>> {
        let path = self.movies_path.clone();
        tokio::task::spawn_blocking(move || Self::read_rows::<MovieRow, MovieRecord>(&path))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
    }

    async fn load_ratings(&self) -> AppResult<Vec<RatingEntry>> {
        let Some(path) = self.ratings_path.clone() else {
            tracing::warn!("No ratings file configured, collaborative signal disabled");
            return Ok(Vec::new());
        };
        tokio::task::spawn_blocking(move || Self::read_rows::<RatingRow, RatingEntry>(&path))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
    }

    fn name(&self) -> &'static str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_movielens_style_movies() {
        let movies = csv_file(
            "movieId,title,genres\n\
             1,Toy Story (1995),Adventure|Animation|Children\n\
             2,Jumanji (1995),Adventure|Children|Fantasy\n",
        );
        let source = FileCatalogSource::new(movies.path(), None);

        let records = source.load_movies().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, MovieId(1));
        assert_eq!(records[0].genres, vec!["Adventure", "Animation", "Children"]);
        assert!(records[0].keywords.is_empty());
        assert_eq!(records[0].popularity, None);
    }

    #[tokio::test]
    async fn test_optional_columns_and_empty_cells() {
        let movies = csv_file(
            "movieId,title,genres,keywords,year,popularity,quality\n\
             10,Heat,Crime|Thriller,heist|los angeles,1995,42.5,4.1\n\
             11,Ronin,Action,,,,\n\
             12,Brazil,Sci-Fi,,unknown,,\n",
        );
        let source = FileCatalogSource::new(movies.path(), None);

        let records = source.load_movies().await.unwrap();
        assert_eq!(records[0].keywords, vec!["heist", "los angeles"]);
        assert_eq!(records[0].year, Some(1995));
        assert_eq!(records[0].quality, Some(4.1));
        assert_eq!(records[1].year, None);
        assert_eq!(records[1].popularity, None);
        assert_eq!(records[2].year, None);
    }

    #[tokio::test]
    async fn test_load_ratings_ignores_extra_columns() {
        let movies = csv_file("movieId,title\n1,Heat\n");
        let ratings = csv_file("userId,movieId,rating,timestamp\n1,1,4.5,964982703\n2,1,3.0,964982224\n");
        let source = FileCatalogSource::new(movies.path(), Some(ratings.path().to_path_buf()));

        let entries = source.load_ratings().await.unwrap();
        assert_eq!(entries, vec![RatingEntry::new(1, 1, 4.5), RatingEntry::new(2, 1, 3.0)]);
    }

    #[tokio::test]
    async fn test_missing_ratings_file_is_empty() {
        let movies = csv_file("movieId,title\n1,Heat\n");
        let source = FileCatalogSource::new(movies.path(), None);
        assert!(source.load_ratings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_row_is_an_error() {
        let movies = csv_file("movieId,title\nnot-a-number,Heat\n");
        let source = FileCatalogSource::new(movies.path(), None);
        assert!(matches!(source.load_movies().await, Err(AppError::Csv(_))));
    }

    #[tokio::test]
    async fn test_missing_file_is_an_error() {
        let source = FileCatalogSource::new("/nonexistent/movies.csv", None);
        assert!(source.load_movies().await.is_err());
    }
}
