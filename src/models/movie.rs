use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::Display;

/// MovieLens placeholder for an empty genre list
const NO_GENRES: &str = "(no genres listed)";

/// Stable catalog identifier for a movie
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MovieId(pub i64);

impl Display for MovieId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a user in the rating dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A validated catalog movie. Never mutated once the catalog is built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Movie {
    pub id: MovieId,
    pub title: String,
    /// Genre tags in source order, without duplicates
    pub genres: Vec<String>,
    /// Lower-cased keyword tags
    pub keywords: BTreeSet<String>,
    pub year: Option<i32>,
    pub popularity: f64,
    pub quality: f64,
}

impl Movie {
    /// Creates a movie, normalizing tags and clamping scores
    pub fn new(
        id: MovieId,
        title: impl Into<String>,
        genres: impl IntoIterator<Item = impl AsRef<str>>,
        keywords: impl IntoIterator<Item = impl AsRef<str>>,
        year: Option<i32>,
        popularity: f64,
        quality: f64,
    ) -> Self {
        let title = title.into().trim().to_string();
        let year = year.or_else(|| parse_title_year(&title));

        Self {
            id,
            title,
            genres: normalize_genres(genres),
            keywords: normalize_keywords(keywords),
            year,
            popularity: sanitize_score(popularity),
            quality: sanitize_score(quality),
        }
    }

    /// First genre tag, used by the diversity pass
    pub fn primary_genre(&self) -> Option<&str> {
        self.genres.first().map(String::as_str)
    }

    /// Case-insensitive genre membership
    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g.eq_ignore_ascii_case(genre))
    }
}

/// Movie data as delivered by a catalog source, before validation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MovieRecord {
    pub id: MovieId,
    pub title: String,
    pub genres: Vec<String>,
    pub keywords: Vec<String>,
    pub year: Option<i32>,
    pub popularity: Option<f64>,
    pub quality: Option<f64>,
}

/// Splits a `|` or `,` separated tag column
pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(['|', ','])
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}

/// Extracts a trailing `(YYYY)` from a MovieLens-style title
pub fn parse_title_year(title: &str) -> Option<i32> {
    let inner = title.trim_end().strip_suffix(')')?;
    let open = inner.rfind('(')?;
    let digits = &inner[open + 1..];
    if digits.len() == 4 && digits.chars().all(|c| c.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}

/// Title without a trailing `(YYYY)`, for external metadata searches
pub fn strip_title_year(title: &str) -> &str {
    match parse_title_year(title) {
        Some(_) => title
            .trim_end()
            .rfind('(')
            .map(|open| title[..open].trim_end())
            .unwrap_or(title),
        None => title.trim(),
    }
}

fn normalize_genres(genres: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for genre in genres {
        let genre = genre.as_ref().trim();
        if genre.is_empty() || genre.eq_ignore_ascii_case(NO_GENRES) {
            continue;
        }
        if !out.iter().any(|g| g.eq_ignore_ascii_case(genre)) {
            out.push(genre.to_string());
        }
    }
    out
}

fn normalize_keywords(keywords: impl IntoIterator<Item = impl AsRef<str>>) -> BTreeSet<String> {
    keywords
        .into_iter()
        .map(|k| k.as_ref().trim().to_lowercase())
        .filter(|k| !k.is_empty())
        .collect()
}

fn sanitize_score(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
        value
    } else {
        0.0
    }
}
