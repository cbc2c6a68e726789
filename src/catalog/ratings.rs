use std::collections::HashMap;

use super::Catalog;
use crate::models::{MovieId, RatingEntry, RatingScale, UserId};

/// Sparse user/movie rating matrix, read-only after construction
#[derive(Debug, Clone, Default)]
pub struct RatingMatrix {
    /// movie → (user, rating), sorted by user
    by_movie: HashMap<MovieId, Vec<(UserId, f64)>>,
    /// user → (movie, rating), sorted by movie
    by_user: HashMap<UserId, Vec<(MovieId, f64)>>,
    len: usize,
    discarded: usize,
}

impl RatingMatrix {
    /// Builds the matrix, discarding entries for unknown movies or outside the scale.
    /// A repeated (user, movie) pair keeps its last rating.
    pub fn build(
        catalog: &Catalog,
        entries: impl IntoIterator<Item = RatingEntry>,
        scale: RatingScale,
    ) -> Self {
        let mut unknown_movie = 0usize;
        let mut out_of_scale = 0usize;
        let mut duplicates = 0usize;
        let mut cells: HashMap<(MovieId, UserId), f64> = HashMap::new();

        for entry in entries {
            if !catalog.contains(entry.movie_id) {
                unknown_movie += 1;
                continue;
            }
            if !scale.contains(entry.rating) {
                out_of_scale += 1;
                continue;
            }
            if cells
                .insert((entry.movie_id, entry.user_id), entry.rating)
                .is_some()
            {
                duplicates += 1;
            }
        }

        let discarded = unknown_movie + out_of_scale + duplicates;
        if discarded > 0 {
            tracing::warn!(
                unknown_movie,
                out_of_scale,
                duplicates,
                "Discarded rating entries during load"
            );
        }

        let mut by_movie: HashMap<MovieId, Vec<(UserId, f64)>> = HashMap::new();
        let mut by_user: HashMap<UserId, Vec<(MovieId, f64)>> = HashMap::new();
        for (&(movie_id, user_id), &rating) in &cells {
            by_movie.entry(movie_id).or_default().push((user_id, rating));
            by_user.entry(user_id).or_default().push((movie_id, rating));
        }
        for ratings in by_movie.values_mut() {
            ratings.sort_by_key(|(user, _)| *user);
        }
        for ratings in by_user.values_mut() {
            ratings.sort_by_key(|(movie, _)| *movie);
        }

        Self {
            by_movie,
            by_user,
            len: cells.len(),
            discarded,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Entries rejected while building
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    pub fn ratings_for_movie(&self, movie_id: MovieId) -> &[(UserId, f64)] {
        self.by_movie
            .get(&movie_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn ratings_by_user(&self, user_id: UserId) -> &[(MovieId, f64)] {
        self.by_user
            .get(&user_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn rating_count(&self, movie_id: MovieId) -> usize {
        self.ratings_for_movie(movie_id).len()
    }

    pub fn mean_rating(&self, movie_id: MovieId) -> Option<f64> {
        let ratings = self.ratings_for_movie(movie_id);
        if ratings.is_empty() {
            return None;
        }
        Some(ratings.iter().map(|(_, r)| r).sum::<f64>() / ratings.len() as f64)
    }

    /// Iterates (movie, rating count, mean rating) for every rated movie
    pub fn movie_stats(&self) -> impl Iterator<Item = (MovieId, usize, f64)> + '_ {
        self.by_movie.iter().map(|(&movie_id, ratings)| {
            let mean = ratings.iter().map(|(_, r)| r).sum::<f64>() / ratings.len() as f64;
            (movie_id, ratings.len(), mean)
        })
    }

    /// The user's favourite movies, highest rating first.
    ///
    /// Prefers ratings at or above `liked_threshold`; when the user has none,
    /// every rated movie is eligible. Ties follow catalog order.
    pub fn top_rated_by(
        &self,
        catalog: &Catalog,
        user_id: UserId,
        liked_threshold: f64,
        limit: usize,
    ) -> Vec<MovieId> {
        let ratings = self.ratings_by_user(user_id);
        let liked: Vec<(MovieId, f64)> = ratings
            .iter()
            .copied()
            .filter(|(_, rating)| *rating >= liked_threshold)
            .collect();
        let mut pool = if liked.is_empty() {
            ratings.to_vec()
        } else {
            liked
        };

        pool.sort_by(|(a_id, a), (b_id, b)| {
            b.total_cmp(a).then_with(|| {
                catalog
                    .position(*a_id)
                    .cmp(&catalog.position(*b_id))
            })
        });
        pool.into_iter().take(limit).map(|(id, _)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Movie;

    fn catalog() -> Catalog {
        Catalog::new(
            (1..=4)
                .map(|i| Movie::new(MovieId(i), format!("Movie {}", i), ["Drama"], Vec::<String>::new(), None, 1.0, 1.0))
                .collect(),
        )
    }

    #[test]
    fn test_build_discards_invalid_entries() {
        let catalog = catalog();
        let matrix = RatingMatrix::build(
            &catalog,
            vec![
                RatingEntry::new(1, 1, 4.0),
                RatingEntry::new(1, 99, 4.0),
                RatingEntry::new(2, 1, 9.0),
                RatingEntry::new(2, 2, 3.0),
                RatingEntry::new(2, 2, 5.0),
            ],
            RatingScale::default(),
        );

        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix.discarded(), 3);
        assert_eq!(matrix.user_count(), 2);
        assert_eq!(matrix.ratings_for_movie(MovieId(2)), &[(UserId(2), 5.0)]);
        assert_eq!(matrix.rating_count(MovieId(99)), 0);
    }

    #[test]
    fn test_mean_rating() {
        let catalog = catalog();
        let matrix = RatingMatrix::build(
            &catalog,
            vec![RatingEntry::new(1, 1, 4.0), RatingEntry::new(2, 1, 3.0)],
            RatingScale::default(),
        );
        assert_eq!(matrix.mean_rating(MovieId(1)), Some(3.5));
        assert_eq!(matrix.mean_rating(MovieId(2)), None);
    }

    #[test]
    fn test_top_rated_prefers_liked_movies() {
        let catalog = catalog();
        let matrix = RatingMatrix::build(
            &catalog,
            vec![
                RatingEntry::new(7, 1, 2.0),
                RatingEntry::new(7, 2, 4.5),
                RatingEntry::new(7, 3, 4.0),
                RatingEntry::new(7, 4, 4.5),
            ],
            RatingScale::default(),
        );

        let top = matrix.top_rated_by(&catalog, UserId(7), 4.0, 5);
        assert_eq!(top, vec![MovieId(2), MovieId(4), MovieId(3)]);
    }

    #[test]
    fn test_top_rated_falls_back_to_all_ratings() {
        let catalog = catalog();
        let matrix = RatingMatrix::build(
            &catalog,
            vec![RatingEntry::new(7, 3, 2.0), RatingEntry::new(7, 1, 3.0)],
            RatingScale::default(),
        );

        let top = matrix.top_rated_by(&catalog, UserId(7), 4.0, 1);
        assert_eq!(top, vec![MovieId(1)]);
        assert!(matrix.top_rated_by(&catalog, UserId(8), 4.0, 5).is_empty());
    }
}
