//! The book entity.

use serde::Serialize;
use time::UtcDateTime;

/// A book on the reading list.
///
/// `id`, `created_at` and `version` belong to the store: they are assigned by
/// [`Repository::insert`](crate::Repository::insert) and only ever changed by
/// the store itself. Everything else is supplied by the caller.
///
/// # Wire representation
/// `id` and `title` are always serialized. `published`, `pages` and `rating`
/// are left out when they are absent or zero, and `genres` is left out when
/// empty. `created_at` and `version` are internal and never serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Book {
    pub id: i64,
    #[serde(skip)]
    pub created_at: UtcDateTime,
    pub title: String,
    /// Year of publication.
    #[serde(skip_serializing_if = "omit")]
    pub published: Option<i32>,
    #[serde(skip_serializing_if = "omit")]
    pub pages: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub genres: Vec<String>,
    /// SQLite stores NaN as NULL, so a NaN rating reads back as `None`.
    #[serde(skip_serializing_if = "omit")]
    pub rating: Option<f32>,
    /// Optimistic concurrency token. Starts at 1 and is bumped by exactly one
    /// on every successful update.
    #[serde(skip)]
    pub version: i32,
}

fn omit<T: Default + PartialEq>(value: &Option<T>) -> bool {
    value.as_ref().is_none_or(|v| *v == T::default())
}

impl Book {
    /// A book that has not been stored yet.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: 0,
            created_at: UtcDateTime::UNIX_EPOCH,
            title: title.into(),
            published: None,
            pages: None,
            genres: Vec::new(),
            rating: None,
            version: 0,
        }
    }

    pub fn with_published(mut self, year: i32) -> Self {
        self.published = Some(year);
        self
    }

    pub fn with_pages(mut self, pages: u32) -> Self {
        self.pages = Some(pages);
        self
    }

    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = genres.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_rating(mut self, rating: f32) -> Self {
        self.rating = Some(rating);
        self
    }

    /// Whether the store has assigned this book an id.
    pub fn is_persisted(&self) -> bool {
        self.id > 0
    }
}
