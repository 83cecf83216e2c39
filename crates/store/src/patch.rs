use crate::Book;
use serde::Deserialize;

/// The fields a caller wants to change on an existing [`Book`].
///
/// Every field is optional; `None` means "not supplied, keep what's stored".
/// Deserializing rejects unknown fields so that typos don't silently turn
/// into no-ops.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BookPatch {
    pub title: Option<String>,
    pub published: Option<i32>,
    pub pages: Option<u32>,
    /// Replaces the stored genres wholesale. An empty list counts as not
    /// supplied.
    pub genres: Option<Vec<String>>,
    pub rating: Option<f32>,
}

impl BookPatch {
    /// Whether the patch would leave a book unchanged.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.published.is_none()
            && self.pages.is_none()
            && self.genres.as_ref().is_none_or(Vec::is_empty)
            && self.rating.is_none()
    }

    /// Overlay the supplied fields onto `book`.
    ///
    /// The store-managed fields (`id`, `created_at`, `version`) are never
    /// touched, so the result can be handed straight to
    /// [`Repository::update`](crate::Repository::update).
    pub fn apply(self, book: &mut Book) {
        if let Some(title) = self.title {
            book.title = title;
        }
        if let Some(published) = self.published {
            book.published = Some(published);
        }
        if let Some(pages) = self.pages {
            book.pages = Some(pages);
        }
        if let Some(genres) = self.genres.filter(|g| !g.is_empty()) {
            book.genres = genres;
        }
        if let Some(rating) = self.rating {
            book.rating = Some(rating);
        }
    }
}
