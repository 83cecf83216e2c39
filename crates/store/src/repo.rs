//! Repository for the book entity.
//!
//! Every operation is a single SQL statement. Concurrent writers are kept
//! apart by the version column alone: an update only lands if the row still
//! carries the version the caller read, which SQLite checks and applies
//! atomically. Nothing is locked between a caller's read and its write.

use crate::error::{ErrorKind, Result};
use crate::models::{BookRow, BookValues, from_timestamp, to_timestamp};
use crate::{Book, BookPatch, Database};
use exn::ResultExt;
use sqlx::SqlitePool;
use time::UtcDateTime;
use tracing::instrument;

/// Store for [`Book`] records, keyed by id.
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Insert
    // =========================================================================

    /// Store a new book.
    ///
    /// Whatever `id`, `created_at` and `version` the book arrives with are
    /// ignored; the store assigns fresh ones (a new unique id, the current
    /// time, version 1) and writes them back into `book`. There is no
    /// uniqueness constraint on content, so inserting the same book twice
    /// yields two records.
    #[instrument(level = "debug", skip_all, fields(id))]
    pub async fn insert(&self, book: &mut Book) -> Result<()> {
        let values = BookValues::try_from(&*book)?;
        let (id, created_at, version): (i64, i64, i32) = sqlx::query_as(include_str!("../queries/insert_book.sql"))
            .bind(to_timestamp(UtcDateTime::now())?)
            .bind(values.title)
            .bind(values.published)
            .bind(values.pages)
            .bind(values.genres)
            .bind(values.rating)
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::DATABASE)?;
        tracing::Span::current().record("id", id);
        book.id = id;
        book.created_at = from_timestamp(created_at)?;
        book.version = version;
        Ok(())
    }

    // =========================================================================
    // Get/Fetch
    // =========================================================================

    /// Fetch a single book by id.
    ///
    /// Ids below 1 can never exist and are rejected with
    /// [`ErrorKind::NotFound`] without querying the database.
    #[instrument(level = "debug", skip(self))]
    pub async fn get(&self, id: i64) -> Result<Book> {
        if id < 1 {
            exn::bail!(ErrorKind::NotFound);
        }
        let row: Option<BookRow> = sqlx::query_as(include_str!("../queries/get_book.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::DATABASE)?;
        match row {
            Some(row) => row.try_into(),
            None => exn::bail!(ErrorKind::NotFound),
        }
    }

    // =========================================================================
    // Listing
    // =========================================================================

    /// Every book, in ascending id order. An empty store is not an error.
    #[instrument(level = "debug", skip(self))]
    pub async fn get_all(&self) -> Result<Vec<Book>> {
        let rows: Vec<BookRow> = sqlx::query_as(include_str!("../queries/list_books.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::DATABASE)?;
        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Number of books currently stored.
    pub async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar(include_str!("../queries/count_books.sql"))
            .fetch_one(&self.pool)
            .await
            .or_raise(|| ErrorKind::DATABASE)?;
        u64::try_from(count).or_raise(|| ErrorKind::invalid("book count"))
    }

    // =========================================================================
    // Update
    // =========================================================================

    /// Persist the caller-supplied fields of `book`.
    ///
    /// `book.id` and `book.version` must be the values the caller last read.
    /// The write only happens if the stored row still has that exact id and
    /// version; on success the version is bumped by one and written back into
    /// `book`. If the row was modified or deleted in the meantime nothing is
    /// written and [`ErrorKind::EditConflict`] is returned. The store never
    /// retries: re-fetch the book and try again if that's what you want.
    #[instrument(level = "debug", skip_all, fields(id = book.id, version = book.version))]
    pub async fn update(&self, book: &mut Book) -> Result<()> {
        // `created_at` is never rewritten, so whatever the caller holds there
        // is not even looked at.
        let values = BookValues::try_from(&*book)?;
        let version: Option<i32> = sqlx::query_scalar(include_str!("../queries/update_book.sql"))
            .bind(values.title)
            .bind(values.published)
            .bind(values.pages)
            .bind(values.genres)
            .bind(values.rating)
            .bind(book.id)
            .bind(book.version)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::DATABASE)?;
        match version {
            Some(version) => {
                book.version = version;
                Ok(())
            },
            None => exn::bail!(ErrorKind::EditConflict),
        }
    }

    /// Apply a partial update to the book with the given id.
    ///
    /// Reads the current record, overlays the supplied fields of `patch` and
    /// writes it back, conditioned on the version that was read. Fields the
    /// patch doesn't mention keep their stored value. If another writer gets
    /// in between the read and the write, this fails with
    /// [`ErrorKind::EditConflict`].
    #[instrument(level = "debug", skip(self, patch))]
    pub async fn patch(&self, id: i64, patch: BookPatch) -> Result<Book> {
        let mut book = self.get(id).await?;
        patch.apply(&mut book);
        self.update(&mut book).await?;
        Ok(book)
    }

    // =========================================================================
    // Delete
    // =========================================================================

    /// Delete a book by id.
    ///
    /// Deleting an id that doesn't exist (including one that was already
    /// deleted) fails with [`ErrorKind::NotFound`].
    #[instrument(level = "debug", skip(self))]
    pub async fn delete(&self, id: i64) -> Result<()> {
        if id < 1 {
            exn::bail!(ErrorKind::NotFound);
        }
        let result = sqlx::query(include_str!("../queries/delete_book.sql"))
            .bind(id)
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::DATABASE)?;
        if result.rows_affected() == 0 {
            exn::bail!(ErrorKind::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    async fn repo() -> Repository {
        Database::connect_in_memory().await.unwrap().books()
    }

    fn make_test_book(title: &str) -> Book {
        Book::new(title)
            .with_published(1954)
            .with_pages(423)
            .with_genres(["Fantasy", "Adventure"])
            .with_rating(4.8)
    }

    #[tokio::test]
    async fn test_insert_assigns_store_fields() {
        let repo = repo().await;
        let start = UtcDateTime::now();
        let mut book = make_test_book("The Fellowship of the Ring");
        book.id = 999;
        book.version = 42;
        repo.insert(&mut book).await.unwrap();
        assert!(book.id > 0);
        assert_ne!(book.id, 999);
        assert_eq!(book.version, 1);
        assert!(book.created_at >= start);
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let repo = repo().await;
        let mut book = make_test_book("The Two Towers");
        repo.insert(&mut book).await.unwrap();
        let fetched = repo.get(book.id).await.unwrap();
        assert_eq!(fetched, book);
    }

    #[tokio::test]
    async fn test_insert_minimal_book() {
        let repo = repo().await;
        let mut book = Book::new("Untitled");
        repo.insert(&mut book).await.unwrap();
        let fetched = repo.get(book.id).await.unwrap();
        assert_eq!(fetched.published, None);
        assert_eq!(fetched.pages, None);
        assert_eq!(fetched.rating, None);
        assert!(fetched.genres.is_empty());
    }

    #[tokio::test]
    async fn test_insert_duplicate_content() {
        let repo = repo().await;
        let mut first = make_test_book("The Return of the King");
        let mut second = first.clone();
        repo.insert(&mut first).await.unwrap();
        repo.insert(&mut second).await.unwrap();
        assert_ne!(first.id, second.id);
    }

    #[rstest]
    #[case(0)]
    #[case(-1)]
    #[case(i64::MIN)]
    #[tokio::test]
    async fn test_invalid_ids_are_not_found(#[case] id: i64) {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = db.books();
        // Closing the pool proves that no query is attempted: any query would
        // fail with a database error instead.
        db.close().await;
        assert_eq!(*repo.get(id).await.unwrap_err(), ErrorKind::NotFound);
        assert_eq!(*repo.delete(id).await.unwrap_err(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let repo = repo().await;
        assert_eq!(*repo.get(12345).await.unwrap_err(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_closed_pool_is_storage_failure() {
        let db = Database::connect_in_memory().await.unwrap();
        let repo = db.books();
        db.close().await;
        assert!(repo.get(1).await.unwrap_err().is_storage_failure());
        assert!(repo.get_all().await.unwrap_err().is_storage_failure());
        assert!(repo.insert(&mut Book::new("Nope")).await.unwrap_err().is_storage_failure());
        let mut book = Book { id: 1, version: 1, ..Book::new("Nope") };
        assert!(repo.update(&mut book).await.unwrap_err().is_storage_failure());
        assert!(repo.patch(1, BookPatch::default()).await.unwrap_err().is_storage_failure());
        assert!(repo.delete(1).await.unwrap_err().is_storage_failure());
        assert!(repo.count().await.unwrap_err().is_storage_failure());
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let repo = repo().await;
        let mut book = make_test_book("Farmer Giles of Ham");
        repo.insert(&mut book).await.unwrap();
        book.title = "Farmer Giles of Ham (Illustrated)".to_string();
        book.genres = vec!["Novella".to_string()];
        repo.update(&mut book).await.unwrap();
        assert_eq!(book.version, 2);
        let fetched = repo.get(book.id).await.unwrap();
        assert_eq!(fetched.title, "Farmer Giles of Ham (Illustrated)");
        assert_eq!(fetched.genres, vec!["Novella".to_string()]);
        assert_eq!(fetched.version, 2);
        assert_eq!(fetched.created_at, book.created_at);
    }

    #[tokio::test]
    async fn test_stale_update_is_edit_conflict() {
        let repo = repo().await;
        let mut book = make_test_book("Smith of Wootton Major");
        repo.insert(&mut book).await.unwrap();

        let mut first = repo.get(book.id).await.unwrap();
        let mut second = repo.get(book.id).await.unwrap();
        first.pages = Some(100);
        second.pages = Some(200);

        repo.update(&mut first).await.unwrap();
        assert_eq!(first.version, 2);
        let err = repo.update(&mut second).await.unwrap_err();
        assert_eq!(*err, ErrorKind::EditConflict);
        // The loser's copy is untouched so it can tell what it tried to write.
        assert_eq!(second.version, 1);

        let stored = repo.get(book.id).await.unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.pages, Some(100));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_racing_connections_only_one_wins() {
        const WRITERS: usize = 32;
        let dir = tempfile::tempdir().unwrap();
        let db = Database::connect_with_limit(dir.path().join("books.sqlite"), Some(8)).await.unwrap();
        let repo = db.books();
        let mut book = make_test_book("Tree and Leaf");
        repo.insert(&mut book).await.unwrap();

        let mut writers = tokio::task::JoinSet::new();
        for n in 0..WRITERS {
            let repo = repo.clone();
            let mut copy = book.clone();
            copy.pages = Some(n as u32);
            writers.spawn(async move { repo.update(&mut copy).await.map(|()| copy.pages) });
        }
        let (mut won, mut conflicts) = (Vec::new(), 0);
        while let Some(result) = writers.join_next().await {
            match result.unwrap() {
                Ok(pages) => won.push(pages),
                Err(err) if *err == ErrorKind::EditConflict => conflicts += 1,
                Err(err) => panic!("unexpected error: {err:?}"),
            }
        }
        assert_eq!(won.len(), 1);
        assert_eq!(conflicts, WRITERS - 1);

        let stored = repo.get(book.id).await.unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.pages, won[0]);
        db.close().await;
    }

    #[tokio::test]
    async fn test_update_ignores_creation_date() {
        let repo = repo().await;
        let mut book = make_test_book("Mr. Bliss");
        repo.insert(&mut book).await.unwrap();
        let created_at = book.created_at;
        // Year 3000, past what the column can hold.
        book.created_at = UtcDateTime::from_unix_timestamp(32_503_680_000).unwrap();
        book.pages = Some(48);
        repo.update(&mut book).await.unwrap();
        let stored = repo.get(book.id).await.unwrap();
        assert_eq!(stored.created_at, created_at);
        assert_eq!(stored.pages, Some(48));
    }

    #[tokio::test]
    async fn test_non_finite_rating_reads_back_absent() {
        let repo = repo().await;
        let mut book = Book::new("Unrated").with_rating(f32::NAN);
        repo.insert(&mut book).await.unwrap();
        assert_eq!(repo.get(book.id).await.unwrap().rating, None);
    }

    #[tokio::test]
    async fn test_update_deleted_is_edit_conflict() {
        let repo = repo().await;
        let mut book = make_test_book("Roverandom");
        repo.insert(&mut book).await.unwrap();
        repo.delete(book.id).await.unwrap();
        assert_eq!(*repo.update(&mut book).await.unwrap_err(), ErrorKind::EditConflict);
    }

    #[tokio::test]
    async fn test_delete_twice() {
        let repo = repo().await;
        let mut book = make_test_book("The Silmarillion");
        repo.insert(&mut book).await.unwrap();
        repo.delete(book.id).await.unwrap();
        assert_eq!(*repo.delete(book.id).await.unwrap_err(), ErrorKind::NotFound);
        assert_eq!(*repo.get(book.id).await.unwrap_err(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_ids_are_not_reused() {
        let repo = repo().await;
        let mut first = make_test_book("Unfinished Tales");
        repo.insert(&mut first).await.unwrap();
        repo.delete(first.id).await.unwrap();
        let mut second = make_test_book("Unfinished Tales");
        repo.insert(&mut second).await.unwrap();
        assert!(second.id > first.id);
    }

    #[tokio::test]
    async fn test_get_all_empty() {
        let repo = repo().await;
        assert!(repo.get_all().await.unwrap().is_empty());
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_get_all_ordered_by_id() {
        let repo = repo().await;
        let mut ids = Vec::new();
        for title in ["C", "A", "B"] {
            let mut book = make_test_book(title);
            repo.insert(&mut book).await.unwrap();
            ids.push(book.id);
        }
        let mut middle = repo.get(ids[1]).await.unwrap();
        middle.title = "A (revised)".to_string();
        repo.update(&mut middle).await.unwrap();

        let books = repo.get_all().await.unwrap();
        assert_eq!(books.iter().map(|b| b.id).collect::<Vec<_>>(), ids);
        assert_eq!(books[1].title, "A (revised)");
        assert_eq!(repo.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_patch_keeps_unsupplied_fields() {
        let repo = repo().await;
        let mut book = Book::new("A").with_pages(100);
        repo.insert(&mut book).await.unwrap();
        let patch = BookPatch {
            pages: Some(200),
            ..BookPatch::default()
        };
        let patched = repo.patch(book.id, patch).await.unwrap();
        assert_eq!(patched.title, "A");
        assert_eq!(patched.pages, Some(200));
        assert_eq!(patched.version, 2);
        assert_eq!(repo.get(book.id).await.unwrap(), patched);
    }

    #[tokio::test]
    async fn test_patch_missing() {
        let repo = repo().await;
        let err = repo.patch(7, BookPatch::default()).await.unwrap_err();
        assert_eq!(*err, ErrorKind::NotFound);
    }
}
