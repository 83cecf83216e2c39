use crate::Book;
use crate::error::{Error, ErrorKind};
use exn::ResultExt;
use serde_json::{from_str as from_json, to_string as to_json};
use time::UtcDateTime;

#[derive(sqlx::FromRow)]
pub(crate) struct BookRow {
    pub(crate) id: i64,
    pub(crate) created_at: i64,
    pub(crate) title: String,
    pub(crate) published: Option<i64>,
    pub(crate) pages: Option<i64>,
    pub(crate) genres: String,
    pub(crate) rating: Option<f32>,
    pub(crate) version: i32,
}

/// The columns a caller may write. The store's own columns (`id`,
/// `created_at`, `version`) are bound separately, if at all.
pub(crate) struct BookValues {
    pub(crate) title: String,
    pub(crate) published: Option<i64>,
    pub(crate) pages: Option<i64>,
    pub(crate) genres: String,
    pub(crate) rating: Option<f32>,
}

pub(crate) fn to_timestamp(datetime: UtcDateTime) -> Result<i64, Error> {
    i64::try_from(datetime.unix_timestamp_nanos()).or_raise(|| ErrorKind::invalid("creation date"))
}

pub(crate) fn from_timestamp(nanos: i64) -> Result<UtcDateTime, Error> {
    UtcDateTime::from_unix_timestamp_nanos(i128::from(nanos)).or_raise(|| ErrorKind::invalid("creation date"))
}

impl TryFrom<&Book> for BookValues {
    type Error = Error;
    fn try_from(book: &Book) -> Result<Self, Self::Error> {
        Ok(Self {
            title: book.title.clone(),
            published: book.published.map(i64::from),
            pages: book.pages.map(i64::from),
            genres: to_json(&book.genres).or_raise(|| ErrorKind::invalid("genres"))?,
            rating: book.rating,
        })
    }
}
impl TryFrom<BookRow> for Book {
    type Error = Error;
    fn try_from(row: BookRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            created_at: from_timestamp(row.created_at)?,
            title: row.title,
            published: row
                .published
                .map(|p| i32::try_from(p).or_raise(|| ErrorKind::invalid("publication year")))
                .transpose()?,
            pages: row
                .pages
                .map(|p| u32::try_from(p).or_raise(|| ErrorKind::invalid("page count")))
                .transpose()?,
            genres: from_json::<Vec<String>>(&row.genres).or_raise(|| ErrorKind::invalid("genres"))?,
            rating: row.rating,
            version: row.version,
        })
    }
}
