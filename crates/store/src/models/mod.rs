mod book;

pub(crate) use self::book::{BookRow, BookValues, from_timestamp, to_timestamp};
