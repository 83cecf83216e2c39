//! Tagged output envelopes.
//!
//! Every response is a single JSON object whose only key names the payload,
//! e.g. `{"book": {...}}` or `{"books": [...]}`.

use readinglist_config::Environment;
use readinglist_store::Book;
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Envelope {
    Book(Book),
    Books(Vec<Book>),
    Status(Status),
    /// Id of the book that was removed.
    Deleted(i64),
    Error(String),
}

#[derive(Debug, Serialize)]
pub struct Status {
    pub state: &'static str,
    pub environment: Environment,
    pub version: &'static str,
    pub books: u64,
}
impl Status {
    pub fn available(environment: Environment, books: u64) -> Self {
        Self {
            state: "available",
            environment,
            version: env!("CARGO_PKG_VERSION"),
            books,
        }
    }
}

impl Envelope {
    /// Pretty-printed JSON, newline terminated.
    pub fn to_json(&self) -> serde_json::Result<String> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}
