use clap::{ArgAction, Args, Parser, Subcommand};
use readinglist_store::{Book, BookPatch};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "readinglist", version, about = "Keep track of the books on your reading list")]
pub struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, short, global = true, env = "READINGLIST_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file, overriding the configured one
    #[arg(long, global = true)]
    pub database: Option<PathBuf>,

    /// More logging; repeat for even more (-v, -vv, -vvv)
    #[arg(long, short, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Report availability, environment and version
    Status,
    /// List every book, oldest first
    List,
    /// Show a single book
    Get {
        #[arg(allow_negative_numbers = true)]
        id: i64,
    },
    /// Add a book to the reading list
    Add {
        title: String,
        #[command(flatten)]
        fields: BookFields,
    },
    /// Change some of a book's details, keeping the rest
    Update {
        #[arg(allow_negative_numbers = true)]
        id: i64,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: BookFields,
    },
    /// Remove a book from the reading list
    Delete {
        #[arg(allow_negative_numbers = true)]
        id: i64,
    },
}

/// Optional book details shared by `add` and `update`.
#[derive(Debug, Args)]
pub struct BookFields {
    /// Year of publication
    #[arg(long, value_name = "YEAR")]
    pub published: Option<i32>,
    #[arg(long)]
    pub pages: Option<u32>,
    /// Genre; repeat for several (replaces all stored genres on update)
    #[arg(long = "genre", value_name = "GENRE")]
    pub genres: Vec<String>,
    #[arg(long, value_parser = finite_rating)]
    pub rating: Option<f32>,
}

fn finite_rating(value: &str) -> Result<f32, String> {
    match value.parse::<f32>() {
        Ok(rating) if rating.is_finite() => Ok(rating),
        Ok(_) => Err("rating must be a finite number".to_string()),
        Err(err) => Err(err.to_string()),
    }
}

impl BookFields {
    pub fn into_book(self, title: String) -> Book {
        Book {
            published: self.published,
            pages: self.pages,
            genres: self.genres,
            rating: self.rating,
            ..Book::new(title)
        }
    }

    pub fn into_patch(self, title: Option<String>) -> BookPatch {
        BookPatch {
            title,
            published: self.published,
            pages: self.pages,
            genres: (!self.genres.is_empty()).then_some(self.genres),
            rating: self.rating,
        }
    }
}
