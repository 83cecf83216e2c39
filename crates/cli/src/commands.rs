use crate::args::Command;
use crate::envelope::{Envelope, Status};
use crate::error::{ErrorKind, Result};
use readinglist_config::Environment;
use readinglist_store::Repository;

/// Run a single command against the book store.
pub async fn run(command: Command, books: &Repository, environment: Environment) -> Result<Envelope> {
    Ok(match command {
        Command::Status => {
            let count = books.count().await.map_err(ErrorKind::store)?;
            Envelope::Status(Status::available(environment, count))
        },
        Command::List => Envelope::Books(books.get_all().await.map_err(ErrorKind::store)?),
        Command::Get { id } => Envelope::Book(books.get(id).await.map_err(ErrorKind::store)?),
        Command::Add { title, fields } => {
            let mut book = fields.into_book(title);
            books.insert(&mut book).await.map_err(ErrorKind::store)?;
            tracing::info!(id = book.id, "added book");
            Envelope::Book(book)
        },
        Command::Update { id, title, fields } => {
            let patch = fields.into_patch(title);
            if patch.is_empty() {
                exn::bail!(ErrorKind::Usage("nothing to update"));
            }
            let book = books.patch(id, patch).await.map_err(ErrorKind::store)?;
            tracing::info!(id, version = book.version, "updated book");
            Envelope::Book(book)
        },
        Command::Delete { id } => {
            books.delete(id).await.map_err(ErrorKind::store)?;
            tracing::info!(id, "deleted book");
            Envelope::Deleted(id)
        },
    })
}
