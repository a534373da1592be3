//! Delete command implementation

use anyhow::{Context, Result};
use pagemark_core::LibraryStore;
use uuid::Uuid;

/// Remove a book and its stored files from the library
pub async fn delete(store: &LibraryStore, id: &str) -> Result<()> {
    let id = Uuid::parse_str(id).context("Invalid book id")?;
    let record = store
        .require(id)
        .await
        .with_context(|| format!("No book with id {}", id))?;

    store.delete(id).await?;
    println!("Deleted '{}'", record.title);
    Ok(())
}
