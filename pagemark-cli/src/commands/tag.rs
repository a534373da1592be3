//! Tag command implementation

use anyhow::{ensure, Context, Result};
use pagemark_core::LibraryStore;
use uuid::Uuid;

/// Add and remove categories on a book
pub async fn tag(
    store: &LibraryStore,
    id: &str,
    add: Vec<String>,
    remove: Vec<String>,
) -> Result<()> {
    let id = Uuid::parse_str(id).context("Invalid book id")?;
    ensure!(store.contains(id).await, "No book with id {}", id);

    for category in &add {
        store.add_category(id, category).await?;
    }
    for category in &remove {
        store.remove_category(id, category).await?;
    }

    let record = store.require(id).await?;
    if record.categories.is_empty() {
        println!("'{}' has no categories", record.title);
    } else {
        let categories: Vec<&str> = record.categories.iter().map(String::as_str).collect();
        println!("'{}': {}", record.title, categories.join(", "));
    }
    Ok(())
}
