//! Reset command implementation

use anyhow::{ensure, Context, Result};
use pagemark_core::LibraryStore;
use uuid::Uuid;

/// Clear the stored reading position for a book
pub async fn reset(store: &LibraryStore, id: &str) -> Result<()> {
    let id = Uuid::parse_str(id).context("Invalid book id")?;
    ensure!(store.reset_position(id).await?, "No book with id {}", id);

    let record = store.require(id).await?;
    println!("Reset '{}' to unread", record.title);
    Ok(())
}
