//! Info command implementation

use anyhow::{Context, Result};
use pagemark_core::LibraryStore;
use uuid::Uuid;

/// Display a book's record
pub async fn info(store: &LibraryStore, id: &str, json: bool) -> Result<()> {
    let id = Uuid::parse_str(id).context("Invalid book id")?;
    let record = store
        .require(id)
        .await
        .with_context(|| format!("No book with id {}", id))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("Title:       {}", record.title);
    if let Some(author) = &record.author {
        println!("Author:      {}", author);
    }
    if let Some(publisher) = &record.publisher {
        println!("Publisher:   {}", publisher);
    }
    if let Some(language) = &record.language {
        println!("Language:    {}", language);
    }
    if let Some(description) = &record.description {
        println!("Description: {}", description);
    }
    if !record.categories.is_empty() {
        let categories: Vec<&str> = record.categories.iter().map(String::as_str).collect();
        println!("Categories:  {}", categories.join(", "));
    }
    println!("Progress:    {}%", record.reading_progress);
    if record.current_page > 0 {
        println!("Page:        {}", record.current_page);
    }
    if let Some(locator) = &record.locator {
        println!("Locator:     {}", locator);
    }
    if let Some(last_read) = &record.last_read {
        println!("Last read:   {}", last_read);
    }
    println!("File size:   {} bytes", record.file_size);
    println!("Added:       {}", record.added_at);
    println!("Id:          {}", record.id);

    Ok(())
}
