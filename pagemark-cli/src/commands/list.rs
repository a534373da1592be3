//! List command implementation

use anyhow::Result;
use pagemark_core::{BookRecord, LibraryStore};
use serde::Serialize;

/// One row of list output
#[derive(Serialize)]
struct BookRow {
    id: String,
    title: String,
    author: Option<String>,
    progress: u8,
    categories: Vec<String>,
}

impl From<&BookRecord> for BookRow {
    fn from(record: &BookRecord) -> Self {
        Self {
            id: record.id.to_string(),
            title: record.title.clone(),
            author: record.author.clone(),
            progress: record.reading_progress,
            categories: record.categories.iter().cloned().collect(),
        }
    }
}

/// List books, optionally filtered by category or search query
pub async fn list(
    store: &LibraryStore,
    category: Option<String>,
    search: Option<String>,
    json: bool,
) -> Result<()> {
    let records = match &search {
        Some(query) => store.search(query).await,
        None => store.list().await,
    };
    let records: Vec<&BookRecord> = records
        .iter()
        .filter(|r| {
            category
                .as_deref()
                .map_or(true, |c| r.categories.contains(c))
        })
        .collect();

    if json {
        let rows: Vec<BookRow> = records.iter().map(|r| BookRow::from(*r)).collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No books in the library");
        return Ok(());
    }

    for record in records {
        println!(
            "{}  {:>3}%  {}  {}",
            record.id,
            record.reading_progress,
            record.title,
            record.author.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
