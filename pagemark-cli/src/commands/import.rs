//! Import command implementation

use anyhow::{Context, Result};
use pagemark_core::{BookMetadata, LibraryStore};
use std::path::Path;
use tracing::debug;

/// Import an ebook file into the library
pub async fn import(
    store: &LibraryStore,
    input: &str,
    title: Option<String>,
    author: Option<String>,
    language: Option<String>,
    categories: Vec<String>,
) -> Result<()> {
    let input_path = Path::new(input);
    let data = tokio::fs::read(input_path)
        .await
        .with_context(|| format!("Failed to read input file: {}", input))?;
    debug!("read {} bytes from {}", data.len(), input);

    let title = title.unwrap_or_else(|| {
        input_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "Untitled".to_string())
    });

    let mut metadata = BookMetadata::titled(title);
    if let Some(author) = author {
        metadata = metadata.with_author(author);
    }
    if let Some(language) = language {
        metadata = metadata.with_language(language);
    }

    let record = store
        .import(data, metadata, None)
        .await
        .context("Failed to import book")?;
    for category in &categories {
        store.add_category(record.id, category).await?;
    }

    println!("Imported '{}' ({})", record.title, record.id);
    Ok(())
}
