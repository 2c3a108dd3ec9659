use crate::error::{DocsError, Result};
use crate::models::Book;
use std::fs;
use std::path::Path;

const BOOK_EXTENSION: &str = "json";

/// Read a JSON book descriptor into a fully materialized [`Book`].
pub fn load_book(path: &Path) -> Result<Book> {
    if !path.is_file() {
        return Err(DocsError::NotFound(path.to_path_buf()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    if extension.as_deref() != Some(BOOK_EXTENSION) {
        return Err(DocsError::UnsupportedFormat(format!(
            "the book file must be of type '{}': {}",
            BOOK_EXTENSION,
            path.display()
        )));
    }

    let raw = fs::read_to_string(path)?;
    if raw.trim().is_empty() {
        return Err(DocsError::CorruptData(format!("empty book file: {}", path.display())));
    }

    let book: Option<Book> = serde_json::from_str(&raw)
        .map_err(|e| DocsError::CorruptData(format!("{}: {}", path.display(), e)))?;

    let book = book.ok_or_else(|| {
        DocsError::CorruptData(format!("the book could not be created from {}", path.display()))
    })?;

    log::info!(
        "Loaded book {:?} with {} top-level sections",
        book.title.as_deref().unwrap_or(""),
        book.sections.len()
    );
    Ok(book)
}
