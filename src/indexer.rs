use crate::db;
use crate::error::Result;
use crate::markdown::PageConverter;
use crate::models::{resolve_page, Book, IndexProgress, IndexedPage};
use crate::progress::ProgressTracker;
use crate::suggest::SuggestionIndex;
use rusqlite::Connection;
use std::path::Path;

/// Walk `book` and populate both indexes.
///
/// Pages are visited children-first. The suggestion index is always
/// refreshed; the durable index is only written when `rebuild` is set.
/// Each index is committed once, after the whole walk, so an error leaves
/// both untouched.
pub fn index_book(
    durable: &mut Connection,
    suggestions: &mut SuggestionIndex,
    converter: &dyn PageConverter,
    progress: &ProgressTracker,
    book: &Book,
    root: &Path,
    rebuild: bool,
) -> Result<IndexProgress> {
    if book.sections.is_empty() {
        log::info!("The book has no sections, nothing to index");
        return Ok(progress.get());
    }

    let pages = book.pages();
    progress.start(pages.len(), rebuild);
    log::info!(
        "Indexing {} pages from {:?} (durable rebuild: {})",
        pages.len(),
        root,
        rebuild
    );

    let durable_tx = if rebuild {
        Some(durable.transaction()?)
    } else {
        None
    };
    let writer = suggestions.writer()?;

    for section in pages {
        let Some(relative) = section.page_path.as_deref() else {
            continue;
        };

        let absolute = resolve_page(root, relative);
        if !absolute.is_file() {
            log::warn!("No file could be read at the path {:?}", absolute);
            progress.page_skipped(relative, format!("missing file {}", absolute.display()));
            continue;
        }

        let Some(name) = section.name.as_deref() else {
            log::warn!("Page {} has no name, skipped", relative);
            progress.page_skipped(relative, "unnamed section".to_string());
            continue;
        };

        if let Some(tx) = durable_tx.as_ref() {
            let content = match converter.plain_text(&absolute) {
                Ok(content) => content,
                Err(e) => {
                    log::warn!("Failed to read {:?}: {}", absolute, e);
                    progress.page_skipped(relative, format!("unreadable file: {}", e));
                    continue;
                }
            };
            db::upsert_page(
                tx,
                &IndexedPage {
                    name,
                    path: relative,
                    content,
                },
            )?;
        }

        writer.upsert(name, relative)?;

        progress.page_indexed(relative);
    }

    if let Some(tx) = durable_tx {
        tx.commit()?;
    }
    writer.commit()?;
    progress.committed();

    let summary = progress.get();
    log::info!(
        "Indexed {} pages, skipped {}",
        summary.processed_pages,
        summary.skipped_pages
    );
    Ok(summary)
}
