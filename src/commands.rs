//! Operations exposed to the host: indexing, suggestions, searches.

use crate::config::{AppConfig, AppPaths};
use crate::db::{self, Field, SearcherManager};
use crate::error::Result;
use crate::indexer;
use crate::markdown::{MarkdownToHtml, PageConverter};
use crate::models::{Book, IndexProgress, Page};
use crate::progress::{IndexEvent, ProgressTracker};
use crate::render::ResultsRenderer;
use crate::search;
use crate::suggest::{Suggester, SuggestionIndex};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

/// Search session over one documentation root.
///
/// Owns the durable index writer, its searcher, and the in-memory
/// suggestion index. Switching to another documentation root means closing
/// this value and opening a new one.
pub struct DocumentationSearches {
    paths: AppPaths,
    config: AppConfig,
    writer: Connection,
    searcher: SearcherManager,
    suggestions: SuggestionIndex,
    suggester: Suggester,
    converter: Box<dyn PageConverter>,
    progress: ProgressTracker,
}

impl DocumentationSearches {
    /// Open the indexes under `paths` and index `book` (rooted at `book_root`).
    ///
    /// A forced rebuild first renders every page not rendered yet, so result
    /// excerpts can be read from them.
    pub fn open(
        paths: AppPaths,
        config: AppConfig,
        book: &Book,
        book_root: &Path,
        force_rebuild: bool,
    ) -> Result<Self> {
        let converter = MarkdownToHtml::new(&paths.pages_dir).with_stylesheet(config.stylesheet.clone());
        if force_rebuild {
            converter.convert_book(book, book_root)?;
        }
        let mut searches = Self::with_converter(paths, config, Box::new(converter))?;
        searches.index(book, book_root, force_rebuild)?;
        Ok(searches)
    }

    /// Open empty indexes with a custom page converter.
    pub fn with_converter(
        paths: AppPaths,
        config: AppConfig,
        converter: Box<dyn PageConverter>,
    ) -> Result<Self> {
        paths.create_dirs()?;
        let db_path = paths.database_path();

        let writer = db::open_index(&db_path)?;
        let searcher = SearcherManager::open(&db_path)?;
        let suggestions = SuggestionIndex::open_in_memory()?;
        let suggester = Suggester::new(config.suggestion_limit);

        Ok(Self {
            paths,
            config,
            writer,
            searcher,
            suggestions,
            suggester,
            converter,
            progress: ProgressTracker::new(),
        })
    }

    /// Receive [`IndexEvent`]s from subsequent indexing passes.
    pub fn subscribe(&self, sender: Sender<IndexEvent>) {
        self.progress.subscribe(sender);
    }

    /// Index every page of `book`. The durable index is only rewritten when
    /// `force_rebuild` is set, or when it is empty and the configuration asks
    /// to rebuild empty indexes.
    pub fn index(&mut self, book: &Book, book_root: &Path, force_rebuild: bool) -> Result<IndexProgress> {
        let rebuild = force_rebuild
            || (self.config.rebuild_when_empty && db::num_docs(&self.writer)? == 0);
        if rebuild && !force_rebuild {
            log::info!("Durable index is empty, rebuilding it");
        }

        indexer::index_book(
            &mut self.writer,
            &mut self.suggestions,
            self.converter.as_ref(),
            &self.progress,
            book,
            book_root,
            rebuild,
        )
    }

    /// Up to `suggestion_limit` pages whose name contains `query`.
    ///
    /// `None` for blank input or when suggestions are unavailable.
    pub fn suggest(&self, query: &str) -> Option<Vec<Page>> {
        self.suggester.suggest(&self.suggestions, query)
    }

    /// Run `query` against names and contents and render the results page.
    ///
    /// `None` for blank input or when the page cannot be written.
    pub fn search(&self, query: &str) -> Option<PathBuf> {
        if query.trim().is_empty() {
            return None;
        }

        let name_results = match self.search_names(query) {
            Ok(results) => results,
            Err(e) => {
                log::error!("Name search failed for {:?}: {}", query, e);
                Vec::new()
            }
        };
        let content_results = self.search_content(query).unwrap_or_default();
        let content_results = search::dedup_content(&name_results, content_results);

        let renderer = ResultsRenderer::new(self.converter.as_ref(), self.config.excerpt_length);
        match renderer.render(query, &name_results, &content_results, &self.paths.index_dir) {
            Ok(path) => Some(path),
            Err(e) => {
                log::error!("Failed to write the results page for {:?}: {}", query, e);
                None
            }
        }
    }

    /// Pages whose content holds the exact lower-cased `query`.
    ///
    /// `None` for blank input; failures are logged and yield an empty list.
    pub fn search_content(&self, query: &str) -> Option<Vec<Page>> {
        if query.trim().is_empty() {
            return None;
        }

        let limit = self.config.search_limit;
        let results = self
            .refreshed()
            .and_then(|_| self.searcher.execute(|conn| search::search_content(conn, query, limit)));

        match results {
            Ok(results) => Some(results),
            Err(e) => {
                log::error!("Content search failed for {:?}: {}", query, e);
                Some(Vec::new())
            }
        }
    }

    fn search_names(&self, query: &str) -> Result<Vec<Page>> {
        self.refreshed()?;
        let limit = self.config.search_limit;
        self.searcher.execute(|conn| search::search_names(conn, query, limit))
    }

    fn refreshed(&self) -> Result<()> {
        self.searcher.maybe_refresh_blocking()?;
        Ok(())
    }

    /// Pages in the durable index.
    pub fn num_docs(&self) -> Result<usize> {
        db::num_docs(&self.writer)
    }

    /// Durable pages with a non-empty `field`.
    pub fn doc_count(&self, field: Field) -> Result<usize> {
        db::doc_count(&self.writer, field)
    }

    pub fn suggestion_index(&self) -> &SuggestionIndex {
        &self.suggestions
    }

    pub fn converter(&self) -> &dyn PageConverter {
        self.converter.as_ref()
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn progress(&self) -> IndexProgress {
        self.progress.get()
    }

    /// Release the writer, the searcher, the suggestion index and the cached lookup.
    pub fn close(self) -> Result<()> {
        let Self {
            writer,
            searcher,
            suggestions,
            suggester,
            ..
        } = self;

        suggester.reset();
        searcher.close()?;
        suggestions.close()?;
        writer.close().map_err(|(_, e)| e.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Section;
    use std::fs;
    use std::sync::mpsc;
    use tempfile::tempdir;

    fn setup(dir: &Path) -> (Book, PathBuf, AppPaths) {
        let root = dir.join("docs");
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join("intro.md"), "# Introduction\n\nHello world, welcome.").unwrap();
        fs::write(root.join("start.md"), "# Quick Start\n\nLorem pietas ipsum.").unwrap();
        let book = Book::new(
            "Docs",
            None,
            "me",
            vec![
                Section::leaf("Introduction", "intro.md"),
                Section::leaf("Quick Start", "start.md"),
            ],
        );
        (book, root, AppPaths::new(&dir.join("appdata"), "DocuPanel"))
    }

    #[test]
    fn test_open_indexes_and_answers() {
        let dir = tempdir().unwrap();
        let (book, root, paths) = setup(dir.path());

        let searches = DocumentationSearches::open(paths, AppConfig::default(), &book, &root, true).unwrap();

        assert_eq!(searches.num_docs().unwrap(), 2);
        assert_eq!(searches.suggest("quick").unwrap().len(), 1);
        assert_eq!(searches.search_content("pietas").unwrap()[0].path, "start.md");
        assert!(searches.search("   ").is_none());

        let page = searches.search("introduction").unwrap();
        assert!(page.is_file());

        searches.close().unwrap();
    }

    #[test]
    fn test_forced_rebuild_renders_pages_first() {
        let dir = tempdir().unwrap();
        let (book, root, paths) = setup(dir.path());

        let searches =
            DocumentationSearches::open(paths.clone(), AppConfig::default(), &book, &root, true).unwrap();
        assert!(paths.pages_dir.join("intro.html").is_file());
        assert!(paths.pages_dir.join("start.html").is_file());

        let page = searches.search("quick").unwrap();
        let html = fs::read_to_string(page).unwrap();
        assert!(html.contains("Lorem pietas ipsum."));
    }

    #[test]
    fn test_non_utf8_page_keeps_session_usable() {
        let dir = tempdir().unwrap();
        let (mut book, root, paths) = setup(dir.path());
        fs::write(root.join("cafe.md"), b"# Caf\xe9\n\nCr\xe8me br\xfbl\xe9e.\n").unwrap();
        book.sections.push(Section::leaf("Cafe", "cafe.md"));

        let searches = DocumentationSearches::open(paths, AppConfig::default(), &book, &root, true).unwrap();

        assert_eq!(searches.num_docs().unwrap(), 3);
        assert_eq!(searches.suggest("caf").unwrap().len(), 1);
        assert_eq!(searches.search_content("pietas").unwrap().len(), 1);
    }

    #[test]
    fn test_reuse_does_not_render_pages() {
        let dir = tempdir().unwrap();
        let (book, root, paths) = setup(dir.path());

        DocumentationSearches::open(paths.clone(), AppConfig::default(), &book, &root, false).unwrap();
        assert!(!paths.pages_dir.join("intro.html").exists());
    }

    #[test]
    fn test_empty_durable_index_is_rebuilt() {
        let dir = tempdir().unwrap();
        let (book, root, paths) = setup(dir.path());

        let searches = DocumentationSearches::open(paths, AppConfig::default(), &book, &root, false).unwrap();
        assert_eq!(searches.num_docs().unwrap(), 2);
    }

    #[test]
    fn test_reuse_without_rebuild() {
        let dir = tempdir().unwrap();
        let (book, root, paths) = setup(dir.path());
        let config = AppConfig {
            rebuild_when_empty: false,
            ..AppConfig::default()
        };

        let searches = DocumentationSearches::open(paths, config, &book, &root, false).unwrap();
        assert_eq!(searches.num_docs().unwrap(), 0);
        assert_eq!(searches.suggest("intro").unwrap().len(), 1);
        assert_eq!(searches.search_content("pietas"), Some(vec![]));
    }

    #[test]
    fn test_reopen_reuses_durable_index() {
        let dir = tempdir().unwrap();
        let (book, root, paths) = setup(dir.path());

        let searches =
            DocumentationSearches::open(paths.clone(), AppConfig::default(), &book, &root, true).unwrap();
        searches.close().unwrap();

        let reopened = DocumentationSearches::open(paths, AppConfig::default(), &book, &root, false).unwrap();
        assert_eq!(reopened.num_docs().unwrap(), 2);
        assert_eq!(reopened.search_content("pietas").unwrap().len(), 1);
        assert_eq!(reopened.suggest("start").unwrap().len(), 1);
    }

    #[test]
    fn test_events_are_published() {
        let dir = tempdir().unwrap();
        let (book, root, paths) = setup(dir.path());

        let mut searches = DocumentationSearches::with_converter(
            paths.clone(),
            AppConfig::default(),
            Box::new(MarkdownToHtml::new(&paths.pages_dir)),
        )
        .unwrap();
        let (tx, rx) = mpsc::channel();
        searches.subscribe(tx);
        searches.index(&book, &root, true).unwrap();

        let events: Vec<IndexEvent> = rx.try_iter().collect();
        assert_eq!(events.first(), Some(&IndexEvent::Started { total_pages: 2, rebuild: true }));
        assert_eq!(events.last(), Some(&IndexEvent::Committed { pages: 2 }));
    }
}
