use docupanel_search::book::load_book;
use docupanel_search::config::{AppConfig, AppPaths};
use docupanel_search::db::Field;
use docupanel_search::models::Book;
use docupanel_search::DocumentationSearches;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

fn fixture_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join("Documentation")
}

fn fixture_book() -> Book {
    load_book(&fixture_root().join("book.json")).unwrap()
}

fn open(rebuild: bool) -> (TempDir, DocumentationSearches) {
    let dir = tempdir().unwrap();
    let paths = AppPaths::new(dir.path(), "DocuPanel");
    let searches =
        DocumentationSearches::open(paths, AppConfig::default(), &fixture_book(), &fixture_root(), rebuild).unwrap();
    (dir, searches)
}

#[test]
fn test_fixture_book_loads() {
    let book = fixture_book();
    assert_eq!(book.author.as_deref(), Some("RHEA System S.A."));
    assert_eq!(book.page_path.as_deref(), Some("index.md"));
    assert_eq!(book.sections.len(), 3);
    assert_eq!(book.content_page_count(&fixture_root()), 5);
}

#[test]
fn test_index_holds_every_content_page() {
    let (_dir, searches) = open(true);

    assert_eq!(searches.num_docs().unwrap(), 5);
    assert_eq!(searches.doc_count(Field::Path).unwrap(), 5);
    assert_eq!(searches.doc_count(Field::Name).unwrap(), 5);
    assert_eq!(searches.doc_count(Field::Content).unwrap(), 5);
    assert_eq!(searches.suggestion_index().doc_count(Field::Name).unwrap(), 5);

    let progress = searches.progress();
    assert_eq!(progress.processed_pages, 5);
    assert_eq!(progress.skipped_pages, 0);
    assert_eq!(progress.status, "completed");
}

#[test]
fn test_reindexing_does_not_duplicate() {
    let (_dir, mut searches) = open(true);

    searches.index(&fixture_book(), &fixture_root(), true).unwrap();
    searches.index(&fixture_book(), &fixture_root(), false).unwrap();

    assert_eq!(searches.num_docs().unwrap(), 5);
    assert_eq!(searches.suggestion_index().num_docs().unwrap(), 5);
}

#[test]
fn test_suggest() {
    let (_dir, searches) = open(false);

    assert_eq!(searches.suggest(""), None);
    assert_eq!(searches.suggest(" "), None);
    assert_eq!(searches.suggest("zzz-not-present"), Some(vec![]));
    assert_eq!(searches.suggest("Hello"), Some(vec![]));
    assert_eq!(searches.suggest("installation"), Some(vec![]));

    let intro = searches.suggest("Intro").unwrap();
    assert_eq!(intro.len(), 2);
    assert!(intro.iter().all(|p| p.name == "<b>Intro</b>duction"));
    let mut paths: Vec<&str> = intro.iter().map(|p| p.path.as_str()).collect();
    paths.sort();
    assert_eq!(
        paths,
        vec!["1_intro_Introduction.md", r"Installation\1_installintro_Introduction.md"]
    );

    let step = searches.suggest("step").unwrap();
    assert_eq!(step.len(), 1);
    assert_eq!(step[0].name, "<b>Step</b> by <b>Step</b>");
    assert_eq!(step[0].path, r"Installation\2_installstep_Step_by_Step.md");
}

#[test]
fn test_search_content() {
    let (_dir, searches) = open(true);

    assert_eq!(searches.search_content(""), None);
    assert_eq!(searches.search_content("Not_present_in_the_doc"), Some(vec![]));

    let hits = searches.search_content("PIETAS").unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name, "Quick Start");
    assert_eq!(hits[0].path, "2_quickstart_Quick_Start.md");
}

#[test]
fn test_search_renders_results_page() {
    let (_dir, searches) = open(true);

    assert_eq!(searches.search("   "), None);

    let page = searches.search("installation").unwrap();
    assert!(page.is_file());
    assert_eq!(page.extension().and_then(|e| e.to_str()), Some("html"));

    let page = searches.search("pietas").unwrap();
    let html = fs::read_to_string(&page).unwrap();
    assert!(html.contains("Results for"));
    assert!(html.contains("Quick Start"));
    assert!(html.contains("2_quickstart_Quick_Start.html"));

    let page = searches.search("Not_present_in_the_doc").unwrap();
    assert!(page.is_file());
}

#[test]
fn test_results_page_carries_excerpts_of_rendered_pages() {
    let (_dir, searches) = open(true);

    let pages_dir = &searches.paths().pages_dir;
    assert!(pages_dir.join("index.html").is_file());
    assert!(pages_dir.join("1_installintro_Introduction.html").is_file());

    let page = searches.search("introduction").unwrap();
    let html = fs::read_to_string(&page).unwrap();
    assert!(html.contains("This documentation describes how to get started with the application."));
    assert!(html.contains("Before installing, make sure the prerequisites are available on the machine."));
}

#[test]
fn test_latin1_page_is_indexed() {
    let dir = tempdir().unwrap();
    let root = dir.path().join("docs");
    fs::create_dir_all(&root).unwrap();
    fs::write(root.join("a.md"), "# Intro\n\nPlain page.").unwrap();
    fs::write(root.join("b.md"), b"# Caf\xe9\n\nMenu du jour.\n").unwrap();
    let book: Book = serde_json::from_str(
        r#"{"Title":"Docs","Sections":[{"Name":"Intro","PagePath":"a.md"},{"Name":"Cafe","PagePath":"b.md"}]}"#,
    )
    .unwrap();

    let paths = AppPaths::new(&dir.path().join("appdata"), "DocuPanel");
    let searches = DocumentationSearches::open(paths, AppConfig::default(), &book, &root, true).unwrap();

    assert_eq!(searches.num_docs().unwrap(), 2);
    assert_eq!(searches.search_content("jour").unwrap()[0].path, "b.md");
}

#[test]
fn test_search_lists_name_hits_once() {
    let (_dir, searches) = open(true);

    let page = searches.search("introduction").unwrap();
    let html = fs::read_to_string(&page).unwrap();
    assert_eq!(html.matches("1_intro_Introduction.html").count(), 1);
}

#[test]
fn test_close_and_reopen_keeps_durable_index() {
    let dir = tempdir().unwrap();
    let paths = AppPaths::new(dir.path(), "DocuPanel");

    let searches =
        DocumentationSearches::open(paths.clone(), AppConfig::default(), &fixture_book(), &fixture_root(), true)
            .unwrap();
    searches.close().unwrap();

    let reopened =
        DocumentationSearches::open(paths, AppConfig::default(), &fixture_book(), &fixture_root(), false).unwrap();
    assert_eq!(reopened.num_docs().unwrap(), 5);
    assert_eq!(reopened.search_content("pietas").unwrap().len(), 1);
}
