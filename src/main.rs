//! DocuPanel search CLI.
//!
//! # Usage
//!
//! ```bash
//! # Index a book (the durable index is reused unless --rebuild is given)
//! docupanel --book docs/book.json index
//!
//! # Type-ahead suggestions and searches
//! docupanel --book docs/book.json suggest "inst"
//! docupanel --book docs/book.json search "user properties"
//! docupanel --book docs/book.json content pietas --json
//!
//! # Render every page of the book to HTML
//! docupanel --book docs/book.json convert
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use docupanel_search::book::load_book;
use docupanel_search::config::{AppPaths, ConfigManager, NAMESPACE};
use docupanel_search::db::Field;
use docupanel_search::markdown::MarkdownToHtml;
use docupanel_search::models::Page;
use docupanel_search::DocumentationSearches;
use std::path::{Path, PathBuf};

/// Index and search a Markdown documentation book.
#[derive(Parser)]
#[command(name = "docupanel", version, about)]
struct Cli {
    /// Path of the book.json describing the documentation tree
    #[arg(long)]
    book: PathBuf,

    /// Custom data directory (default: platform standard location)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Rewrite the durable index even when it already holds pages
    #[arg(long)]
    rebuild: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index the book and report document counts
    Index,
    /// Page names containing the query
    Suggest { query: String },
    /// Search names and contents and write the results page
    Search { query: String },
    /// Pages whose content holds the query
    Content { query: String },
    /// Render the home page and every section page to HTML
    Convert,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let book = load_book(&cli.book).with_context(|| format!("Failed to load {}", cli.book.display()))?;
    let root = book_root(&cli.book);

    let paths = AppPaths::resolve(cli.data_dir.as_deref(), NAMESPACE)?;
    paths.create_dirs()?;
    let config = ConfigManager::new(paths.database_path())?
        .load()
        .context("Failed to load settings")?;

    if let Command::Convert = cli.command {
        let converter = MarkdownToHtml::new(&paths.pages_dir).with_stylesheet(config.stylesheet.clone());
        let converted = converter.convert_book(&book, &root)?;
        println!("Rendered {} pages into {}", converted, paths.pages_dir.display());
        return Ok(());
    }

    let searches = DocumentationSearches::open(paths, config, &book, &root, cli.rebuild)
        .context("Failed to open the search indexes")?;

    match &cli.command {
        Command::Index => {
            let progress = searches.progress();
            println!(
                "Indexed {} of {} pages ({} skipped)",
                progress.processed_pages, progress.total_pages, progress.skipped_pages
            );
            println!(
                "Durable index: {} pages, {} with content",
                searches.num_docs()?,
                searches.doc_count(Field::Content)?
            );
            for warning in &progress.warnings {
                println!("  warning: {}", warning);
            }
        }
        Command::Suggest { query } => {
            print_pages(query, searches.suggest(query), cli.json)?;
        }
        Command::Content { query } => {
            print_pages(query, searches.search_content(query), cli.json)?;
        }
        Command::Search { query } => match searches.search(query) {
            Some(page) => println!("{}", page.display()),
            None => bail!("No results page could be produced for {:?}", query),
        },
        Command::Convert => {}
    }

    searches.close()?;
    Ok(())
}

fn book_root(book_path: &Path) -> PathBuf {
    book_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn print_pages(query: &str, pages: Option<Vec<Page>>, json: bool) -> Result<()> {
    let Some(pages) = pages else {
        eprintln!("Nothing to look up for {:?}", query);
        return Ok(());
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&pages)?);
        return Ok(());
    }

    if pages.is_empty() {
        println!("No pages found for {:?}", query);
    }
    for page in pages {
        println!("{}\t{}", page.name, page.path);
    }
    Ok(())
}
