pub mod book;
pub mod commands;
pub mod config;
pub mod db;
pub mod error;
pub mod indexer;
pub mod markdown;
pub mod models;
pub mod progress;
pub mod query;
pub mod render;
pub mod search;
pub mod suggest;

pub use commands::DocumentationSearches;
pub use config::{AppConfig, AppPaths, ConfigManager};
pub use error::{DocsError, Result};
pub use models::{Book, Page, Section};
