use crate::error::{DocsError, Result};
use directories::ProjectDirs;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Durable index directory, below the namespace directory.
pub const INDEX_DIR_NAME: &str = "search-index";
/// Durable index database file.
pub const INDEX_DB_NAME: &str = "pages.db";
/// Directory name under the application data folder.
pub const NAMESPACE: &str = "DocuPanel";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Maximum number of type-ahead suggestions
    pub suggestion_limit: usize,

    /// Maximum number of hits for name and content searches
    pub search_limit: usize,

    /// Characters of the first paragraph shown per result
    pub excerpt_length: usize,

    /// Rebuild the durable index when it holds no page, even if no rebuild was requested
    #[serde(default)]
    pub rebuild_when_empty: bool,

    /// Custom stylesheet inlined into converted pages (None = built-in style)
    #[serde(default)]
    pub stylesheet: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            suggestion_limit: 5,
            search_limit: 10,
            excerpt_length: 300,
            rebuild_when_empty: true,
            stylesheet: None,
        }
    }
}

/// Filesystem layout of one application data root.
///
/// ```text
/// <appdata>/<namespace>/                 converted HTML pages
/// <appdata>/<namespace>/search-index/    pages.db, search_results.md
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AppPaths {
    pub pages_dir: PathBuf,
    pub index_dir: PathBuf,
}

impl AppPaths {
    pub fn new(app_data: &Path, namespace: &str) -> Self {
        let pages_dir = app_data.join(namespace);
        let index_dir = pages_dir.join(INDEX_DIR_NAME);
        Self { pages_dir, index_dir }
    }

    /// Resolve the layout from an explicit directory or the platform data directory.
    ///
    /// - Linux: `~/.local/share/docupanel/`
    /// - macOS: `~/Library/Application Support/org.rhea.DocuPanel/`
    /// - Windows: `%APPDATA%\rhea\DocuPanel\data\`
    pub fn resolve(custom_dir: Option<&Path>, namespace: &str) -> Result<Self> {
        if let Some(dir) = custom_dir {
            return Ok(Self::new(dir, namespace));
        }

        ProjectDirs::from("org", "rhea", "DocuPanel")
            .map(|dirs| Self::new(dirs.data_dir(), namespace))
            .ok_or_else(|| DocsError::Config("could not determine the application data directory".to_string()))
    }

    pub fn database_path(&self) -> PathBuf {
        self.index_dir.join(INDEX_DB_NAME)
    }

    pub fn create_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.index_dir)?;
        Ok(())
    }
}

/// Settings persisted next to the durable index.
pub struct ConfigManager {
    db_path: PathBuf,
    config: Arc<Mutex<AppConfig>>,
}

impl ConfigManager {
    pub fn new(db_path: PathBuf) -> Result<Self> {
        let config = Arc::new(Mutex::new(AppConfig::default()));
        let manager = Self { db_path, config };

        manager.init_table()?;

        Ok(manager)
    }

    fn get_connection(&self) -> Result<Connection> {
        Ok(Connection::open(&self.db_path)?)
    }

    fn init_table(&self) -> Result<()> {
        let conn = self.get_connection()?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS settings (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                config TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// Load settings, writing the defaults on first use
    pub fn load(&self) -> Result<AppConfig> {
        let conn = self.get_connection()?;

        let result: rusqlite::Result<String> =
            conn.query_row("SELECT config FROM settings WHERE id = 1", [], |row| row.get(0));

        match result {
            Ok(json) => {
                let config: AppConfig = serde_json::from_str(&json).unwrap_or_else(|e| {
                    log::warn!("Stored settings are unreadable ({}), using defaults", e);
                    AppConfig::default()
                });
                self.set_cached(config.clone());
                Ok(config)
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                let default_config = AppConfig::default();
                self.save(&default_config)?;
                Ok(default_config)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, config: &AppConfig) -> Result<()> {
        validate(config)?;
        let conn = self.get_connection()?;

        let json = serde_json::to_string(config).map_err(|e| DocsError::Config(e.to_string()))?;
        let now = chrono::Utc::now().timestamp();

        let updated = conn.execute(
            "UPDATE settings SET config = ?1, updated_at = ?2 WHERE id = 1",
            params![json, now],
        )?;

        if updated == 0 {
            conn.execute(
                "INSERT INTO settings (id, config, created_at, updated_at) VALUES (1, ?1, ?2, ?3)",
                params![json, now, now],
            )?;
        }

        self.set_cached(config.clone());
        Ok(())
    }

    /// Current config (from memory)
    pub fn get(&self) -> AppConfig {
        match self.config.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn update_suggestion_limit(&self, limit: usize) -> Result<()> {
        let mut config = self.get();
        config.suggestion_limit = limit;
        self.save(&config)
    }

    pub fn update_search_limit(&self, limit: usize) -> Result<()> {
        let mut config = self.get();
        config.search_limit = limit;
        self.save(&config)
    }

    fn set_cached(&self, config: AppConfig) {
        if let Ok(mut guard) = self.config.lock() {
            *guard = config;
        }
    }
}

fn validate(config: &AppConfig) -> Result<()> {
    if config.suggestion_limit == 0 || config.search_limit == 0 {
        return Err(DocsError::Config("result limits must be positive".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_default() {
        let temp_file = NamedTempFile::new().unwrap();
        let manager = ConfigManager::new(temp_file.path().to_path_buf()).unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.suggestion_limit, 5);
        assert_eq!(config.search_limit, 10);
        assert_eq!(config.excerpt_length, 300);
    }

    #[test]
    fn test_config_save_load() {
        let temp_file = NamedTempFile::new().unwrap();
        let manager = ConfigManager::new(temp_file.path().to_path_buf()).unwrap();

        let mut config = AppConfig::default();
        config.stylesheet = Some("body { color: red; }".to_string());
        config.excerpt_length = 120;

        manager.save(&config).unwrap();

        let loaded = manager.load().unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_config_update_fields() {
        let temp_file = NamedTempFile::new().unwrap();
        let manager = ConfigManager::new(temp_file.path().to_path_buf()).unwrap();

        manager.load().unwrap();

        manager.update_suggestion_limit(8).unwrap();
        assert_eq!(manager.get().suggestion_limit, 8);

        manager.update_search_limit(20).unwrap();
        assert_eq!(manager.get().search_limit, 20);

        assert!(manager.update_search_limit(0).is_err());
        assert_eq!(manager.get().search_limit, 20);
    }

    #[test]
    fn test_stored_namespace_does_not_move_the_index() {
        let dir = tempfile::tempdir().unwrap();
        let paths = AppPaths::resolve(Some(dir.path()), NAMESPACE).unwrap();
        paths.create_dirs().unwrap();

        let manager = ConfigManager::new(paths.database_path()).unwrap();
        let conn = Connection::open(paths.database_path()).unwrap();
        conn.execute(
            "INSERT INTO settings (id, config, created_at, updated_at) VALUES (1, ?1, 0, 0)",
            params![r#"{"namespace":"Elsewhere","suggestion_limit":7,"search_limit":10,"excerpt_length":300}"#],
        )
        .unwrap();

        let config = manager.load().unwrap();
        assert_eq!(config.suggestion_limit, 7);
        assert_eq!(paths.pages_dir, dir.path().join(NAMESPACE));
        assert!(paths.database_path().starts_with(&paths.pages_dir));
    }

    #[test]
    fn test_paths_layout() {
        let paths = AppPaths::new(Path::new("/data"), "DocuPanel");
        assert_eq!(paths.pages_dir, Path::new("/data/DocuPanel"));
        assert_eq!(paths.index_dir, Path::new("/data/DocuPanel/search-index"));
        assert_eq!(paths.database_path(), Path::new("/data/DocuPanel/search-index/pages.db"));
    }

    #[test]
    fn test_custom_data_dir() {
        let paths = AppPaths::resolve(Some(Path::new("/tmp/custom-data")), "Docs").unwrap();
        assert_eq!(paths.pages_dir, Path::new("/tmp/custom-data/Docs"));
    }
}
