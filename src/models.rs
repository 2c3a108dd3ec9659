use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root of a documentation set, as described by `book.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Book {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// Home page, relative to the book root. The host may change it while navigating.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_path: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

/// A node of the documentation tree. Folder nodes have no `page_path`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Section {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_path: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Book {
    pub fn new(
        title: impl Into<String>,
        page_path: Option<String>,
        author: impl Into<String>,
        sections: Vec<Section>,
    ) -> Self {
        Self {
            title: Some(title.into()),
            author: Some(author.into()),
            page_path,
            sections,
        }
    }

    /// Every section carrying a page path, children before their parent.
    pub fn pages(&self) -> Vec<&Section> {
        let mut out = Vec::new();
        for section in &self.sections {
            section.collect_pages(&mut out);
        }
        out
    }

    /// Number of sections with a name whose page file exists under `root`.
    pub fn content_page_count(&self, root: &Path) -> usize {
        self.pages()
            .into_iter()
            .filter(|s| s.name.is_some())
            .filter_map(|s| s.page_path.as_deref())
            .filter(|p| resolve_page(root, p).is_file())
            .count()
    }
}

impl Section {
    pub fn leaf(name: &str, page_path: &str) -> Self {
        Self {
            name: Some(name.to_string()),
            page_path: Some(page_path.to_string()),
            sections: Vec::new(),
        }
    }

    pub fn folder(name: &str, sections: Vec<Section>) -> Self {
        Self {
            name: Some(name.to_string()),
            page_path: None,
            sections,
        }
    }

    fn collect_pages<'a>(&'a self, out: &mut Vec<&'a Section>) {
        for child in &self.sections {
            child.collect_pages(out);
        }
        if self.page_path.is_some() {
            out.push(self);
        }
    }
}

/// Resolve a book-relative page path against the book root.
///
/// Book files written on Windows use `\` separators; both are accepted.
pub fn resolve_page(root: &Path, relative: &str) -> PathBuf {
    relative
        .split(['\\', '/'])
        .filter(|part| !part.is_empty())
        .fold(root.to_path_buf(), |acc, part| acc.join(part))
}

/// A search or suggestion hit. Suggestion names carry `<b>` markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub name: String,
    pub path: String,
}

/// Flattened view of one content-bearing section, built during indexing.
#[derive(Debug, Clone)]
pub struct IndexedPage<'a> {
    pub name: &'a str,
    pub path: &'a str,
    pub content: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexProgress {
    pub total_pages: usize,
    pub processed_pages: usize,
    pub skipped_pages: usize,
    pub current_page: Option<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub status: String,
}
