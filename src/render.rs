use crate::error::Result;
use crate::markdown::PageConverter;
use crate::models::Page;
use scraper::{Html, Selector};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Summary file written into the output directory before conversion.
pub const RESULTS_FILE_NAME: &str = "search_results.md";

/// Builds the search results page.
pub struct ResultsRenderer<'a> {
    converter: &'a dyn PageConverter,
    excerpt_length: usize,
}

impl<'a> ResultsRenderer<'a> {
    pub fn new(converter: &'a dyn PageConverter, excerpt_length: usize) -> Self {
        Self {
            converter,
            excerpt_length,
        }
    }

    /// Write the summary for `query` into `output_dir`, convert it and
    /// return the converted page.
    pub fn render(
        &self,
        query: &str,
        name_results: &[Page],
        content_results: &[Page],
        output_dir: &Path,
    ) -> Result<PathBuf> {
        let summary = self.summary(query, name_results, content_results);

        fs::create_dir_all(output_dir)?;
        let summary_path = output_dir.join(RESULTS_FILE_NAME);
        fs::write(&summary_path, summary)?;

        self.converter.convert(&summary_path)
    }

    /// Markdown text of the results page.
    pub fn summary(&self, query: &str, name_results: &[Page], content_results: &[Page]) -> String {
        let mut md = String::new();
        let _ = writeln!(md, "# Results for *{}*\n", query);

        for result in name_results {
            if result.path.is_empty() {
                let _ = writeln!(md, "## {}\n", result.name);
            } else {
                self.push_entry(&mut md, "##", result);
            }
        }

        let linked: Vec<&Page> = content_results.iter().filter(|p| !p.path.is_empty()).collect();
        match linked.as_slice() {
            [] => {}
            [only] => {
                let _ = writeln!(md, "## *{}* is contained in the following page\n", query);
                self.push_entry(&mut md, "###", only);
            }
            many => {
                let _ = writeln!(md, "## *{}* is contained in the following pages\n", query);
                for result in many {
                    self.push_entry(&mut md, "###", result);
                }
            }
        }

        md
    }

    fn push_entry(&self, md: &mut String, heading: &str, page: &Page) {
        let html_path = self.converter.html_path(Path::new(&page.path));
        let _ = writeln!(
            md,
            "{} [{}](<{}>)\n",
            heading,
            page.name,
            html_path.display()
        );
        if let Some(excerpt) = excerpt(&html_path, self.excerpt_length) {
            let _ = writeln!(md, "{}\n", excerpt);
        }
    }
}

/// First paragraph of a rendered page, cut to `max_chars` characters plus `...`.
///
/// `None` when the page is missing or holds no paragraph.
pub fn excerpt(html_path: &Path, max_chars: usize) -> Option<String> {
    let html = fs::read_to_string(html_path).ok()?;
    let document = Html::parse_document(&html);
    let selector = Selector::parse("p").ok()?;
    let paragraph = document.select(&selector).next()?;

    let text: String = paragraph.text().collect::<String>();
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }

    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        Some(format!("{}...", cut))
    } else {
        Some(text)
    }
}
