use crate::error::{DocsError, Result};
use crate::models::{resolve_page, Book};
use pulldown_cmark::{html, Event, Options, Parser, Tag, TagEnd};
use std::fs;
use std::path::{Path, PathBuf};

const HTML_EXTENSION: &str = "html";

const DEFAULT_STYLESHEET: &str = "\
.markdown-body { font-family: -apple-system, \"Segoe UI\", Helvetica, Arial, sans-serif; \
font-size: 16px; line-height: 1.5; max-width: 980px; margin: 0 auto; padding: 45px; color: #24292e; }
.markdown-body h1, .markdown-body h2 { border-bottom: 1px solid #eaecef; padding-bottom: .3em; }
.markdown-body code { background-color: rgba(27,31,35,.05); border-radius: 3px; padding: .2em .4em; }
.markdown-body pre { background-color: #f6f8fa; border-radius: 3px; padding: 16px; overflow: auto; }
.markdown-body table { border-collapse: collapse; }
.markdown-body td, .markdown-body th { border: 1px solid #dfe2e5; padding: 6px 13px; }
";

/// Seam to the page renderer: where a page's displayable form lives, how to
/// produce it, and what text of it gets indexed.
pub trait PageConverter: Send + Sync {
    /// Rendered location of a Markdown file.
    fn html_path(&self, markdown_path: &Path) -> PathBuf;

    /// Render `markdown_path`, overwriting any previous rendering.
    fn convert(&self, markdown_path: &Path) -> Result<PathBuf>;

    /// Indexable text of a page.
    fn plain_text(&self, markdown_path: &Path) -> Result<String>;

    fn is_converted(&self, markdown_path: &Path) -> bool {
        self.html_path(markdown_path).is_file()
    }
}

/// Renders Markdown pages into standalone HTML files inside `pages_dir`.
pub struct MarkdownToHtml {
    pages_dir: PathBuf,
    stylesheet: String,
}

impl MarkdownToHtml {
    pub fn new(pages_dir: impl Into<PathBuf>) -> Self {
        Self {
            pages_dir: pages_dir.into(),
            stylesheet: DEFAULT_STYLESHEET.to_string(),
        }
    }

    pub fn with_stylesheet(mut self, css: Option<String>) -> Self {
        if let Some(css) = css {
            self.stylesheet = css;
        }
        self
    }

    pub fn pages_dir(&self) -> &Path {
        &self.pages_dir
    }

    /// Render the home page and every section page not rendered yet.
    /// Missing pages are logged and skipped. Returns the number of pages rendered.
    pub fn convert_book(&self, book: &Book, root: &Path) -> Result<usize> {
        let mut converted = 0;

        let relative_pages = book
            .page_path
            .iter()
            .map(String::as_str)
            .chain(book.pages().into_iter().filter_map(|s| s.page_path.as_deref()));

        for relative in relative_pages {
            let absolute = resolve_page(root, relative);
            if !absolute.is_file() {
                log::warn!("No file could be read at the path {:?}", absolute);
                continue;
            }
            if self.is_converted(&absolute) {
                continue;
            }
            match self.convert(&absolute) {
                Ok(_) => converted += 1,
                Err(e) => log::warn!("Failed to render {:?}: {}", absolute, e),
            }
        }

        log::info!("Rendered {} pages into {:?}", converted, self.pages_dir);
        Ok(converted)
    }

    fn wrap_html_body(&self, body: &str) -> String {
        format!(
            "<html><head><meta charset=\"utf-8\"><style>{}</style></head><body>\n<article class=\"markdown-body\">\n{}\n</article></body></html>\n",
            self.stylesheet, body
        )
    }
}

fn parser_options() -> Options {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);
    options.insert(Options::ENABLE_HEADING_ATTRIBUTES);
    options
}

impl PageConverter for MarkdownToHtml {
    fn html_path(&self, markdown_path: &Path) -> PathBuf {
        // Book paths may carry `\` separators on any platform.
        let raw = markdown_path.to_string_lossy();
        let file_name = raw.rsplit(['\\', '/']).next().unwrap_or_default();
        let stem = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_default();
        let mut file_name = PathBuf::from(stem);
        file_name.set_extension(HTML_EXTENSION);
        self.pages_dir.join(file_name)
    }

    fn convert(&self, markdown_path: &Path) -> Result<PathBuf> {
        if !markdown_path.is_file() {
            return Err(DocsError::NotFound(markdown_path.to_path_buf()));
        }
        fs::create_dir_all(&self.pages_dir)?;

        let markdown = read_page(markdown_path)?;
        let parser = Parser::new_ext(&markdown, parser_options()).map(|event| match event {
            // Raw HTML in pages is shown, not interpreted.
            Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
            other => other,
        });
        let mut body = String::new();
        html::push_html(&mut body, parser);

        let html_path = self.html_path(markdown_path);
        fs::write(&html_path, self.wrap_html_body(&body))?;

        log::debug!("Rendered {:?} -> {:?}", markdown_path, html_path);
        Ok(html_path)
    }

    fn plain_text(&self, markdown_path: &Path) -> Result<String> {
        if !markdown_path.is_file() {
            return Err(DocsError::NotFound(markdown_path.to_path_buf()));
        }
        let markdown = read_page(markdown_path)?;
        Ok(markdown_text(&markdown))
    }
}

/// Page source as text. Bytes that are not UTF-8 become U+FFFD.
fn read_page(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(e) => {
            log::warn!("{:?} is not valid UTF-8, invalid bytes replaced", path);
            Ok(String::from_utf8_lossy(e.as_bytes()).into_owned())
        }
    }
}

/// Text content of a Markdown document, one block per line.
pub fn markdown_text(markdown: &str) -> String {
    let mut text = String::new();

    for event in Parser::new_ext(markdown, parser_options()) {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::End(TagEnd::Paragraph)
            | Event::End(TagEnd::Heading(_))
            | Event::End(TagEnd::CodeBlock)
            | Event::End(TagEnd::Item)
            | Event::End(TagEnd::TableCell) => text.push('\n'),
            Event::Start(Tag::Image { title, .. }) if !title.is_empty() => {
                text.push_str(&title);
                text.push(' ');
            }
            _ => {}
        }
    }

    text.trim().to_string()
}
