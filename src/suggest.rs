//! Type-ahead suggestions over page names.
//!
//! Pages are recorded in an in-memory SQLite database (rebuilt on every run)
//! and answered through an infix lookup: a suffix array over the case-folded
//! names, built lazily on the first query and cached until the suggestion
//! index is committed again.

use crate::db::Field;
use crate::error::Result;
use crate::models::Page;
use rusqlite::{params, Connection, Transaction};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

const HIGHLIGHT_OPEN: &str = "<b>";
const HIGHLIGHT_CLOSE: &str = "</b>";

/// In-memory (name, path) store, unique by path.
pub struct SuggestionIndex {
    conn: Connection,
    generation: AtomicU64,
}

impl SuggestionIndex {
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute(
            "CREATE TABLE IF NOT EXISTS suggest_pages (
                path TEXT PRIMARY KEY,
                name TEXT NOT NULL
            )",
            [],
        )?;

        Ok(Self {
            conn,
            generation: AtomicU64::new(0),
        })
    }

    /// Start a batch of upserts; nothing is visible until [`SuggestionWriter::commit`].
    pub fn writer(&mut self) -> Result<SuggestionWriter<'_>> {
        let Self { conn, generation } = self;
        let tx = conn.transaction()?;
        Ok(SuggestionWriter { tx, generation })
    }

    /// Bumped on every commit; a lookup built for an older generation is stale.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// All entries in indexing order.
    pub fn entries(&self) -> Result<Vec<Page>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, path FROM suggest_pages ORDER BY rowid")?;
        let pages = stmt
            .query_map([], |row| {
                Ok(Page {
                    name: row.get(0)?,
                    path: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(pages)
    }

    pub fn num_docs(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM suggest_pages", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Number of entries with a non-empty `field`. Content is not stored here.
    pub fn doc_count(&self, field: Field) -> Result<usize> {
        let sql = match field {
            Field::Path => "SELECT COUNT(*) FROM suggest_pages WHERE path <> ''",
            Field::Name => "SELECT COUNT(*) FROM suggest_pages WHERE trim(name) <> ''",
            Field::Content => return Ok(0),
        };
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| e.into())
    }
}

pub struct SuggestionWriter<'a> {
    tx: Transaction<'a>,
    generation: &'a AtomicU64,
}

impl SuggestionWriter<'_> {
    /// Insert or replace the entry for `path`. A replaced entry moves to the
    /// end of the indexing order.
    pub fn upsert(&self, name: &str, path: &str) -> Result<()> {
        self.tx.execute(
            "INSERT OR REPLACE INTO suggest_pages (path, name) VALUES (?, ?)",
            params![path, name],
        )?;
        Ok(())
    }

    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        self.generation.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

struct Entry {
    name: String,
    folded: Vec<char>,
    path: String,
}

/// Suffix array over case-folded page names.
pub struct InfixLookup {
    entries: Vec<Entry>,
    /// (entry, char offset), sorted by the folded suffix starting there
    suffixes: Vec<(usize, usize)>,
    generation: u64,
}

/// Per-char case folding so folded offsets line up with the original name.
fn fold(text: &str) -> Vec<char> {
    text.chars()
        .map(|c| c.to_lowercase().next().unwrap_or(c))
        .collect()
}

impl InfixLookup {
    pub fn build(pages: Vec<Page>, generation: u64) -> Self {
        let entries: Vec<Entry> = pages
            .into_iter()
            .map(|page| Entry {
                folded: fold(&page.name),
                name: page.name,
                path: page.path,
            })
            .collect();

        let mut suffixes: Vec<(usize, usize)> = entries
            .iter()
            .enumerate()
            .flat_map(|(i, e)| (0..e.folded.len()).map(move |off| (i, off)))
            .collect();
        suffixes.sort_by(|a, b| {
            entries[a.0].folded[a.1..]
                .cmp(&entries[b.0].folded[b.1..])
                .then(a.cmp(b))
        });

        log::debug!(
            "Built infix lookup: {} names, {} suffixes",
            entries.len(),
            suffixes.len()
        );
        Self {
            entries,
            suffixes,
            generation,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn suffix(&self, s: (usize, usize)) -> &[char] {
        &self.entries[s.0].folded[s.1..]
    }

    /// Suffix-array range of suffixes starting with `term`.
    fn occurrences(&self, term: &[char]) -> &[(usize, usize)] {
        let lo = self.suffixes.partition_point(|&s| self.suffix(s) < term);
        let len = self.suffixes[lo..].partition_point(|&s| self.suffix(s).starts_with(term));
        &self.suffixes[lo..lo + len]
    }

    fn position_score(&self, entry: usize, offset: usize) -> u32 {
        if offset == 0 {
            return 3;
        }
        let prev = self.entries[entry].folded[offset - 1];
        if prev.is_alphanumeric() {
            1
        } else {
            2
        }
    }

    /// Names containing every whitespace-separated word of `query`, best first.
    pub fn lookup(&self, query: &str, limit: usize) -> Vec<Page> {
        let terms: Vec<Vec<char>> = query.split_whitespace().map(fold).collect();
        if terms.is_empty() {
            return Vec::new();
        }

        // entry -> (score, spans)
        let mut matches: BTreeMap<usize, (u32, Vec<(usize, usize)>)> = BTreeMap::new();
        for (i, term) in terms.iter().enumerate() {
            let mut per_entry: BTreeMap<usize, (u32, Vec<(usize, usize)>)> = BTreeMap::new();
            for &(entry, offset) in self.occurrences(term) {
                let hit = per_entry.entry(entry).or_insert((0, Vec::new()));
                hit.0 = hit.0.max(self.position_score(entry, offset));
                hit.1.push((offset, offset + term.len()));
            }

            if i == 0 {
                matches = per_entry;
            } else {
                matches.retain(|entry, _| per_entry.contains_key(entry));
                for (entry, (score, spans)) in per_entry {
                    if let Some(found) = matches.get_mut(&entry) {
                        found.0 += score;
                        found.1.extend(spans);
                    }
                }
            }
        }

        let mut ranked: Vec<(usize, u32, Vec<(usize, usize)>)> = matches
            .into_iter()
            .map(|(entry, (score, spans))| (entry, score, spans))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(limit);

        ranked
            .into_iter()
            .map(|(entry, _, spans)| {
                let e = &self.entries[entry];
                Page {
                    name: highlight(&e.name, spans),
                    path: e.path.clone(),
                }
            })
            .collect()
    }
}

/// Wrap the char ranges `spans` of `name` in bold markers, merging overlaps.
fn highlight(name: &str, mut spans: Vec<(usize, usize)>) -> String {
    spans.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }

    let mut out = String::with_capacity(name.len() + merged.len() * 7);
    let mut spans = merged.into_iter().peekable();
    let mut open_until: Option<usize> = None;
    for (i, c) in name.chars().enumerate() {
        if open_until == Some(i) {
            out.push_str(HIGHLIGHT_CLOSE);
            open_until = None;
        }
        if let Some(&(start, end)) = spans.peek() {
            if start == i {
                out.push_str(HIGHLIGHT_OPEN);
                open_until = Some(end);
                spans.next();
            }
        }
        out.push(c);
    }
    if open_until.is_some() {
        out.push_str(HIGHLIGHT_CLOSE);
    }
    out
}

/// Lazily built, cached infix lookup.
///
/// The mutex is the one-shot latch: the first caller builds while concurrent
/// callers wait, later callers reuse the cached lookup until the index
/// generation moves.
pub struct Suggester {
    cache: Mutex<Option<Arc<InfixLookup>>>,
    limit: usize,
}

impl Suggester {
    pub fn new(limit: usize) -> Self {
        Self {
            cache: Mutex::new(None),
            limit,
        }
    }

    /// `None` for blank input or when the lookup cannot be built.
    pub fn suggest(&self, index: &SuggestionIndex, query: &str) -> Option<Vec<Page>> {
        if query.trim().is_empty() {
            return None;
        }

        let lookup = match self.lookup_for(index) {
            Ok(lookup) => lookup,
            Err(e) => {
                log::warn!("Suggestions unavailable: {}", e);
                return None;
            }
        };

        Some(lookup.lookup(query, self.limit))
    }

    /// Cached lookup, rebuilt when `index` was committed since the last build.
    pub fn lookup_for(&self, index: &SuggestionIndex) -> Result<Arc<InfixLookup>> {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let generation = index.generation();
        if let Some(lookup) = cache.as_ref() {
            if lookup.generation() == generation {
                return Ok(Arc::clone(lookup));
            }
            log::info!("Suggestion index changed, rebuilding infix lookup");
        }

        let lookup = Arc::new(InfixLookup::build(index.entries()?, generation));
        *cache = Some(Arc::clone(&lookup));
        Ok(lookup)
    }

    /// Drop the cached lookup.
    pub fn reset(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            *cache = None;
        }
    }
}
