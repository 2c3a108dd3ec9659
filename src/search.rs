use crate::error::Result;
use crate::models::Page;
use crate::query;
use rusqlite::{params, Connection};
use std::collections::HashSet;

/// Relevance-ranked match of `query_text` against page names.
///
/// Input without any searchable clause yields no hits.
pub fn search_names(conn: &Connection, query_text: &str, limit: usize) -> Result<Vec<Page>> {
    let Some(expr) = query::parse("name", query_text) else {
        log::debug!("Query {:?} has no searchable terms", query_text);
        return Ok(Vec::new());
    };

    let results = run_match(conn, &expr, limit)?;
    log::info!("Name search found {} results for query: {}", results.len(), query_text);
    Ok(results)
}

/// Pages whose content holds the lower-cased query as an exact token
/// (or exact token sequence).
pub fn search_content(conn: &Connection, query_text: &str, limit: usize) -> Result<Vec<Page>> {
    let Some(expr) = query::exact("content", &query_text.to_lowercase()) else {
        return Ok(Vec::new());
    };

    let results = run_match(conn, &expr, limit)?;
    log::info!("Content search found {} results for query: {}", results.len(), query_text);
    Ok(results)
}

fn run_match(conn: &Connection, expr: &str, limit: usize) -> Result<Vec<Page>> {
    let mut stmt = conn.prepare(
        "SELECT p.name, p.path
         FROM pages_fts
         JOIN pages p ON p.id = pages_fts.rowid
         WHERE pages_fts MATCH ?
         ORDER BY bm25(pages_fts), p.id
         LIMIT ?",
    )?;

    let results = stmt
        .query_map(params![expr, limit as i64], parse_page_row)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(results)
}

fn parse_page_row(row: &rusqlite::Row) -> rusqlite::Result<Page> {
    Ok(Page {
        name: row.get(0)?,
        path: row.get(1)?,
    })
}

/// Drop content hits already listed among the name hits.
pub fn dedup_content(name_results: &[Page], content_results: Vec<Page>) -> Vec<Page> {
    let seen: HashSet<&str> = name_results.iter().map(|p| p.path.as_str()).collect();
    content_results
        .into_iter()
        .filter(|p| !seen.contains(p.path.as_str()))
        .collect()
}
