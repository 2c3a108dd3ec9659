//! Translation of user query text into FTS5 match expressions.
//!
//! Accepted syntax follows the classic full-text convention:
//!
//! - bare words are optional clauses, combined with OR
//! - `"quoted phrases"` match consecutive tokens
//! - `+word` / `-word` mark a clause required / prohibited
//! - `a AND b` makes both sides required, `NOT word` prohibits, `OR` is the default
//! - a trailing `*` turns the last token into a prefix match
//!
//! Every token is re-quoted, so punctuation in user input can never reach
//! the FTS5 parser as syntax.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Occur {
    Should,
    Must,
    MustNot,
}

#[derive(Debug, Clone)]
struct Clause {
    occur: Occur,
    tokens: Vec<String>,
    prefix: bool,
}

impl Clause {
    fn render(&self) -> String {
        let phrase = format!("\"{}\"", self.tokens.join(" ").replace('"', "\"\""));
        if self.prefix {
            format!("{}*", phrase)
        } else {
            phrase
        }
    }
}

/// Split raw text into index tokens: runs of alphanumerics and `_`, lower-cased.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(|t| t.to_lowercase())
        .collect()
}

/// Build a match expression for `input` restricted to `column`.
///
/// Returns `None` when the input holds no positive clause.
pub fn parse(column: &str, input: &str) -> Option<String> {
    let clauses = lex(input);

    let musts: Vec<String> = clauses
        .iter()
        .filter(|c| c.occur == Occur::Must)
        .map(Clause::render)
        .collect();
    let shoulds: Vec<String> = clauses
        .iter()
        .filter(|c| c.occur == Occur::Should)
        .map(Clause::render)
        .collect();
    let nots: Vec<String> = clauses
        .iter()
        .filter(|c| c.occur == Occur::MustNot)
        .map(Clause::render)
        .collect();

    let positive = if !musts.is_empty() {
        musts.join(" AND ")
    } else if !shoulds.is_empty() {
        shoulds.join(" OR ")
    } else {
        return None;
    };

    let mut expr = format!("({})", positive);
    if !nots.is_empty() {
        expr.push_str(&format!(" NOT ({})", nots.join(" OR ")));
    }

    Some(format!("{{{}}} : ({})", column, expr))
}

/// Exact token (or token sequence) match on `column`, no query syntax.
pub fn exact(column: &str, input: &str) -> Option<String> {
    let tokens = tokenize(input);
    if tokens.is_empty() {
        return None;
    }
    let clause = Clause {
        occur: Occur::Must,
        tokens,
        prefix: false,
    };
    Some(format!("{{{}}} : {}", column, clause.render()))
}

fn lex(input: &str) -> Vec<Clause> {
    let mut clauses: Vec<Clause> = Vec::new();
    let mut pending: Option<Occur> = None;
    let mut and_pending = false;

    for (word, quoted) in split_words(input) {
        if !quoted {
            match word.as_str() {
                "AND" | "&&" => {
                    if let Some(last) = clauses.last_mut() {
                        if last.occur == Occur::Should {
                            last.occur = Occur::Must;
                        }
                        and_pending = true;
                    }
                    continue;
                }
                "OR" | "||" => continue,
                "NOT" | "!" => {
                    pending = Some(Occur::MustNot);
                    continue;
                }
                _ => {}
            }
        }

        let mut text = word.as_str();
        let mut occur = pending.take().unwrap_or(Occur::Should);
        if !quoted && text.len() > 1 {
            if let Some(rest) = text.strip_prefix('+') {
                occur = Occur::Must;
                text = rest;
            } else if let Some(rest) = text.strip_prefix('-') {
                occur = Occur::MustNot;
                text = rest;
            }
        }
        if and_pending && occur == Occur::Should {
            occur = Occur::Must;
        }
        and_pending = false;

        let prefix = !quoted && text.ends_with('*');
        let tokens = tokenize(text);
        if tokens.is_empty() {
            continue;
        }

        clauses.push(Clause { occur, tokens, prefix });
    }

    clauses
}

/// Split on whitespace, keeping `"..."` groups together. The flag marks quoted groups.
fn split_words(input: &str) -> Vec<(String, bool)> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in input.chars() {
        match c {
            '"' => {
                if in_quotes {
                    words.push((std::mem::take(&mut current), true));
                } else if !current.is_empty() {
                    words.push((std::mem::take(&mut current), false));
                }
                in_quotes = !in_quotes;
            }
            c if c.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    words.push((std::mem::take(&mut current), false));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        // An unterminated quote still yields its words as a phrase.
        words.push((current, in_quotes));
    }

    words
}
