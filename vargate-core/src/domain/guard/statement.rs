// vargate-core/src/domain/guard/statement.rs

use std::ops::Range;

use serde::{Deserialize, Serialize};
use sqlparser::ast::Statement;
use sqlparser::dialect::{Dialect, DuckDbDialect, SQLiteDialect};
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Location, Token, TokenWithSpan, Tokenizer};
use thiserror::Error;

use super::keywords;
use crate::domain::query::{QueryParams, SqlValue};

/// SQL dialect used to lex and parse candidate statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlFlavor {
    #[default]
    Sqlite,
    DuckDb,
}

impl SqlFlavor {
    pub fn dialect(&self) -> Box<dyn Dialect> {
        match self {
            SqlFlavor::Sqlite => Box::new(SQLiteDialect {}),
            SqlFlavor::DuckDb => Box::new(DuckDbDialect {}),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GuardRejection {
    #[error("Empty statement")]
    Empty,

    #[error("Multiple statements are not allowed")]
    MultipleStatements,

    #[error("Only SELECT or WITH statements are allowed (found '{keyword}')")]
    DisallowedStatement { keyword: String },

    #[error("Denied keyword '{keyword}'")]
    DeniedKeyword { keyword: String },

    #[error("Statement could not be parsed: {message}")]
    Unparseable { message: String },

    #[error("Statement is not a query")]
    NotAQuery,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderKind {
    Positional,
    Named(String),
}

/// A bind marker found in the token stream. `range` indexes the normalized text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub kind: PlaceholderKind,
    pub range: Range<usize>,
}

/// A statement that passed every guard check.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedStatement {
    sql: String,
    placeholders: Vec<Placeholder>,
}

impl ValidatedStatement {
    /// Trimmed text with comments before the first token and the trailing `;` removed.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    /// Resolves parameters into engine-ready text plus positional values.
    ///
    /// Named markers are rewritten to `?` and their values ordered by
    /// occurrence. Values never reach the text.
    pub fn bind(&self, params: &QueryParams) -> Result<(String, Vec<SqlValue>), String> {
        match params {
            QueryParams::None => Ok((self.sql.clone(), Vec::new())),
            QueryParams::Positional(values) => Ok((self.sql.clone(), values.clone())),
            QueryParams::Named(pairs) => self.bind_named(pairs),
        }
    }

    fn bind_named(&self, pairs: &[(String, SqlValue)]) -> Result<(String, Vec<SqlValue>), String> {
        let lookup = |name: &str| {
            pairs
                .iter()
                .find(|(k, _)| strip_sigil(k) == name)
                .map(|(_, v)| v.clone())
        };

        let mut text = String::with_capacity(self.sql.len());
        let mut values = Vec::with_capacity(self.placeholders.len());
        let mut cursor = 0;

        for placeholder in &self.placeholders {
            let name = match &placeholder.kind {
                PlaceholderKind::Named(name) => name,
                PlaceholderKind::Positional => {
                    return Err(
                        "positional placeholder cannot be bound with named parameters".to_string(),
                    );
                }
            };
            let value =
                lookup(name).ok_or_else(|| format!("missing value for parameter ':{name}'"))?;

            text.push_str(&self.sql[cursor..placeholder.range.start]);
            text.push('?');
            cursor = placeholder.range.end;
            values.push(value);
        }
        text.push_str(&self.sql[cursor..]);

        for (key, _) in pairs {
            let key = strip_sigil(key);
            let used = self
                .placeholders
                .iter()
                .any(|p| matches!(&p.kind, PlaceholderKind::Named(n) if n == key));
            if !used {
                return Err(format!("parameter ':{key}' is not used by the statement"));
            }
        }

        Ok((text, values))
    }
}

fn strip_sigil(name: &str) -> &str {
    name.trim_start_matches([':', '$', '@'])
}

/// First line of defense: decides whether a statement may reach a connection at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementGuard {
    flavor: SqlFlavor,
}

impl StatementGuard {
    pub fn new(flavor: SqlFlavor) -> Self {
        Self { flavor }
    }

    pub fn flavor(&self) -> SqlFlavor {
        self.flavor
    }

    pub fn validate(&self, sql: &str) -> Result<ValidatedStatement, GuardRejection> {
        if sql.trim().is_empty() {
            return Err(GuardRejection::Empty);
        }

        let dialect = self.flavor.dialect();
        let tokens = Tokenizer::new(&*dialect, sql)
            .tokenize_with_location()
            .map_err(|e| GuardRejection::Unparseable {
                message: e.to_string(),
            })?;

        let significant: Vec<&TokenWithSpan> =
            tokens.iter().filter(|t| is_significant(&t.token)).collect();
        let Some(first) = significant.first() else {
            return Err(GuardRejection::Empty);
        };

        // Single statement, optionally closed by one `;`.
        let terminator = significant
            .iter()
            .position(|t| matches!(t.token, Token::SemiColon));
        let body = match terminator {
            Some(idx) if idx + 1 < significant.len() => {
                return Err(GuardRejection::MultipleStatements);
            }
            Some(idx) => &significant[..idx],
            None => &significant[..],
        };
        if body.is_empty() {
            return Err(GuardRejection::Empty);
        }

        check_denylist(body)?;

        match &first.token {
            Token::Word(w) if w.quote_style.is_none() && keywords::is_allowed_leading(&w.value) => {}
            other => {
                return Err(GuardRejection::DisallowedStatement {
                    keyword: other.to_string(),
                });
            }
        }

        let offsets = LineIndex::new(sql);
        let start = offsets.offset(sql, first.span.start);
        let end = match terminator {
            Some(idx) => offsets.offset(sql, significant[idx].span.start),
            None => sql.len(),
        };
        let normalized = sql[start..end].trim_end();

        let statements =
            Parser::parse_sql(&*dialect, normalized).map_err(|e| GuardRejection::Unparseable {
                message: e.to_string(),
            })?;
        match statements.as_slice() {
            [Statement::Query(_)] => {}
            [_] => return Err(GuardRejection::NotAQuery),
            _ => return Err(GuardRejection::MultipleStatements),
        }

        let placeholders = collect_placeholders(&tokens, sql, &offsets, start)
            .into_iter()
            .filter(|p| p.range.end <= normalized.len())
            .collect();

        Ok(ValidatedStatement {
            sql: normalized.to_string(),
            placeholders,
        })
    }
}

fn is_significant(token: &Token) -> bool {
    !matches!(token, Token::Whitespace(_) | Token::EOF)
}

fn check_denylist(body: &[&TokenWithSpan]) -> Result<(), GuardRejection> {
    for (idx, t) in body.iter().enumerate() {
        let Token::Word(word) = &t.token else {
            continue;
        };
        if word.quote_style.is_some() || !keywords::is_denied(&word.value) {
            continue;
        }
        let is_call = matches!(body.get(idx + 1).map(|n| &n.token), Some(Token::LParen));
        if is_call && keywords::is_function_exception(&word.value) {
            continue;
        }
        return Err(GuardRejection::DeniedKeyword {
            keyword: word.value.to_uppercase(),
        });
    }
    Ok(())
}

fn collect_placeholders(
    tokens: &[TokenWithSpan],
    sql: &str,
    offsets: &LineIndex,
    base: usize,
) -> Vec<Placeholder> {
    let mut found = Vec::new();
    let mut iter = tokens.iter().peekable();

    while let Some(t) = iter.next() {
        let start = offsets.offset(sql, t.span.start);
        if start < base {
            continue;
        }
        match &t.token {
            Token::Placeholder(raw) => {
                let rest = raw.get(1..).unwrap_or_default();
                let kind = if raw.starts_with('?') || rest.chars().all(|c| c.is_ascii_digit()) {
                    PlaceholderKind::Positional
                } else {
                    PlaceholderKind::Named(rest.to_string())
                };
                found.push(Placeholder {
                    kind,
                    range: (start - base)..(start - base + raw.len()),
                });
            }
            Token::Colon | Token::AtSign => {
                // `:name` lexes as a colon immediately followed by a bare word.
                if let Some(next) = iter.peek()
                    && let Token::Word(w) = &next.token
                    && w.quote_style.is_none()
                    && offsets.offset(sql, next.span.start) == start + 1
                {
                    found.push(Placeholder {
                        kind: PlaceholderKind::Named(w.value.clone()),
                        range: (start - base)..(start - base + 1 + w.value.len()),
                    });
                    iter.next();
                }
            }
            _ => {}
        }
    }
    found
}

/// Maps tokenizer locations (1-based line and char column) to byte offsets.
struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    fn new(sql: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(sql.match_indices('\n').map(|(i, _)| i + 1));
        Self { line_starts }
    }

    fn offset(&self, sql: &str, loc: Location) -> usize {
        let line = (loc.line as usize).saturating_sub(1);
        let Some(&line_start) = self.line_starts.get(line) else {
            return sql.len();
        };
        let column = (loc.column as usize).saturating_sub(1);
        sql[line_start..]
            .char_indices()
            .nth(column)
            .map(|(i, _)| line_start + i)
            .unwrap_or(sql.len())
    }
}
