// src/shipments/ai/sanitizer.rs
//! Lexical safety gate over normalized statements.
//!
//! This is a pragmatic word-level check, not a SQL parser: the leading token
//! must be a fetch keyword, and no write/DDL keyword may appear as a
//! standalone word outside a quoted literal. Keywords inside string literals
//! are tolerated (`SELECT 'please do not DROP anything'` is safe), and
//! `REPLACE` is deliberately not on the list — the currency-cleaning rule
//! tells the generator to emit the SQLite `REPLACE()` function.

use crate::shipments::error::{PipelineResult, QueryError};

const FETCH_KEYWORDS: [&str; 2] = ["SELECT", "WITH"];

const DISALLOWED_KEYWORDS: [&str; 12] = [
    "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE", "ATTACH", "DETACH",
    "PRAGMA", "VACUUM", "REINDEX",
];

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn leading_token(statement: &str) -> &str {
    let trimmed = statement.trim_start();
    let end = trimmed
        .char_indices()
        .find(|(_, c)| !is_ident_char(*c))
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    &trimmed[..end]
}

/// Word-boundary search for `word` in `statement`, skipping quoted literals.
fn contains_word_outside_literals(statement: &str, word: &str) -> bool {
    let upper = statement.to_ascii_uppercase();
    let chars: Vec<char> = upper.chars().collect();
    let word_chars: Vec<char> = word.chars().collect();
    let mut delimiter: Option<char> = None;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if let Some(d) = delimiter {
            if (c == '\\' || c == d) && i + 1 < chars.len() && chars[i + 1] == d {
                i += 2;
                continue;
            }
            if c == d {
                delimiter = None;
            }
            i += 1;
            continue;
        }
        if c == '\'' || c == '"' {
            delimiter = Some(c);
            i += 1;
            continue;
        }
        if chars[i..].starts_with(&word_chars) {
            let before_ok = i == 0 || !is_ident_char(chars[i - 1]);
            let after = i + word_chars.len();
            let after_ok = after >= chars.len() || !is_ident_char(chars[after]);
            if before_ok && after_ok {
                return true;
            }
        }
        i += 1;
    }
    false
}

/// Accepts a candidate statement body (routing marker already stripped) only
/// if it is a read-only fetch. Side-effect-free; the offending keyword is
/// carried for logging but responses never expose the list itself.
pub fn sanitize(statement: &str) -> PipelineResult<()> {
    let token = leading_token(statement);
    let is_fetch = FETCH_KEYWORDS
        .iter()
        .any(|k| token.eq_ignore_ascii_case(k));
    if !is_fetch {
        tracing::warn!(token, "blocked statement with non-fetch leading keyword");
        return Err(QueryError::UnsafeStatement {
            keyword: Some(token.to_string()),
        });
    }

    for keyword in DISALLOWED_KEYWORDS {
        if contains_word_outside_literals(statement, keyword) {
            tracing::warn!(keyword, "blocked statement containing write/DDL keyword");
            return Err(QueryError::UnsafeStatement {
                keyword: Some(keyword.to_string()),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_and_cte_accepted() {
        assert!(sanitize("SELECT * FROM shipments;").is_ok());
        assert!(sanitize("select id from shipments;").is_ok());
        assert!(sanitize("WITH t AS (SELECT * FROM shipments) SELECT * FROM t;").is_ok());
    }

    #[test]
    fn test_non_fetch_leading_keyword_rejected() {
        for statement in [
            "DROP TABLE shipments",
            "DELETE FROM shipments",
            "INSERT INTO shipments VALUES (1)",
            "UPDATE shipments SET status = 'x'",
            "PRAGMA table_info(shipments)",
            "no sql here at all",
            "",
        ] {
            assert!(
                matches!(sanitize(statement), Err(QueryError::UnsafeStatement { .. })),
                "accepted: {:?}",
                statement
            );
        }
    }

    #[test]
    fn test_write_keyword_after_fetch_rejected() {
        let err = sanitize("SELECT 1; DROP TABLE shipments;").unwrap_err();
        assert!(matches!(
            err,
            QueryError::UnsafeStatement { keyword: Some(k) } if k == "DROP"
        ));
    }

    #[test]
    fn test_keywords_inside_literals_tolerated() {
        assert!(sanitize("SELECT * FROM shipments WHERE notes = 'please DROP by later';").is_ok());
        assert!(sanitize("SELECT 'UPDATE' AS word FROM shipments;").is_ok());
    }

    #[test]
    fn test_keywords_inside_identifiers_tolerated() {
        // Word-boundary matching: substrings of identifiers are not hits.
        assert!(sanitize("SELECT lastUpdateTime FROM shipments;").is_ok());
        assert!(sanitize("SELECT created_at FROM shipments;").is_ok());
    }

    #[test]
    fn test_replace_function_is_allowed() {
        assert!(sanitize(
            "SELECT SUM(CAST(REPLACE(REPLACE(totalAmount, '$', ''), ',', '') AS REAL)) FROM shipments;"
        )
        .is_ok());
    }
}
