// src/shipments/ai/normalizer.rs
//! Output normalizer: raw generator text in, one canonical statement out.
//!
//! ## Responsibilities
//!
//! - Detect the document-routing marker on the original text
//! - Clean conversational wrappers, stray line breaks, and trailing junk
//! - Repair half-applied case-fold comparisons
//! - Classify the result: executable, routed lookup, refusal, or unroutable
//!
//! Each pass is a total function; the full pipeline is deterministic and
//! idempotent (re-running it on its own rendered output is a no-op). The
//! passes are small explicit scanners rather than one string-replace chain,
//! so each can be tested on its own.

use super::{CANNOT_DETERMINE_MARKER, PDF_LOOKUP_MARKER, REFUSAL_MARKER};

/// The classified result of normalizing one raw generator output.
///
/// `Executable` bodies lead with a fetch keyword; `Executable` and
/// `DocumentLookup` never hold an unterminated quoted literal. The
/// sanitizer remains the gate for disallowed keywords embedded after the
/// lead, and for routed lookup bodies, which are not fetch-checked here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedStatement {
    /// A statement ready for the sanitizer and executor.
    Executable(String),
    /// A routed document lookup; carries the canonical marker-prefixed text.
    DocumentLookup(String),
    /// A refusal marker or otherwise unusable output; carries the cleaned
    /// body for diagnostics.
    Rejected(String),
    /// The generator could not determine which previous document an
    /// elliptical follow-up refers to.
    Unroutable,
    /// The routing marker arrived with nothing left to execute behind it.
    EmptyRoutedBody,
}

impl NormalizedStatement {
    /// Canonical text form; feeding it back through `normalize` yields the
    /// same classification.
    pub fn rendered(&self) -> String {
        match self {
            NormalizedStatement::Executable(sql) => sql.clone(),
            NormalizedStatement::DocumentLookup(sql) => sql.clone(),
            NormalizedStatement::Rejected(body) => body.clone(),
            NormalizedStatement::Unroutable => CANNOT_DETERMINE_MARKER.to_string(),
            NormalizedStatement::EmptyRoutedBody => PDF_LOOKUP_MARKER.to_string(),
        }
    }

    /// The bare SQL of a routed lookup, marker stripped.
    pub fn lookup_body(&self) -> Option<&str> {
        match self {
            NormalizedStatement::DocumentLookup(sql) => {
                let rest = sql.trim_start().strip_prefix(PDF_LOOKUP_MARKER)?;
                Some(rest.trim_start_matches(['\r', '\n']).trim())
            }
            _ => None,
        }
    }
}

/// Runs the full multi-pass normalization pipeline.
pub fn normalize(raw: &str) -> NormalizedStatement {
    // Pass 1: routing detection happens on the original text; later passes
    // may strip the marker.
    let wants_document_lookup = detect_routing(raw);

    // Pass 2: body isolation.
    let body = isolate_body(raw, wants_document_lookup);

    // Passes 3-9.
    let body = collapse_line_breaks(&body);
    let body = anchor_statement_start(&body);
    let body = strip_wrappers(&body);
    let body = clean_quoted_literals(&body);
    let body = lowercase_folded_literals(&body);
    let body = repair_trailing_artifacts(&body);
    let body = normalize_terminator(&body);

    // Pass 10: re-attachment and classification.
    reattach(wants_document_lookup, body)
}

/// Pass 1: does the trimmed raw text begin with the routing marker?
/// Case-sensitive on the marker token.
fn detect_routing(raw: &str) -> bool {
    raw.trim_start().starts_with(PDF_LOOKUP_MARKER)
}

/// Pass 2: strip the marker (and one following line break) if routing was
/// detected; otherwise the body is the whole text.
fn isolate_body(raw: &str, routed: bool) -> String {
    let trimmed = raw.trim();
    if !routed {
        return trimmed.to_string();
    }
    let rest = trimmed.strip_prefix(PDF_LOOKUP_MARKER).unwrap_or(trimmed);
    let rest = rest.strip_prefix("\r\n").or_else(|| rest.strip_prefix('\n')).unwrap_or(rest);
    rest.trim().to_string()
}

/// Pass 3: collapse every run of line-break characters to a single space.
fn collapse_line_breaks(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' || c == '\n' {
            while matches!(chars.peek(), Some('\r') | Some('\n')) {
                chars.next();
            }
            out.push(' ');
        } else {
            out.push(c);
        }
    }
    out
}

const ANCHOR_KEYWORDS: [&str; 9] = [
    "SELECT", "WITH", "INSERT", "UPDATE", "DELETE", "DROP", "CREATE", "ALTER", "TRUNCATE",
];

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Finds the earliest word-boundary occurrence of any keyword,
/// case-insensitively.
fn find_first_keyword(body: &str) -> Option<usize> {
    let upper = body.to_ascii_uppercase();
    let mut earliest: Option<usize> = None;
    for keyword in ANCHOR_KEYWORDS {
        let mut from = 0;
        while let Some(pos) = upper[from..].find(keyword) {
            let at = from + pos;
            let before_ok = at == 0
                || !is_ident_char(upper[..at].chars().next_back().unwrap_or(' '));
            let after = at + keyword.len();
            let after_ok = after >= upper.len()
                || !is_ident_char(upper[after..].chars().next().unwrap_or(' '));
            if before_ok && after_ok {
                earliest = Some(earliest.map_or(at, |e| e.min(at)));
                break;
            }
            from = at + 1;
        }
    }
    earliest
}

/// Pass 4: discard any prose before the first statement keyword. Write
/// keywords anchor too; classification and the sanitizer decide what
/// happens to them.
fn anchor_statement_start(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.starts_with('#') {
        // Refusal / cannot-determine markers are left untouched.
        return trimmed.to_string();
    }
    match find_first_keyword(trimmed) {
        Some(at) => trimmed[at..].to_string(),
        None => {
            if !trimmed.is_empty() {
                tracing::warn!(body = trimmed, "no statement keyword found in generator output");
            }
            trimmed.to_string()
        }
    }
}

const WRAPPER_PREFIXES: [&str; 6] = [
    "```sql",
    "```",
    "here is the sql query:",
    "here is the sql:",
    "sql:",
    "query:",
];

/// Pass 5: strip known conversational/code-fence wrappers from both ends.
fn strip_wrappers(body: &str) -> String {
    let mut current = body.trim();
    loop {
        let before = current;
        for prefix in WRAPPER_PREFIXES {
            if current.len() >= prefix.len()
                && current[..prefix.len()].eq_ignore_ascii_case(prefix)
            {
                current = current[prefix.len()..].trim_start();
            }
        }
        if let Some(stripped) = current.strip_suffix("```") {
            current = stripped.trim_end();
        }
        if current == before {
            break;
        }
    }
    current.to_string()
}

/// Pass 6: rewrite quoted literal interiors, collapsing escaped line-break
/// sequences to spaces. A literal opens on either quote character and closes
/// on the next unescaped occurrence of the same delimiter; doubled and
/// backslash-escaped delimiters do not terminate it. Text outside quoted
/// spans is untouched.
fn clean_quoted_literals(body: &str) -> String {
    let chars: Vec<char> = body.chars().collect();
    let mut out = String::with_capacity(body.len());
    let mut i = 0;
    let mut delimiter: Option<char> = None;

    while i < chars.len() {
        let c = chars[i];
        match delimiter {
            None => {
                if c == '\'' || c == '"' {
                    delimiter = Some(c);
                }
                out.push(c);
                i += 1;
            }
            Some(d) => {
                if c == '\\' && i + 1 < chars.len() && chars[i + 1] == 'n' {
                    // Escaped line break inside the literal.
                    out.push(' ');
                    i += 2;
                } else if c == '\\' && i + 1 < chars.len() && chars[i + 1] == d {
                    out.push(c);
                    out.push(chars[i + 1]);
                    i += 2;
                } else if c == d && i + 1 < chars.len() && chars[i + 1] == d {
                    // Doubled delimiter is an escape, not a terminator.
                    out.push(c);
                    out.push(chars[i + 1]);
                    i += 2;
                } else if c == d {
                    delimiter = None;
                    out.push(c);
                    i += 1;
                } else if c == '\r' || c == '\n' {
                    out.push(' ');
                    i += 1;
                } else {
                    out.push(c);
                    i += 1;
                }
            }
        }
    }
    out
}

/// True if a quoted literal opens and never closes.
fn has_unterminated_literal(body: &str) -> bool {
    let chars: Vec<char> = body.chars().collect();
    let mut i = 0;
    let mut delimiter: Option<char> = None;
    while i < chars.len() {
        let c = chars[i];
        match delimiter {
            None => {
                if c == '\'' || c == '"' {
                    delimiter = Some(c);
                }
                i += 1;
            }
            Some(d) => {
                if (c == '\\' || c == d) && i + 1 < chars.len() && chars[i + 1] == d {
                    i += 2;
                } else if c == d {
                    delimiter = None;
                    i += 1;
                } else {
                    i += 1;
                }
            }
        }
    }
    delimiter.is_some()
}

/// Pass 7: where the generator case-folded the column but forgot the
/// literal (`LOWER(col) = 'Value'`), lowercase the literal in place. Applies
/// to `=`, `LIKE`, `<>` and `!=` comparisons; the column expression is left
/// untouched.
fn lowercase_folded_literals(body: &str) -> String {
    let chars: Vec<char> = body.chars().collect();
    let mut out = String::with_capacity(body.len());
    let mut i = 0;
    let mut delimiter: Option<char> = None;

    while i < chars.len() {
        let c = chars[i];
        if let Some(d) = delimiter {
            if (c == '\\' || c == d) && i + 1 < chars.len() && chars[i + 1] == d {
                out.push(c);
                out.push(chars[i + 1]);
                i += 2;
                continue;
            }
            if c == d {
                delimiter = None;
            }
            out.push(c);
            i += 1;
            continue;
        }
        if c == '\'' || c == '"' {
            delimiter = Some(c);
            out.push(c);
            i += 1;
            continue;
        }
        if starts_lower_call(&chars, i) {
            if let Some(end) = try_rewrite_fold_comparison(&chars, i, &mut out) {
                i = end;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }
    out
}

/// Word-boundary, case-insensitive match of `LOWER(` at position `i`.
fn starts_lower_call(chars: &[char], i: usize) -> bool {
    if i > 0 && is_ident_char(chars[i - 1]) {
        return false;
    }
    let word: String = chars[i..].iter().take(5).collect();
    if !word.eq_ignore_ascii_case("lower") {
        return false;
    }
    let mut j = i + 5;
    while j < chars.len() && chars[j].is_whitespace() {
        j += 1;
    }
    j < chars.len() && chars[j] == '('
}

/// Attempts to consume `LOWER(...) <op> '<literal>'` starting at `start`,
/// writing the rewritten text to `out` and returning the index just past the
/// literal. On no match, nothing is written and `None` is returned.
fn try_rewrite_fold_comparison(chars: &[char], start: usize, out: &mut String) -> Option<usize> {
    // LOWER
    let mut i = start + 5;
    while i < chars.len() && chars[i].is_whitespace() {
        i += 1;
    }
    if i >= chars.len() || chars[i] != '(' {
        return None;
    }
    // Balanced paren group, quote-aware.
    let mut depth = 0usize;
    let mut delimiter: Option<char> = None;
    let expr_start = i;
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
        match c {
            '\'' | '"' => delimiter = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    i += 1;
                    break;
                }
            }
            _ => {}
        }
        i += 1;
    }
    if depth != 0 {
        return None;
    }
    let expr_end = i;

    // Operator: =, <>, !=, or the word LIKE.
    let mut j = expr_end;
    while j < chars.len() && chars[j].is_whitespace() {
        j += 1;
    }
    let op_end = if j < chars.len() && chars[j] == '=' {
        j + 1
    } else if j + 1 < chars.len()
        && ((chars[j] == '<' && chars[j + 1] == '>') || (chars[j] == '!' && chars[j + 1] == '='))
    {
        j + 2
    } else {
        let word: String = chars[j..].iter().take(4).collect();
        if word.eq_ignore_ascii_case("like")
            && (j + 4 >= chars.len() || !is_ident_char(chars[j + 4]))
        {
            j + 4
        } else {
            return None;
        }
    };

    // Quoted literal.
    let mut k = op_end;
    while k < chars.len() && chars[k].is_whitespace() {
        k += 1;
    }
    if k >= chars.len() || (chars[k] != '\'' && chars[k] != '"') {
        return None;
    }
    let d = chars[k];
    let lit_open = k;
    let mut m = k + 1;
    while m < chars.len() {
        let c = chars[m];
        if (c == '\\' || c == d) && m + 1 < chars.len() && chars[m + 1] == d {
            m += 2;
            continue;
        }
        if c == d {
            break;
        }
        m += 1;
    }
    if m >= chars.len() {
        // Unterminated literal; leave it for later passes.
        return None;
    }

    // Emit: column expression and operator untouched, literal lowercased.
    out.extend(chars[start..lit_open + 1].iter());
    out.extend(chars[lit_open + 1..m].iter().map(|c| c.to_ascii_lowercase()));
    out.push(d);
    Some(m + 1)
}

const MAX_REPAIR_PASSES: usize = 10;

/// Pass 8: iteratively strip known malformed trailing sequences. Bounded,
/// terminating early once a pass makes no change.
fn repair_trailing_artifacts(body: &str) -> String {
    let mut current = body.trim_end().to_string();
    for _ in 0..MAX_REPAIR_PASSES {
        let before = current.clone();

        // Trailing terminators (doubled or otherwise) come off here; the
        // terminator pass re-adds exactly one to fetch bodies.
        while current.ends_with(';') {
            current.pop();
            while current.ends_with(' ') {
                current.pop();
            }
        }

        // A stray quote left dangling after the statement, the
        // `...LIMIT 1;';` shape.
        for quote in ['\'', '"'] {
            if current.ends_with(quote) && has_unterminated_literal(&current) {
                current.pop();
            }
        }

        // An unbalanced closing parenthesis with no matching open.
        if current.ends_with(')') && paren_balance(&current) < 0 {
            current.pop();
        }

        // Quotes wrapping a refusal marker.
        let stripped = current.trim_matches(|c| c == '\'' || c == '"').trim();
        if stripped.starts_with('#') && stripped != current {
            current = stripped.to_string();
        }

        current = current.trim_end().to_string();
        if current == before {
            break;
        }
    }
    current
}

/// Net paren depth outside quoted literals; negative means an extra closer.
fn paren_balance(body: &str) -> i32 {
    let chars: Vec<char> = body.chars().collect();
    let mut balance = 0i32;
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
        } else {
            match c {
                '\'' | '"' => delimiter = Some(c),
                '(' => balance += 1,
                ')' => balance -= 1,
                _ => {}
            }
        }
        i += 1;
    }
    balance
}

fn is_fetch_start(body: &str) -> bool {
    let trimmed = body.trim_start();
    for keyword in ["SELECT", "WITH"] {
        if trimmed.len() >= keyword.len()
            && trimmed[..keyword.len()].eq_ignore_ascii_case(keyword)
            && trimmed[keyword.len()..]
                .chars()
                .next()
                .map_or(true, |c| !is_ident_char(c))
        {
            return true;
        }
    }
    false
}

/// Pass 9: fetch bodies end with exactly one terminator; markers end with
/// none.
fn normalize_terminator(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.starts_with('#') {
        return trimmed.trim_end_matches([';', ' ']).to_string();
    }
    if is_fetch_start(trimmed) {
        let mut cleaned = trimmed.trim_end_matches([';', ' ']).to_string();
        cleaned.push(';');
        return cleaned;
    }
    trimmed.to_string()
}

/// Pass 10: classification and marker re-attachment.
fn reattach(wants_document_lookup: bool, body: String) -> NormalizedStatement {
    let trimmed = body.trim();

    if trimmed.starts_with("# Cannot determine") {
        return NormalizedStatement::Unroutable;
    }
    if trimmed.starts_with('#') {
        return NormalizedStatement::Rejected(trimmed.to_string());
    }
    if trimmed.is_empty() {
        return if wants_document_lookup {
            NormalizedStatement::EmptyRoutedBody
        } else {
            NormalizedStatement::Rejected(String::new())
        };
    }
    if has_unterminated_literal(trimmed) {
        tracing::warn!(body = trimmed, "unterminated quoted literal in generator output");
        return NormalizedStatement::Rejected(trimmed.to_string());
    }
    if wants_document_lookup {
        return NormalizedStatement::DocumentLookup(format!(
            "{}\n{}",
            PDF_LOOKUP_MARKER, trimmed
        ));
    }
    if !is_fetch_start(trimmed) {
        tracing::warn!(body = trimmed, "non-fetch statement body rejected");
        return NormalizedStatement::Rejected(trimmed.to_string());
    }
    NormalizedStatement::Executable(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_select_passes_through() {
        let result = normalize("SELECT * FROM shipments WHERE LOWER(status) = 'done'");
        assert_eq!(
            result,
            NormalizedStatement::Executable(
                "SELECT * FROM shipments WHERE LOWER(status) = 'done';".to_string()
            )
        );
    }

    #[test]
    fn test_case_fold_repair_lowercases_literal() {
        let result = normalize("SELECT * FROM shipments WHERE LOWER(status) = 'Done'");
        assert_eq!(
            result,
            NormalizedStatement::Executable(
                "SELECT * FROM shipments WHERE LOWER(status) = 'done';".to_string()
            )
        );
    }

    #[test]
    fn test_case_fold_repair_applies_to_like_and_inequality() {
        let result = normalize(
            "SELECT * FROM shipments WHERE LOWER(shipmentName) LIKE '%Acme%' AND LOWER(status) <> 'Done'",
        );
        assert_eq!(
            result,
            NormalizedStatement::Executable(
                "SELECT * FROM shipments WHERE LOWER(shipmentName) LIKE '%acme%' AND LOWER(status) <> 'done';"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_case_fold_repair_leaves_column_expression_alone() {
        let result =
            normalize("SELECT * FROM shipments WHERE LOWER(TRIM(Status)) = 'DONE'");
        assert_eq!(
            result,
            NormalizedStatement::Executable(
                "SELECT * FROM shipments WHERE LOWER(TRIM(Status)) = 'done';".to_string()
            )
        );
    }

    #[test]
    fn test_prose_prefix_is_anchored_away() {
        let result =
            normalize("Here is the SQL:\nSELECT id FROM shipments");
        assert_eq!(
            result,
            NormalizedStatement::Executable("SELECT id FROM shipments;".to_string())
        );
    }

    #[test]
    fn test_code_fences_are_stripped() {
        let result = normalize("```sql\nSELECT id FROM shipments\n```");
        assert_eq!(
            result,
            NormalizedStatement::Executable("SELECT id FROM shipments;".to_string())
        );
    }

    #[test]
    fn test_line_breaks_collapse_inside_and_outside_literals() {
        let result = normalize(
            "SELECT *\nFROM shipments\nWHERE LOWER(notes) LIKE '%line one\\nline two%'",
        );
        assert_eq!(
            result,
            NormalizedStatement::Executable(
                "SELECT * FROM shipments WHERE LOWER(notes) LIKE '%line one line two%';"
                    .to_string()
            )
        );
    }

    #[test]
    fn test_routing_round_trip() {
        let raw = "--PDF_LOOKUP\nSELECT labReport, shipmentName FROM shipments WHERE LOWER(shipmentName) LIKE '%acme%'";
        let result = normalize(raw);
        match &result {
            NormalizedStatement::DocumentLookup(full) => {
                assert!(full.starts_with("--PDF_LOOKUP\n"));
                let body = result.lookup_body().unwrap();
                assert_eq!(
                    body,
                    "SELECT labReport, shipmentName FROM shipments WHERE LOWER(shipmentName) LIKE '%acme%';"
                );
                assert_eq!(body.matches(';').count(), 1);
            }
            other => panic!("expected DocumentLookup, got {:?}", other),
        }
    }

    #[test]
    fn test_routing_detected_before_cleaning_mutates_marker() {
        // Marker plus fenced body: the flag comes from the original text.
        let result = normalize("--PDF_LOOKUP\n```sql\nSELECT labReport, shipmentName FROM shipments\n```");
        assert!(matches!(result, NormalizedStatement::DocumentLookup(_)));
    }

    #[test]
    fn test_refusal_propagates_as_rejected() {
        let result = normalize("# Cannot generate SQL for this question.");
        assert_eq!(
            result,
            NormalizedStatement::Rejected(REFUSAL_MARKER.to_string())
        );
    }

    #[test]
    fn test_terminator_wrapped_refusal_is_unwrapped() {
        let result = normalize("'# Cannot generate SQL for this question.';");
        assert_eq!(
            result,
            NormalizedStatement::Rejected(REFUSAL_MARKER.to_string())
        );
    }

    #[test]
    fn test_cannot_determine_is_unroutable() {
        let result = normalize("# Cannot determine the previous document.");
        assert_eq!(result, NormalizedStatement::Unroutable);
    }

    #[test]
    fn test_empty_routed_body() {
        assert_eq!(normalize("--PDF_LOOKUP"), NormalizedStatement::EmptyRoutedBody);
        assert_eq!(normalize("--PDF_LOOKUP\n  "), NormalizedStatement::EmptyRoutedBody);
    }

    #[test]
    fn test_trailing_artifact_repair() {
        let result = normalize("SELECT * FROM shipments LIMIT 1;';");
        assert_eq!(
            result,
            NormalizedStatement::Executable("SELECT * FROM shipments LIMIT 1;".to_string())
        );
    }

    #[test]
    fn test_doubled_terminators_collapse() {
        let result = normalize("SELECT id FROM shipments;;");
        assert_eq!(
            result,
            NormalizedStatement::Executable("SELECT id FROM shipments;".to_string())
        );
    }

    #[test]
    fn test_unbalanced_trailing_paren_is_dropped() {
        let result = normalize("SELECT COUNT(*) FROM shipments);");
        assert_eq!(
            result,
            NormalizedStatement::Executable("SELECT COUNT(*) FROM shipments;".to_string())
        );
    }

    #[test]
    fn test_unterminated_literal_is_rejected() {
        let result = normalize("SELECT * FROM shipments WHERE status = 'done");
        assert!(matches!(result, NormalizedStatement::Rejected(_)));
    }

    #[test]
    fn test_non_fetch_body_is_rejected_not_executable() {
        for raw in ["DROP TABLE shipments", "DELETE FROM shipments", "no sql here at all"] {
            let result = normalize(raw);
            assert_eq!(
                result,
                NormalizedStatement::Rejected(raw.to_string()),
                "for {:?}",
                raw
            );
        }
    }

    #[test]
    fn test_routed_body_is_not_fetch_checked_here() {
        // Lookup bodies stay routed; the router's sanitizer pass gates them.
        let result = normalize("--PDF_LOOKUP\nDELETE FROM shipments");
        assert!(matches!(result, NormalizedStatement::DocumentLookup(_)));
    }

    #[test]
    fn test_idempotence_over_representative_outputs() {
        let samples = [
            "SELECT * FROM shipments WHERE LOWER(status) = 'Done'",
            "```sql\nSELECT id\nFROM shipments\n```",
            "Here is the SQL: SELECT id FROM shipments;",
            "--PDF_LOOKUP\nSELECT laboratoryReport, shipmentName FROM shipments WHERE LOWER(shipmentName) LIKE '%acme%'",
            "--PDF_LOOKUP",
            "# Cannot generate SQL for this question.",
            "# Cannot determine the previous document.",
            "SELECT * FROM shipments LIMIT 1;';",
            "SELECT COUNT(*) FROM shipments);",
            "WITH t AS (SELECT * FROM shipments) SELECT * FROM t",
            "no sql here at all",
            "",
        ];
        for raw in samples {
            let once = normalize(raw);
            let twice = normalize(&once.rendered());
            assert_eq!(once, twice, "not idempotent for {:?}", raw);
        }
    }
}
