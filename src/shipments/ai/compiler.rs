// src/shipments/ai/compiler.rs
//! Query compiler: assembles the generation request that turns a question
//! into candidate SQL.
//!
//! The rule-set encoded here is the contract the generator is asked to obey
//! and the contract the normalizer/sanitizer police on the way back. The two
//! sides must stay in sync: every marker and rewrite rule in the
//! instructions has a matching detection pass downstream.

use super::generator::{ConversationTurn, GenerationRequest, TextGenerator};
use super::{CANNOT_DETERMINE_MARKER, PDF_LOOKUP_MARKER, REFUSAL_MARKER};
use crate::shipments::error::{PipelineResult, QueryError};
use serde_json::Value;
use std::collections::BTreeMap;

/// A row the human has focused on, injected as disambiguating context.
/// Keys are column names; JSON nulls are dropped before formatting.
pub type SelectedRowContext = BTreeMap<String, Value>;

pub struct QueryCompiler<'a> {
    generator: Option<&'a dyn TextGenerator>,
}

impl<'a> QueryCompiler<'a> {
    pub fn new(generator: Option<&'a dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Builds the full generation request and invokes the generator once.
    /// Returns the raw, untrusted model text.
    pub fn generate_statement(
        &self,
        schema_description: &str,
        selected: Option<&SelectedRowContext>,
        prior_turns: &[ConversationTurn],
        question: &str,
        table: &str,
        label_column: &str,
        document_columns: &[String],
    ) -> PipelineResult<String> {
        let generator = self.generator.ok_or(QueryError::GenerationUnavailable)?;
        let request = GenerationRequest {
            system_instructions: build_system_instructions(
                schema_description,
                selected,
                table,
                label_column,
                document_columns,
            ),
            prior_turns: prior_turns.to_vec(),
            current_question: question.to_string(),
        };
        tracing::debug!(question, turns = prior_turns.len(), "invoking text generator");
        generator.generate(&request)
    }

    /// Retry path used when the question clearly concerns document content
    /// but the generator omitted the routing marker: instructions are
    /// narrowed so the only acceptable output is a routed lookup.
    pub fn generate_lookup_only(
        &self,
        schema_description: &str,
        prior_turns: &[ConversationTurn],
        question: &str,
        table: &str,
        label_column: &str,
        document_columns: &[String],
    ) -> PipelineResult<String> {
        let generator = self.generator.ok_or(QueryError::GenerationUnavailable)?;
        let request = GenerationRequest {
            system_instructions: build_lookup_only_instructions(
                schema_description,
                table,
                label_column,
                document_columns,
            ),
            prior_turns: prior_turns.to_vec(),
            current_question: question.to_string(),
        };
        tracing::debug!(question, "retrying generation with lookup-only instructions");
        generator.generate(&request)
    }

    /// Second call of the document flow: answer the original question from
    /// the extracted text alone. No schema, no turn history.
    pub fn generate_document_answer(
        &self,
        document_text: &str,
        shipment_label: &str,
        question: &str,
    ) -> PipelineResult<String> {
        let generator = self.generator.ok_or(QueryError::GenerationUnavailable)?;
        let request = GenerationRequest {
            system_instructions: build_document_answer_instructions(document_text, shipment_label),
            prior_turns: Vec::new(),
            current_question: question.to_string(),
        };
        generator.generate(&request)
    }
}

/// Renders the selected-row clause, dropping JSON nulls.
fn render_selected_row(selected: &SelectedRowContext) -> Option<String> {
    let parts: Vec<String> = selected
        .iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| match v {
            Value::String(s) => format!("{} = '{}'", k, s),
            other => format!("{} = {}", k, other),
        })
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(format!(
        "The user currently has this row selected; prefer it when the question is ambiguous: {}.",
        parts.join(", ")
    ))
}

pub fn build_system_instructions(
    schema_description: &str,
    selected: Option<&SelectedRowContext>,
    table: &str,
    label_column: &str,
    document_columns: &[String],
) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "You translate questions about shipment records into SQLite SQL for the table '{}'.\n{}\n\n",
        table, schema_description
    ));
    if let Some(clause) = selected.and_then(render_selected_row) {
        out.push_str(&clause);
        out.push_str("\n\n");
    }
    out.push_str("Rules:\n");
    out.push_str("1. Return only the bare SQL statement. No prose, no markdown, no code fences.\n");
    out.push_str(
        "2. String comparisons must be case-insensitive: wrap the column in LOWER() and write \
         the literal in lowercase, e.g. LOWER(status) = 'done'.\n",
    );
    out.push_str(
        "3. Numeric columns stored as text with currency symbols or thousands separators must be \
         cleaned before arithmetic, comparison, or ordering: \
         CAST(REPLACE(REPLACE(column, '$', ''), ',', '') AS REAL).\n",
    );
    out.push_str(
        "4. Date columns stored as M/D/YYYY text must be converted to ISO YYYY-MM-DD before \
         comparing against ISO literals, using exactly: \
         substr(column, -4) || '-' || printf('%02d', CAST(substr(column, 1, instr(column, '/') - 1) AS INTEGER)) \
         || '-' || printf('%02d', CAST(substr(substr(column, instr(column, '/') + 1), 1, \
         instr(substr(column, instr(column, '/') + 1), '/') - 1) AS INTEGER)).\n",
    );
    out.push_str(
        "5. For follow-up questions, take the filter predicate from the most recent SQL statement \
         in the conversation and AND it with the new condition. Aggregate follow-ups apply the \
         aggregate over that same filter. A 'show me the rows' follow-up to an aggregate must be \
         a filtered SELECT using the aggregate as a sub-select bound, not a bare aggregate.\n",
    );
    out.push_str(&format!(
        "6. If the question asks about the textual content of an attached document (PDF), output \
         the line {} followed by a newline, then a SELECT of exactly the relevant document column \
         ({}) and {} — never the document content itself.\n",
        PDF_LOOKUP_MARKER,
        document_columns.join(" or "),
        label_column
    ));
    out.push_str(&format!(
        "7. If the question cannot be answered by a read-only SELECT (ambiguous, conversational, \
         or would modify data), return exactly: {}\n",
        REFUSAL_MARKER
    ));
    out.push_str(&format!(
        "8. If the question is a short follow-up to a previous document answer and the previous \
         document lookup cannot be inferred from the conversation, return exactly: {}\n",
        CANNOT_DETERMINE_MARKER
    ));
    out
}

pub fn build_lookup_only_instructions(
    schema_description: &str,
    table: &str,
    label_column: &str,
    document_columns: &[String],
) -> String {
    format!(
        "You translate questions about shipment records into SQLite document lookups for the \
         table '{}'.\n{}\n\nThe question concerns the content of an attached document. Your only \
         valid output is the line {} followed by a newline, then a SELECT of exactly the relevant \
         document column ({}) and {} for the shipment in question. Wrap string comparisons in \
         LOWER() with lowercase literals. No prose, no markdown. If even that is impossible, \
         return exactly: {}",
        table,
        schema_description,
        PDF_LOOKUP_MARKER,
        document_columns.join(" or "),
        label_column,
        REFUSAL_MARKER
    )
}

pub fn build_document_answer_instructions(document_text: &str, shipment_label: &str) -> String {
    format!(
        "You answer a question about shipment '{}' using only the document text below. Begin your \
         answer with 'From the document:'. Be concise and factual. If the document does not \
         contain the answer, say so plainly instead of guessing.\n\n--- DOCUMENT TEXT ---\n{}\n--- END DOCUMENT TEXT ---",
        shipment_label, document_text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_columns() -> Vec<String> {
        vec!["laboratoryReport".to_string(), "shippingDocsFinalDocs".to_string()]
    }

    #[test]
    fn test_instructions_encode_all_rules() {
        let instructions = build_system_instructions(
            "Table 'shipments' columns: status (TEXT).",
            None,
            "shipments",
            "shipmentName",
            &doc_columns(),
        );
        assert!(instructions.contains("LOWER(status) = 'done'"));
        assert!(instructions.contains("REPLACE(REPLACE(column, '$', ''), ',', '')"));
        assert!(instructions.contains("printf('%02d'"));
        assert!(instructions.contains(PDF_LOOKUP_MARKER));
        assert!(instructions.contains(REFUSAL_MARKER));
        assert!(instructions.contains(CANNOT_DETERMINE_MARKER));
        assert!(instructions.contains("sub-select bound"));
    }

    #[test]
    fn test_selected_row_clause_drops_nulls() {
        let mut selected = SelectedRowContext::new();
        selected.insert("shipmentName".to_string(), Value::from("Acme March"));
        selected.insert("eta".to_string(), Value::Null);
        let instructions = build_system_instructions(
            "Table 'shipments' columns: status (TEXT).",
            Some(&selected),
            "shipments",
            "shipmentName",
            &doc_columns(),
        );
        assert!(instructions.contains("shipmentName = 'Acme March'"));
        assert!(!instructions.contains("eta ="));
    }

    #[test]
    fn test_no_generator_is_unavailable_not_fatal() {
        let compiler = QueryCompiler::new(None);
        let err = compiler
            .generate_statement(
                "Table 'shipments' columns: status (TEXT).",
                None,
                &[],
                "status is Done",
                "shipments",
                "shipmentName",
                &doc_columns(),
            )
            .unwrap_err();
        assert!(matches!(err, QueryError::GenerationUnavailable));
    }
}
