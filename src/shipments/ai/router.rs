// src/shipments/ai/router.rs
//! Document router: turns a routed lookup statement into a prose answer.
//!
//! ## Responsibilities
//!
//! - Detect document-content intent on the question text itself,
//!   independently of the generator's own routing decision
//! - Detect elliptical follow-ups to a previous document answer
//! - Run the lookup through sanitizer + executor, derive the document
//!   descriptor, extract text, and issue the second generation call
//!
//! The flow is a straight line through four phases
//! (`AwaitingPathLookup → AwaitingDocumentText → Answering → Answered`);
//! every failure short-circuits into a user-facing explanation rather than a
//! hard error, except a missing store which aborts the whole request.

use super::compiler::QueryCompiler;
use super::extraction::{DocumentDescriptor, TextExtractor};
use super::generator::{ConversationTurn, Role};
use super::normalizer::NormalizedStatement;
use super::sanitizer;
use super::PDF_LOOKUP_MARKER;
use crate::shipments::database::{execute_fetch, DbConnection, FetchResult};
use crate::shipments::error::{PipelineResult, QueryError};
use crate::shipments::pipeline::PipelineConfig;

/// Question words/phrases that signal the answer lives inside an attached
/// document. A replaceable policy table, not a contract.
const DOCUMENT_TRIGGER_PHRASES: &[&str] = &[
    "pdf",
    "document",
    "lab report",
    "laboratory report",
    "shipping docs",
    "shipping documents",
    "attachment",
    "attached",
    "in the report",
    "report say",
    "report says",
    "report state",
    "contents of",
];

/// Short affirmations/elliptical follow-ups. Replaceable policy table.
const AFFIRMATIVE_FOLLOWUPS: &[&str] = &[
    "yes",
    "yes please",
    "sure",
    "ok",
    "okay",
    "go ahead",
    "go on",
    "more",
    "more detail",
    "more details",
    "tell me more",
    "what else",
    "anything else",
];

/// Openings the second generation call is instructed to produce, so document
/// answers in the turn history are recognizable. Replaceable policy table.
const DOCUMENT_ANSWER_PHRASES: &[&str] = &[
    "from the document",
    "the document states",
    "according to the document",
    "could not read its contents",
    "could not find the document",
];

/// What the router hands back to the pipeline: always a best-effort
/// statement string and a human-readable answer, never rows (document
/// answers are prose).
#[derive(Debug)]
pub struct RouterOutcome {
    pub statement: String,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingPathLookup,
    AwaitingDocumentText,
    Answering,
}

pub struct DocumentRouter<'a> {
    config: &'a PipelineConfig,
    compiler: &'a QueryCompiler<'a>,
    extractor: &'a dyn TextExtractor,
}

impl<'a> DocumentRouter<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        compiler: &'a QueryCompiler<'a>,
        extractor: &'a dyn TextExtractor,
    ) -> Self {
        Self {
            config,
            compiler,
            extractor,
        }
    }

    /// Heuristic document-content intent on the question text itself. Used
    /// to catch generator omission of the routing marker.
    pub fn question_wants_document(question: &str) -> bool {
        let lowered = question.to_lowercase();
        DOCUMENT_TRIGGER_PHRASES.iter().any(|p| lowered.contains(p))
    }

    /// Heuristic: a short affirmative question following a document answer
    /// (or a document-trigger question one turn earlier) is an implicit
    /// request to revisit the same document, not a fresh fetch question.
    pub fn is_document_followup(question: &str, turns: &[ConversationTurn]) -> bool {
        let cleaned = question
            .trim()
            .trim_end_matches(['?', '!', '.'])
            .to_lowercase();
        let short = cleaned.split_whitespace().count() <= 4;
        let affirmative = AFFIRMATIVE_FOLLOWUPS.iter().any(|p| cleaned == *p)
            || (short && AFFIRMATIVE_FOLLOWUPS.iter().any(|p| cleaned.starts_with(p)));
        if !affirmative {
            return false;
        }

        let last_is_document_answer = turns.last().is_some_and(|turn| {
            turn.role == Role::Assistant
                && DOCUMENT_ANSWER_PHRASES
                    .iter()
                    .any(|p| turn.content.to_lowercase().contains(p))
        });
        let prior_user_triggered = turns.len() >= 2
            && turns[turns.len() - 2].role == Role::User
            && Self::question_wants_document(&turns[turns.len() - 2].content);

        last_is_document_answer || prior_user_triggered
    }

    /// Recovers the most recent routed lookup statement from the supplied
    /// turn history (assistant turns carry prior generated statements).
    pub fn recover_previous_lookup(turns: &[ConversationTurn]) -> Option<String> {
        turns.iter().rev().find_map(|turn| {
            if turn.role != Role::Assistant {
                return None;
            }
            let content = turn.content.trim();
            content
                .starts_with(PDF_LOOKUP_MARKER)
                .then(|| content.to_string())
        })
    }

    /// Runs the full document flow for a routed lookup.
    pub fn run(&self, question: &str, lookup: &NormalizedStatement) -> PipelineResult<RouterOutcome> {
        let statement = lookup.rendered();

        let body = match lookup {
            NormalizedStatement::DocumentLookup(_) => lookup.lookup_body().unwrap_or_default().to_string(),
            NormalizedStatement::EmptyRoutedBody => {
                return Ok(RouterOutcome {
                    statement,
                    answer: "I recognized a document question but could not produce a lookup \
                             for it. Please name the shipment and the document you mean."
                        .to_string(),
                });
            }
            NormalizedStatement::Unroutable => {
                return Ok(RouterOutcome {
                    statement,
                    answer: "I could not determine which previous document you mean. Please \
                             ask about the document again with the shipment name."
                        .to_string(),
                });
            }
            other => {
                tracing::warn!(?other, "router invoked with a non-routed statement");
                return Ok(RouterOutcome {
                    statement,
                    answer: "This question did not resolve to a document lookup.".to_string(),
                });
            }
        };

        let mut phase = Phase::AwaitingPathLookup;
        tracing::debug!(?phase, %body, "document lookup started");

        if let Err(err) = sanitizer::sanitize(&body) {
            tracing::warn!(error = %err, "document lookup failed the safety gate");
            return Ok(RouterOutcome {
                statement,
                answer: "The generated document lookup was not a safe read-only query, so it \
                         was not executed."
                    .to_string(),
            });
        }

        let descriptor = match self.resolve_descriptor(&body) {
            Ok(d) => d,
            Err(QueryError::StoreUnavailable(path)) => {
                return Err(QueryError::StoreUnavailable(path));
            }
            Err(err) => {
                tracing::warn!(error = %err, "document path lookup failed");
                return Ok(RouterOutcome {
                    statement,
                    answer: format!(
                        "I could not find the document referenced by this question: {}",
                        err
                    ),
                });
            }
        };

        phase = Phase::AwaitingDocumentText;
        tracing::debug!(?phase, shipment = %descriptor.shipment_label,
            column = %descriptor.document_column, "resolving document text");

        let text = match self.extractor.extract(&descriptor) {
            Ok(Some(text)) => text,
            Ok(None) | Err(QueryError::ExtractionFailed(_)) => {
                return Ok(RouterOutcome {
                    statement,
                    answer: format!(
                        "I found the document reference '{}' for shipment '{}' but could not \
                         read its contents.",
                        descriptor.stored_path_value, descriptor.shipment_label
                    ),
                });
            }
            Err(other) => return Err(other),
        };

        phase = Phase::Answering;
        tracing::debug!(?phase, bytes = text.len(), "answering from document text");

        let answer = match self.compiler.generate_document_answer(
            &text,
            &descriptor.shipment_label,
            question,
        ) {
            Ok(answer) => answer.trim().to_string(),
            Err(err) => {
                tracing::warn!(error = %err, "document answer generation failed");
                format!(
                    "I read the document for shipment '{}' but could not generate an answer \
                     from it.",
                    descriptor.shipment_label
                )
            }
        };

        Ok(RouterOutcome { statement, answer })
    }

    /// AwaitingPathLookup: exactly one descriptor must be derivable from the
    /// first result row — the label column value plus the first other
    /// column's name and value.
    fn resolve_descriptor(&self, lookup_sql: &str) -> PipelineResult<DocumentDescriptor> {
        let conn = DbConnection::open_read_only(&self.config.db_path)?;
        let result = execute_fetch(&conn, lookup_sql)?;
        derive_descriptor(&result, &self.config.label_column)
    }
}

/// Derives the document descriptor from a lookup result. Separated from the
/// router so it can be tested without a store.
pub fn derive_descriptor(
    result: &FetchResult,
    label_column: &str,
) -> PipelineResult<DocumentDescriptor> {
    let row = result
        .rows
        .first()
        .ok_or_else(|| QueryError::PathUnresolved("the lookup returned no rows".to_string()))?;

    let shipment_label = row
        .get(label_column)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            QueryError::PathUnresolved(format!(
                "the lookup did not return a '{}' value",
                label_column
            ))
        })?;

    // First non-label column in result order carries the stored path.
    for column in &result.columns {
        if column == label_column {
            continue;
        }
        if let Some(value) = row.get(column).and_then(|v| v.as_str()) {
            let value = value.trim();
            if !value.is_empty() {
                return Ok(DocumentDescriptor {
                    stored_path_value: value.to_string(),
                    shipment_label,
                    document_column: column.clone(),
                });
            }
        }
    }

    Err(QueryError::PathUnresolved(
        "the lookup returned no document column".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lookup_result(columns: &[&str], row: serde_json::Value) -> FetchResult {
        let mut map = serde_json::Map::new();
        if let serde_json::Value::Object(obj) = row {
            map = obj;
        }
        FetchResult {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: vec![map],
        }
    }

    #[test]
    fn test_descriptor_uses_first_non_label_column() {
        let result = lookup_result(
            &["laboratoryReport", "shipmentName"],
            json!({ "laboratoryReport": "Lab Report March.pdf", "shipmentName": "Acme March" }),
        );
        let descriptor = derive_descriptor(&result, "shipmentName").unwrap();
        assert_eq!(descriptor.stored_path_value, "Lab Report March.pdf");
        assert_eq!(descriptor.shipment_label, "Acme March");
        assert_eq!(descriptor.document_column, "laboratoryReport");
    }

    #[test]
    fn test_descriptor_fails_without_rows() {
        let result = FetchResult {
            columns: vec!["laboratoryReport".to_string(), "shipmentName".to_string()],
            rows: Vec::new(),
        };
        assert!(matches!(
            derive_descriptor(&result, "shipmentName"),
            Err(QueryError::PathUnresolved(_))
        ));
    }

    #[test]
    fn test_descriptor_fails_without_label_or_document_column() {
        let no_label = lookup_result(
            &["laboratoryReport"],
            json!({ "laboratoryReport": "x.pdf" }),
        );
        assert!(derive_descriptor(&no_label, "shipmentName").is_err());

        let no_document = lookup_result(
            &["shipmentName"],
            json!({ "shipmentName": "Acme March" }),
        );
        assert!(derive_descriptor(&no_document, "shipmentName").is_err());
    }

    #[test]
    fn test_question_intent_heuristic() {
        assert!(DocumentRouter::question_wants_document(
            "what does the lab report say about zinc content?"
        ));
        assert!(DocumentRouter::question_wants_document(
            "summarize the PDF for Acme March"
        ));
        assert!(!DocumentRouter::question_wants_document(
            "how many shipments are done?"
        ));
    }

    #[test]
    fn test_followup_detection_needs_affirmation_and_context() {
        let turns = vec![
            ConversationTurn::user("what does the lab report say about zinc?"),
            ConversationTurn::assistant("From the document: zinc content is 54.2%."),
        ];
        assert!(DocumentRouter::is_document_followup("yes, tell me more", &turns));
        assert!(DocumentRouter::is_document_followup("More details?", &turns));
        assert!(!DocumentRouter::is_document_followup(
            "how many shipments are done?",
            &turns
        ));
        assert!(!DocumentRouter::is_document_followup("tell me more", &[]));
    }

    #[test]
    fn test_recover_previous_lookup_scans_assistant_turns() {
        let turns = vec![
            ConversationTurn::user("what does the lab report say?"),
            ConversationTurn::assistant(
                "--PDF_LOOKUP\nSELECT laboratoryReport, shipmentName FROM shipments WHERE LOWER(shipmentName) LIKE '%acme%';",
            ),
            ConversationTurn::assistant("From the document: zinc content is 54.2%."),
        ];
        let recovered = DocumentRouter::recover_previous_lookup(&turns).unwrap();
        assert!(recovered.starts_with("--PDF_LOOKUP"));
        assert!(DocumentRouter::recover_previous_lookup(&[]).is_none());
    }
}
