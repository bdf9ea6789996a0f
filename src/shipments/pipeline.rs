// src/shipments/pipeline.rs
//! The "answer a question" entry point: one call per inbound question,
//! wiring compiler → normalizer → sanitizer → router/executor together.
//!
//! Everything here is request-scoped. The caller supplies the conversation
//! turns and gets them back untouched; no session state survives the call.
//! Degraded outcomes (refusals, unsafe statements, extraction failures)
//! still produce a response carrying the best-effort generated statement and
//! a human-readable answer — only a missing store or bad client input abort.

use crate::shipments::ai::compiler::{QueryCompiler, SelectedRowContext};
use crate::shipments::ai::generator::{ConversationTurn, TextGenerator};
use crate::shipments::ai::normalizer::{normalize, NormalizedStatement};
use crate::shipments::ai::router::DocumentRouter;
use crate::shipments::ai::{extraction::TextExtractor, sanitizer, CANNOT_DETERMINE_MARKER};
use crate::shipments::database::{describe_table, execute_fetch, DbConnection, FetchResult};
use crate::shipments::error::{PipelineResult, QueryError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Store-side configuration for the pipeline. Explicit rather than ambient
/// so tests can point it at a scratch database.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub db_path: PathBuf,
    pub table: String,
    /// Column whose value names a shipment in lookup results.
    pub label_column: String,
    /// Columns that store document path values.
    pub document_columns: Vec<String>,
}

impl PipelineConfig {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            table: "shipments".to_string(),
            label_column: "shipmentName".to_string(),
            document_columns: vec![
                "laboratoryReport".to_string(),
                "shippingDocsProvisional".to_string(),
                "shippingDocsFinalDocs".to_string(),
            ],
        }
    }
}

/// External collaborators, passed in rather than reached for globally so
/// tests can substitute fakes.
pub struct Collaborators<'a> {
    pub generator: Option<&'a dyn TextGenerator>,
    pub extractor: &'a dyn TextExtractor,
}

/// One inbound question with its caller-supplied context.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuestionRequest {
    pub question: String,
    #[serde(default)]
    pub selected_row_context: Option<SelectedRowContext>,
    #[serde(default)]
    pub prior_turns: Vec<ConversationTurn>,
}

/// The full response contract: the caller always gets the schema it was
/// answered against, the best-effort generated statement, and an answer
/// string, even when the pipeline degraded along the way.
#[derive(Debug, Clone, Serialize)]
pub struct QuestionResponse {
    pub question: String,
    pub selected_row_context: Option<SelectedRowContext>,
    pub prior_turns: Vec<ConversationTurn>,
    pub schema_description: String,
    pub generated_statement: String,
    pub answer: String,
    pub rows: Option<FetchResult>,
}

const STATEMENT_NOT_ATTEMPTED: &str = "# SQL generation not attempted.";

/// Answers one natural-language question about the shipment store.
pub fn answer_question(
    config: &PipelineConfig,
    collaborators: &Collaborators<'_>,
    request: QuestionRequest,
) -> PipelineResult<QuestionResponse> {
    let request_id = Uuid::new_v4();
    let span = tracing::info_span!("question", %request_id);
    let _guard = span.enter();

    let question = request.question.trim().to_string();
    if question.is_empty() {
        return Err(QueryError::ClientInputError(
            "Missing 'question' in request".to_string(),
        ));
    }
    tracing::info!(%question, turns = request.prior_turns.len(), "handling question");

    let schema_description = {
        let conn = DbConnection::open_read_only(&config.db_path)?;
        describe_table(&conn, &config.table)?
    };

    let compiler = QueryCompiler::new(collaborators.generator);
    let router = DocumentRouter::new(config, &compiler, collaborators.extractor);

    let base = |statement: String, answer: String, rows: Option<FetchResult>| QuestionResponse {
        question: question.clone(),
        selected_row_context: request.selected_row_context.clone(),
        prior_turns: request.prior_turns.clone(),
        schema_description: schema_description.clone(),
        generated_statement: statement,
        answer,
        rows,
    };

    // Elliptical follow-up to a previous document answer: re-run the prior
    // lookup instead of treating the short text as a fresh question.
    if DocumentRouter::is_document_followup(&question, &request.prior_turns) {
        tracing::info!("question detected as document follow-up");
        match DocumentRouter::recover_previous_lookup(&request.prior_turns) {
            Some(previous) => {
                let lookup = normalize(&previous);
                let outcome = router.run(&question, &lookup)?;
                return Ok(base(outcome.statement, outcome.answer, None));
            }
            None => {
                return Ok(base(
                    CANNOT_DETERMINE_MARKER.to_string(),
                    "I could not determine which previous document you mean. Please ask \
                     about the document again with the shipment name."
                        .to_string(),
                    None,
                ));
            }
        }
    }

    // First generation call.
    let raw = match compiler.generate_statement(
        &schema_description,
        request.selected_row_context.as_ref(),
        &request.prior_turns,
        &question,
        &config.table,
        &config.label_column,
        &config.document_columns,
    ) {
        Ok(raw) => raw,
        Err(QueryError::GenerationUnavailable) => {
            tracing::warn!("no text generator configured");
            return Ok(base(
                STATEMENT_NOT_ATTEMPTED.to_string(),
                "The language model is not configured, so the question could not be \
                 translated into a query."
                    .to_string(),
                None,
            ));
        }
        Err(QueryError::GenerationError(detail)) => {
            tracing::warn!(%detail, "text generation failed");
            return Ok(base(
                STATEMENT_NOT_ATTEMPTED.to_string(),
                format!("SQL generation failed: {}", detail),
                None,
            ));
        }
        Err(other) => return Err(other),
    };

    let normalized = normalize(&raw);
    tracing::debug!(statement = %normalized.rendered(), "normalized generator output");

    match normalized {
        NormalizedStatement::Rejected(body) => {
            let shown = if body.is_empty() {
                "(empty output)".to_string()
            } else {
                body
            };
            Ok(base(
                shown.clone(),
                format!(
                    "Could not generate a valid SQL query for your question. The generator \
                     said: {}",
                    shown
                ),
                None,
            ))
        }
        lookup @ (NormalizedStatement::DocumentLookup(_)
        | NormalizedStatement::Unroutable
        | NormalizedStatement::EmptyRoutedBody) => {
            let outcome = router.run(&question, &lookup)?;
            Ok(base(outcome.statement, outcome.answer, None))
        }
        NormalizedStatement::Executable(sql) => {
            // The question may clearly concern document content even though
            // the generator skipped the marker; force one narrowed retry.
            if DocumentRouter::question_wants_document(&question) {
                tracing::info!("question looks document-directed; retrying as lookup");
                if let Ok(retry_raw) = compiler.generate_lookup_only(
                    &schema_description,
                    &request.prior_turns,
                    &question,
                    &config.table,
                    &config.label_column,
                    &config.document_columns,
                ) {
                    let retried = normalize(&retry_raw);
                    if matches!(retried, NormalizedStatement::DocumentLookup(_)) {
                        let outcome = router.run(&question, &retried)?;
                        return Ok(base(outcome.statement, outcome.answer, None));
                    }
                    tracing::warn!("lookup retry did not produce a routed statement");
                }
            }

            if let Err(err) = sanitizer::sanitize(&sql) {
                tracing::warn!(error = %err, "statement blocked by the safety gate");
                return Ok(base(
                    sql,
                    "The generated statement was not a read-only query, so it was not \
                     executed. Only SELECT statements are permitted."
                        .to_string(),
                    None,
                ));
            }

            let conn = DbConnection::open_read_only(&config.db_path)?;
            match execute_fetch(&conn, &sql) {
                Ok(result) => Ok(base(
                    sql,
                    "Query executed successfully. Returning data.".to_string(),
                    Some(result),
                )),
                Err(QueryError::ExecutionError(detail)) => {
                    tracing::warn!(%detail, "generated statement failed to execute");
                    Ok(base(
                        sql,
                        format!("Error executing the generated SQL query: {}", detail),
                        None,
                    ))
                }
                Err(other) => Err(other),
            }
        }
    }
}
