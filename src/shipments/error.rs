// src/shipments/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Error taxonomy for the question pipeline.
///
/// Variants split into two groups: failures that degrade to a user-facing
/// explanation with no rows (generation, extraction, sanitizer rejections)
/// and failures that abort the whole request (missing store, bad client
/// input, unexpected engine faults). The split is applied by the pipeline
/// entry point, not encoded here.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("Could not retrieve schema for table '{table}': {detail}")]
    SchemaUnavailable { table: String, detail: String },

    #[error("No text generator is configured")]
    GenerationUnavailable,

    #[error("Text generation failed: {0}")]
    GenerationError(String),

    #[error("Query type not allowed. Only read-only SELECT statements are permitted.")]
    UnsafeStatement {
        /// The disallowed word that triggered the rejection, if any.
        /// Surfaced in logs only, never in responses.
        keyword: Option<String>,
    },

    #[error("Database file not found at {}", .0.display())]
    StoreUnavailable(PathBuf),

    #[error("Error executing SQL: {0}")]
    ExecutionError(String),

    #[error("Could not resolve a document path from the lookup result: {0}")]
    PathUnresolved(String),

    #[error("Could not extract text from document '{0}'")]
    ExtractionFailed(String),

    #[error("Could not determine which previous document the question refers to")]
    CannotDetermine,

    #[error("Document lookup was requested but the statement body was empty")]
    EmptyRoutedBody,

    #[error("{0}")]
    ClientInputError(String),
}

pub type PipelineResult<T> = Result<T, QueryError>;

impl From<rusqlite::Error> for QueryError {
    fn from(err: rusqlite::Error) -> Self {
        QueryError::ExecutionError(err.to_string())
    }
}

impl From<serde_json::Error> for QueryError {
    fn from(err: serde_json::Error) -> Self {
        QueryError::ClientInputError(format!("Invalid JSON: {}", err))
    }
}

impl From<std::io::Error> for QueryError {
    fn from(err: std::io::Error) -> Self {
        QueryError::ExtractionFailed(err.to_string())
    }
}
