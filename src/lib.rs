// src/lib.rs
//! shipquery: natural-language questions over a shipment SQLite database.
//!
//! The crate compiles untrusted language-model output into a single safe,
//! read-only SQL statement, or routes document-content questions through a
//! lookup/extract/answer flow. The HTTP surface that would sit in front of
//! [`shipments::answer_question`] is deliberately out of scope; this library
//! plus the bundled CLI is the whole deliverable.

pub mod cli;
pub mod settings;
pub mod shipments;

pub use shipments::{
    answer_question, Collaborators, PipelineConfig, QueryError, QuestionRequest, QuestionResponse,
};
