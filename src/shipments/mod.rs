// src/shipments/mod.rs
// Shipment question-answering domain: store access, the LLM compilation
// pipeline, and the request-scoped entry point.

pub mod ai;
pub mod database;
pub mod error;
pub mod pipeline;

pub use error::{PipelineResult, QueryError};
pub use pipeline::{answer_question, Collaborators, PipelineConfig, QuestionRequest, QuestionResponse};
