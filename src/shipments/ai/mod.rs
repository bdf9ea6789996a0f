// src/shipments/ai/mod.rs
//! Language-model-output compilation pipeline.
//!
//! ## Architecture Overview
//!
//! - **Compiler**: builds the generation request (schema + rules + turns)
//!   and invokes the text-generation collaborator
//! - **Normalizer**: converts raw model output into one canonical,
//!   executable statement or a routed marker
//! - **Sanitizer**: lexical read-only gate over normalized statements
//! - **Router**: document-lookup orchestration across two model calls
//! - **Generator**: the text-generation collaborator boundary
//! - **Extraction**: document location and text extraction boundary
//!
//! Every string returned by the generator is untrusted; nothing reaches the
//! store without passing the normalizer and the sanitizer.

pub mod compiler;
pub mod extraction;
pub mod generator;
pub mod normalizer;
pub mod router;
pub mod sanitizer;

/// Routing marker the generator prefixes to document-content lookups.
/// Matched case-sensitively on the original text, before any cleaning.
pub const PDF_LOOKUP_MARKER: &str = "--PDF_LOOKUP";

/// Literal refusal the generator returns when no read-only fetch can answer
/// the question.
pub const REFUSAL_MARKER: &str = "# Cannot generate SQL for this question.";

/// Literal marker for elliptical document follow-ups whose prior lookup
/// cannot be inferred from the conversation.
pub const CANNOT_DETERMINE_MARKER: &str = "# Cannot determine the previous document.";

pub use compiler::{QueryCompiler, SelectedRowContext};
pub use extraction::{DocumentDescriptor, DocumentLocator, FileTextExtractor, FolderMap, TextExtractor};
pub use generator::{ConversationTurn, GenerationRequest, GeminiGenerator, Role, TextGenerator};
pub use normalizer::{normalize, NormalizedStatement};
pub use router::DocumentRouter;
pub use sanitizer::sanitize;
