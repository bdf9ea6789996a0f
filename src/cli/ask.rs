// src/cli/ask.rs

use crate::settings::AppSettings;
use crate::shipments::ai::compiler::SelectedRowContext;
use crate::shipments::ai::{DocumentLocator, FileTextExtractor, FolderMap, GeminiGenerator, TextGenerator};
use crate::shipments::{answer_question, Collaborators, PipelineConfig, QuestionRequest, QueryError};

/// Parses `column=value` pairs into a selected-row context.
pub fn parse_context_pairs(pairs: &[String]) -> Result<Option<SelectedRowContext>, QueryError> {
    if pairs.is_empty() {
        return Ok(None);
    }
    let mut context = SelectedRowContext::new();
    for pair in pairs {
        let (column, value) = pair.split_once('=').ok_or_else(|| {
            QueryError::ClientInputError(format!("context pair '{}' is not COL=VALUE", pair))
        })?;
        context.insert(column.trim().to_string(), serde_json::Value::from(value.trim()));
    }
    Ok(Some(context))
}

/// Builds the pipeline collaborators from process settings and answers one
/// question, printing the statement, answer, and any rows.
pub fn run(settings: &AppSettings, question: String, context: Vec<String>) -> Result<(), QueryError> {
    let folder_map = match &settings.folder_map_path {
        Some(path) => FolderMap::load(path)?,
        None => FolderMap::default(),
    };
    let extractor = FileTextExtractor::new(DocumentLocator::new(
        settings.documents_root.clone(),
        folder_map,
    ));

    let generator: Option<GeminiGenerator> = match &settings.api_key {
        Some(key) => Some(GeminiGenerator::new(key.clone(), settings.model.clone())?),
        None => None,
    };

    let config = PipelineConfig::new(settings.db_path.clone());
    let collaborators = Collaborators {
        generator: generator.as_ref().map(|g| g as &dyn TextGenerator),
        extractor: &extractor,
    };

    let response = answer_question(
        &config,
        &collaborators,
        QuestionRequest {
            question,
            selected_row_context: parse_context_pairs(&context)?,
            prior_turns: Vec::new(),
        },
    )?;

    println!("statement: {}", response.generated_statement);
    println!("answer:    {}", response.answer);
    if let Some(rows) = &response.rows {
        println!("{}", serde_json::to_string_pretty(&rows.rows)?);
    }
    Ok(())
}
