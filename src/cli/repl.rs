// src/cli/repl.rs

use crate::settings::AppSettings;
use crate::shipments::ai::{
    ConversationTurn, DocumentLocator, FileTextExtractor, FolderMap, GeminiGenerator,
    TextGenerator,
};
use crate::shipments::{answer_question, Collaborators, PipelineConfig, QuestionRequest, QueryError};
use std::io::{BufRead, Write};

/// Interactive question loop. Turns accumulate in memory only: assistant
/// turns carry the generated statement (so follow-up filter inference and
/// document-lookup recovery work) followed by the prose answer.
pub fn run(settings: &AppSettings) -> Result<(), QueryError> {
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

    let mut turns: Vec<ConversationTurn> = Vec::new();
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();

    loop {
        print!("? ");
        stdout.flush()?;
        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim().to_string();
        if question.is_empty() {
            continue;
        }
        if question == "exit" || question == "quit" {
            break;
        }

        match answer_question(
            &config,
            &collaborators,
            QuestionRequest {
                question: question.clone(),
                selected_row_context: None,
                prior_turns: turns.clone(),
            },
        ) {
            Ok(response) => {
                println!("statement: {}", response.generated_statement);
                println!("answer:    {}", response.answer);
                if let Some(rows) = &response.rows {
                    println!("{}", serde_json::to_string_pretty(&rows.rows)?);
                }
                turns.push(ConversationTurn::user(question));
                turns.push(ConversationTurn::assistant(response.generated_statement));
                turns.push(ConversationTurn::assistant(response.answer));
            }
            Err(err) => {
                eprintln!("error: {}", err);
            }
        }
    }
    Ok(())
}
