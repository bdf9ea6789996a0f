// src/cli/mod.rs
// CLI surface: one-shot questions, an in-memory conversation loop, and a
// schema inspection helper.

pub mod ask;
pub mod repl;
pub mod schema;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "shipquery")]
#[command(about = "Ask natural-language questions about a shipment database", long_about = None)]
pub struct Cli {
    /// Path to the shipment SQLite database
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Root directory containing shipment documents and extracted text
    #[arg(long, global = true)]
    pub docs_dir: Option<PathBuf>,

    /// JSON file mapping shipment and document column to a subfolder
    #[arg(long, global = true)]
    pub folder_map: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask a single question and print the answer (and rows, if any)
    Ask {
        /// The question to answer
        question: String,

        /// Selected-row context as column=value pairs
        #[arg(long = "context", value_name = "COL=VALUE")]
        context: Vec<String>,
    },

    /// Interactive loop; conversation turns live only for the session
    Repl,

    /// Print the schema description the generator would be shown
    Schema,
}
