// src/main.rs

use clap::Parser;
use shipquery::cli::{Cli, Commands};
use shipquery::settings::AppSettings;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let mut settings = AppSettings::from_env();
    if let Some(db) = cli.db {
        settings.db_path = db;
    }
    if let Some(docs) = cli.docs_dir {
        settings.documents_root = docs;
    }
    if let Some(map) = cli.folder_map {
        settings.folder_map_path = Some(map);
    }

    let result = match cli.command {
        Commands::Ask { question, context } => {
            shipquery::cli::ask::run(&settings, question, context)
        }
        Commands::Repl => shipquery::cli::repl::run(&settings),
        Commands::Schema => shipquery::cli::schema::run(&settings),
    };

    if let Err(err) = result {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
