// src/settings/mod.rs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_DB_PATH: &str = "shipping_data.db";
pub const DEFAULT_DOCUMENTS_ROOT: &str = "documents";

/// Process-level settings for the CLI. The pipeline itself never reads the
/// environment; everything it needs is passed in explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub db_path: PathBuf,
    pub documents_root: PathBuf,
    /// Optional JSON file mapping shipment → document column → subfolder.
    pub folder_map_path: Option<PathBuf>,
    pub model: String,
    #[serde(skip)]
    pub api_key: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            documents_root: PathBuf::from(DEFAULT_DOCUMENTS_ROOT),
            folder_map_path: None,
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
        }
    }
}

impl AppSettings {
    /// Loads settings from the environment (after a best-effort `.env`
    /// load), applied over the defaults.
    pub fn from_env() -> Self {
        // Missing .env is the normal case, not an error.
        let _ = dotenvy::dotenv();
        let mut settings = Self::default();
        settings.api_key = std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty());
        if let Ok(model) = std::env::var("GEMINI_MODEL") {
            if !model.is_empty() {
                settings.model = model;
            }
        }
        settings
    }
}
