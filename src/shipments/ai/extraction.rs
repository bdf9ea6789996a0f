// src/shipments/ai/extraction.rs
//! Document location and text extraction boundary.
//!
//! The core pipeline only ever sees the `TextExtractor` trait; the file
//! system walking and the per-shipment subfolder mapping live behind it as
//! configuration-driven collaborators. PDF-to-text conversion itself is a
//! black box: the shipped extractor reads pre-extracted sidecar text files,
//! anything smarter can replace it without touching the pipeline.

use crate::shipments::error::{PipelineResult, QueryError};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Everything needed to locate one shipment document, derived from the first
/// row of a document-lookup result. All three fields must be non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentDescriptor {
    /// The raw value stored in the document column (a path fragment or file
    /// name, in whatever convention the spreadsheet author used).
    pub stored_path_value: String,
    /// The shipment the document belongs to.
    pub shipment_label: String,
    /// Which document column the value came from.
    pub document_column: String,
}

/// Resolves a descriptor to document text, or `None` when the document
/// exists but yields no text.
pub trait TextExtractor {
    fn extract(&self, descriptor: &DocumentDescriptor) -> PipelineResult<Option<String>>;
}

/// Static per-shipment, per-document-column subfolder mapping, loaded from a
/// JSON file maintained next to the documents:
/// `{ "Acme March": { "laboratoryReport": "acme/lab" } }`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FolderMap(BTreeMap<String, BTreeMap<String, String>>);

impl FolderMap {
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)
            .map_err(|e| QueryError::ExtractionFailed(format!("folder map: {}", e)))?)
    }

    fn subfolder(&self, shipment: &str, column: &str) -> Option<&str> {
        self.0.get(shipment)?.get(column).map(|s| s.as_str())
    }
}

/// Locates a stored-path value under the documents root, trying the derived
/// file-name variants the spreadsheet data actually contains (spaces vs
/// underscores, bare basenames) and the configured subfolder first, then a
/// case-insensitive walk of the whole root as a last resort.
#[derive(Debug, Clone)]
pub struct DocumentLocator {
    root: PathBuf,
    folder_map: FolderMap,
}

impl DocumentLocator {
    pub fn new(root: impl Into<PathBuf>, folder_map: FolderMap) -> Self {
        Self {
            root: root.into(),
            folder_map,
        }
    }

    fn name_variants(stored: &str) -> Vec<String> {
        let mut variants = vec![stored.to_string()];
        variants.push(stored.replace(' ', "_"));
        variants.push(stored.replace('_', " "));
        if let Some(base) = Path::new(stored).file_name().and_then(|n| n.to_str()) {
            if base != stored {
                variants.push(base.to_string());
                variants.push(base.replace(' ', "_"));
            }
        }
        variants.dedup();
        variants
    }

    pub fn resolve(&self, descriptor: &DocumentDescriptor) -> Option<PathBuf> {
        let variants = Self::name_variants(&descriptor.stored_path_value);

        let mut search_dirs = vec![self.root.clone()];
        if let Some(sub) = self
            .folder_map
            .subfolder(&descriptor.shipment_label, &descriptor.document_column)
        {
            search_dirs.insert(0, self.root.join(sub));
        }

        for dir in &search_dirs {
            for variant in &variants {
                let candidate = dir.join(variant);
                if candidate.is_file() {
                    return Some(candidate);
                }
            }
        }

        // Last resort: case-insensitive file-name match anywhere under root.
        let lowered: Vec<String> = variants.iter().map(|v| v.to_lowercase()).collect();
        for entry in WalkDir::new(&self.root).into_iter().flatten() {
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if lowered.iter().any(|v| name.to_lowercase() == *v) {
                    return Some(entry.into_path());
                }
            }
        }
        None
    }
}

/// File-backed extractor: resolves the document, then reads its text — the
/// file itself when it is already text, otherwise a `.txt` sidecar produced
/// by an external extraction step.
pub struct FileTextExtractor {
    locator: DocumentLocator,
}

impl FileTextExtractor {
    pub fn new(locator: DocumentLocator) -> Self {
        Self { locator }
    }
}

impl TextExtractor for FileTextExtractor {
    fn extract(&self, descriptor: &DocumentDescriptor) -> PipelineResult<Option<String>> {
        let Some(path) = self.locator.resolve(descriptor) else {
            tracing::warn!(
                stored = %descriptor.stored_path_value,
                shipment = %descriptor.shipment_label,
                "document not found under documents root"
            );
            return Ok(None);
        };

        let is_text = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("txt"))
            .unwrap_or(false);

        let text_path = if is_text {
            path.clone()
        } else {
            let sidecar = path.with_extension("txt");
            if !sidecar.is_file() {
                tracing::warn!(path = %path.display(), "no extracted-text sidecar for document");
                return Ok(None);
            }
            sidecar
        };

        let text = std::fs::read_to_string(&text_path)
            .map_err(|e| QueryError::ExtractionFailed(format!("{}: {}", text_path.display(), e)))?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        tracing::debug!(path = %text_path.display(), bytes = text.len(), "document text extracted");
        Ok(Some(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_variant_resolution_spaces_and_underscores() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "Lab_Report_March.txt", "zinc 54.2%");

        let locator = DocumentLocator::new(dir.path(), FolderMap::default());
        let descriptor = DocumentDescriptor {
            stored_path_value: "Lab Report March.txt".to_string(),
            shipment_label: "Acme March".to_string(),
            document_column: "laboratoryReport".to_string(),
        };
        assert!(locator.resolve(&descriptor).is_some());
    }

    #[test]
    fn test_subfolder_mapping_is_searched_first() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "acme/lab/report.txt", "subfolder copy");
        write(dir.path(), "report.txt", "root copy");

        let map: FolderMap = serde_json::from_str(
            r#"{ "Acme March": { "laboratoryReport": "acme/lab" } }"#,
        )
        .unwrap();
        let locator = DocumentLocator::new(dir.path(), map);
        let descriptor = DocumentDescriptor {
            stored_path_value: "report.txt".to_string(),
            shipment_label: "Acme March".to_string(),
            document_column: "laboratoryReport".to_string(),
        };
        let resolved = locator.resolve(&descriptor).unwrap();
        assert!(resolved.ends_with("acme/lab/report.txt"));
    }

    #[test]
    fn test_pdf_reads_sidecar_text() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "report.pdf", "%PDF-1.4 binary");
        write(dir.path(), "report.txt", "zinc content 54.2%");

        let extractor =
            FileTextExtractor::new(DocumentLocator::new(dir.path(), FolderMap::default()));
        let descriptor = DocumentDescriptor {
            stored_path_value: "report.pdf".to_string(),
            shipment_label: "Acme March".to_string(),
            document_column: "laboratoryReport".to_string(),
        };
        let text = extractor.extract(&descriptor).unwrap().unwrap();
        assert_eq!(text, "zinc content 54.2%");
    }

    #[test]
    fn test_missing_document_is_none_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let extractor =
            FileTextExtractor::new(DocumentLocator::new(dir.path(), FolderMap::default()));
        let descriptor = DocumentDescriptor {
            stored_path_value: "nowhere.pdf".to_string(),
            shipment_label: "Acme March".to_string(),
            document_column: "laboratoryReport".to_string(),
        };
        assert!(extractor.extract(&descriptor).unwrap().is_none());
    }
}
