//! Document Loaders
//!
//! Turn files or in-memory bytes into plain text for chunking. The format
//! comes from the file extension (or an explicit hint for inline content):
//!
//! - plain text: read as UTF-8
//! - JSON: parsed and pretty-printed with two-space indentation
//! - CSV: one line per row, `header: value` pairs joined by ` | `
//! - PDF: text extraction via `pdf-extract`, pages joined by newlines

use std::fs;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::models::knowledge::{DocumentFormat, InlineDocument, LoadedDocument};
use crate::utils::error::{AppError, AppResult};

/// Load one file, inferring the format from its extension.
pub fn load_document(path: &Path) -> AppResult<LoadedDocument> {
    if !path.is_file() {
        return Err(AppError::not_found(format!(
            "Document not found: {}",
            path.display()
        )));
    }

    let bytes = fs::read(path)?;
    let source = path.display().to_string();
    load_bytes(&source, &bytes, DocumentFormat::from_path(path))
}

/// Decode in-memory content of a known format.
pub fn load_bytes(source: &str, bytes: &[u8], format: DocumentFormat) -> AppResult<LoadedDocument> {
    let content = match format {
        DocumentFormat::PlainText => decode_utf8(source, bytes)?,
        DocumentFormat::Json => load_json(source, bytes)?,
        DocumentFormat::Csv => load_csv(source, bytes)?,
        DocumentFormat::Pdf => load_pdf(source, bytes)?,
    };

    tracing::debug!(source, ?format, chars = content.len(), "loaded document");

    Ok(LoadedDocument {
        source: source.to_string(),
        content,
    })
}

/// Decode an inline document using its format hint.
pub fn load_inline(document: &InlineDocument) -> AppResult<LoadedDocument> {
    load_bytes(
        &document.source,
        &document.content,
        document.resolved_format(),
    )
}

/// Regular files directly inside `dir`, sorted by path. Not recursive.
pub fn collect_document_paths(dir: &Path) -> AppResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(AppError::not_found(format!(
            "Directory not found: {}",
            dir.display()
        )));
    }

    let mut paths = Vec::new();
    let walker = WalkBuilder::new(dir)
        .max_depth(Some(1))
        .standard_filters(false)
        .follow_links(false)
        .build();

    for entry in walker {
        let entry = entry.map_err(|e| AppError::document_load(e.to_string()))?;
        if entry.file_type().is_some_and(|t| t.is_file()) {
            paths.push(entry.into_path());
        }
    }

    paths.sort();
    Ok(paths)
}

/// Directories expand to their direct files (see [`collect_document_paths`]);
/// anything else passes through in order.
pub fn expand_document_paths(paths: &[PathBuf]) -> AppResult<Vec<PathBuf>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        if path.is_dir() {
            files.extend(collect_document_paths(path)?);
        } else {
            files.push(path.clone());
        }
    }
    Ok(files)
}

fn decode_utf8(source: &str, bytes: &[u8]) -> AppResult<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| AppError::document_load(format!("{} is not valid UTF-8: {}", source, e)))
}

fn load_json(source: &str, bytes: &[u8]) -> AppResult<String> {
    let value: serde_json::Value = serde_json::from_slice(bytes)
        .map_err(|e| AppError::document_load(format!("{} is not valid JSON: {}", source, e)))?;
    Ok(serde_json::to_string_pretty(&value)?)
}

fn load_csv(source: &str, bytes: &[u8]) -> AppResult<String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| AppError::document_load(format!("{}: {}", source, e)))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut lines = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| AppError::document_load(format!("{}: {}", source, e)))?;
        let line = headers
            .iter()
            .zip(record.iter())
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect::<Vec<_>>()
            .join(" | ");
        lines.push(line);
    }

    Ok(lines.join("\n"))
}

fn load_pdf(source: &str, bytes: &[u8]) -> AppResult<String> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| AppError::document_load(format!("Failed to extract PDF text from {}: {}", source, e)))?;
    // pdf-extract separates pages with form feeds
    Ok(text.replace('\x0c', "\n"))
}
