//! Per-format text extraction, assembled into the capability table the
//! ingestion stage receives at construction.
//!
//! Each parser turns one file into a single plain-text string; corrupt or
//! unreadable files surface as errors to the dispatching caller. Formats:
//! `txt`, `csv` here, `pdf` in [`pdf`], `docx`/`pptx` in [`office`].

pub mod office;
pub mod pdf;

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use thiserror::Error;

/// A document format with no parser in the capability table.
#[derive(Error, Debug)]
#[error("unsupported document format: {0:?}")]
pub struct UnsupportedFormat(pub String);

pub type ParseFn = Box<dyn Fn(&Path) -> Result<String> + Send + Sync>;
pub type ParserTable = HashMap<String, ParseFn>;

/// The full five-format parser table.
#[must_use]
pub fn default_parsers() -> ParserTable {
    let mut table: ParserTable = HashMap::new();
    table.insert("txt".to_string(), Box::new(parse_txt));
    table.insert("csv".to_string(), Box::new(parse_csv));
    table.insert("pdf".to_string(), Box::new(pdf::parse_pdf));
    table.insert("docx".to_string(), Box::new(office::parse_docx));
    table.insert("pptx".to_string(), Box::new(office::parse_pptx));
    table
}

/// Map a file path to its format key via the extension, lowercased.
#[must_use]
pub fn kind_for_path(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
}

/// Whole-file UTF-8 read.
pub fn parse_txt(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Flatten a CSV into text: one line per record, fields separated by
/// single spaces, header row first.
pub fn parse_csv(path: &Path) -> Result<String> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open CSV {}", path.display()))?;

    let mut lines: Vec<String> = Vec::new();

    let headers = reader.headers().context("failed to read CSV headers")?;
    let header_line = headers.iter().collect::<Vec<_>>().join(" ");
    if !header_line.is_empty() {
        lines.push(header_line);
    }

    for record in reader.records() {
        let record = record.context("failed to read CSV record")?;
        lines.push(record.iter().collect::<Vec<_>>().join(" "));
    }

    Ok(lines.join("\n"))
}
