use std::path::Path;

use anyhow::{Context, Result};

/// Extract the text of every page of a PDF, in page order.
pub fn parse_pdf(path: &Path) -> Result<String> {
    let doc = lopdf::Document::load(path)
        .with_context(|| format!("failed to open PDF {}", path.display()))?;

    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
    doc.extract_text(&pages)
        .with_context(|| format!("failed to extract text from {}", path.display()))
}
