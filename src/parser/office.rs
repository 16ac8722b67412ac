//! Text extraction for OOXML word processors and presentations.
//!
//! DOCX goes through the docx-rs reader (paragraph text joined by
//! newlines). PPTX has no reader crate in our stack, so slides are pulled
//! straight out of the OOXML archive: every `a:t` text run of
//! `ppt/slides/slideN.xml`, slides in numeric order.

use std::io::{Cursor, Read};
use std::path::Path;

use anyhow::{Context, Result, anyhow};

/// Extract the paragraph text of a DOCX document.
pub fn parse_docx(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let docx = docx_rs::read_docx(&bytes)
        .map_err(|e| anyhow!("failed to parse DOCX {}: {e:?}", path.display()))?;

    let mut paragraphs: Vec<String> = Vec::new();
    for child in docx.document.children {
        if let docx_rs::DocumentChild::Paragraph(para) = child {
            let mut text = String::new();
            for pc in para.children {
                if let docx_rs::ParagraphChild::Run(run) = pc {
                    for rc in run.children {
                        if let docx_rs::RunChild::Text(t) = rc {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            paragraphs.push(text);
        }
    }

    Ok(paragraphs.join("\n"))
}

/// Extract the slide text of a PPTX presentation, slides in order.
pub fn parse_pptx(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))
        .with_context(|| format!("failed to open PPTX archive {}", path.display()))?;

    let mut slide_names: Vec<String> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .map(|s| s.to_string())
        .collect();
    slide_names.sort_by_key(|name| {
        name.trim_start_matches("ppt/slides/slide")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(u32::MAX)
    });

    let mut slides: Vec<String> = Vec::new();
    for name in slide_names {
        let mut xml = Vec::new();
        archive
            .by_name(&name)
            .with_context(|| format!("missing archive entry {name}"))?
            .read_to_end(&mut xml)
            .with_context(|| format!("failed to read archive entry {name}"))?;
        let text = text_runs(&xml)?;
        if !text.is_empty() {
            slides.push(text);
        }
    }

    Ok(slides.join("\n"))
}

/// Collect the contents of every `t` element, space-separated.
fn text_runs(xml: &[u8]) -> Result<String> {
    let mut reader = quick_xml::Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut runs: Vec<String> = Vec::new();
    let mut buf = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(e)) => {
                in_text = e.local_name().as_ref() == b"t";
            }
            Ok(quick_xml::events::Event::Text(t)) if in_text => {
                let run = t
                    .unescape()
                    .context("invalid XML escape in slide text")?
                    .into_owned();
                if !run.is_empty() {
                    runs.push(run);
                }
            }
            Ok(quick_xml::events::Event::End(_)) => {
                in_text = false;
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(e) => return Err(anyhow!("malformed slide XML: {e}")),
            _ => {}
        }
        buf.clear();
    }

    Ok(runs.join(" "))
}
