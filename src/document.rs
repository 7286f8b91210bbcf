//! Text extraction from uploaded question files (`.txt`, `.docx`)

use anyhow::{bail, Context, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{Cursor, Read};
use std::path::Path;
use tracing::{error, info};

/// Lower-cased extension of `file_name` including the dot, or "" when absent
pub fn file_extension(file_name: &str) -> String {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

/// Extract plain text from an uploaded file, dispatching on its extension
pub fn extract_text(bytes: &[u8], file_name: &str) -> Result<String> {
    let extension = file_extension(file_name);

    let result = match extension.as_str() {
        ".txt" => Ok(extract_plain(bytes)),
        ".docx" => extract_docx(bytes),
        _ => Err(anyhow::anyhow!("unsupported file format: {}", extension)),
    };

    match &result {
        Ok(text) => info!("Extracted {} chars from {}", text.chars().count(), file_name),
        Err(e) => error!("Failed to process file {}: {:#}", file_name, e),
    }

    result
}

fn extract_plain(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    text.strip_prefix('\u{feff}').unwrap_or(&text).to_string()
}

/// Text of every non-blank paragraph in `word/document.xml`, one per line
fn extract_docx(bytes: &[u8]) -> Result<String> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).context("Failed to open .docx archive")?;

    let mut xml = String::new();
    archive
        .by_name("word/document.xml")
        .context("Document body (word/document.xml) not found")?
        .read_to_string(&mut xml)
        .context("Failed to read document body")?;

    let mut reader = Reader::from_str(&xml);
    let mut text = String::new();
    let mut paragraph = String::new();
    let mut in_text_run = false;

    loop {
        match reader.read_event().context("Malformed document body")? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:p" => paragraph.clear(),
                b"w:t" => in_text_run = true,
                _ => {}
            },
            Event::Text(t) if in_text_run => {
                paragraph.push_str(&t.unescape().context("Invalid text in document body")?);
            }
            Event::End(e) => match e.name().as_ref() {
                b"w:t" => in_text_run = false,
                b"w:p" => {
                    if !paragraph.trim().is_empty() {
                        text.push_str(&paragraph);
                        text.push('\n');
                    }
                    paragraph.clear();
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if text.is_empty() && !xml.contains("<w:body") {
        bail!("Document body is empty or not a Word document");
    }

    Ok(text)
}
