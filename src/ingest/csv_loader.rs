use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use csv::{ReaderBuilder, Trim};

use crate::models::{Document, DocumentMetadata};

/// Accepts `text/csv` with or without parameters such as `charset`.
pub fn is_csv_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(|essence| essence.trim().eq_ignore_ascii_case("text/csv"))
        .unwrap_or(false)
}

pub fn load_file(path: &Path, source: &str) -> Result<Vec<Document>> {
    let file = fs::File::open(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;
    load_documents(file, source)
}

/// One document per data row. Each row is rendered as `header: value` lines;
/// rows whose cells are all empty are skipped but still count toward the row
/// index.
pub fn load_documents<R: Read>(reader: R, source: &str) -> Result<Vec<Document>> {
    let mut reader = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Missing header row in {}", source))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut documents = Vec::new();
    for (row, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Invalid row {} in {}", row + 1, source))?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }

        let page_content = record
            .iter()
            .enumerate()
            .map(|(i, value)| {
                let header = headers
                    .get(i)
                    .filter(|h| !h.is_empty())
                    .cloned()
                    .unwrap_or_else(|| format!("column_{}", i + 1));
                format!("{}: {}", header, value)
            })
            .collect::<Vec<_>>()
            .join("\n");

        documents.push(Document {
            page_content,
            metadata: DocumentMetadata {
                source: source.to_string(),
                row: row as u64,
            },
        });
    }

    Ok(documents)
}
