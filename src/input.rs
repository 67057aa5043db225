//! Batch input loading.
//!
//! Three file shapes are accepted, chosen by extension:
//!
//! - `.json`: an array of `{"url": ..., "snippet": ...}` objects
//! - `.yaml` / `.yml`: the same shape in YAML
//! - anything else: one URL per line, optionally followed by a TAB and a
//!   snippet; blank lines and `#` comments are skipped

use crate::models::InputRow;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn load_rows(path: &Path) -> Result<Vec<InputRow>, Box<dyn Error>> {
    let raw = fs::read_to_string(path).await?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let rows: Vec<InputRow> = match extension.as_deref() {
        Some("json") => serde_json::from_str(&raw)?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&raw)?,
        _ => parse_lines(&raw),
    };
    let rows = normalize(rows);

    info!(count = rows.len(), "Loaded input rows");
    Ok(rows)
}

pub fn parse_lines(raw: &str) -> Vec<InputRow> {
    let rows = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| match line.split_once('\t') {
            Some((url, snippet)) => InputRow {
                url: url.to_string(),
                snippet: Some(snippet.to_string()),
            },
            None => InputRow::new(line),
        })
        .collect();
    normalize(rows)
}

/// Trim urls and snippets, dropping rows without a url and empty snippets.
fn normalize(rows: Vec<InputRow>) -> Vec<InputRow> {
    rows.into_iter()
        .filter_map(|row| {
            let url = row.url.trim();
            if url.is_empty() {
                return None;
            }
            let snippet = row
                .snippet
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty());
            Some(InputRow {
                url: url.to_string(),
                snippet,
            })
        })
        .collect()
}
