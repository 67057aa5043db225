//! Markdown results table.

use crate::models::AnalysisRecord;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

/// Render `records` as a Markdown document with one table row per record.
///
/// Optional columns appear only when at least one record carries them.
pub fn records_to_markdown(records: &[AnalysisRecord], heading: &str) -> String {
    let has_method = records.iter().any(|r| r.method.is_some());
    let has_byline = records.iter().any(|r| r.byline.is_some());
    let has_sentiment = records.iter().any(|r| r.sentiment.is_some());
    let has_summary = records.iter().any(|r| r.summary.is_some());

    let mut header = vec!["#", "URL", "Title"];
    if has_method {
        header.extend(["Method", "Chars"]);
    }
    if has_byline {
        header.push("Byline");
    }
    if has_sentiment {
        header.extend(["Sentiment", "Confidence", "Reasoning"]);
    }
    if has_summary {
        header.push("Summary");
    }

    let mut md = format!("# {heading}\n\n");
    md.push_str(&format!("| {} |\n", header.join(" | ")));
    md.push_str(&format!("|{}\n", "---|".repeat(header.len())));

    for (i, record) in records.iter().enumerate() {
        let mut cells = vec![
            (i + 1).to_string(),
            cell(&record.url),
            cell(&record.title),
        ];
        if has_method {
            cells.push(record.method.map(|m| m.to_string()).unwrap_or_default());
            cells.push(
                record
                    .content
                    .as_deref()
                    .map(|c| c.chars().count().to_string())
                    .unwrap_or_default(),
            );
        }
        if has_byline {
            cells.push(cell(record.byline.as_deref().unwrap_or("")));
        }
        if has_sentiment {
            let s = record.sentiment.clone().unwrap_or_default();
            cells.extend([cell(&s.sentiment), cell(&s.confidence), cell(&s.reasoning)]);
        }
        if has_summary {
            cells.push(cell(record.summary.as_deref().unwrap_or("")));
        }
        md.push_str(&format!("| {} |\n", cells.join(" | ")));
    }

    md
}

/// Single-line table cell text with pipes escaped.
fn cell(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

/// Write the table to `{output_dir}/{stem}.md` and return the path.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir))]
pub async fn write_table(
    records: &[AnalysisRecord],
    output_dir: &str,
    stem: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let md = records_to_markdown(records, &format!("News analysis {stem}"));
    fs::create_dir_all(output_dir).await?;
    let path = PathBuf::from(output_dir).join(format!("{stem}.md"));
    fs::write(&path, md).await?;
    info!(path = %path.display(), "Wrote Markdown results");
    Ok(path)
}
