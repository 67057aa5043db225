//! Result files written at the end of a run.
//!
//! # Submodules
//!
//! - [`json`]: the full record set as a pretty-printed JSON array
//! - [`markdown`]: a results table for quick reading
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── 2025-05-06_14-03-27.json
//! └── 2025-05-06_14-03-27.md
//! ```

pub mod json;
pub mod markdown;

use crate::models::AnalysisRecord;
use chrono::{DateTime, Local};
use std::error::Error;
use std::path::PathBuf;
use tracing::error;

/// File stem shared by both outputs of one run.
pub fn run_stem(now: DateTime<Local>) -> String {
    now.format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// Write the JSON array, then the Markdown table.
///
/// # Arguments
///
/// * `records` - One record per input row.
/// * `output_dir` - Created if missing.
/// * `stem` - Shared file stem, usually from [`run_stem`].
///
/// # Returns
///
/// The JSON and Markdown paths, in that order.
///
/// # Errors
///
/// The first writer error. A Markdown failure leaves the JSON file in place.
pub async fn write_all(
    records: &[AnalysisRecord],
    output_dir: &str,
    stem: &str,
) -> Result<(PathBuf, PathBuf), Box<dyn Error>> {
    let json_path = json::write_records(records, output_dir, stem)
        .await
        .inspect_err(|e| error!(error = %e, "Failed to write JSON results"))?;
    let md_path = markdown::write_table(records, output_dir, stem)
        .await
        .inspect_err(|e| {
            error!(
                error = %e,
                json = %json_path.display(),
                "Failed to write Markdown results (JSON results were written)"
            )
        })?;
    Ok((json_path, md_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_write_all_writes_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let records = vec![AnalysisRecord::new("https://example.com/a", "Judul".to_string())];
        let (json_path, md_path) = write_all(&records, dir.path().to_str().unwrap(), "run")
            .await
            .unwrap();
        assert!(json_path.ends_with("run.json"));
        assert!(md_path.ends_with("run.md"));
        assert!(md_path.is_file());
    }

    #[tokio::test]
    async fn test_markdown_failure_fails_the_write() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the table should go makes the Markdown write fail
        std::fs::create_dir(dir.path().join("run.md")).unwrap();
        let records = vec![AnalysisRecord::new("https://example.com/a", "Judul".to_string())];
        let result = write_all(&records, dir.path().to_str().unwrap(), "run").await;
        assert!(result.is_err());
        assert!(dir.path().join("run.json").is_file());
    }

    #[test]
    fn test_run_stem() {
        let now = Local.with_ymd_and_hms(2025, 5, 6, 14, 3, 27).unwrap();
        assert_eq!(run_stem(now), "2025-05-06_14-03-27");
    }
}
