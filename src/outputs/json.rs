//! JSON output of the analysis records.

use crate::models::AnalysisRecord;
use std::error::Error;
use std::path::PathBuf;
use tokio::fs;
use tracing::{error, info, instrument};

/// Write `records` to `{output_dir}/{stem}.json` and return the path.
#[instrument(level = "info", skip_all, fields(output_dir = %output_dir, count = records.len()))]
pub async fn write_records(
    records: &[AnalysisRecord],
    output_dir: &str,
    stem: &str,
) -> Result<PathBuf, Box<dyn Error>> {
    let json = serde_json::to_string_pretty(records)?;

    if let Err(e) = fs::create_dir_all(output_dir).await {
        error!(%output_dir, error = %e, "Failed to create output dir");
        return Err(e.into());
    }

    let path = PathBuf::from(output_dir).join(format!("{stem}.json"));
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON results");

    Ok(path)
}
