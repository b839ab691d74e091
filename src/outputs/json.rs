//! JSON output, one dated directory per run day.

use crate::error::Result;
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Serialize `value` to `{json_output_dir}/{local date}/{name}.json`.
///
/// Creates the dated directory when missing and overwrites an existing file
/// of the same name.
///
/// # Arguments
///
/// * `value` - Anything `Serialize`, e.g. the FPL store or the odds rows
/// * `json_output_dir` - Base directory for JSON output
/// * `name` - File stem, without `.json`
///
/// # Returns
///
/// The path written, or an I/O or serialization error.
///
/// # Example
///
/// ```ignore
/// let path = write_json(scraper.store(), "./json", "fpl").await?;
/// // ./json/2024-08-16/fpl.json
/// ```
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir, name = %name))]
pub async fn write_json<T: Serialize + ?Sized>(
    value: &T,
    json_output_dir: &str,
    name: &str,
) -> Result<PathBuf> {
    let json = serde_json::to_string_pretty(value)?;

    let full_json_dir = Path::new(json_output_dir).join(Local::now().date_naive().to_string());
    info!(full_json_dir = %full_json_dir.display(), "Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(&full_json_dir).await {
        error!(full_json_dir = %full_json_dir.display(), error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let path = full_json_dir.join(format!("{name}.json"));
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote JSON file");

    Ok(path)
}
