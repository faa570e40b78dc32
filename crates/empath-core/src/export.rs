//! Checkpoint → prediction file.
//!
//! Predictions are re-enumerated from 0 so the scorer can align them with
//! references by position; `data_idx` is not carried over.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::checkpoint::read_rows;
use crate::dataset::decode_text;
use crate::model::PredictionRow;

pub const PREDICTION_HEADER: [&str; 2] = ["id", "prediction"];

/// Checkpoint rows deduplicated by `data_idx` (first occurrence wins),
/// ordered by `data_idx`, then re-enumerated.
pub fn predictions_from_checkpoint(path: &Path) -> Result<Vec<PredictionRow>> {
    std::fs::metadata(path)
        .with_context(|| format!("failed to open checkpoint {}", path.display()))?;
    let rows = read_rows(path)?;
    let total = rows.len();

    let mut by_idx: BTreeMap<usize, String> = BTreeMap::new();
    for row in rows {
        by_idx.entry(row.data_idx).or_insert(row.response);
    }
    if by_idx.len() != total {
        warn!(
            path = %path.display(),
            duplicates = total - by_idx.len(),
            "dropped duplicate checkpoint rows"
        );
    }

    Ok(enumerate(by_idx.into_values()))
}

#[derive(Deserialize)]
struct InferenceLine {
    #[serde(default)]
    output: Option<String>,
}

/// One prediction per non-blank JSONL line, taken from its `output` field
/// (missing → empty, to keep alignment).
pub fn predictions_from_jsonl(path: &Path) -> Result<Vec<PredictionRow>> {
    let bytes =
        std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let text = decode_text(&bytes);

    let mut outputs = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let parsed: InferenceLine = serde_json::from_str(line).with_context(|| {
            format!("{}:{}: invalid inference record", path.display(), line_no + 1)
        })?;
        outputs.push(parsed.output.unwrap_or_default());
    }
    Ok(enumerate(outputs))
}

/// Autodetect by extension: `.jsonl` is inference output, anything else a
/// checkpoint CSV.
pub fn load_predictions(path: &Path) -> Result<Vec<PredictionRow>> {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("jsonl") => predictions_from_jsonl(path),
        _ => predictions_from_checkpoint(path),
    }
}

pub fn write_predictions(path: &Path, rows: &[PredictionRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(PREDICTION_HEADER)?;
    for row in rows {
        writer.write_record([row.id.to_string().as_str(), row.prediction.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Load, normalize and write in one step. Returns the number of rows written.
pub fn export_predictions(input: &Path, output: &Path) -> Result<usize> {
    let rows = load_predictions(input)?;
    write_predictions(output, &rows)?;
    info!(
        input = %input.display(),
        output = %output.display(),
        rows = rows.len(),
        "exported predictions"
    );
    Ok(rows.len())
}

fn enumerate(responses: impl IntoIterator<Item = String>) -> Vec<PredictionRow> {
    responses
        .into_iter()
        .enumerate()
        .map(|(id, prediction)| PredictionRow { id, prediction })
        .collect()
}
