//! Append-only ledger of evaluation runs.

use std::fs::OpenOptions;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::report::{read_scores, MetricAverages};

pub const RUN_LOG_HEADER: [&str; 9] = [
    "adapter",
    "base_model",
    "dataset",
    "max_new_tokens",
    "temperature",
    "avg_overlap",
    "avg_lcs",
    "avg_tfidf",
    "notes",
];

/// Run metadata recorded next to the averaged metrics.
#[derive(Debug, Clone, PartialEq)]
pub struct RunLogEntry {
    pub adapter: String,
    pub base_model: String,
    pub dataset: String,
    pub max_new_tokens: u32,
    pub temperature: f32,
    pub notes: String,
}

impl RunLogEntry {
    fn record(&self, averages: &MetricAverages) -> [String; 9] {
        [
            self.adapter.clone(),
            self.base_model.clone(),
            self.dataset.clone(),
            self.max_new_tokens.to_string(),
            self.temperature.to_string(),
            format!("{:.4}", averages.overlap),
            format!("{:.4}", averages.lcs),
            format!("{:.4}", averages.tfidf_cosine),
            self.notes.clone(),
        ]
    }
}

/// Append one row; the header is written only when the log does not exist
/// yet. Earlier rows are never touched.
pub fn append_run_log(log: &Path, entry: &RunLogEntry, averages: &MetricAverages) -> Result<()> {
    if let Some(parent) = log.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let existed = log.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log)
        .with_context(|| format!("failed to open run log {}", log.display()))?;

    let mut writer = csv::Writer::from_writer(file);
    if !existed {
        writer.write_record(RUN_LOG_HEADER)?;
    }
    writer.write_record(entry.record(averages))?;
    writer.flush()?;
    Ok(())
}

/// Average a score file and append the result. Returns the averages logged.
pub fn log_scores(scores: &Path, log: &Path, entry: &RunLogEntry) -> Result<MetricAverages> {
    let rows = read_scores(scores)?;
    let averages = MetricAverages::from_rows(&rows)
        .with_context(|| format!("score file {} is empty", scores.display()))?;
    append_run_log(log, entry, &averages)?;
    info!(log = %log.display(), adapter = %entry.adapter, rows = rows.len(), "appended run log");
    Ok(averages)
}
