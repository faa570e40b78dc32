//! Per-row score table and its averages.

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::lexical::{jaccard, lcs_ratio};
use crate::tfidf::tfidf_cosine_batch;

/// Inputs that cannot produce a score table. Callers treat these as bad
/// input rather than internal failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoreInputError {
    #[error("no comparable rows (predictions: {predictions}, references: {references}); ensure both files align by index")]
    NoComparableRows { predictions: usize, references: usize },

    #[error("no score rows to average")]
    EmptyScoreTable,
}

pub const SCORE_HEADER: [&str; 4] = ["id", "Overlap", "LCS", "TF-IDF"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRow {
    pub id: usize,
    #[serde(rename = "Overlap")]
    pub overlap: f64,
    #[serde(rename = "LCS")]
    pub lcs: f64,
    #[serde(rename = "TF-IDF")]
    pub tfidf_cosine: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MetricAverages {
    pub overlap: f64,
    pub lcs: f64,
    pub tfidf_cosine: f64,
}

impl MetricAverages {
    /// Arithmetic means; errors on an empty table.
    pub fn from_rows(rows: &[ScoreRow]) -> Result<Self> {
        if rows.is_empty() {
            return Err(ScoreInputError::EmptyScoreTable.into());
        }
        let n = rows.len() as f64;
        let sum = |f: fn(&ScoreRow) -> f64| rows.iter().map(f).sum::<f64>() / n;
        Ok(Self {
            overlap: sum(|r| r.overlap),
            lcs: sum(|r| r.lcs),
            tfidf_cosine: sum(|r| r.tfidf_cosine),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ScoreReport {
    pub rows: Vec<ScoreRow>,
    pub averages: MetricAverages,
}

impl ScoreReport {
    pub fn compared(&self) -> usize {
        self.rows.len()
    }

    /// Console summary, averages to 4 decimals.
    pub fn summary(&self) -> String {
        format!(
            "Samples scored: {}\nAverage Overlap: {:.4}\nAverage LCS    : {:.4}\nAverage TF-IDF : {:.4}",
            self.compared(),
            self.averages.overlap,
            self.averages.lcs,
            self.averages.tfidf_cosine
        )
    }
}

/// Score aligned pairs. Inputs are truncated to the shorter list; zero
/// comparable rows is an error.
pub fn score_pairs(predictions: &[String], references: &[String]) -> Result<ScoreReport> {
    let n = predictions.len().min(references.len());
    if n == 0 {
        return Err(ScoreInputError::NoComparableRows {
            predictions: predictions.len(),
            references: references.len(),
        }
        .into());
    }
    if predictions.len() != references.len() {
        warn!(
            predictions = predictions.len(),
            references = references.len(),
            compared = n,
            "prediction/reference count mismatch; truncating to shorter"
        );
    }
    let (preds, refs) = (&predictions[..n], &references[..n]);

    let tfidf = tfidf_cosine_batch(preds, refs);
    let rows: Vec<ScoreRow> = preds
        .iter()
        .zip(refs)
        .zip(tfidf)
        .enumerate()
        .map(|(id, ((p, r), t))| ScoreRow {
            id,
            overlap: jaccard(p, r),
            lcs: lcs_ratio(p, r),
            tfidf_cosine: t,
        })
        .collect();

    let averages = MetricAverages::from_rows(&rows)?;
    Ok(ScoreReport { rows, averages })
}

/// Overwrite `path` with the score table, values to 6 decimals.
pub fn write_scores(path: &Path, rows: &[ScoreRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    writer.write_record(SCORE_HEADER)?;
    for row in rows {
        writer.write_record([
            row.id.to_string(),
            format!("{:.6}", row.overlap),
            format!("{:.6}", row.lcs),
            format!("{:.6}", row.tfidf_cosine),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn read_scores(path: &Path) -> Result<Vec<ScoreRow>> {
    let file = File::open(path)
        .with_context(|| format!("failed to open scores {}", path.display()))?;
    let mut reader = csv::Reader::from_reader(file);
    reader
        .deserialize()
        .enumerate()
        .map(|(i, row)| {
            row.with_context(|| format!("{}: bad score row {}", path.display(), i + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(xs: &[&str]) -> Vec<String> {
        xs.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn mismatched_lengths_compare_shorter() {
        let preds = strings(&["offer tea", "sit down", "call help"]);
        let refs = strings(&["offer tea", "sit down", "call help", "extra", "more"]);
        let report = score_pairs(&preds, &refs).unwrap();
        assert_eq!(report.compared(), 3);
        assert!((report.averages.overlap - 1.0).abs() < 1e-12);
        assert!((report.averages.tfidf_cosine - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_rows_is_an_input_error() {
        let err = score_pairs(&[], &strings(&["a"])).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ScoreInputError>(),
            Some(&ScoreInputError::NoComparableRows {
                predictions: 0,
                references: 1
            })
        );
        assert!(err.to_string().contains("no comparable rows"));

        let err = MetricAverages::from_rows(&[]).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ScoreInputError>(),
            Some(&ScoreInputError::EmptyScoreTable)
        );
    }

    #[test]
    fn score_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/scores.csv");
        let report = score_pairs(
            &strings(&["the cat sat", "no"]),
            &strings(&["the cat sat down", "yes"]),
        )
        .unwrap();
        write_scores(&path, &report.rows).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("id,Overlap,LCS,TF-IDF"));
        assert!(lines.next().unwrap().starts_with("0,0.750000,0.750000,"));
        assert_eq!(lines.next(), Some("1,0.000000,0.000000,0.000000"));

        let back = read_scores(&path).unwrap();
        assert_eq!(back.len(), 2);
        assert_eq!(back[0].overlap, 0.75);
    }

    #[test]
    fn summary_uses_four_decimals() {
        let report = score_pairs(&strings(&["a b c"]), &strings(&["a b"])).unwrap();
        assert!(report.summary().contains("Samples scored: 1"));
        assert!(report.summary().contains("Average LCS    : 0.6667"));
    }
}
