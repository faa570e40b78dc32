//! Reference-based scoring of generated action plans.
//!
//! Three metrics per aligned prediction/reference pair: token Jaccard
//! overlap, normalized LCS, and TF-IDF cosine fitted over the whole batch.

pub mod lexical;
pub mod readers;
pub mod report;
pub mod run_log;
pub mod tfidf;

use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

pub use lexical::{jaccard, lcs_ratio, tokenize};
pub use readers::{read_predictions, read_references};
pub use report::{
    read_scores, score_pairs, write_scores, MetricAverages, ScoreInputError, ScoreReport, ScoreRow,
};
pub use run_log::{append_run_log, log_scores, RunLogEntry};
pub use tfidf::{tfidf_cosine_batch, TfidfVectorizer};

/// Read both files, score the pairs they share by index, and write the
/// per-row table to `out`.
pub fn score_files(predictions: &Path, references: &Path, out: &Path) -> Result<ScoreReport> {
    let preds = read_predictions(predictions)?;
    let refs = read_references(references)?;
    let report = score_pairs(&preds, &refs)?;
    write_scores(out, &report.rows)
        .with_context(|| format!("failed to write scores to {}", out.display()))?;
    info!(
        compared = report.compared(),
        out = %out.display(),
        "wrote per-row scores"
    );
    Ok(report)
}
