//! Append-only checkpoint ledger.
//!
//! The CSV file (`data_idx,response`) is both the durable log of completed
//! generations and, once read back, the index of which scenarios are done.
//! Every append is flushed and synced before the next scenario starts, so a
//! killed run resumes exactly after its last successful row. A row torn by
//! a kill mid-write is cut off when the ledger is reopened.

use std::collections::BTreeSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use tracing::{debug, warn};

use crate::model::CheckpointRow;

pub const CHECKPOINT_HEADER: [&str; 2] = ["data_idx", "response"];

#[derive(Debug)]
pub struct CheckpointLedger {
    path: PathBuf,
    completed: BTreeSet<usize>,
}

impl CheckpointLedger {
    /// Open (or prepare to create) the ledger at `path` and rebuild the
    /// completed-index set from whatever rows are already there.
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        repair_torn_tail(&path)?;
        let completed = read_rows(&path)?.into_iter().map(|r| r.data_idx).collect();
        let ledger = Self { path, completed };
        debug!(
            path = %ledger.path.display(),
            completed = ledger.completed.len(),
            "checkpoint loaded"
        );
        Ok(ledger)
    }

    /// Delete the ledger file so the next run starts fresh.
    pub fn reset(path: &Path) -> anyhow::Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("failed to remove {}", path.display())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contains(&self, data_idx: usize) -> bool {
        self.completed.contains(&data_idx)
    }

    pub fn completed(&self) -> &BTreeSet<usize> {
        &self.completed
    }

    pub fn len(&self) -> usize {
        self.completed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.completed.is_empty()
    }

    /// Durably append one row. Returns `false` without writing when
    /// `data_idx` is already recorded.
    pub fn append(&mut self, data_idx: usize, response: &str) -> anyhow::Result<bool> {
        if self.completed.contains(&data_idx) {
            warn!(data_idx, "checkpoint already holds this index; not appending");
            return Ok(false);
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open checkpoint {}", self.path.display()))?;
        let is_new = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if is_new {
            writer.write_record(CHECKPOINT_HEADER)?;
        }
        writer.write_record([data_idx.to_string().as_str(), response])?;
        writer.flush()?;
        writer
            .get_ref()
            .sync_data()
            .with_context(|| format!("failed to sync checkpoint {}", self.path.display()))?;

        self.completed.insert(data_idx);
        Ok(true)
    }
}

/// Rows in file order. Rows whose `data_idx` is not a plain integer, and
/// unreadable or partially written trailing records, are skipped.
pub fn read_rows(path: &Path) -> anyhow::Result<Vec<CheckpointRow>> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to open checkpoint {}", path.display()))
        }
    };
    let sound = &bytes[..torn_tail_offset(&bytes).unwrap_or(bytes.len())];
    if sound.is_empty() {
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(sound);

    let headers = reader.headers()?.clone();
    let Some(idx_col) = headers.iter().position(|h| h.trim() == "data_idx") else {
        bail!(
            "checkpoint {} has no data_idx column (header: {:?})",
            path.display(),
            headers
        );
    };
    let resp_col = headers.iter().position(|h| h.trim() == "response");

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!(path = %path.display(), line = line + 2, error = %e, "skipping unreadable checkpoint row");
                continue;
            }
        };
        let raw_idx = record.get(idx_col).unwrap_or("").trim();
        if raw_idx.is_empty() || !raw_idx.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let Ok(data_idx) = raw_idx.parse::<usize>() else {
            continue;
        };
        let response = resp_col
            .and_then(|c| record.get(c))
            .unwrap_or("")
            .to_string();
        rows.push(CheckpointRow { data_idx, response });
    }
    Ok(rows)
}

/// Byte offset where a partially written final record starts, if any.
///
/// Every append ends in `\n` with balanced quotes; a final record that
/// lacks either was cut off mid-write.
fn torn_tail_offset(bytes: &[u8]) -> Option<usize> {
    if bytes.is_empty() {
        return None;
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut record = csv::ByteRecord::new();
    let mut last_start = 0;
    loop {
        let start = reader.position().byte() as usize;
        match reader.read_byte_record(&mut record) {
            Ok(true) => last_start = start,
            Ok(false) => break,
            Err(_) => {
                last_start = start;
                break;
            }
        }
    }

    let tail = &bytes[last_start.min(bytes.len())..];
    let quotes = tail.iter().filter(|&&b| b == b'"').count();
    if tail.ends_with(b"\n") && quotes % 2 == 0 {
        None
    } else {
        Some(last_start)
    }
}

/// Truncate a torn final record so later appends start on a fresh line.
fn repair_torn_tail(path: &Path) -> anyhow::Result<()> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read checkpoint {}", path.display()))
        }
    };
    let Some(keep) = torn_tail_offset(&bytes) else {
        return Ok(());
    };

    warn!(
        path = %path.display(),
        dropped_bytes = bytes.len() - keep,
        "discarding partially written checkpoint row"
    );
    let file = OpenOptions::new()
        .write(true)
        .open(path)
        .with_context(|| format!("failed to open checkpoint {}", path.display()))?;
    file.set_len(keep as u64)
        .and_then(|()| file.sync_all())
        .with_context(|| format!("failed to truncate checkpoint {}", path.display()))?;
    Ok(())
}
