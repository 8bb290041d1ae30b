use crate::processing::DecodedResult;
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Timestamp format used in stored records.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const UNANALYZED_LABEL: &str = "Unanalyzed Image";
pub const NOT_AVAILABLE: &str = "N/A";

/// One analysis outcome as handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub date: String,
    pub image_uri: String,
    pub result: String,
    pub confidence_level: String,
}

impl AnalysisRecord {
    /// Record for a decoded result.
    pub fn from_result(
        result: &DecodedResult,
        image_uri: impl Into<String>,
        at: DateTime<Local>,
    ) -> Self {
        let (label, confidence) = result.summary();
        Self {
            date: at.format(DATE_FORMAT).to_string(),
            image_uri: image_uri.into(),
            result: label,
            confidence_level: confidence,
        }
    }

    /// Record for an image saved without running the model.
    pub fn unanalyzed(image_uri: impl Into<String>, at: DateTime<Local>) -> Self {
        Self {
            date: at.format(DATE_FORMAT).to_string(),
            image_uri: image_uri.into(),
            result: UNANALYZED_LABEL.to_string(),
            confidence_level: NOT_AVAILABLE.to_string(),
        }
    }
}

/// Receiver of finished records. Insert is fire-and-forget for the caller.
pub trait RecordSink: Send + Sync {
    fn insert(&self, record: AnalysisRecord);
}

/// Sink that only logs each record.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl RecordSink for LogSink {
    fn insert(&self, record: AnalysisRecord) {
        tracing::info!(
            date = %record.date,
            image = %record.image_uri,
            result = %record.result,
            confidence = %record.confidence_level,
            "Analysis record"
        );
    }
}

/// Appends one JSON object per line to a file.
pub struct JsonlSink {
    path: PathBuf,
    file: Mutex<File>,
}

impl JsonlSink {
    pub fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Stored records, newest first.
    pub fn records(&self) -> anyhow::Result<Vec<AnalysisRecord>> {
        Self::read_all(&self.path)
    }

    /// Remove every stored record.
    pub fn clear(&self) -> anyhow::Result<()> {
        let file = self
            .file
            .lock()
            .map_err(|_| anyhow::anyhow!("record file lock poisoned"))?;
        file.set_len(0)?;
        tracing::info!(path = %self.path.display(), "Records cleared");
        Ok(())
    }

    fn append(&self, record: &AnalysisRecord) -> anyhow::Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow::anyhow!("record file lock poisoned"))?;
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }

    /// All records in the file, newest first.
    pub fn read_all(path: impl AsRef<Path>) -> anyhow::Result<Vec<AnalysisRecord>> {
        let reader = BufReader::new(File::open(path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        records.reverse();
        Ok(records)
    }
}

impl RecordSink for JsonlSink {
    fn insert(&self, record: AnalysisRecord) {
        match self.append(&record) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Record stored"),
            Err(e) => tracing::error!(
                error = %e,
                path = %self.path.display(),
                "Failed to store record"
            ),
        }
    }
}
