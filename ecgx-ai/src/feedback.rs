//! Append-only clinician feedback log
//!
//! CSV with columns `timestamp, predicted_label, confidence, user_feedback,
//! correct_label`. The header is written once, when the file is new or empty;
//! existing rows are never rewritten.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("Feedback log I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Feedback log CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid feedback entry: {0}")]
    InvalidEntry(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserFeedback {
    Yes,
    No,
    Skip,
}

impl std::str::FromStr for UserFeedback {
    type Err = FeedbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" | "y" => Ok(UserFeedback::Yes),
            "no" | "n" => Ok(UserFeedback::No),
            "skip" | "s" => Ok(UserFeedback::Skip),
            other => Err(FeedbackError::InvalidEntry(format!(
                "unknown feedback '{}', expected yes, no or skip",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackEntry {
    pub timestamp: DateTime<Utc>,
    pub predicted_label: String,
    /// Percent, as shown in the report
    pub confidence: f64,
    pub user_feedback: UserFeedback,
    pub correct_label: Option<String>,
}

impl FeedbackEntry {
    pub fn new(
        predicted_label: impl Into<String>,
        confidence: f64,
        user_feedback: UserFeedback,
    ) -> Result<Self, FeedbackError> {
        if !(0.0..=100.0).contains(&confidence) {
            return Err(FeedbackError::InvalidEntry(format!(
                "confidence {} outside [0, 100]",
                confidence
            )));
        }
        Ok(Self {
            timestamp: Utc::now(),
            predicted_label: predicted_label.into(),
            confidence,
            user_feedback,
            correct_label: None,
        })
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Blank labels are treated as absent
    pub fn with_correct_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        self.correct_label = if label.trim().is_empty() {
            None
        } else {
            Some(label)
        };
        self
    }
}

#[derive(Debug, Clone)]
pub struct FeedbackLog {
    path: PathBuf,
}

impl FeedbackLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, entry: &FeedbackEntry) -> Result<(), FeedbackError> {
        if entry.correct_label.is_some() && entry.user_feedback != UserFeedback::No {
            warn!(
                "Correct label '{}' recorded for a prediction marked {:?}",
                entry.correct_label.as_deref().unwrap_or_default(),
                entry.user_feedback
            );
        }
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| FeedbackError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let io_error = |source| FeedbackError::Io {
            path: self.path.clone(),
            source,
        };
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_error)?;
        let needs_header = file.metadata().map_err(io_error)?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(needs_header)
            .from_writer(file);
        writer.serialize(entry)?;
        writer.flush().map_err(io_error)?;

        debug!(
            path = %self.path.display(),
            label = %entry.predicted_label,
            "Appended feedback entry"
        );
        Ok(())
    }

    /// All entries in file order; a missing file has none
    pub fn entries(&self) -> Result<Vec<FeedbackEntry>, FeedbackError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let mut reader = csv::Reader::from_path(&self.path)?;
        reader
            .deserialize()
            .collect::<Result<Vec<FeedbackEntry>, csv::Error>>()
            .map_err(FeedbackError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn entry(label: &str, feedback: UserFeedback) -> FeedbackEntry {
        FeedbackEntry::new(label, 92.5, feedback)
            .unwrap()
            .with_timestamp(Utc.with_ymd_and_hms(2025, 5, 3, 14, 0, 0).unwrap())
    }

    #[test]
    fn test_header_written_once() {
        let dir = TempDir::new().unwrap();
        let log = FeedbackLog::new(dir.path().join("feedback.csv"));
        log.append(&entry("AFIB", UserFeedback::Yes)).unwrap();
        log.append(&entry("NSTEMI", UserFeedback::No).with_correct_label("STEMI"))
            .unwrap();

        let text = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "timestamp,predicted_label,confidence,user_feedback,correct_label"
        );
        assert!(lines[1].ends_with(",AFIB,92.5,Yes,"));
        assert!(lines[2].ends_with(",NSTEMI,92.5,No,STEMI"));
    }

    #[test]
    fn test_entries_read_back() {
        let dir = TempDir::new().unwrap();
        let log = FeedbackLog::new(dir.path().join("nested/feedback.csv"));
        assert!(log.entries().unwrap().is_empty());

        let first = entry("AFIB", UserFeedback::Skip);
        log.append(&first).unwrap();
        let entries = log.entries().unwrap();
        assert_eq!(entries, vec![first]);
    }

    #[test]
    fn test_existing_rows_preserved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("feedback.csv");
        std::fs::write(
            &path,
            "timestamp,predicted_label,confidence,user_feedback,correct_label\n\
             2025-05-03T14:00:00Z,NORM,80.0,Yes,\n",
        )
        .unwrap();
        let log = FeedbackLog::new(&path);
        log.append(&entry("MI", UserFeedback::No)).unwrap();

        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].predicted_label, "NORM");
        assert_eq!(entries[0].correct_label, None);
        assert_eq!(entries[1].predicted_label, "MI");
    }

    #[test]
    fn test_invalid_confidence_rejected() {
        assert!(FeedbackEntry::new("AFIB", 120.0, UserFeedback::Yes).is_err());
        assert!(FeedbackEntry::new("AFIB", f64::NAN, UserFeedback::Yes).is_err());
    }

    #[test]
    fn test_parse_user_feedback() {
        assert_eq!("Yes".parse::<UserFeedback>().unwrap(), UserFeedback::Yes);
        assert_eq!(" n ".parse::<UserFeedback>().unwrap(), UserFeedback::No);
        assert!("maybe".parse::<UserFeedback>().is_err());
    }

    #[test]
    fn test_blank_correct_label_is_none() {
        let e = entry("AFIB", UserFeedback::No).with_correct_label("  ");
        assert_eq!(e.correct_label, None);
    }
}
