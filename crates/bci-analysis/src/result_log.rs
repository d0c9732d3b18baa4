//! Incremental per-subject result log
//!
//! Semicolon-separated table with one row per subject, appended as soon as
//! that subject's cross-validation finishes. A later subject's failure
//! leaves earlier rows intact, so partial runs stay recoverable.

use bci_core::{BciError, BciResult};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

const HEADER: [&str; 4] = ["Subject", "Accuracy list", "Std of Avg. Acc", "Avg. Acc"];

/// Append-only result table
#[derive(Debug, Clone)]
pub struct ResultLog {
    path: PathBuf,
}

/// One parsed row of the result table
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub subject: u32,
    pub accuracies: Vec<f32>,
    pub std: f32,
    pub avg: f32,
}

impl ResultLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ResultLog { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one subject's per-fold accuracies, creating the file with a
    /// header row on first use.
    pub fn append(&self, subject: u32, accuracies: &[f32]) -> BciResult<()> {
        if accuracies.is_empty() {
            return Err(BciError::EmptyDataset {
                reason: format!("no fold accuracies for subject {}", subject),
            });
        }

        let write_header = !self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b';')
            .has_headers(false)
            .from_writer(file);

        if write_header {
            writer.write_record(HEADER).map_err(csv_error)?;
        }

        let n = accuracies.len() as f32;
        let avg = accuracies.iter().sum::<f32>() / n;
        let std = (accuracies.iter().map(|a| (a - avg).powi(2)).sum::<f32>() / n).sqrt();
        let list = accuracies
            .iter()
            .map(|a| a.to_string())
            .collect::<Vec<_>>()
            .join(" ");

        writer
            .write_record(&[
                subject.to_string(),
                list,
                std.to_string(),
                avg.to_string(),
            ])
            .map_err(csv_error)?;
        writer.flush()?;
        Ok(())
    }

    /// Read all rows appended so far.
    pub fn read_rows(&self) -> BciResult<Vec<ResultRow>> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b';')
            .has_headers(true)
            .from_path(&self.path)
            .map_err(csv_error)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(csv_error)?;

            let subject = field(&record, 0)?
                .parse::<u32>()
                .map_err(|e| BciError::Serialization {
                    reason: e.to_string(),
                })?;
            let accuracies = field(&record, 1)?
                .split_whitespace()
                .map(|a| {
                    a.parse::<f32>().map_err(|e| BciError::Serialization {
                        reason: e.to_string(),
                    })
                })
                .collect::<BciResult<Vec<f32>>>()?;
            let std = field(&record, 2)?
                .parse::<f32>()
                .map_err(|e| BciError::Serialization {
                    reason: e.to_string(),
                })?;
            let avg = field(&record, 3)?
                .parse::<f32>()
                .map_err(|e| BciError::Serialization {
                    reason: e.to_string(),
                })?;

            rows.push(ResultRow {
                subject,
                accuracies,
                std,
                avg,
            });
        }
        Ok(rows)
    }
}

fn field<'r>(record: &'r csv::StringRecord, idx: usize) -> BciResult<&'r str> {
    record.get(idx).ok_or_else(|| BciError::Serialization {
        reason: format!("result log row has no column {}", idx),
    })
}

fn csv_error(err: csv::Error) -> BciError {
    BciError::Serialization {
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("bci_result_log_{}_{}.csv", std::process::id(), name))
    }

    #[test]
    fn test_rows_append_incrementally() {
        let path = scratch_path("incremental");
        std::fs::remove_file(&path).ok();
        let log = ResultLog::new(&path);

        log.append(1, &[0.8, 0.9]).unwrap();
        log.append(2, &[0.6, 0.7, 0.8]).unwrap();

        let rows = log.read_rows().unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].subject, 1);
        assert_eq!(rows[0].accuracies, vec![0.8, 0.9]);
        assert!((rows[0].avg - 0.85).abs() < 1e-6);
        assert_eq!(rows[1].subject, 2);
        assert!((rows[1].avg - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_earlier_rows_survive_later_failure() {
        let path = scratch_path("survive");
        std::fs::remove_file(&path).ok();
        let log = ResultLog::new(&path);

        log.append(1, &[0.75]).unwrap();
        // A failed subject appends nothing.
        assert!(log.append(2, &[]).is_err());

        let rows = log.read_rows().unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].subject, 1);
        assert_eq!(rows[0].accuracies, vec![0.75]);
    }

    #[test]
    fn test_std_column() {
        let path = scratch_path("std");
        std::fs::remove_file(&path).ok();
        let log = ResultLog::new(&path);

        log.append(3, &[0.5, 0.9]).unwrap();
        let rows = log.read_rows().unwrap();
        std::fs::remove_file(&path).ok();

        assert!((rows[0].std - 0.2).abs() < 1e-6);
        assert!((rows[0].avg - 0.7).abs() < 1e-6);
    }
}
