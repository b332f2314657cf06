// THEORY:
// The dataset is the training-data side of the engine: a flat, append-only text
// file where every labeling event adds one line per region. Lines are
// `label,area,aspectRatio,percentFilled,leastCentralMomentAxis` with no header.
//
// Floats are written with Rust's shortest round-trip formatting, so reading a
// line back yields bit-for-bit the values that were recorded.

use crate::core_modules::region::Region;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

const FIELD_COUNT: usize = 5;

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("could not access dataset file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid label {0:?}: labels must be non-empty and contain no commas or line breaks")]
    InvalidLabel(String),
    #[error("malformed record on line {line}: {reason}")]
    Parse { line: usize, reason: String },
}

/// One labeled feature vector.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub label: String,
    pub area: u32,
    pub aspect_ratio: f64,
    pub percent_filled: f64,
    pub least_central_moment_axis: f64,
}

impl FeatureRecord {
    pub fn from_region(label: &str, region: &Region) -> Self {
        Self {
            label: label.to_string(),
            area: region.area,
            aspect_ratio: region.aspect_ratio,
            percent_filled: region.percent_filled,
            least_central_moment_axis: region.least_central_moment_axis,
        }
    }

    /// The record as one dataset line, without the trailing newline.
    pub fn to_line(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.label,
            self.area,
            self.aspect_ratio,
            self.percent_filled,
            self.least_central_moment_axis
        )
    }

    /// Parses one dataset line. `line_number` is only used for error reporting.
    pub fn parse_line(line: &str, line_number: usize) -> Result<Self, DatasetError> {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != FIELD_COUNT {
            return Err(DatasetError::Parse {
                line: line_number,
                reason: format!("expected {FIELD_COUNT} fields, found {}", fields.len()),
            });
        }

        let number = |index: usize| -> Result<f64, DatasetError> {
            fields[index].parse::<f64>().map_err(|e| DatasetError::Parse {
                line: line_number,
                reason: format!("field {index} ({:?}): {e}", fields[index]),
            })
        };

        Ok(Self {
            label: fields[0].to_string(),
            area: fields[1].parse::<u32>().map_err(|e| DatasetError::Parse {
                line: line_number,
                reason: format!("area ({:?}): {e}", fields[1]),
            })?,
            aspect_ratio: number(2)?,
            percent_filled: number(3)?,
            least_central_moment_axis: number(4)?,
        })
    }
}

/// Rejects labels that would break the line format.
pub fn validate_label(label: &str) -> Result<(), DatasetError> {
    if label.is_empty() || label.contains([',', '\n', '\r']) {
        return Err(DatasetError::InvalidLabel(label.to_string()));
    }
    Ok(())
}

/// Appends labeled feature vectors to a dataset file.
#[derive(Debug, Clone)]
pub struct DatasetRecorder {
    path: PathBuf,
}

impl DatasetRecorder {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes one record per region, in order, under `label`.
    ///
    /// The file is created if missing, never truncated, and flushed and closed
    /// before returning. Returns the number of records written.
    pub fn append(&self, label: &str, regions: &[Region]) -> Result<usize, DatasetError> {
        validate_label(label)?;

        let io_error = |source: std::io::Error| DatasetError::Io {
            path: self.path.clone(),
            source,
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(io_error)?;
        let mut writer = BufWriter::new(file);

        for region in regions {
            let record = FeatureRecord::from_region(label, region);
            writeln!(writer, "{}", record.to_line()).map_err(io_error)?;
        }
        writer.flush().map_err(io_error)?;

        log::debug!(
            "Appended {} records labeled {:?} to {}",
            regions.len(),
            label,
            self.path.display()
        );
        Ok(regions.len())
    }
}

/// Reads every record of a dataset file, in file order. Blank lines are skipped.
pub fn read_records(path: impl AsRef<Path>) -> Result<Vec<FeatureRecord>, DatasetError> {
    let path = path.as_ref();
    let file = File::open(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|source| DatasetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if line.trim().is_empty() {
            continue;
        }
        records.push(FeatureRecord::parse_line(&line, index + 1)?);
    }
    Ok(records)
}
