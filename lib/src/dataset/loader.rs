//! CSV loading for the labeled stress survey.
//!
//! Columns are looked up by header name, so the file may order them freely
//! or carry extra columns; the resulting matrix is always in
//! [`Feature::ALL`] order.

use super::LabeledDataset;
use crate::error::{Result, StressError};
use crate::features::{Feature, N_FEATURES};
use csv::ReaderBuilder;
use ndarray::{Array1, Array2};
use std::io::Read;
use std::path::Path;

/// Label column of the reference survey dataset.
pub const DEFAULT_LABEL_COLUMN: &str = "stress_level";

impl LabeledDataset {
    /// Load a labeled dataset from a CSV file with a header row.
    pub fn from_csv<P: AsRef<Path>>(path: P, label_column: &str) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| StressError::Csv(format!("cannot open {}: {e}", path.display())))?;
        let dataset = Self::from_reader(std::io::BufReader::new(file), label_column)?;
        tracing::info!(
            path = %path.display(),
            rows = dataset.len(),
            "loaded labeled dataset"
        );
        Ok(dataset)
    }

    /// Load a labeled dataset from any CSV source with a header row.
    pub fn from_reader<R: Read>(reader: R, label_column: &str) -> Result<Self> {
        let mut rdr = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = rdr.headers()?.clone();

        let position = |name: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| StressError::schema(format!("column `{name}`"), "no such column"))
        };
        let mut columns = [0usize; N_FEATURES];
        for feature in Feature::ALL {
            columns[feature.index()] = position(feature.name())?;
        }
        let label_idx = position(label_column)?;

        let mut values = Vec::new();
        let mut labels = Vec::new();
        for (row, record) in rdr.records().enumerate() {
            let record = record?;
            let cell = |idx: usize, name: &str| -> Result<f64> {
                let raw = record.get(idx).unwrap_or("");
                raw.parse::<f64>().map_err(|_| {
                    StressError::Csv(format!(
                        "row {}: column `{name}` has non-numeric value `{raw}`",
                        row + 1
                    ))
                })
            };
            for feature in Feature::ALL {
                values.push(cell(columns[feature.index()], feature.name())?);
            }
            labels.push(cell(label_idx, label_column)?);
        }

        if labels.is_empty() {
            return Err(StressError::EmptyDataset(
                "CSV source contains a header but no rows".to_string(),
            ));
        }

        let features = Array2::from_shape_vec((labels.len(), N_FEATURES), values)
            .map_err(|e| StressError::Csv(e.to_string()))?;
        LabeledDataset::new(features, Array1::from_vec(labels))
    }
}
