//! Tabular inputs read from local CSV files rather than the LIMS.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::core::index::IndexPair;
use crate::core::sample::{SampleRow, CONTROL_PROJECT, DEFAULT_RECIPE};
use crate::lims::records::{ArtifactRecord, TransferRecord, Udfs};
use crate::lims::Field;

/// Lane assigned to index rows without a `Lane` column
pub const DEFAULT_LANE: &str = "1";

#[derive(Error, Debug)]
pub enum LocalDataError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("No rows found in {0}")]
    Empty(String),
}

/// One row of an offline normalization sample sheet
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NormSheetRow {
    pub sample_name: String,
    pub src_plate: String,
    pub src_well: String,
    pub dst_plate: String,
    pub dst_well: String,
    /// Concentration, ng/ul
    pub conc: f64,
    /// Raw volume in the source well, ul
    pub vol: f64,
    pub target_amt: f64,
    pub target_vol: f64,
}

impl NormSheetRow {
    /// The equivalent LIMS transfer record; artifact ids are synthesised from the row number
    #[must_use]
    pub fn into_record(self, row: usize) -> TransferRecord {
        TransferRecord {
            input: ArtifactRecord {
                id: format!("local-in-{row}"),
                name: self.sample_name.clone(),
                sample_name: Some(self.sample_name.clone()),
                container: self.src_plate,
                well: self.src_well,
                udf: Udfs::default()
                    .with(Field::Concentration, self.conc)
                    .with(Field::ConcUnits, "ng/ul")
                    .with(Field::Volume, self.vol),
                sample_udf: Udfs::default(),
            },
            output: ArtifactRecord {
                id: format!("local-out-{row}"),
                name: self.sample_name,
                sample_name: None,
                container: self.dst_plate,
                well: self.dst_well,
                udf: Udfs::default()
                    .with(Field::TargetAmount, self.target_amt)
                    .with(Field::TargetTotalVolume, self.target_vol),
                sample_udf: Udfs::default(),
            },
        }
    }
}

/// Read an offline normalization sample sheet
///
/// # Errors
///
/// Returns an error if the file cannot be read, a row fails to parse, or no rows are present.
pub fn read_norm_sheet(path: &Path) -> Result<Vec<TransferRecord>, LocalDataError> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_path(path)?;

    let mut records = Vec::new();
    for (i, row) in reader.deserialize::<NormSheetRow>().enumerate() {
        records.push(row?.into_record(i + 1));
    }

    if records.is_empty() {
        return Err(LocalDataError::Empty(path.display().to_string()));
    }
    Ok(records)
}

#[derive(Debug, Deserialize)]
struct IndexSheetRow {
    #[serde(rename = "SampleName")]
    sample_name: String,
    #[serde(rename = "Index1")]
    index1: String,
    #[serde(rename = "Index2", default)]
    index2: String,
    #[serde(rename = "Lane", default)]
    lane: Option<String>,
}

/// Parse index rows from CSV text with columns `SampleName,Index1[,Index2][,Lane]`
///
/// # Errors
///
/// Returns an error if a row fails to parse or no rows are present.
pub fn parse_index_sheet(text: &str) -> Result<Vec<SampleRow>, LocalDataError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for row in reader.deserialize::<IndexSheetRow>() {
        let row = row?;
        let index = if row.index2.is_empty() {
            IndexPair::single(row.index1.to_uppercase())
        } else {
            IndexPair::dual(row.index1.to_uppercase(), row.index2.to_uppercase())
        };
        let lane = row
            .lane
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| DEFAULT_LANE.to_string());
        rows.push(SampleRow::new(
            row.sample_name,
            index,
            lane,
            CONTROL_PROJECT,
            DEFAULT_RECIPE,
        ));
    }

    if rows.is_empty() {
        return Err(LocalDataError::Empty("index sheet".to_string()));
    }
    Ok(rows)
}

/// Read index rows from a CSV file
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn read_index_sheet(path: &Path) -> Result<Vec<SampleRow>, LocalDataError> {
    let text = std::fs::read_to_string(path)?;
    parse_index_sheet(&text)
}
