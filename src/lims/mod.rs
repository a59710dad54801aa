//! Interface to the LIMS collaborator.
//!
//! The core never walks the LIMS object graph. It asks the collaborator for flat
//! records ([`records::LanePool`], [`records::TransferRecord`]) and reads fields
//! through the closed [`Field`] set. Results are written back with "put" semantics:
//! the last writer wins.
//!
//! [`snapshot::SnapshotLims`] serves a JSON snapshot of one process and records
//! write-backs and uploads in an output directory.

use serde::{Serialize, Serializer};
use std::path::Path;
use thiserror::Error;

pub mod records;
pub mod snapshot;

use records::{LanePool, ProcessInfo, TransferRecord, UdfValue};

#[derive(Error, Debug)]
pub enum LimsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid LIMS snapshot: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown artifact '{0}'")]
    UnknownArtifact(String),

    #[error("{entity} is missing required field '{field}'")]
    MissingField { entity: String, field: &'static str },
}

/// The fields the core reads from or writes to LIMS entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Concentration,
    ConcUnits,
    Volume,
    AmountTaken,
    TotalVolume,
    FinalVolume,
    TargetAmount,
    TargetTotalVolume,
    PoolConc,
    PhixPercent,
    PhixSet,
    SequencingSetup,
    CustomerConc,
    CustomerVolume,
}

impl Field {
    /// The UDF name used by the LIMS
    #[must_use]
    pub fn udf_name(self) -> &'static str {
        match self {
            Self::Concentration => "Concentration",
            Self::ConcUnits => "Conc. Units",
            Self::Volume => "Volume (ul)",
            Self::AmountTaken => "Amount taken (ng)",
            Self::TotalVolume => "Total Volume (uL)",
            Self::FinalVolume => "Final Volume (uL)",
            Self::TargetAmount => "Target Amount (ng)",
            Self::TargetTotalVolume => "Target Total Volume (uL)",
            Self::PoolConc => "Pool Conc. (nM)",
            Self::PhixPercent => "% phiX",
            Self::PhixSet => "Element PhiX Set",
            Self::SequencingSetup => "Sequencing setup",
            Self::CustomerConc => "Customer Conc",
            Self::CustomerVolume => "Customer Volume",
        }
    }
}

/// Fields serialize as their UDF name, the key the LIMS stores them under
impl Serialize for Field {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.udf_name())
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.udf_name())
    }
}

/// Read/write access to one LIMS process
pub trait Lims {
    /// Metadata of the current process
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be fetched.
    fn process(&self) -> Result<ProcessInfo, LimsError>;

    /// Output analytes of a sequencing step, one per lane
    ///
    /// # Errors
    ///
    /// Returns an error if the analytes cannot be fetched.
    fn lane_pools(&self) -> Result<Vec<LanePool>, LimsError>;

    /// Input -> output analyte pairs of a liquid-handling step
    ///
    /// # Errors
    ///
    /// Returns an error if the mappings cannot be fetched.
    fn transfers(&self) -> Result<Vec<TransferRecord>, LimsError>;

    /// Set a field on an artifact
    ///
    /// # Errors
    ///
    /// Returns `LimsError::UnknownArtifact` if the artifact does not belong to the process.
    fn put_udf(&mut self, artifact_id: &str, field: Field, value: UdfValue)
        -> Result<(), LimsError>;

    /// Attach a file to the named file slot of the process
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be uploaded.
    fn upload(&mut self, slot: &str, path: &Path) -> Result<(), LimsError>;
}

/// Every output needs a volume field and a concentration or amount field
///
/// # Errors
///
/// Returns `LimsError::MissingField` naming the first output lacking one.
pub fn assert_output_fields(transfers: &[TransferRecord]) -> Result<(), LimsError> {
    for record in transfers {
        let udf = &record.output.udf;
        if !(udf.has(Field::FinalVolume) || udf.has(Field::TargetTotalVolume)) {
            return Err(LimsError::MissingField {
                entity: record.output.name.clone(),
                field: "Final Volume (uL) or Target Total Volume (uL)",
            });
        }
        if !(udf.has(Field::TargetAmount)
            || udf.has(Field::PoolConc)
            || udf.has(Field::AmountTaken))
        {
            return Err(LimsError::MissingField {
                entity: record.output.name.clone(),
                field: "Target Amount (ng), Amount taken (ng) or Pool Conc. (nM)",
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::UdfWrite;

    #[test]
    fn test_field_serializes_as_udf_name() {
        assert_eq!(serde_json::to_value(Field::PoolConc).unwrap(), "Pool Conc. (nM)");

        let write = UdfWrite::rounded("2-1", Field::AmountTaken, 12.346);
        assert_eq!(
            serde_json::to_value(&write).unwrap(),
            serde_json::json!({"artifact_id": "2-1", "field": "Amount taken (ng)", "value": 12.35})
        );
    }
}
