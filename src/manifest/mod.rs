//! AVITI run manifest generation.
//!
//! Samples of every lane pool are expanded into one row per index pair, grouped by
//! (len Index1, len Index2, lane), topped up with length-fitted PhiX controls and
//! collision-checked per lane before one CSV per group is written:
//!
//! ```text
//! [RUNVALUES]
//! KeyName, Value
//! lims_step_name, "<step>"
//! lims_step_id, "<process id>"
//! manifest_file, "<root>_<k>.csv"
//! manifest_group, <k+1>/<N>
//! grouped_by, len_idx1:<n> len_idx2:<n> lane:<lane>
//!
//! [SETTINGS]
//! SettingName, Value
//!
//! [SAMPLES]
//! SampleName,Index1,Index2,Lane,Project,Recipe
//! ```
//!
//! The CSVs are delivered together as `<root>.zip`.

use thiserror::Error;

use crate::lims::Field;
use crate::matching::collision::CollisionError;
use crate::parsing::label::IndexError;

pub mod archive;
pub mod builder;
pub mod sections;

pub use builder::{fit_seq, ManifestBuilder, ManifestFile, ManifestSet};

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Can't fit '{seq}' to length {length}: {reason}")]
    Extension {
        seq: String,
        length: usize,
        reason: String,
    },

    #[error("Expected one or two output pools, found {0}")]
    PoolCount(usize),

    #[error("Expected a single-lane or dual-lane flowcell, found lanes {{{0}}}")]
    Lanes(String),

    #[error("Expected all pools on a single flowcell, found {0:?}")]
    Flowcell(Vec<String>),

    #[error("Detected non-unique reagent labels in pool {0}")]
    DuplicateLabels(String),

    #[error("PhiX controls loaded but no kit specified for pool {0}")]
    PhixWithoutKit(String),

    #[error("PhiX controls specified but not loaded for pool {0}")]
    KitWithoutPhix(String),

    #[error("Unknown PhiX kit '{0}'")]
    UnknownPhixSet(String),

    #[error("{entity} is missing required field '{field}'")]
    MissingField { entity: String, field: Field },

    #[error("Sample {sample}: {source}")]
    Label {
        sample: String,
        #[source]
        source: IndexError,
    },

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Collision(#[from] CollisionError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Step metadata written into every manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunHeader {
    pub step_name: String,
    pub step_id: String,
    /// Root of every file name, see [`archive::manifest_root_name`]
    pub root_name: String,
}
