use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::warn;

use crate::core::index::PhixSet;
use crate::utils::dna::is_dna;

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read index catalog: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse index catalog: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("PhiX set '{name}' must have exactly 4 index pairs, found {found}")]
    MalformedPhixSet { name: String, found: usize },

    #[error("Catalog entry '{entry}' has a non-ACGT sequence '{seq}'")]
    InvalidSequence { entry: String, seq: String },
}

/// Fail on the first sequence of `entry` outside {A, C, G, T}
fn check_dna<'a>(entry: &str, seqs: impl IntoIterator<Item = &'a String>) -> Result<(), CatalogError> {
    match seqs.into_iter().find(|seq| !is_dna(seq)) {
        Some(seq) => Err(CatalogError::InvalidSequence {
            entry: entry.to_string(),
            seq: seq.clone(),
        }),
        None => Ok(()),
    }
}

/// Catalog version for compatibility checking
pub const CATALOG_VERSION: &str = "1.0.0";

/// i7 and i5 sequence lists for one SMART-seq3 well code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartSeqEntry(pub Vec<String>, pub Vec<String>);

/// Serializable catalog format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogData {
    pub version: String,

    #[serde(default)]
    pub phix_sets: Vec<PhixSet>,

    /// 10X well code -> sequences. Single-index codes list four i7 sequences,
    /// dual-index codes list `[i7, i5]`.
    #[serde(default)]
    pub chromium_10x: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub smartseq3: BTreeMap<String, SmartSeqEntry>,
}

/// Immutable lookup tables injected into the index resolver and manifest builder
#[derive(Debug, Clone, Default)]
pub struct IndexCatalog {
    phix_sets: BTreeMap<String, PhixSet>,
    chromium_10x: BTreeMap<String, Vec<String>>,
    smartseq3: BTreeMap<String, SmartSeqEntry>,
}

impl IndexCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the embedded default catalog
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded JSON is malformed (validated by build.rs).
    pub fn load_embedded() -> Result<Self, CatalogError> {
        const EMBEDDED_CATALOG: &str = include_str!("../../catalogs/index_tables.json");
        Self::from_json(EMBEDDED_CATALOG)
    }

    /// Load a catalog from a JSON file
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ReadError` if the file cannot be read, or a parse error.
    pub fn load_from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse a catalog from a JSON string
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ParseError` for invalid JSON,
    /// `CatalogError::MalformedPhixSet` if a PhiX set does not hold four pairs, or
    /// `CatalogError::InvalidSequence` for any sequence outside {A, C, G, T}.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let data: CatalogData = serde_json::from_str(json)?;

        // Version check (warn but don't fail)
        if data.version != CATALOG_VERSION {
            warn!(
                "Index catalog version mismatch (expected {}, found {})",
                CATALOG_VERSION, data.version
            );
        }

        let mut catalog = Self::new();
        for set in data.phix_sets {
            catalog.add_phix_set(set)?;
        }
        for (code, seqs) in &data.chromium_10x {
            check_dna(code, seqs)?;
        }
        for (code, SmartSeqEntry(i7, i5)) in &data.smartseq3 {
            check_dna(code, i7.iter().chain(i5))?;
        }
        catalog.chromium_10x = data.chromium_10x;
        catalog.smartseq3 = data.smartseq3;

        Ok(catalog)
    }

    /// Add a PhiX set, keyed by its LIMS dropdown name
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::MalformedPhixSet` unless the set has exactly four pairs,
    /// or `CatalogError::InvalidSequence` if an index is not ACGT.
    pub fn add_phix_set(&mut self, set: PhixSet) -> Result<(), CatalogError> {
        if set.indices.len() != 4 {
            return Err(CatalogError::MalformedPhixSet {
                name: set.name,
                found: set.indices.len(),
            });
        }
        check_dna(&set.name, set.indices.iter().flat_map(|(i7, i5)| [i7, i5]))?;
        self.phix_sets.insert(set.name.clone(), set);
        Ok(())
    }

    #[must_use]
    pub fn with_10x(mut self, code: impl Into<String>, seqs: &[&str]) -> Self {
        self.chromium_10x
            .insert(code.into(), seqs.iter().map(ToString::to_string).collect());
        self
    }

    #[must_use]
    pub fn with_smartseq3(mut self, code: impl Into<String>, i7: &[&str], i5: &[&str]) -> Self {
        let to_vec = |s: &[&str]| -> Vec<String> { s.iter().map(ToString::to_string).collect() };
        self.smartseq3
            .insert(code.into(), SmartSeqEntry(to_vec(i7), to_vec(i5)));
        self
    }

    /// Overlay another catalog's entries on top of this one
    pub fn merge(&mut self, other: IndexCatalog) {
        self.phix_sets.extend(other.phix_sets);
        self.chromium_10x.extend(other.chromium_10x);
        self.smartseq3.extend(other.smartseq3);
    }

    #[must_use]
    pub fn phix_set(&self, name: &str) -> Option<&PhixSet> {
        self.phix_sets.get(name)
    }

    pub fn phix_set_names(&self) -> impl Iterator<Item = &str> {
        self.phix_sets.keys().map(String::as_str)
    }

    #[must_use]
    pub fn chromium_10x(&self, code: &str) -> Option<&[String]> {
        self.chromium_10x.get(code).map(Vec::as_slice)
    }

    #[must_use]
    pub fn smartseq3(&self, code: &str) -> Option<&SmartSeqEntry> {
        self.smartseq3.get(code)
    }

    /// Export to JSON
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, CatalogError> {
        let data = CatalogData {
            version: CATALOG_VERSION.to_string(),
            phix_sets: self.phix_sets.values().cloned().collect(),
            chromium_10x: self.chromium_10x.clone(),
            smartseq3: self.smartseq3.clone(),
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }
}
