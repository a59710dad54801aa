use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::lims::Field;

/// A UDF value as stored in the LIMS
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UdfValue {
    Number(f64),
    Text(String),
}

impl UdfValue {
    /// Numeric value; numeric text is accepted since the LIMS stores some numbers as strings
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
        }
    }

    #[must_use]
    pub fn as_text(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for UdfValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// UDFs of one LIMS entity, keyed by LIMS field name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Udfs(pub BTreeMap<String, UdfValue>);

impl Udfs {
    #[must_use]
    pub fn number(&self, field: Field) -> Option<f64> {
        self.0.get(field.udf_name()).and_then(UdfValue::as_f64)
    }

    #[must_use]
    pub fn text(&self, field: Field) -> Option<String> {
        self.0.get(field.udf_name()).map(UdfValue::as_text)
    }

    #[must_use]
    pub fn has(&self, field: Field) -> bool {
        self.0.contains_key(field.udf_name())
    }

    #[must_use]
    pub fn with(mut self, field: Field, value: impl Into<UdfValue>) -> Self {
        self.0.insert(field.udf_name().to_string(), value.into());
        self
    }
}

impl From<&str> for UdfValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// Process (step) metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub id: String,
    /// Step type name
    pub name: String,
    pub technician: String,
}

/// A sample inside a pool loaded on a flowcell lane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSample {
    pub name: String,
    /// Reagent label linked to this sample in the pool
    pub label: String,
    #[serde(default)]
    pub project: Option<String>,
    /// Project-level UDFs ("Sequencing setup")
    #[serde(default)]
    pub project_udf: Udfs,
}

/// An output analyte of a manifest step: one pool on one lane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanePool {
    pub id: String,
    pub name: String,
    /// Flowcell container name
    pub container: String,
    /// Container location, `<lane>:<column>`
    pub location: String,
    #[serde(default)]
    pub udf: Udfs,
    pub samples: Vec<PoolSample>,
}

impl LanePool {
    /// Lane number as text, taken from the container location
    #[must_use]
    pub fn lane(&self) -> &str {
        self.location
            .split_once(':')
            .map_or(self.location.as_str(), |(lane, _)| lane)
    }
}

/// One side (input or output) of a transfer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRecord {
    pub id: String,
    pub name: String,
    /// Name of the submitted sample, when the artifact is not a pool
    #[serde(default)]
    pub sample_name: Option<String>,
    /// Container (plate) name
    pub container: String,
    /// Well, e.g. `A:1`
    pub well: String,
    #[serde(default)]
    pub udf: Udfs,
    /// UDFs of the submitted sample (customer-supplied values)
    #[serde(default)]
    pub sample_udf: Udfs,
}

/// An input -> output artifact mapping of a liquid-handling step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub input: ArtifactRecord,
    pub output: ArtifactRecord,
}

impl TransferRecord {
    /// Name used to report on the sample
    #[must_use]
    pub fn sample_name(&self) -> &str {
        self.input.sample_name.as_deref().unwrap_or(&self.input.name)
    }
}
