use serde::{Deserialize, Serialize};

use crate::core::index::IndexPair;

/// Project name used for PhiX rows and samples without a project
pub const CONTROL_PROJECT: &str = "Control";

/// Recipe used for controls and projects lacking a sequencing setup
pub const DEFAULT_RECIPE: &str = "0-0";

/// One manifest row: a sample (or control) with one expanded index pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRow {
    pub sample_name: String,
    pub index: IndexPair,
    pub lane: String,
    pub project: String,
    pub recipe: String,

    /// Whether PhiX is loaded in the pool this sample belongs to
    #[serde(default)]
    pub phix_loaded: bool,

    /// PhiX kit selected for the pool, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phix_set: Option<String>,
}

impl SampleRow {
    pub fn new(
        sample_name: impl Into<String>,
        index: IndexPair,
        lane: impl Into<String>,
        project: impl Into<String>,
        recipe: impl Into<String>,
    ) -> Self {
        Self {
            sample_name: sample_name.into(),
            index,
            lane: lane.into(),
            project: project.into(),
            recipe: recipe.into(),
            phix_loaded: false,
            phix_set: None,
        }
    }

    #[must_use]
    pub fn with_phix(mut self, phix_set: Option<String>) -> Self {
        self.phix_loaded = phix_set.is_some();
        self.phix_set = phix_set;
        self
    }

    /// The manifest grouping key of this row
    #[must_use]
    pub fn group_key(&self) -> GroupKey {
        let (len_index1, len_index2) = self.index.lengths();
        GroupKey {
            len_index1,
            len_index2,
            lane: self.lane.clone(),
        }
    }
}

/// Manifest grouping key. Ordering is (len Index1, len Index2, lane).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub len_index1: usize,
    pub len_index2: usize,
    pub lane: String,
}

impl std::fmt::Display for GroupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "len_idx1:{} len_idx2:{} lane:{}",
            self.len_index1, self.len_index2, self.lane
        )
    }
}

/// Sanitize a LIMS project name for use in a manifest
#[must_use]
pub fn sanitize_project_name(name: &str) -> String {
    name.replace('.', "__").replace(',', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_key_ordering() {
        let short = SampleRow::new("a", IndexPair::dual("AAAAAAAA", "CCCCCCCC"), "2", "P1", "0-0");
        let long = SampleRow::new("b", IndexPair::dual("AAAAAAAAAA", "CC"), "1", "P1", "0-0");
        assert!(short.group_key() < long.group_key());
        assert_eq!(short.group_key().to_string(), "len_idx1:8 len_idx2:8 lane:2");
    }

    #[test]
    fn test_sanitize_project_name() {
        assert_eq!(sanitize_project_name("J.Doe_24_01"), "J__Doe_24_01");
        assert_eq!(sanitize_project_name("Smith, A"), "Smith A");
    }
}
