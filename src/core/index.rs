use serde::{Deserialize, Serialize};

/// A resolved index assignment for one sample row.
///
/// Single-indexed samples carry an empty `index2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexPair {
    /// i7 index sequence
    pub index1: String,

    /// i5 index sequence, already reverse-complemented where the label grammar requires it
    #[serde(default)]
    pub index2: String,
}

impl IndexPair {
    pub fn single(index1: impl Into<String>) -> Self {
        Self {
            index1: index1.into(),
            index2: String::new(),
        }
    }

    pub fn dual(index1: impl Into<String>, index2: impl Into<String>) -> Self {
        Self {
            index1: index1.into(),
            index2: index2.into(),
        }
    }

    #[must_use]
    pub fn is_single(&self) -> bool {
        self.index2.is_empty()
    }

    /// Lengths of (Index1, Index2)
    #[must_use]
    pub fn lengths(&self) -> (usize, usize) {
        (self.index1.len(), self.index2.len())
    }

    /// Index1 followed directly by Index2
    #[must_use]
    pub fn concatenated(&self) -> String {
        format!("{}{}", self.index1, self.index2)
    }
}

impl std::fmt::Display for IndexPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.index1, self.index2)
    }
}

/// The label grammars recognised on LIMS reagent labels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexGrammar {
    /// 10X single-index well code (SI-GA-*, SI-NA-*), expands to four i7 sequences
    TenXSingle,
    /// 10X dual-index well code (SI-TT-*, SI-NT-*, ...), expands to one pair
    TenXDual,
    /// SMART-seq3 well code, expands to the i7 x i5 cartesian product
    SmartSeq3,
    /// Literal sequence(s), `ACGT...[-ACGT...]`
    Plain,
}

impl std::fmt::Display for IndexGrammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TenXSingle => write!(f, "10X single"),
            Self::TenXDual => write!(f, "10X dual"),
            Self::SmartSeq3 => write!(f, "SMART-seq3"),
            Self::Plain => write!(f, "plain"),
        }
    }
}

/// A named PhiX control kit: four index pairs plus the sample name used in manifests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhixSet {
    /// Kit name as offered by the LIMS dropdown
    pub name: String,

    /// Sample name written into manifests
    pub nickname: String,

    /// Exactly four (Index1, Index2) pairs
    pub indices: Vec<(String, String)>,
}

impl PhixSet {
    pub fn pairs(&self) -> impl Iterator<Item = IndexPair> + '_ {
        self.indices
            .iter()
            .map(|(i1, i2)| IndexPair::dual(i1.clone(), i2.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_and_dual() {
        let single = IndexPair::single("ACGTACGT");
        assert!(single.is_single());
        assert_eq!(single.lengths(), (8, 0));
        assert_eq!(single.concatenated(), "ACGTACGT");

        let dual = IndexPair::dual("AAAA", "CCCCCC");
        assert!(!dual.is_single());
        assert_eq!(dual.lengths(), (4, 6));
        assert_eq!(dual.concatenated(), "AAAACCCCCC");
        assert_eq!(dual.to_string(), "AAAA-CCCCCC");
    }
}
