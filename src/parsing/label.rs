//! Sequence/index resolver: decodes LIMS reagent labels into concrete index pairs.

use regex::Regex;
use thiserror::Error;
use tracing::debug;

use crate::catalog::store::IndexCatalog;
use crate::core::index::{IndexGrammar, IndexPair};
use crate::utils::dna::{revcomp, InvalidBase};

/// 10X single-index well codes, e.g. `SI-GA-A1`
pub const TENX_SINGLE_PATTERN: &str = r"SI-(?:GA|NA)-[A-H][1-9][0-2]?";

/// 10X dual-index well codes, e.g. `SI-TT-B12`
pub const TENX_DUAL_PATTERN: &str = r"SI-(?:TT|NT|NN|TN|TS)-[A-H][1-9][0-2]?";

/// SMART-seq3 well codes, e.g. `SMARTSEQ3-12H`
pub const SMARTSEQ_PATTERN: &str = r"SMARTSEQ[1-9]?-[1-9][0-9]?[A-P]";

/// Literal sequences, `Index1[-Index2]`
pub const PLAIN_PATTERN: &str = r"[ACGT]{4,}N*(?:-[ACGT]*)?";

#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Unsupported index kind in label '{0}': NoIndex samples are not allowed")]
    UnsupportedIndexKind(String),

    #[error("Could not parse index from '{0}'")]
    Unparseable(String),

    #[error("{grammar} code '{code}' not found in the index tables")]
    UnknownCode { grammar: IndexGrammar, code: String },

    #[error("{grammar} code '{code}' has a malformed table entry: {reason}")]
    MalformedEntry {
        grammar: IndexGrammar,
        code: String,
        reason: String,
    },

    #[error(transparent)]
    InvalidBase(#[from] InvalidBase),

    #[error("Invalid label pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Compiled label grammars, tried in priority order
#[derive(Debug, Clone)]
pub struct LabelPatterns {
    pub tenx_single: Regex,
    pub tenx_dual: Regex,
    pub smartseq: Regex,
    pub plain: Regex,
}

impl LabelPatterns {
    /// Compile the facility's standard label grammars
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Pattern` if a pattern fails to compile.
    pub fn standard() -> Result<Self, IndexError> {
        Self::new(
            TENX_SINGLE_PATTERN,
            TENX_DUAL_PATTERN,
            SMARTSEQ_PATTERN,
            PLAIN_PATTERN,
        )
    }

    /// Compile custom label grammars
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Pattern` if a pattern fails to compile.
    pub fn new(
        tenx_single: &str,
        tenx_dual: &str,
        smartseq: &str,
        plain: &str,
    ) -> Result<Self, IndexError> {
        Ok(Self {
            tenx_single: Regex::new(tenx_single)?,
            tenx_dual: Regex::new(tenx_dual)?,
            smartseq: Regex::new(smartseq)?,
            plain: Regex::new(plain)?,
        })
    }

    /// Find the grammar a label belongs to and the matched code or sequence.
    ///
    /// # Errors
    ///
    /// Returns `IndexError::UnsupportedIndexKind` for NoIndex/empty labels and
    /// `IndexError::Unparseable` when no grammar matches.
    pub fn classify<'l>(&self, label: &'l str) -> Result<(IndexGrammar, &'l str), IndexError> {
        if let Some(m) = self.tenx_single.find(label) {
            return Ok((IndexGrammar::TenXSingle, m.as_str()));
        }
        if let Some(m) = self.tenx_dual.find(label) {
            return Ok((IndexGrammar::TenXDual, m.as_str()));
        }
        if let Some(m) = self.smartseq.find(label) {
            return Ok((IndexGrammar::SmartSeq3, m.as_str()));
        }

        let bare = label.replace(',', "").to_uppercase();
        if bare.is_empty() || bare == "NOINDEX" {
            return Err(IndexError::UnsupportedIndexKind(label.to_string()));
        }

        self.plain
            .find(label)
            .map(|m| (IndexGrammar::Plain, m.as_str()))
            .ok_or_else(|| IndexError::Unparseable(label.to_string()))
    }
}

/// Resolves reagent labels against injected lookup tables
pub struct IndexResolver<'a> {
    catalog: &'a IndexCatalog,
    patterns: LabelPatterns,
}

impl<'a> IndexResolver<'a> {
    /// Create a resolver using the standard label grammars
    ///
    /// # Errors
    ///
    /// Returns `IndexError::Pattern` if the standard patterns fail to compile.
    pub fn new(catalog: &'a IndexCatalog) -> Result<Self, IndexError> {
        Ok(Self::with_patterns(catalog, LabelPatterns::standard()?))
    }

    #[must_use]
    pub fn with_patterns(catalog: &'a IndexCatalog, patterns: LabelPatterns) -> Self {
        Self { catalog, patterns }
    }

    /// Resolve a label into one or more index pairs.
    ///
    /// Single indices are returned with an empty `index2`.
    ///
    /// # Errors
    ///
    /// Returns an `IndexError` if the label is NoIndex, matches no grammar, refers to a
    /// code missing from the tables, or contains a non-ACGT base that must be
    /// reverse-complemented.
    pub fn resolve(&self, label: &str) -> Result<Vec<IndexPair>, IndexError> {
        let (grammar, matched) = self.patterns.classify(label)?;
        debug!("Label '{label}' resolved as {grammar} '{matched}'");

        match grammar {
            IndexGrammar::TenXSingle => {
                let seqs = self.tenx_entry(grammar, matched)?;
                Ok(seqs.iter().map(IndexPair::single).collect())
            }
            IndexGrammar::TenXDual => {
                let seqs = self.tenx_entry(grammar, matched)?;
                let [i7, i5, ..] = seqs else {
                    return Err(IndexError::MalformedEntry {
                        grammar,
                        code: matched.to_string(),
                        reason: format!("expected [i7, i5], found {} sequence(s)", seqs.len()),
                    });
                };
                Ok(vec![IndexPair::dual(i7.clone(), revcomp(i5)?)])
            }
            IndexGrammar::SmartSeq3 => {
                let entry =
                    self.catalog
                        .smartseq3(matched)
                        .ok_or_else(|| IndexError::UnknownCode {
                            grammar,
                            code: matched.to_string(),
                        })?;
                let mut pairs = Vec::with_capacity(entry.0.len() * entry.1.len());
                for i7 in &entry.0 {
                    for i5 in &entry.1 {
                        pairs.push(IndexPair::dual(i7.clone(), revcomp(i5)?));
                    }
                }
                Ok(pairs)
            }
            IndexGrammar::Plain => match matched.split_once('-') {
                Some((index1, index2)) => Ok(vec![IndexPair::dual(index1, revcomp(index2)?)]),
                None => Ok(vec![IndexPair::single(matched)]),
            },
        }
    }

    fn tenx_entry(&self, grammar: IndexGrammar, code: &str) -> Result<&'a [String], IndexError> {
        self.catalog
            .chromium_10x(code)
            .ok_or_else(|| IndexError::UnknownCode {
                grammar,
                code: code.to_string(),
            })
    }
}
