//! Parsers for index labels and local sample sheets.
//!
//! - **Reagent labels**: [`label::IndexResolver`] decodes a LIMS reagent label into
//!   concrete index pairs. Four grammars are recognised, in priority order:
//!
//! | Grammar | Example | Expands to |
//! |---------|---------|------------|
//! | 10X single | `SI-GA-A1` | every sequence in the table, as single indices |
//! | 10X dual | `SI-TT-B12` | one pair, i5 reverse-complemented |
//! | SMART-seq3 | `SMARTSEQ3-12H` | i7 × i5, i5 reverse-complemented |
//! | Plain | `ACGTACGT-TTGGCCAA` | one pair, Index2 reverse-complemented |
//!
//!   `NoIndex` and empty labels are rejected.
//!
//! - **Local CSV**: offline normalization sample sheets and ad hoc index lists
//!   ([`local`]).
//!
//! ## Example
//!
//! ```rust
//! use lims_liquid::catalog::store::IndexCatalog;
//! use lims_liquid::parsing::label::IndexResolver;
//!
//! let catalog = IndexCatalog::new().with_10x("SI-GA-A1", &["GGTTTACT", "CTAAACGG"]);
//! let resolver = IndexResolver::new(&catalog).unwrap();
//! let pairs = resolver.resolve("SI-GA-A1").unwrap();
//! assert_eq!(pairs.len(), 2);
//! ```

pub mod label;
pub mod local;
