//! # lims-liquid
//!
//! A library for turning the data of one LIMS step into sequencer and liquid-handler inputs.
//!
//! Two paths share the crate:
//!
//! - **Run manifests**: reagent labels of every pooled sample are expanded into
//!   concrete index sequences, grouped by index lengths and lane, topped up with
//!   PhiX controls, checked for index collisions and written as AVITI run manifests.
//! - **Worklists**: transfer volumes for pooling or normalization are solved under
//!   pipetting constraints (dead volume, minimum pipetting volume, well capacity)
//!   and written as Mosquito/Zika advanced worklists.
//!
//! ## Example
//!
//! ```rust
//! use lims_liquid::{IndexCatalog, IndexResolver};
//!
//! let catalog = IndexCatalog::new().with_10x("SI-GA-A1", &["GGTTTACT", "CTAAACGG"]);
//! let resolver = IndexResolver::new(&catalog).unwrap();
//!
//! // A 10X single-index code expands into one pair per sequence
//! let pairs = resolver.resolve("SI-GA-A1").unwrap();
//! assert_eq!(pairs.len(), 2);
//!
//! // Plain dual indices are split and Index2 is reverse-complemented
//! let pairs = resolver.resolve("ACGTACGT-AACCGGTT").unwrap();
//! assert_eq!(pairs[0].index1, "ACGTACGT");
//! assert_eq!(pairs[0].index2, "AACCGGTT");
//! ```
//!
//! ## Modules
//!
//! - [`catalog`]: Index lookup tables and PhiX control sets
//! - [`core`]: Core data types for indices, samples, plates and transfers
//! - [`parsing`]: Reagent label grammars and local CSV inputs
//! - [`matching`]: Index distances and collision detection
//! - [`manifest`]: AVITI run manifest builder and archive
//! - [`volume`]: Pooling and normalization volume solvers
//! - [`worklist`]: Mosquito/Zika worklist formatter
//! - [`lims`]: Interface to the LIMS collaborator
//! - [`report`]: Run log and exit codes
//! - [`cli`]: Command-line interface implementation

pub mod catalog;
pub mod cli;
pub mod core;
pub mod lims;
pub mod manifest;
pub mod matching;
pub mod parsing;
pub mod report;
pub mod utils;
pub mod volume;
pub mod worklist;

// Re-export commonly used types for convenience
pub use catalog::store::IndexCatalog;
pub use core::index::{IndexPair, PhixSet};
pub use core::sample::SampleRow;
pub use manifest::{ManifestBuilder, ManifestSet};
pub use matching::collision::{CollisionConfig, CollisionWarning};
pub use parsing::label::IndexResolver;
pub use report::RunLog;
