//! Index lookup tables and PhiX control sets.
//!
//! The catalog holds the static data the index resolver and manifest builder depend on:
//!
//! - **PhiX sets**: keyed by the LIMS dropdown value ("Element PhiX Set")
//! - **Chromium 10X**: well code -> index sequences
//! - **SMART-seq3**: well code -> (i7 list, i5 list)
//!
//! An embedded catalog with the Element PhiX sets is compiled into the binary.
//! The facility's full 10X and SMART-seq3 tables are supplied as a JSON file:
//!
//! ```rust,no_run
//! use lims_liquid::catalog::store::IndexCatalog;
//! use std::path::Path;
//!
//! let embedded = IndexCatalog::load_embedded().unwrap();
//! let full = IndexCatalog::load_from_file(Path::new("index_tables.json")).unwrap();
//! ```

pub mod store;
