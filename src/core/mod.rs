//! Core data types shared by the manifest and worklist paths.
//!
//! - [`IndexPair`], [`IndexGrammar`], [`PhixSet`]: index assignments and PhiX control kits
//! - [`SampleRow`], [`GroupKey`]: manifest rows and their grouping key
//! - [`Well`], [`Deck`]: plate coordinates and deck slot assignment
//! - [`TransferRow`], [`PlacedTransfer`], [`WorklistRow`]: the worklist pipeline stages
//!
//! ## Volumes
//!
//! Solvers work in microliters (`f64`). Worklists work in whole nanoliters (`u32`);
//! the conversion happens once, in [`crate::worklist::format`].
//!
//! [`IndexPair`]: index::IndexPair
//! [`IndexGrammar`]: index::IndexGrammar
//! [`PhixSet`]: index::PhixSet
//! [`SampleRow`]: sample::SampleRow
//! [`GroupKey`]: sample::GroupKey
//! [`Well`]: plate::Well
//! [`Deck`]: plate::Deck
//! [`TransferRow`]: transfer::TransferRow
//! [`PlacedTransfer`]: transfer::PlacedTransfer
//! [`WorklistRow`]: transfer::WorklistRow

pub mod index;
pub mod plate;
pub mod sample;
pub mod transfer;
