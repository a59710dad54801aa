//! Index collision detection.
//!
//! Two rows collide when their indices are too similar for the sequencer to
//! demultiplex reliably:
//!
//! - **Direct**: Hamming distance over the concatenation Index1+Index2
//! - **Flip-aware**: minimum over all 16 forward/reverse-complement orientations
//!   of the four indices involved
//!
//! Distances at or below the threshold (default 3) are warnings; a distance of 0 is
//! fatal. Sequences of different length are not comparable and are never truncated.
//!
//! ## Example
//!
//! ```rust
//! use lims_liquid::core::index::IndexPair;
//! use lims_liquid::core::sample::SampleRow;
//! use lims_liquid::matching::collision::{check_pairs, CollisionConfig};
//!
//! let rows = vec![
//!     SampleRow::new("S1", IndexPair::dual("ACGTACGT", "TTGGCCAA"), "1", "P", "0-0"),
//!     SampleRow::new("S2", IndexPair::dual("ACGTACGA", "TTGGCCAA"), "1", "P", "0-0"),
//! ];
//! let warnings = check_pairs(&rows, &CollisionConfig::default()).unwrap();
//! assert_eq!(warnings[0].distance, 1);
//! ```

pub mod collision;
pub mod distance;
