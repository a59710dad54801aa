use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::core::sample::SampleRow;
use crate::matching::distance::{direct_distance, flip_distance, show_match, PairDistance};
use crate::utils::dna::InvalidBase;

/// Default distance at or below which a pair is reported
pub const DEFAULT_DISTANCE_THRESHOLD: usize = 3;

#[derive(Error, Debug)]
pub enum CollisionError {
    #[error("Identical indices detected between {sample_a} and {sample_b}\n{details}")]
    IdenticalIndices {
        sample_a: String,
        sample_b: String,
        details: String,
    },

    #[error(transparent)]
    InvalidBase(#[from] InvalidBase),
}

/// Configuration for index collision checks
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollisionConfig {
    /// Pairs with distance at or below this value are reported
    pub threshold: usize,
    /// Also compare every reverse-complement orientation of each index
    pub check_flips: bool,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DISTANCE_THRESHOLD,
            check_flips: false,
        }
    }
}

/// A near-collision between two rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollisionWarning {
    pub sample_a: String,
    pub sample_b: String,
    pub distance: usize,
    /// Human-readable, multi-line description
    pub message: String,
}

/// Outcome of comparing two rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairCheck {
    /// `None` if the indices are not comparable (different lengths)
    pub distance: Option<usize>,
    pub warning: Option<CollisionWarning>,
}

/// Compare two rows.
///
/// # Errors
///
/// Returns `CollisionError::IdenticalIndices` at distance 0, or `InvalidBase` if a
/// flip-aware check meets a non-ACGT index.
pub fn check_pair(
    a: &SampleRow,
    b: &SampleRow,
    config: &CollisionConfig,
) -> Result<PairCheck, CollisionError> {
    let result = if config.check_flips {
        flip_distance(&a.index, &b.index)?
    } else {
        direct_distance(&a.index, &b.index)
    };

    let Some(result) = result else {
        debug!(
            "Indices of {} ({}) and {} ({}) differ in length, not comparable",
            a.sample_name, a.index, b.sample_name, b.index
        );
        return Ok(PairCheck {
            distance: None,
            warning: None,
        });
    };

    if result.distance > config.threshold {
        return Ok(PairCheck {
            distance: Some(result.distance),
            warning: None,
        });
    }

    let message = describe(a, b, &result);
    warn!("{message}");

    if result.distance == 0 {
        return Err(CollisionError::IdenticalIndices {
            sample_a: a.sample_name.clone(),
            sample_b: b.sample_name.clone(),
            details: message,
        });
    }

    Ok(PairCheck {
        distance: Some(result.distance),
        warning: Some(CollisionWarning {
            sample_a: a.sample_name.clone(),
            sample_b: b.sample_name.clone(),
            distance: result.distance,
            message,
        }),
    })
}

fn describe(a: &SampleRow, b: &SampleRow, result: &PairDistance) -> String {
    let mut lines = vec![format!(
        "Hamming distance {} between {} and {}",
        result.distance, a.sample_name, b.sample_name
    )];

    if let Some(conformation) = result.conformation {
        lines.push(format!("Given: {} <-> {}", a.index, b.index));
        lines.push(format!(
            "Distance: {} when flipped to {conformation}",
            result.distance
        ));
    }

    if let Some(visual) = show_match(&result.compared.0, &result.compared.1) {
        lines.push(visual);
    }

    lines.join("\n")
}

/// Compare every pair of rows once, O(n²).
///
/// # Errors
///
/// Fails on the first identical pair.
pub fn check_pairs(
    rows: &[SampleRow],
    config: &CollisionConfig,
) -> Result<Vec<CollisionWarning>, CollisionError> {
    let mut warnings = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        for other in &rows[i + 1..] {
            if let Some(warning) = check_pair(row, other, config)?.warning {
                warnings.push(warning);
            }
        }
    }
    Ok(warnings)
}

/// Run [`check_pairs`] separately within each lane; rows in different lanes are never compared.
///
/// # Errors
///
/// Fails on the first identical pair within any lane.
pub fn check_lanes(
    rows: &[SampleRow],
    config: &CollisionConfig,
) -> Result<Vec<CollisionWarning>, CollisionError> {
    let mut lanes: BTreeMap<&str, Vec<SampleRow>> = BTreeMap::new();
    for row in rows {
        lanes.entry(row.lane.as_str()).or_default().push(row.clone());
    }

    let mut warnings = Vec::new();
    for (lane, lane_rows) in &lanes {
        debug!("Checking {} index pairs in lane {lane}", lane_rows.len());
        warnings.extend(check_pairs(lane_rows, config)?);
    }
    Ok(warnings)
}
