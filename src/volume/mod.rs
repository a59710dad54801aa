//! Volume solving for pooling and normalization.
//!
//! Both modes work on the *accessible* volume of each source well (raw volume minus
//! dead volume) and the minimum volume the liquid handler can pipette:
//!
//! - **Pooling** ([`pool`]): equal molar or mass representation of every sample in a
//!   pool. Infeasible targets are nudged to the nearest feasible concentration and
//!   volume; samples that cannot keep up are knowingly under-represented.
//! - **Normalization** ([`norm`]): each sample diluted to a target amount in a target
//!   volume, with optional volume expansion for over-concentrated samples.
//!
//! Hard physical violations are errors for the whole batch. Adjustments are
//! recorded as warnings in the [`RunLog`](crate::report::RunLog).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lims::records::UdfValue;
use crate::lims::Field;
use crate::worklist::buffer::BufferStrategy;

pub mod norm;
pub mod pool;

/// Concentrations below this are treated as this value
pub const MIN_CONCENTRATION: f64 = 0.01;

#[derive(Error, Debug, PartialEq)]
pub enum VolumeError {
    #[error("The minimum required source volume is {dead_vol} ul, {sample} has {vol} ul")]
    InsufficientVolume {
        sample: String,
        vol: f64,
        dead_vol: f64,
    },

    #[error("The target volume of {entity} must be >0 - {max} ul, got {vol} ul")]
    TargetVolume { entity: String, vol: f64, max: f64 },

    #[error("The target amount of {0} must be greater than zero")]
    TargetAmount(String),

    #[error("All sample concentrations are expected in 'ng/ul', {sample} is in '{units}'")]
    ConcUnits { sample: String, units: String },

    #[error("Sample {sample} is too concentrated ({conc} ng/ul) and must be diluted manually")]
    DilutionRequired { sample: String, conc: f64 },

    #[error("Sample {sample} delivers {fraction:.2} of its target amount, below the minimum {min:.2}")]
    UnderDelivered {
        sample: String,
        fraction: f64,
        min: f64,
    },

    #[error("{entity} is missing required field '{field}'")]
    MissingField { entity: String, field: Field },

    #[error("Pool {0} has no input samples")]
    EmptyPool(String),
}

/// A computed value to write back to a LIMS artifact
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UdfWrite {
    pub artifact_id: String,
    pub field: Field,
    pub value: UdfValue,
}

impl UdfWrite {
    #[must_use]
    pub fn rounded(artifact_id: &str, field: Field, value: f64) -> Self {
        Self {
            artifact_id: artifact_id.to_string(),
            field,
            value: UdfValue::Number(round_to(value, 2)),
        }
    }
}

/// Pooling constraints, volumes in ul
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Lowest validated pipetting volume
    pub min_pipette_vol: f64,
    /// Inaccessible volume in each source well
    pub dead_vol: f64,
    /// Largest allowed pool volume
    pub well_max_vol: f64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_pipette_vol: 0.5,
            dead_vol: 5.0,
            well_max_vol: 180.0,
        }
    }
}

/// Normalization constraints and worklist options, volumes in ul
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormConfig {
    pub min_pipette_vol: f64,
    pub dead_vol: f64,
    /// Largest allowed destination well volume
    pub well_max_vol: f64,
    /// Increase the total volume of over-concentrated samples to reach the target concentration
    pub volume_expansion: bool,
    /// Aspirate buffer and sample into the same tip when possible
    pub multi_aspirate: bool,
    /// Keep tips between consecutive buffer transfers to the same well
    pub keep_buffer_tips: bool,
    pub buffer_strategy: BufferStrategy,
    /// Fail when a sample delivers less than this fraction of its target amount
    pub min_delivered_fraction: Option<f64>,
}

impl Default for NormConfig {
    fn default() -> Self {
        Self {
            min_pipette_vol: 0.1,
            dead_vol: 5.0,
            well_max_vol: 15.0,
            volume_expansion: true,
            multi_aspirate: true,
            keep_buffer_tips: false,
            buffer_strategy: BufferStrategy::FirstColumn,
            min_delivered_fraction: None,
        }
    }
}

/// Round half away from zero to `decimals` places
#[must_use]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Source volume minus dead volume
///
/// # Errors
///
/// Returns `VolumeError::InsufficientVolume` unless the raw volume exceeds the dead volume.
pub fn accessible_volume(sample: &str, vol: f64, dead_vol: f64) -> Result<f64, VolumeError> {
    if vol > dead_vol {
        Ok(vol - dead_vol)
    } else {
        Err(VolumeError::InsufficientVolume {
            sample: sample.to_string(),
            vol,
            dead_vol,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_to() {
        assert!((round_to(1.005_01, 2) - 1.01).abs() < 1e-12);
        assert!((round_to(2.344, 2) - 2.34).abs() < 1e-12);
        assert!((round_to(12.25, 1) - 12.3).abs() < 1e-12);
    }

    #[test]
    fn test_accessible_volume() {
        assert!((accessible_volume("S1", 30.0, 5.0).unwrap() - 25.0).abs() < 1e-12);
        assert!(matches!(
            accessible_volume("S1", 5.0, 5.0),
            Err(VolumeError::InsufficientVolume { .. })
        ));
    }

    #[test]
    fn test_config_defaults_from_partial_json() {
        let config: NormConfig = serde_json::from_str(r#"{"well_max_vol": 20.0}"#).unwrap();
        assert!((config.well_max_vol - 20.0).abs() < 1e-12);
        assert!((config.min_pipette_vol - 0.1).abs() < 1e-12);
        assert!(config.volume_expansion);
        assert_eq!(config.buffer_strategy, BufferStrategy::FirstColumn);
    }
}
