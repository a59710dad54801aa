//! Buffer transfer resolution: which buffer plate well each buffer draw comes from.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::plate::{Well, BUFFER_PLATE};
use crate::core::transfer::{SourceKind, TransferRow};
use crate::worklist::WorklistError;

/// Volume lost per sub-transfer to over-aspiration, ul
pub const OVERASPIRATION_LOSS_UL: f64 = 0.2;

/// How buffer wells are assigned
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BufferStrategy {
    /// Column 1 of the buffer plate, in the row of the sample's source well
    #[default]
    FirstColumn,
    /// Fill buffer wells column-major, moving on when a well is used up
    Adaptive,
}

/// Buffer plate constraints for the adaptive strategy, volumes in ul
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    pub dead_vol: f64,
    pub well_max_vol: f64,
    /// Largest single pipetting step
    pub max_transfer_vol: f64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            dead_vol: 5.0,
            well_max_vol: 180.0,
            max_transfer_vol: 5.0,
        }
    }
}

/// Buffer draws with source wells assigned, plus operator instructions
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTransfers {
    pub rows: Vec<TransferRow>,
    pub comments: Vec<String>,
    /// Buffer draws that alone exceed the usable volume of a buffer well
    pub warnings: Vec<String>,
}

/// Drop empty transfers, order them (buffer first, then by destination column and
/// row) and move buffer draws onto the buffer plate.
///
/// # Errors
///
/// Returns `WorklistError::BufferCapacity` if the adaptive strategy runs out of wells.
pub fn resolve_buffer_transfers(
    rows: Vec<TransferRow>,
    strategy: BufferStrategy,
    config: &BufferConfig,
) -> Result<ResolvedTransfers, WorklistError> {
    let mut rows: Vec<TransferRow> = rows.into_iter().filter(|r| r.volume_ul > 0.0).collect();
    rows.sort_by_key(|r| (r.kind, r.dst_well.column, r.dst_well.row));

    for row in rows.iter_mut().filter(|r| r.kind == SourceKind::Buffer) {
        row.src_plate = BUFFER_PLATE.to_string();
    }

    let mut comments = Vec::new();
    let mut warnings = Vec::new();
    match strategy {
        BufferStrategy::FirstColumn => {
            for row in rows.iter_mut().filter(|r| r.kind == SourceKind::Buffer) {
                row.src_well = row.src_well.first_column();
            }
        }
        BufferStrategy::Adaptive => {
            let last = fill_adaptive(&mut rows, config, &mut warnings)?;
            if let Some(last) = last {
                comments.push(format!(
                    "Fill up the buffer plate column-wise up to well {last} with {} uL buffer.",
                    config.well_max_vol
                ));
            }
        }
    }

    Ok(ResolvedTransfers {
        rows,
        comments,
        warnings,
    })
}

fn fill_adaptive(
    rows: &mut [TransferRow],
    config: &BufferConfig,
    warnings: &mut Vec<String>,
) -> Result<Option<Well>, WorklistError> {
    let mut wells = Well::column_major();
    let mut current: Option<Well> = None;
    let mut current_vol = config.dead_vol;
    let usable = config.well_max_vol - config.dead_vol;

    for row in rows.iter_mut().filter(|r| r.kind == SourceKind::Buffer) {
        let sub_transfers = (row.volume_ul / config.max_transfer_vol).floor() + 1.0;
        let needed = row.volume_ul + OVERASPIRATION_LOSS_UL * sub_transfers;

        let well = match current {
            Some(well) if current_vol + needed <= config.well_max_vol => well,
            _ => {
                let next = wells.next().ok_or(WorklistError::BufferCapacity)?;
                current_vol = config.dead_vol;
                current = Some(next);
                next
            }
        };

        if needed > usable {
            let message = format!(
                "Buffer draw of {needed:.2} uL for {} exceeds the {usable:.2} uL usable in buffer well {well}, \
                 the well will be over-filled",
                row.name
            );
            warnings.push(message);
        }

        current_vol += needed;
        row.src_well = well;
    }

    debug!("Buffer plate filled up to {current:?}");
    Ok(current)
}
