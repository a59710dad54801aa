//! Deck placement, nanoliter conversion, ordering and splitting of transfers.

use tracing::debug;

use crate::core::plate::Deck;
use crate::core::transfer::{PlacedTransfer, SourceKind, TransferRow};
use crate::worklist::{WorklistError, MAX_TRANSFER_NL, SPLIT_NL};

/// Row ordering of a worklist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortMode {
    /// Buffer before sample, then destination column and row
    Normalization,
    /// Destination column and row, larger volumes first
    Pooling,
}

/// Microliters to whole nanoliters, rounding to nearest
///
/// # Errors
///
/// Returns `WorklistError::VolumeOverflow` at or above the instrument ceiling.
pub fn to_nanoliters(row: &TransferRow) -> Result<u32, WorklistError> {
    let nl = (row.volume_ul * 1000.0).round();
    if nl >= f64::from(MAX_TRANSFER_NL) {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let volume_nl = nl as u64;
        return Err(WorklistError::VolumeOverflow {
            plate: row.src_plate.clone(),
            volume_nl,
        });
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // checked above, negatives are filtered
    let volume_nl = nl.max(0.0) as u32;
    Ok(volume_nl)
}

/// Split into full `SPLIT_NL` chunks plus one remainder, either leading or trailing
#[must_use]
pub fn split_volume(volume_nl: u32, remainder_first: bool) -> Vec<u32> {
    let full = (volume_nl / SPLIT_NL) as usize;
    let remainder = volume_nl % SPLIT_NL;
    let chunks = std::iter::repeat(SPLIT_NL).take(full);

    match (remainder, remainder_first) {
        (0, _) => chunks.collect(),
        (r, true) => std::iter::once(r).chain(chunks).collect(),
        (r, false) => chunks.chain(std::iter::once(r)).collect(),
    }
}

fn place(row: &TransferRow, deck: &Deck, volume_nl: u32) -> Result<PlacedTransfer, WorklistError> {
    let position = |plate: &str| {
        deck.position(plate)
            .ok_or_else(|| WorklistError::UnknownPlate(plate.to_string()))
    };
    Ok(PlacedTransfer {
        kind: row.kind,
        src_plate: row.src_plate.clone(),
        src_pos: position(&row.src_plate)?,
        src_well: row.src_well,
        dst_plate: row.dst_plate.clone(),
        dst_pos: position(&row.dst_plate)?,
        dst_well: row.dst_well,
        volume_nl,
    })
}

/// Place solved transfers on the deck, order them and split large volumes.
///
/// Transfers that round to zero are dropped. In normalization worklists a sample's
/// remainder chunk leads, so it can share a tip with the preceding buffer draw.
///
/// # Errors
///
/// Returns an error if a plate is not on the deck or a transfer is too large.
pub fn format_transfers(
    rows: &[TransferRow],
    deck: &Deck,
    mode: SortMode,
) -> Result<Vec<PlacedTransfer>, WorklistError> {
    let mut placed = Vec::with_capacity(rows.len());
    for row in rows.iter().filter(|r| r.volume_ul > 0.0) {
        let volume_nl = to_nanoliters(row)?;
        if volume_nl == 0 {
            debug!("Dropping {} transfer for {} below 1 nl", row.kind, row.name);
            continue;
        }
        placed.push(place(row, deck, volume_nl)?);
    }

    match mode {
        SortMode::Normalization => {
            placed.sort_by_key(|t| (t.kind, t.dst_well.column, t.dst_well.row));
        }
        SortMode::Pooling => {
            placed.sort_by_key(|t| (t.dst_well.column, t.dst_well.row, std::cmp::Reverse(t.volume_nl)));
        }
    }

    Ok(placed
        .into_iter()
        .flat_map(|t| {
            let remainder_first = mode == SortMode::Normalization && t.kind == SourceKind::Sample;
            split_volume(t.volume_nl, remainder_first)
                .into_iter()
                .map(move |volume_nl| PlacedTransfer {
                    volume_nl,
                    ..t.clone()
                })
        })
        .collect())
}
