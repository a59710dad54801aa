//! Mosquito/Zika worklist generation.
//!
//! Solved transfers (ul, plate names, LIMS wells) become deck-placed instructions
//! (nl, slots, numeric rows and columns):
//!
//! 1. [`buffer`]: buffer transfers are assigned wells on the buffer plate
//! 2. [`format`]: deck lookup, nl conversion, sorting, splitting at 5000 nl
//! 3. [`writer`]: multi-aspiration, tip strategy, serialization
//!
//! ```text
//! worklist,
//! [VAR1]TipChangeStrategy,always
//! COMMENT, This is the worklist <file>
//! COMMENT, <comment>
//! COMMENT, Set up layout:    <slot 1>     <slot 2>     ...
//! COPY,<src pos>,<src col>,<src col>,<src row>,<dst pos>,<dst col>,<dst row>,<nl>,<tips>
//! COMMENT, Done
//! ```

use thiserror::Error;

use crate::core::plate::{Deck, PlateError, BUFFER_PLATE};

pub mod buffer;
pub mod format;
pub mod writer;

/// Instrument ceiling for a single transfer before splitting, nl
pub const MAX_TRANSFER_NL: u32 = 180_000;

/// Largest volume pipetted in one go, nl
pub const SPLIT_NL: u32 = 5_000;

/// Pool destination plate slot
pub const POOL_DST_SLOT: u8 = 3;

/// Pool source plate slots, in order of first appearance
pub const POOL_SRC_SLOTS: [u8; 4] = [2, 4, 1, 5];

pub const NORM_BUFFER_SLOT: u8 = 2;
pub const NORM_SRC_SLOT: u8 = 3;
pub const NORM_DST_SLOT: u8 = 4;

#[derive(Error, Debug, PartialEq)]
pub enum WorklistError {
    #[error("Plate '{0}' is not on the deck")]
    UnknownPlate(String),

    #[error("Transfer of {volume_nl} nl from {plate} exceeds the {max} nl limit", max = MAX_TRANSFER_NL)]
    VolumeOverflow { plate: String, volume_nl: u64 },

    #[error("Total buffer volume exceeds plate capacity")]
    BufferCapacity,

    #[error("Only {max} input plate(s) allowed, found {found}")]
    SourcePlates { found: usize, max: usize },

    #[error("Only one output plate allowed, found {0}")]
    DestinationPlates(usize),

    #[error(transparent)]
    Plate(#[from] PlateError),
}

fn unique_in_order<'a>(names: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut unique: Vec<&str> = Vec::new();
    for name in names {
        if !unique.contains(&name) {
            unique.push(name);
        }
    }
    unique
}

/// Pooling deck: one destination plate in slot 3, up to four sources in slots 2, 4, 1, 5
///
/// # Errors
///
/// Returns an error for more than four source plates or not exactly one destination.
pub fn pool_deck<'a>(
    sources: impl IntoIterator<Item = &'a str>,
    destinations: impl IntoIterator<Item = &'a str>,
) -> Result<Deck, WorklistError> {
    let sources = unique_in_order(sources);
    let destinations = unique_in_order(destinations);
    if sources.len() > POOL_SRC_SLOTS.len() {
        return Err(WorklistError::SourcePlates {
            found: sources.len(),
            max: POOL_SRC_SLOTS.len(),
        });
    }
    let [destination] = destinations[..] else {
        return Err(WorklistError::DestinationPlates(destinations.len()));
    };

    let mut deck = Deck::new();
    deck.place(destination, POOL_DST_SLOT)?;
    for (plate, slot) in sources.into_iter().zip(POOL_SRC_SLOTS) {
        deck.place(plate, slot)?;
    }
    Ok(deck)
}

/// Normalization deck: buffer plate in slot 2, one source in 3, one destination in 4
///
/// # Errors
///
/// Returns an error unless there is exactly one source and one destination plate.
pub fn norm_deck<'a>(
    sources: impl IntoIterator<Item = &'a str>,
    destinations: impl IntoIterator<Item = &'a str>,
) -> Result<Deck, WorklistError> {
    let sources = unique_in_order(sources);
    let destinations = unique_in_order(destinations);
    let [source] = sources[..] else {
        return Err(WorklistError::SourcePlates {
            found: sources.len(),
            max: 1,
        });
    };
    let [destination] = destinations[..] else {
        return Err(WorklistError::DestinationPlates(destinations.len()));
    };

    let mut deck = Deck::new();
    deck.place(BUFFER_PLATE, NORM_BUFFER_SLOT)?;
    deck.place(source, NORM_SRC_SLOT)?;
    deck.place(destination, NORM_DST_SLOT)?;
    Ok(deck)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pool_deck_slots() {
        let deck = pool_deck(["P1", "P2", "P1", "P3"], ["Pools", "Pools"]).unwrap();
        assert_eq!(deck.position("Pools"), Some(3));
        assert_eq!(deck.position("P1"), Some(2));
        assert_eq!(deck.position("P2"), Some(4));
        assert_eq!(deck.position("P3"), Some(1));
        assert_eq!(
            deck.layout_comment(),
            "COMMENT, Set up layout:    P3     P1     Pools     P2     [Empty]"
        );
    }

    #[test]
    fn test_pool_deck_limits() {
        assert!(matches!(
            pool_deck(["A", "B", "C", "D", "E"], ["Pools"]),
            Err(WorklistError::SourcePlates { found: 5, max: 4 })
        ));
        assert!(matches!(
            pool_deck(["A"], ["X", "Y"]),
            Err(WorklistError::DestinationPlates(2))
        ));
    }

    #[test]
    fn test_norm_deck() {
        let deck = norm_deck(["Src"], ["Dst"]).unwrap();
        assert_eq!(deck.position(BUFFER_PLATE), Some(2));
        assert_eq!(deck.position("Src"), Some(3));
        assert_eq!(deck.position("Dst"), Some(4));
        assert!(norm_deck(["Src", "Src2"], ["Dst"]).is_err());
    }

    #[test]
    fn test_same_plate_as_source_and_destination_fails() {
        assert!(matches!(
            norm_deck(["Plate1"], ["Plate1"]),
            Err(WorklistError::Plate(PlateError::AlreadyPlaced { slot: 3, .. }))
        ));
        assert!(matches!(
            pool_deck(["Pools", "P1"], ["Pools"]),
            Err(WorklistError::Plate(PlateError::AlreadyPlaced { slot: 3, .. }))
        ));
    }
}
