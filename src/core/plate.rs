use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Row letters of a 96-well plate, top to bottom
pub const PLATE_ROWS: &str = "ABCDEFGH";

/// Number of columns on a 96-well plate
pub const PLATE_COLUMNS: u8 = 12;

/// Number of deck slots on the liquid handler
pub const DECK_SLOTS: u8 = 5;

/// Name of the reservoir plate used for buffer transfers
pub const BUFFER_PLATE: &str = "buffer_plate";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum PlateError {
    #[error("Invalid well '{0}': expected '<row A-H>:<column 1-12>'")]
    InvalidWell(String),

    #[error("Deck slot {slot} for plate '{plate}' is outside 1-{DECK_SLOTS}")]
    InvalidSlot { plate: String, slot: u8 },

    #[error("Deck slot {slot} is already occupied by '{plate}'")]
    SlotTaken { plate: String, slot: u8 },

    #[error("Plate '{plate}' is already placed in deck slot {slot}")]
    AlreadyPlaced { plate: String, slot: u8 },
}

/// A well on a 96-well plate, 1-based row and column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Well {
    pub row: u8,
    pub column: u8,
}

impl Well {
    /// Parse LIMS well notation such as `A:1` or `H:12`
    ///
    /// # Errors
    ///
    /// Returns `PlateError::InvalidWell` if the text is not a valid 96-well position.
    pub fn parse(text: &str) -> Result<Self, PlateError> {
        let invalid = || PlateError::InvalidWell(text.to_string());
        let (row, column) = text.trim().split_once(':').ok_or_else(invalid)?;

        let mut letters = row.chars();
        let (Some(letter), None) = (letters.next(), letters.next()) else {
            return Err(invalid());
        };
        let row = PLATE_ROWS
            .find(letter.to_ascii_uppercase())
            .ok_or_else(invalid)?;
        let column: u8 = column.parse().map_err(|_| invalid())?;
        if !(1..=PLATE_COLUMNS).contains(&column) {
            return Err(invalid());
        }

        let row = u8::try_from(row + 1).map_err(|_| invalid())?;

        Ok(Self { row, column })
    }

    #[must_use]
    pub fn row_letter(&self) -> char {
        PLATE_ROWS
            .chars()
            .nth(usize::from(self.row.saturating_sub(1)))
            .unwrap_or('?')
    }

    /// The well in the same row, first column
    #[must_use]
    pub fn first_column(&self) -> Self {
        Self {
            row: self.row,
            column: 1,
        }
    }

    /// All 96 wells in column-major order (A:1, B:1, ..., H:1, A:2, ...)
    pub fn column_major() -> impl Iterator<Item = Well> {
        #[allow(clippy::cast_possible_truncation)] // 8 rows
        let rows = PLATE_ROWS.len() as u8;
        (1..=PLATE_COLUMNS).flat_map(move |column| (1..=rows).map(move |row| Well { row, column }))
    }
}

impl std::fmt::Display for Well {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.row_letter(), self.column)
    }
}

impl std::str::FromStr for Well {
    type Err = PlateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Mapping from plate name to deck slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deck {
    slots: BTreeMap<String, u8>,
}

impl Deck {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a plate on a slot
    ///
    /// # Errors
    ///
    /// Returns an error if the slot is outside the deck or already occupied, or if
    /// the plate already sits in another slot.
    pub fn place(&mut self, plate: impl Into<String>, slot: u8) -> Result<(), PlateError> {
        let plate = plate.into();
        if !(1..=DECK_SLOTS).contains(&slot) {
            return Err(PlateError::InvalidSlot { plate, slot });
        }
        if let Some(current) = self.position(&plate).filter(|s| *s != slot) {
            return Err(PlateError::AlreadyPlaced { plate, slot: current });
        }
        if let Some(occupant) = self.plate_at(slot) {
            if occupant != plate {
                return Err(PlateError::SlotTaken {
                    plate: occupant.to_string(),
                    slot,
                });
            }
        }
        self.slots.insert(plate, slot);
        Ok(())
    }

    #[must_use]
    pub fn position(&self, plate: &str) -> Option<u8> {
        self.slots.get(plate).copied()
    }

    #[must_use]
    pub fn plate_at(&self, slot: u8) -> Option<&str> {
        self.slots
            .iter()
            .find(|(_, s)| **s == slot)
            .map(|(plate, _)| plate.as_str())
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Worklist comment describing which plate goes in which slot
    #[must_use]
    pub fn layout_comment(&self) -> String {
        let layout: Vec<String> = (1..=DECK_SLOTS)
            .map(|slot| {
                self.plate_at(slot)
                    .map_or_else(|| "[Empty]".to_string(), |p| p.replace(',', ""))
            })
            .collect();
        format!("COMMENT, Set up layout:    {}", layout.join("     "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well() {
        assert_eq!(Well::parse("A:1").unwrap(), Well { row: 1, column: 1 });
        assert_eq!(Well::parse("H:12").unwrap(), Well { row: 8, column: 12 });
        assert_eq!(Well::parse("c:5").unwrap().to_string(), "C:5");
        assert!(Well::parse("I:1").is_err());
        assert!(Well::parse("A:13").is_err());
        assert!(Well::parse("A1").is_err());
        assert!(Well::parse("AB:1").is_err());
    }

    #[test]
    fn test_first_column() {
        let well = Well::parse("D:11").unwrap();
        assert_eq!(well.first_column().to_string(), "D:1");
    }

    #[test]
    fn test_column_major_order() {
        let wells: Vec<String> = Well::column_major().map(|w| w.to_string()).collect();
        assert_eq!(wells.len(), 96);
        assert_eq!(wells[0], "A:1");
        assert_eq!(wells[7], "H:1");
        assert_eq!(wells[8], "A:2");
        assert_eq!(wells[95], "H:12");
    }

    #[test]
    fn test_deck_layout_comment() {
        let mut deck = Deck::new();
        deck.place(BUFFER_PLATE, 2).unwrap();
        deck.place("Src, plate", 3).unwrap();
        deck.place("Dst", 4).unwrap();
        assert_eq!(deck.position("Dst"), Some(4));
        assert_eq!(deck.position("Missing"), None);
        assert_eq!(
            deck.layout_comment(),
            "COMMENT, Set up layout:    [Empty]     buffer_plate     Src plate     Dst     [Empty]"
        );
    }

    #[test]
    fn test_deck_rejects_bad_slots() {
        let mut deck = Deck::new();
        assert!(deck.place("P", 6).is_err());
        deck.place("P", 1).unwrap();
        assert!(matches!(
            deck.place("Q", 1),
            Err(PlateError::SlotTaken { .. })
        ));
    }

    #[test]
    fn test_deck_never_moves_a_plate() {
        let mut deck = Deck::new();
        deck.place("P", 3).unwrap();
        deck.place("P", 3).unwrap();
        assert!(matches!(
            deck.place("P", 4),
            Err(PlateError::AlreadyPlaced { slot: 3, .. })
        ));
        assert_eq!(deck.position("P"), Some(3));
        assert_eq!(deck.plate_at(4), None);
    }
}
