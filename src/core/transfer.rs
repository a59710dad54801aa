use serde::{Deserialize, Serialize};

use crate::core::plate::Well;

/// What is being aspirated. Buffer sorts before sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Buffer,
    Sample,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buffer => write!(f, "buffer"),
            Self::Sample => write!(f, "sample"),
        }
    }
}

/// A single solved liquid transfer, volume in microliters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRow {
    /// Sample or pool the transfer belongs to
    pub name: String,
    pub kind: SourceKind,
    pub src_plate: String,
    pub src_well: Well,
    pub dst_plate: String,
    pub dst_well: Well,
    pub volume_ul: f64,
}

/// A transfer placed on the deck, volume in whole nanoliters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacedTransfer {
    pub kind: SourceKind,
    pub src_plate: String,
    pub src_pos: u8,
    pub src_well: Well,
    pub dst_plate: String,
    pub dst_pos: u8,
    pub dst_well: Well,
    pub volume_nl: u32,
}

impl PlacedTransfer {
    #[must_use]
    pub fn same_destination(&self, other: &Self) -> bool {
        self.dst_pos == other.dst_pos && self.dst_well == other.dst_well
    }
}

/// Tip change strategy, declared as a worklist variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipStrategy {
    Always,
    Never,
}

impl TipStrategy {
    /// Worklist variable holding this strategy
    #[must_use]
    pub fn variable(self) -> &'static str {
        match self {
            Self::Always => "[VAR1]",
            Self::Never => "[VAR2]",
        }
    }

    #[must_use]
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Always => "always",
            Self::Never => "never",
        }
    }
}

/// One serialized instruction of a liquid-handler worklist
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transfer_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorklistRow {
    /// Aspirate from source and dispense into destination
    Copy {
        src_pos: u8,
        src_well: Well,
        dst_pos: u8,
        dst_well: Well,
        volume_nl: u32,
        tips: TipStrategy,
    },
    /// Aspirate only; the following `Copy` dispenses both liquids together
    MultiAspirate {
        src_pos: u8,
        src_well: Well,
        volume_nl: u32,
    },
    ChangePipettes,
}

impl WorklistRow {
    #[must_use]
    pub fn transfer_type(&self) -> &'static str {
        match self {
            Self::Copy { .. } => "COPY",
            Self::MultiAspirate { .. } => "MULTI_ASPIRATE",
            Self::ChangePipettes => "CHANGE_PIPETTES",
        }
    }

    #[must_use]
    pub fn volume_nl(&self) -> u32 {
        match self {
            Self::Copy { volume_nl, .. } | Self::MultiAspirate { volume_nl, .. } => *volume_nl,
            Self::ChangePipettes => 0,
        }
    }

    #[must_use]
    pub fn tips(&self) -> Option<TipStrategy> {
        match self {
            Self::Copy { tips, .. } => Some(*tips),
            _ => None,
        }
    }
}

impl std::fmt::Display for WorklistRow {
    /// Mosquito advanced-worklist line, without trailing newline
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Copy {
                src_pos,
                src_well,
                dst_pos,
                dst_well,
                volume_nl,
                tips,
            } => write!(
                f,
                "COPY,{src_pos},{c},{c},{r},{dst_pos},{dc},{dr},{volume_nl},{t}",
                c = src_well.column,
                r = src_well.row,
                dc = dst_well.column,
                dr = dst_well.row,
                t = tips.variable(),
            ),
            Self::MultiAspirate {
                src_pos,
                src_well,
                volume_nl,
            } => write!(
                f,
                "MULTI_ASPIRATE,{src_pos},{},{},1,{volume_nl}",
                src_well.column, src_well.row
            ),
            Self::ChangePipettes => write!(f, "CHANGE_PIPETTES"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worklist_row_lines() {
        let copy = WorklistRow::Copy {
            src_pos: 3,
            src_well: Well::parse("B:2").unwrap(),
            dst_pos: 4,
            dst_well: Well::parse("C:10").unwrap(),
            volume_nl: 1500,
            tips: TipStrategy::Always,
        };
        assert_eq!(copy.to_string(), "COPY,3,2,2,2,4,10,3,1500,[VAR1]");

        let multi = WorklistRow::MultiAspirate {
            src_pos: 2,
            src_well: Well::parse("A:1").unwrap(),
            volume_nl: 800,
        };
        assert_eq!(multi.to_string(), "MULTI_ASPIRATE,2,1,1,1,800");
        assert_eq!(WorklistRow::ChangePipettes.to_string(), "CHANGE_PIPETTES");
    }

    #[test]
    fn test_buffer_sorts_before_sample() {
        assert!(SourceKind::Buffer < SourceKind::Sample);
    }
}
