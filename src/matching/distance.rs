use serde::Serialize;

use crate::core::index::IndexPair;
use crate::utils::dna::{revcomp, InvalidBase};

/// Per-position mismatch count, `None` if the sequences differ in length
#[must_use]
pub fn hamming(a: &str, b: &str) -> Option<usize> {
    if a.len() != b.len() {
        return None;
    }
    Some(a.bytes().zip(b.bytes()).filter(|(x, y)| x != y).count())
}

/// Orientation of one index in a flip comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Orientation {
    Forward,
    ReverseComplement,
}

impl Orientation {
    const BOTH: [Self; 2] = [Self::Forward, Self::ReverseComplement];

    fn suffix(self) -> &'static str {
        match self {
            Self::Forward => "",
            Self::ReverseComplement => "_rc",
        }
    }
}

/// Orientations of (A.Index1, A.Index2, B.Index1, B.Index2) behind a flip distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FlipConformation(pub [Orientation; 4]);

impl std::fmt::Display for FlipConformation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a1, a2, b1, b2] = self.0;
        write!(
            f,
            "Index1{}-Index2{} Index1{}-Index2{}",
            a1.suffix(),
            a2.suffix(),
            b1.suffix(),
            b2.suffix()
        )
    }
}

/// Result of comparing two index pairs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PairDistance {
    pub distance: usize,

    /// The two compared sequences as `Index1-Index2`, after any flips
    pub compared: (String, String),

    /// Set only for flip-aware comparisons
    pub conformation: Option<FlipConformation>,
}

/// Hamming distance over the concatenation Index1+Index2.
///
/// Returns `None` when the concatenations differ in length.
#[must_use]
pub fn direct_distance(a: &IndexPair, b: &IndexPair) -> Option<PairDistance> {
    let distance = hamming(&a.concatenated(), &b.concatenated())?;
    Some(PairDistance {
        distance,
        compared: (a.to_string(), b.to_string()),
        conformation: None,
    })
}

/// Minimum distance over all 16 combinations of forward/reverse-complement orientation
/// of each of the four indices. Ties resolve to the first minimum in the fixed order
/// (A.Index1, A.Index2, B.Index1, B.Index2), forward before reverse-complement.
///
/// Combinations whose component lengths differ are not comparable and are skipped;
/// `Ok(None)` means no combination was comparable.
///
/// # Errors
///
/// Returns `InvalidBase` if an index cannot be reverse-complemented.
pub fn flip_distance(a: &IndexPair, b: &IndexPair) -> Result<Option<PairDistance>, InvalidBase> {
    let oriented = |seq: &str| -> Result<[String; 2], InvalidBase> {
        Ok([seq.to_string(), revcomp(seq)?])
    };
    let a1 = oriented(&a.index1)?;
    let a2 = oriented(&a.index2)?;
    let b1 = oriented(&b.index1)?;
    let b2 = oriented(&b.index2)?;

    let mut best: Option<PairDistance> = None;
    for (i, o_a1) in Orientation::BOTH.iter().enumerate() {
        for (j, o_a2) in Orientation::BOTH.iter().enumerate() {
            for (k, o_b1) in Orientation::BOTH.iter().enumerate() {
                for (l, o_b2) in Orientation::BOTH.iter().enumerate() {
                    let (Some(d1), Some(d2)) = (hamming(&a1[i], &b1[k]), hamming(&a2[j], &b2[l]))
                    else {
                        continue;
                    };
                    let distance = d1 + d2;
                    if best.as_ref().map_or(true, |b| distance < b.distance) {
                        best = Some(PairDistance {
                            distance,
                            compared: (
                                format!("{}-{}", a1[i], a2[j]),
                                format!("{}-{}", b1[k], b2[l]),
                            ),
                            conformation: Some(FlipConformation([*o_a1, *o_a2, *o_b1, *o_b2])),
                        });
                    }
                }
            }
        }
    }

    Ok(best)
}

/// Visualize base-by-base agreement of two equal-length sequences:
/// `|` for a match, `X` for a mismatch. Dashes are compared like bases.
///
/// Returns `None` if the lengths differ.
#[must_use]
pub fn show_match(a: &str, b: &str) -> Option<String> {
    if a.len() != b.len() {
        return None;
    }
    let marks: String = a
        .bytes()
        .zip(b.bytes())
        .map(|(x, y)| if x == y { '|' } else { 'X' })
        .collect();
    Some(format!("{a}\n{marks}\n{b}"))
}
