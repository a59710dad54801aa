//! Nucleotide string helpers.

use thiserror::Error;

/// A character outside {A, C, G, T} where only unambiguous bases are allowed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid base '{base}' in sequence '{sequence}': only A, C, G, T are allowed")]
pub struct InvalidBase {
    pub sequence: String,
    pub base: char,
}

/// Reverse-complement a DNA string over {A, C, G, T}.
///
/// # Examples
///
/// ```
/// use lims_liquid::utils::dna::revcomp;
///
/// assert_eq!(revcomp("AACG").unwrap(), "CGTT");
/// assert!(revcomp("ACGN").is_err());
/// ```
///
/// # Errors
///
/// Returns `InvalidBase` for any character outside the alphabet, including ambiguity codes.
pub fn revcomp(seq: &str) -> Result<String, InvalidBase> {
    seq.chars()
        .rev()
        .map(|base| match base {
            'A' => Ok('T'),
            'C' => Ok('G'),
            'G' => Ok('C'),
            'T' => Ok('A'),
            other => Err(InvalidBase {
                sequence: seq.to_string(),
                base: other,
            }),
        })
        .collect()
}

/// True if the sequence is non-empty and contains only A, C, G, T
#[must_use]
pub fn is_dna(seq: &str) -> bool {
    !seq.is_empty() && seq.bytes().all(|b| matches!(b, b'A' | b'C' | b'G' | b'T'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revcomp() {
        assert_eq!(revcomp("ATGTCGCTAG").unwrap(), "CTAGCGACAT");
        assert_eq!(revcomp("").unwrap(), "");
    }

    #[test]
    fn test_revcomp_is_involution() {
        for seq in ["A", "ACGT", "GGGTTTAAACCC", "CTAGCTCGTA", "TTTTTTTTTTTTTTTTTTTTC"] {
            let rc = revcomp(seq).unwrap();
            assert_eq!(rc.len(), seq.len());
            assert_eq!(revcomp(&rc).unwrap(), seq);
        }
    }

    #[test]
    fn test_revcomp_rejects_ambiguity_codes() {
        let err = revcomp("ACNGT").unwrap_err();
        assert_eq!(err.base, 'N');
        assert!(revcomp("acgt").is_err());
    }

    #[test]
    fn test_is_dna() {
        assert!(is_dna("ACGT"));
        assert!(!is_dna(""));
        assert!(!is_dna("ACGU"));
    }
}
