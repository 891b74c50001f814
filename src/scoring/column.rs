//! Column scoring strategies.
//!
//! Every extension routine is generic over [`ColumnScore`], so the choice between
//! plain, PSSM and two-quality scoring is made once per phase and each routine is
//! monomorphized per variant. Coordinates are buffer offsets: `x` into the
//! reference buffer, `y` into the query buffer.

use super::matrix::ScoreMatrix;
use super::quality::{Pssm, TwoQualityScoreMatrix};

pub trait ColumnScore {
    /// Score of aligning reference offset `x` with query offset `y`.
    fn score(&self, x: usize, y: usize) -> i32;

    /// True when both offsets hold the same letter, ignoring case.
    fn is_identical(&self, x: usize, y: usize) -> bool;
}

/// Substitution matrix lookup on two coded sequences.
#[derive(Clone, Copy)]
pub struct PlainScorer<'a> {
    pub matrix: &'a ScoreMatrix,
    pub reference: &'a [u8],
    pub query: &'a [u8],
    /// Uppercase mapping, used for identity checks.
    pub unmasked: &'a [u8],
}

impl ColumnScore for PlainScorer<'_> {
    #[inline(always)]
    fn score(&self, x: usize, y: usize) -> i32 {
        self.matrix.score(self.reference[x], self.query[y])
    }

    #[inline(always)]
    fn is_identical(&self, x: usize, y: usize) -> bool {
        identical(self.unmasked, self.reference[x], self.query[y])
    }
}

/// Query represented by per-position score rows.
#[derive(Clone, Copy)]
pub struct PssmScorer<'a> {
    pub pssm: &'a Pssm,
    pub reference: &'a [u8],
    pub query: &'a [u8],
    pub unmasked: &'a [u8],
}

impl ColumnScore for PssmScorer<'_> {
    #[inline(always)]
    fn score(&self, x: usize, y: usize) -> i32 {
        self.pssm.score(self.reference[x], y)
    }

    #[inline(always)]
    fn is_identical(&self, x: usize, y: usize) -> bool {
        identical(self.unmasked, self.reference[x], self.query[y])
    }
}

/// Both sequences carry phred qualities.
#[derive(Clone, Copy)]
pub struct TwoQualityScorer<'a> {
    pub matrix: &'a TwoQualityScoreMatrix,
    pub reference: &'a [u8],
    pub reference_qualities: &'a [u8],
    pub query: &'a [u8],
    pub query_qualities: &'a [u8],
    pub unmasked: &'a [u8],
}

impl ColumnScore for TwoQualityScorer<'_> {
    #[inline(always)]
    fn score(&self, x: usize, y: usize) -> i32 {
        self.matrix.score(
            self.reference[x],
            self.reference_qualities[x],
            self.query[y],
            self.query_qualities[y],
        )
    }

    #[inline(always)]
    fn is_identical(&self, x: usize, y: usize) -> bool {
        identical(self.unmasked, self.reference[x], self.query[y])
    }
}

#[inline(always)]
fn identical(unmasked: &[u8], a: u8, b: u8) -> bool {
    let ua = unmasked[a as usize];
    ua != NOT_A_LETTER && ua == unmasked[b as usize]
}

const NOT_A_LETTER: u8 = u8::MAX;

/// Uppercase mapping for every code of an alphabet, for [`ColumnScore::is_identical`].
/// Unknowns and the delimiter map to a value that never matches.
pub fn unmasking_table(alphabet: &crate::alphabet::Alphabet) -> Vec<u8> {
    (0..alphabet.code_count() as u8)
        .map(|c| {
            if alphabet.is_letter(c) {
                alphabet.to_uppercase(c)
            } else {
                NOT_A_LETTER
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;

    #[test]
    fn test_plain_scorer() {
        let dna = Alphabet::dna();
        let m = ScoreMatrix::from_match_mismatch(&dna, 1, 1);
        let unmasked = unmasking_table(&dna);
        let r = dna.encode(b"ACgN");
        let q = dna.encode(b"AGGN");
        let s = PlainScorer {
            matrix: &m,
            reference: &r,
            query: &q,
            unmasked: &unmasked,
        };
        assert_eq!(s.score(0, 0), 1);
        assert_eq!(s.score(1, 1), -1);
        assert!(s.is_identical(2, 2), "case is ignored");
        assert!(!s.is_identical(3, 3), "unknown never counts as identical");
    }

    #[test]
    fn test_pssm_scorer_ignores_query_letters() {
        let dna = Alphabet::dna();
        let width = dna.code_count();
        let pssm = Pssm::from_rows(width, (0..width as i32).collect());
        let unmasked = unmasking_table(&dna);
        let r = dna.encode(b"T");
        let q = dna.encode(b"A");
        let s = PssmScorer {
            pssm: &pssm,
            reference: &r,
            query: &q,
            unmasked: &unmasked,
        };
        assert_eq!(s.score(0, 0), 3);
    }
}
