//! Gapless X-drop extension.
//!
//! All routines are generic over [`ColumnScore`], so the plain, PSSM and
//! two-quality variants share one implementation. Coordinates are buffer offsets;
//! the delimiters around every record score `-INF`, which ends any walk before it
//! leaves the record.

use crate::scoring::ColumnScore;

use super::segment_pair::SegmentPair;

/// Result of extending in one direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GaplessExtension {
    /// Best running score reached (0 if no column helps).
    pub score: i32,
    /// Columns up to the first point where that best score was reached.
    pub len: usize,
}

/// Extend rightwards from `(x, y)`, covering columns `(x + k, y + k)`.
///
/// Stops once the running score falls more than `max_drop` below the best seen.
pub fn extend_forward<S: ColumnScore>(s: &S, x: usize, y: usize, max_drop: i32) -> GaplessExtension {
    let mut score = 0;
    let mut best = GaplessExtension::default();
    let mut k = 0;
    loop {
        score += s.score(x + k, y + k);
        k += 1;
        if score > best.score {
            best = GaplessExtension { score, len: k };
        } else if score < best.score - max_drop {
            return best;
        }
    }
}

/// Extend leftwards from `(x, y)`, covering columns `(x - 1 - k, y - 1 - k)`.
pub fn extend_reverse<S: ColumnScore>(s: &S, x: usize, y: usize, max_drop: i32) -> GaplessExtension {
    let mut score = 0;
    let mut best = GaplessExtension::default();
    let mut k = 0;
    loop {
        score += s.score(x - 1 - k, y - 1 - k);
        k += 1;
        if score > best.score {
            best = GaplessExtension { score, len: k };
        } else if score < best.score - max_drop {
            return best;
        }
    }
}

/// Maximal gapless segment pair through the seed position `(x, y)`.
pub fn extend_seed<S: ColumnScore>(s: &S, x: usize, y: usize, max_drop: i32) -> SegmentPair {
    let left = extend_reverse(s, x, y, max_drop);
    let right = extend_forward(s, x, y, max_drop);
    SegmentPair::new(
        x - left.len,
        y - left.len,
        left.len + right.len,
        left.score + right.score,
    )
}

/// Exact sum of column scores over `len` columns.
pub fn gapless_score<S: ColumnScore>(s: &S, x: usize, y: usize, len: usize) -> i32 {
    (0..len).map(|k| s.score(x + k, y + k)).sum()
}

/// True when no prefix of the run scores `<= 0`, no stretch drops by more than
/// `max_drop`, and the final column raises the score to a new maximum. A run
/// failing this would be better reported as a shorter segment or split in two.
pub fn is_optimal<S: ColumnScore>(s: &S, x: usize, y: usize, len: usize, max_drop: i32) -> bool {
    let mut score = 0;
    let mut max_score = 0;
    for k in 0..len {
        score += s.score(x + k, y + k);
        if score > max_score {
            max_score = score;
        } else if score <= 0 || k + 1 == len || max_score - score > max_drop {
            return false;
        }
    }
    len > 0
}

/// The longest run of identical columns inside `sp` (the first one on ties). If no
/// column is identical the result is an empty run at the middle of `sp`.
pub fn shrink_to_longest_identical_run<S: ColumnScore>(s: &S, sp: &SegmentPair) -> SegmentPair {
    let mut best_start = sp.len / 2;
    let mut best_len = 0;
    let mut run_start = 0;
    for k in 0..=sp.len {
        let identical = k < sp.len && s.is_identical(sp.ref_start + k, sp.query_start + k);
        if !identical {
            if k - run_start > best_len {
                best_len = k - run_start;
                best_start = run_start;
            }
            run_start = k + 1;
        }
    }
    let (x, y) = (sp.ref_start + best_start, sp.query_start + best_start);
    SegmentPair::new(x, y, best_len, gapless_score(s, x, y, best_len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use crate::scoring::{unmasking_table, PlainScorer, ScoreMatrix};
    use crate::sequence::SequenceBuffer;

    struct Fixture {
        matrix: ScoreMatrix,
        reference: SequenceBuffer,
        query: SequenceBuffer,
        unmasked: Vec<u8>,
    }

    impl Fixture {
        fn new(r: &[u8], q: &[u8]) -> Self {
            let dna = Alphabet::dna();
            Self {
                matrix: ScoreMatrix::from_match_mismatch(&dna, 1, 1),
                reference: SequenceBuffer::from_records(&dna, [("r", r)]),
                query: SequenceBuffer::from_records(&dna, [("q", q)]),
                unmasked: unmasking_table(&dna),
            }
        }

        fn scorer(&self) -> PlainScorer<'_> {
            PlainScorer {
                matrix: &self.matrix,
                reference: self.reference.as_slice(),
                query: self.query.as_slice(),
                unmasked: &self.unmasked,
            }
        }
    }

    #[test]
    fn test_identical_sequences_extend_fully() {
        let f = Fixture::new(b"ACGTACGT", b"ACGTACGT");
        let s = f.scorer();
        let sp = extend_seed(&s, 4, 4, 10);
        assert_eq!(sp, SegmentPair::new(1, 1, 8, 8));
        assert!(is_optimal(&s, sp.ref_start, sp.query_start, sp.len, 10));
        assert_eq!(gapless_score(&s, 1, 1, 8), 8);
    }

    #[test]
    fn test_end_is_first_best_not_stop_point() {
        // Mismatch then match leaves the score level: the end stays at the first best.
        let f = Fixture::new(b"AAAAGA", b"AAAACA");
        let s = f.scorer();
        let fwd = extend_forward(&s, 1, 1, 5);
        assert_eq!(fwd, GaplessExtension { score: 4, len: 4 });
    }

    #[test]
    fn test_drop_stops_extension() {
        let f = Fixture::new(b"AAAACCCAAAAAAAA", b"AAAAGGGAAAAAAAA");
        let s = f.scorer();
        assert_eq!(extend_forward(&s, 1, 1, 2).score, 4);
        assert_eq!(extend_forward(&s, 1, 1, 3).score, 9);
    }

    #[test]
    fn test_reverse_extension() {
        let f = Fixture::new(b"TTACGT", b"GGACGT");
        let s = f.scorer();
        let rev = extend_reverse(&s, 7, 7, 10);
        assert_eq!(rev, GaplessExtension { score: 4, len: 4 });
    }

    #[test]
    fn test_is_optimal_rejects_weak_runs() {
        let f = Fixture::new(b"ACGTTCGT", b"ACGTACGA");
        let s = f.scorer();
        // Ends on a mismatch.
        assert!(!is_optimal(&s, 1, 1, 8, 10));
        // Starts with a non-positive prefix.
        assert!(!is_optimal(&s, 5, 5, 3, 10));
        // Interior drop larger than allowed: +4, -1, +2 with drop 0.
        assert!(!is_optimal(&s, 1, 1, 7, 0));
        assert!(is_optimal(&s, 1, 1, 7, 1));
        assert!(!is_optimal(&s, 1, 1, 0, 1));
    }

    #[test]
    fn test_shrink_to_longest_identical_run() {
        let f = Fixture::new(b"ACGTTCGTAA", b"ACTTACGTAA");
        let s = f.scorer();
        let sp = SegmentPair::new(1, 1, 10, 6);
        let run = shrink_to_longest_identical_run(&s, &sp);
        assert_eq!(run, SegmentPair::new(6, 6, 5, 5));
    }
}
