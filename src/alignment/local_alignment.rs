//! Gapped local alignments and the checks that replay them column by column.

use std::cmp::Ordering;
use std::ops::Range;

use crate::scoring::{ColumnScore, GapCosts};

use super::cigar::{self, EditOp, EditRun};
use super::segment_pair::SegmentPair;

/// A local alignment anchored at buffer offsets `ref_start` / `query_start`.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub ref_start: usize,
    pub query_start: usize,
    pub ops: Vec<EditRun>,
    pub score: i32,
    /// Gapless segment pair the alignment was grown from.
    pub seed: SegmentPair,
    /// Posterior probability of each column, when computed.
    pub posterior: Option<Vec<f64>>,
}

impl Alignment {
    /// Gapless alignment covering exactly one segment pair.
    pub fn from_segment_pair(sp: &SegmentPair) -> Self {
        let mut ops = Vec::new();
        cigar::push_run(&mut ops, EditOp::Match, sp.len as u32);
        Self {
            ref_start: sp.ref_start,
            query_start: sp.query_start,
            ops,
            score: sp.score,
            seed: *sp,
            posterior: None,
        }
    }

    pub fn ref_len(&self) -> usize {
        cigar::reference_length(&self.ops)
    }

    pub fn query_len(&self) -> usize {
        cigar::query_length(&self.ops)
    }

    pub fn ref_end(&self) -> usize {
        self.ref_start + self.ref_len()
    }

    pub fn query_end(&self) -> usize {
        self.query_start + self.query_len()
    }

    pub fn ref_range(&self) -> Range<usize> {
        self.ref_start..self.ref_end()
    }

    pub fn query_range(&self) -> Range<usize> {
        self.query_start..self.query_end()
    }

    /// Matched runs as `(ref offset, query offset, length)`.
    pub fn match_runs(&self) -> impl Iterator<Item = (usize, usize, usize)> + '_ {
        let (mut x, mut y) = (self.ref_start, self.query_start);
        self.ops.iter().filter_map(move |&(op, len)| {
            let len = len as usize;
            let run = (op == EditOp::Match).then_some((x, y, len));
            if op.consumes_ref() {
                x += len;
            }
            if op.consumes_query() {
                y += len;
            }
            run
        })
    }

    /// Score obtained by replaying every column and gap against the given tables.
    pub fn replay_score<S: ColumnScore>(&self, s: &S, gaps: &GapCosts) -> i32 {
        let (mut x, mut y) = (self.ref_start, self.query_start);
        let mut score = 0;
        for &(op, len) in &self.ops {
            let n = len as usize;
            match op {
                EditOp::Match => {
                    score += (0..n).map(|k| s.score(x + k, y + k)).sum::<i32>();
                    x += n;
                    y += n;
                }
                EditOp::Insertion => {
                    score -= gaps.insertion_cost(len);
                    y += n;
                }
                EditOp::Deletion => {
                    score -= gaps.deletion_cost(len);
                    x += n;
                }
            }
        }
        score
    }

    /// Same test as gapless optimality, with each gap run charged as one step: no
    /// prefix scores `<= 0`, no drop exceeds `max_drop`, and the last column is a
    /// strict improvement.
    pub fn is_optimal<S: ColumnScore>(&self, s: &S, gaps: &GapCosts, max_drop: i32) -> bool {
        let (mut x, mut y) = (self.ref_start, self.query_start);
        let mut score = 0;
        let mut max_score = 0;
        let mut improved = false;
        for &(op, len) in &self.ops {
            let n = len as usize;
            match op {
                EditOp::Match => {
                    for k in 0..n {
                        score += s.score(x + k, y + k);
                        improved = score > max_score;
                        if improved {
                            max_score = score;
                        } else if score <= 0 || max_score - score > max_drop {
                            return false;
                        }
                    }
                    x += n;
                    y += n;
                }
                EditOp::Insertion | EditOp::Deletion => {
                    score -= if op == EditOp::Insertion {
                        gaps.insertion_cost(len)
                    } else {
                        gaps.deletion_cost(len)
                    };
                    improved = false;
                    if score <= 0 || max_score - score > max_drop {
                        return false;
                    }
                    if op == EditOp::Insertion {
                        y += n;
                    } else {
                        x += n;
                    }
                }
            }
        }
        improved
    }

    /// True when one of the alignment's matched columns lies on `sp`'s diagonal
    /// inside `sp`'s reference span.
    pub fn shares_diagonal_cell(&self, sp: &SegmentPair) -> bool {
        self.match_runs().any(|(x, y, len)| {
            x as isize - y as isize == sp.diagonal() && x < sp.ref_end() && sp.ref_start < x + len
        })
    }

    pub fn mean_posterior(&self) -> Option<f64> {
        self.posterior.as_ref().filter(|p| !p.is_empty()).map(|p| p.iter().sum::<f64>() / p.len() as f64)
    }

    /// Pot ranking: higher score, earlier start, longer span, then the path itself.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then(self.ref_start.cmp(&other.ref_start))
            .then(self.query_start.cmp(&other.query_start))
            .then(other.ref_len().cmp(&self.ref_len()))
            .then(other.query_len().cmp(&self.query_len()))
            .then_with(|| self.ops.cmp(&other.ops))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use crate::scoring::{unmasking_table, PlainScorer, ScoreMatrix};
    use crate::sequence::SequenceBuffer;

    fn alignment(ref_start: usize, query_start: usize, ops: &str) -> Alignment {
        Alignment {
            ref_start,
            query_start,
            ops: cigar::parse(ops).unwrap(),
            score: 0,
            seed: SegmentPair::default(),
            posterior: None,
        }
    }

    #[test]
    fn test_replay_and_optimality_with_insertion() {
        let dna = Alphabet::dna();
        let m = ScoreMatrix::from_match_mismatch(&dna, 1, 1);
        let unmasked = unmasking_table(&dna);
        let r = SequenceBuffer::from_records(&dna, [("r", &b"AAAACCCC"[..])]);
        let q = SequenceBuffer::from_records(&dna, [("q", &b"AAAAGCCCC"[..])]);
        let s = PlainScorer {
            matrix: &m,
            reference: r.as_slice(),
            query: q.as_slice(),
            unmasked: &unmasked,
        };
        let gaps = GapCosts::affine(5, 1);
        let aln = alignment(1, 1, "4M1I4M");
        assert_eq!(aln.ref_len(), 8);
        assert_eq!(aln.query_len(), 9);
        assert_eq!(aln.replay_score(&s, &gaps), 8 - 5 - 1);
        // The gap takes the running score from 4 down to -2.
        assert!(!aln.is_optimal(&s, &gaps, 100));
        assert!(alignment(1, 1, "4M").is_optimal(&s, &gaps, 0));
    }

    #[test]
    fn test_match_runs_and_shared_diagonal() {
        let aln = alignment(10, 20, "3M2D4M1I2M");
        let runs: Vec<_> = aln.match_runs().collect();
        assert_eq!(runs, vec![(10, 20, 3), (15, 23, 4), (19, 28, 2)]);
        assert!(aln.shares_diagonal_cell(&SegmentPair::new(16, 24, 2, 2)));
        assert!(!aln.shares_diagonal_cell(&SegmentPair::new(16, 23, 2, 2)));
        assert!(!aln.shares_diagonal_cell(&SegmentPair::new(13, 23, 2, 2)), "inside the deletion");
    }

    #[test]
    fn test_rank_cmp_prefers_score_then_position() {
        let mut a = alignment(5, 5, "4M");
        a.score = 10;
        let mut b = alignment(1, 1, "4M");
        b.score = 7;
        assert_eq!(a.rank_cmp(&b), Ordering::Less);
        b.score = 10;
        assert_eq!(b.rank_cmp(&a), Ordering::Less);
    }

    #[test]
    fn test_mean_posterior() {
        let mut a = alignment(0, 0, "2M");
        assert_eq!(a.mean_posterior(), None);
        a.posterior = Some(vec![0.5, 1.0]);
        assert_eq!(a.mean_posterior(), Some(0.75));
    }
}
