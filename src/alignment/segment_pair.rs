//! Ungapped aligned runs.

use std::cmp::Ordering;
use std::ops::Range;

/// One gapless run: `len` columns starting at buffer offsets
/// `ref_start` (reference) and `query_start` (query).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SegmentPair {
    pub ref_start: usize,
    pub query_start: usize,
    pub len: usize,
    pub score: i32,
}

impl SegmentPair {
    pub const fn new(ref_start: usize, query_start: usize, len: usize, score: i32) -> Self {
        Self {
            ref_start,
            query_start,
            len,
            score,
        }
    }

    #[inline]
    pub const fn ref_end(&self) -> usize {
        self.ref_start + self.len
    }

    #[inline]
    pub const fn query_end(&self) -> usize {
        self.query_start + self.len
    }

    /// Diagonal index `ref - query`; constant along the run.
    #[inline]
    pub fn diagonal(&self) -> isize {
        self.ref_start as isize - self.query_start as isize
    }

    pub fn ref_range(&self) -> Range<usize> {
        self.ref_start..self.ref_end()
    }

    pub fn query_range(&self) -> Range<usize> {
        self.query_start..self.query_end()
    }

    /// True when both the reference and the query intervals intersect.
    pub fn overlaps(&self, other: &Self) -> bool {
        ranges_intersect(&self.ref_range(), &other.ref_range())
            && ranges_intersect(&self.query_range(), &other.query_range())
    }

    /// Ranking used by the pots: higher score first, then earlier reference start,
    /// earlier query start, longer run.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then(self.ref_start.cmp(&other.ref_start))
            .then(self.query_start.cmp(&other.query_start))
            .then(other.len.cmp(&self.len))
    }
}

#[inline]
pub(crate) fn ranges_intersect(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}
