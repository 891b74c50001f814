// Subset suffix array: seed lookup over a reduced alphabet.
//
// The reference buffer is mapped through a SubsetAlphabet to a small-integer text
// (0 = sentinel, 1 = unseedable separator, 2.. = seed symbols) and suffix-sorted
// with bio's SA-IS construction. Only suffixes that start on a seedable position
// (and on the sampling step) are kept. All suffixes sharing a prefix of seed
// symbols form one contiguous interval, which is narrowed one symbol at a time.
//
// A bucket table caches the interval for every prefix up to `bucket_depth`
// symbols, so the first few narrowing steps are table lookups.

use std::ops::Range;

use bio::data_structures::suffix_array::suffix_array;

use crate::alphabet::{SubsetAlphabet, UNSEEDABLE};
use crate::errors::{Result, ScanError};

const SENTINEL: u8 = 0;
const SEPARATOR: u8 = 1;
const FIRST_SYMBOL: u8 = 2;

/// Bucket tables larger than this many entries per depth are not built.
const MAX_BUCKET_ENTRIES: usize = 1 << 22;

/// Result of an adaptive seed lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedMatch {
    /// Interval into [`SubsetSuffixArray::positions`].
    pub range: Range<usize>,
    /// Number of query symbols matched.
    pub depth: usize,
}

#[derive(Debug, Clone)]
pub struct SubsetSuffixArray {
    subset: SubsetAlphabet,
    text: Vec<u8>,
    positions: Vec<usize>,
    /// `buckets[d][code]` is the interval for the prefix `code` of length `d + 1`.
    buckets: Vec<Vec<(usize, usize)>>,
}

impl SubsetSuffixArray {
    /// Index every `step`-th seedable position of a coded reference buffer.
    pub fn build(reference: &[u8], subset: SubsetAlphabet, step: usize, bucket_depth: usize) -> Self {
        let step = step.max(1);
        let mut text: Vec<u8> = reference
            .iter()
            .map(|&c| match subset.symbol(c) {
                UNSEEDABLE => SEPARATOR,
                s => s + FIRST_SYMBOL,
            })
            .collect();
        text.push(SENTINEL);

        let sa = suffix_array(&text);
        let positions: Vec<usize> = sa
            .into_iter()
            .filter(|&p| p < reference.len() && p % step == 0 && text[p] >= FIRST_SYMBOL)
            .collect();

        let mut index = Self {
            subset,
            text,
            positions,
            buckets: Vec::new(),
        };
        index.build_buckets(bucket_depth);
        log::debug!(
            "Indexed {} of {} positions for seed '{}' (bucket depth {})",
            index.positions.len(),
            reference.len(),
            index.subset.pattern(),
            index.buckets.len()
        );
        index
    }

    fn build_buckets(&mut self, bucket_depth: usize) {
        let alphabet = self.subset.size();
        let mut previous: Vec<(usize, usize)> = vec![(0, self.positions.len())];
        for depth in 0..bucket_depth {
            if previous.len() * alphabet > MAX_BUCKET_ENTRIES {
                break;
            }
            let mut current = Vec::with_capacity(previous.len() * alphabet);
            for &(beg, end) in &previous {
                for sym in 0..alphabet as u8 {
                    current.push(self.narrow(beg, end, depth, sym + FIRST_SYMBOL));
                }
            }
            self.buckets.push(current.clone());
            previous = current;
        }
    }

    /// Restrict `[beg, end)`, whose suffixes share `depth` symbols, to those whose next symbol is `sym`.
    #[inline]
    fn narrow(&self, beg: usize, end: usize, depth: usize, sym: u8) -> (usize, usize) {
        let slice = &self.positions[beg..end];
        let lo = slice.partition_point(|&p| self.text[p + depth] < sym);
        let hi = lo + slice[lo..].partition_point(|&p| self.text[p + depth] <= sym);
        (beg + lo, beg + hi)
    }

    /// Interval after extending a match of `depth` symbols by one query code.
    /// `None` when the code is unseedable.
    #[inline]
    fn step(&self, range: (usize, usize), depth: usize, code: u8, bucket_code: &mut usize) -> Option<(usize, usize)> {
        let sym = self.subset.symbol(code);
        if sym == UNSEEDABLE {
            return None;
        }
        if depth < self.buckets.len() {
            *bucket_code = *bucket_code * self.subset.size() + sym as usize;
            Some(self.buckets[depth][*bucket_code])
        } else {
            Some(self.narrow(range.0, range.1, depth, sym + FIRST_SYMBOL))
        }
    }

    pub fn subset(&self) -> &SubsetAlphabet {
        &self.subset
    }

    /// Number of indexed positions.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Reference offsets for an interval returned by a lookup, in suffix order.
    #[inline]
    pub fn positions(&self, range: Range<usize>) -> &[usize] {
        &self.positions[range]
    }

    /// Adaptive seed starting at `query[start]`: grow the match until it has at most
    /// `max_hits` occurrences and at least `min_depth` symbols.
    ///
    /// Returns `None` when an unseedable query code is reached first.
    pub fn match_adaptive(
        &self,
        query: &[u8],
        start: usize,
        max_hits: usize,
        min_depth: usize,
    ) -> Option<SeedMatch> {
        let mut range = (0, self.positions.len());
        let mut depth = 0;
        let mut bucket_code = 0;
        loop {
            if range.1 - range.0 <= max_hits && depth >= min_depth {
                return Some(SeedMatch {
                    range: range.0..range.1,
                    depth,
                });
            }
            let code = *query.get(start + depth)?;
            range = self.step(range, depth, code, &mut bucket_code)?;
            depth += 1;
            if range.0 == range.1 {
                return Some(SeedMatch {
                    range: range.0..range.0,
                    depth,
                });
            }
        }
    }

    /// Every occurrence of `pattern`, truncated to the first `max_occurrences` in suffix order.
    pub fn find(&self, pattern: &[u8], max_occurrences: usize) -> Result<Vec<usize>> {
        let range = self.exact_range(pattern)?;
        let end = range.end.min(range.start.saturating_add(max_occurrences));
        Ok(self.positions[range.start..end].to_vec())
    }

    pub fn count_occurrences(&self, pattern: &[u8]) -> Result<usize> {
        Ok(self.exact_range(pattern)?.len())
    }

    fn exact_range(&self, pattern: &[u8]) -> Result<Range<usize>> {
        if pattern.is_empty() {
            return Err(ScanError::DegenerateInput("empty seed pattern".into()));
        }
        let mut range = (0, self.positions.len());
        let mut bucket_code = 0;
        for (depth, &code) in pattern.iter().enumerate() {
            match self.step(range, depth, code, &mut bucket_code) {
                Some(r) if r.0 < r.1 => range = r,
                _ => return Ok(0..0),
            }
        }
        Ok(range.0..range.1)
    }

    /// Add, for each match length `d >= 1`, the number of reference positions matching
    /// `query[start..start + d]`.
    pub fn count_matches(&self, query: &[u8], start: usize, counts: &mut Vec<u64>) {
        let mut range = (0, self.positions.len());
        let mut bucket_code = 0;
        let mut depth = 0;
        while let Some(&code) = query.get(start + depth) {
            match self.step(range, depth, code, &mut bucket_code) {
                Some(r) if r.0 < r.1 => range = r,
                _ => break,
            }
            depth += 1;
            if counts.len() <= depth {
                counts.resize(depth + 1, 0);
            }
            counts[depth] += (range.1 - range.0) as u64;
        }
    }
}
