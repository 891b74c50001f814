//! Redundancy elimination: at most one surviving candidate per overlapping locus.
//!
//! Candidates are collected as they arrive and resolved lazily. Resolution walks
//! them in rank order (score descending, then reference start, query start and
//! length) and keeps each one that overlaps no already-kept candidate on both
//! axes, so the survivors do not depend on insertion order.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;
use std::ops::Range;

use super::cigar::EditRun;
use super::local_alignment::Alignment;
use super::segment_pair::{ranges_intersect, SegmentPair};

/// Something a [`Pot`] can hold.
pub trait PotItem: Clone {
    /// Identity used to reject exact re-insertions.
    type Key: Hash + Eq;

    fn key(&self) -> Self::Key;
    fn ref_range(&self) -> Range<usize>;
    fn query_range(&self) -> Range<usize>;
    /// `Less` means `self` ranks ahead of `other`.
    fn rank_cmp(&self, other: &Self) -> Ordering;
}

impl PotItem for SegmentPair {
    type Key = SegmentPair;

    fn key(&self) -> Self::Key {
        *self
    }

    fn ref_range(&self) -> Range<usize> {
        SegmentPair::ref_range(self)
    }

    fn query_range(&self) -> Range<usize> {
        SegmentPair::query_range(self)
    }

    fn rank_cmp(&self, other: &Self) -> Ordering {
        SegmentPair::rank_cmp(self, other)
    }
}

impl PotItem for Alignment {
    type Key = (usize, usize, Vec<EditRun>);

    fn key(&self) -> Self::Key {
        (self.ref_start, self.query_start, self.ops.clone())
    }

    fn ref_range(&self) -> Range<usize> {
        Alignment::ref_range(self)
    }

    fn query_range(&self) -> Range<usize> {
        Alignment::query_range(self)
    }

    fn rank_cmp(&self, other: &Self) -> Ordering {
        Alignment::rank_cmp(self, other)
    }
}

pub struct Pot<T: PotItem> {
    candidates: Vec<T>,
    keys: HashSet<T::Key>,
    /// Resolved survivors ordered by reference start, then query start.
    survivors: Vec<T>,
    covered: Vec<bool>,
    resolved: bool,
}

pub type SegmentPairPot = Pot<SegmentPair>;
pub type AlignmentPot = Pot<Alignment>;

impl<T: PotItem> Default for Pot<T> {
    fn default() -> Self {
        Self {
            candidates: Vec::new(),
            keys: HashSet::new(),
            survivors: Vec::new(),
            covered: Vec::new(),
            resolved: true,
        }
    }
}

impl<T: PotItem> Pot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a candidate. Returns false if the same candidate was already offered.
    pub fn add(&mut self, item: T) -> bool {
        if !self.keys.insert(item.key()) {
            return false;
        }
        self.candidates.push(item);
        self.resolved = false;
        true
    }

    /// Number of distinct candidates offered so far.
    pub fn candidate_count(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Surviving candidates, ordered by reference start then query start.
    pub fn survivors(&mut self) -> &[T] {
        self.resolve();
        &self.survivors
    }

    pub fn into_survivors(mut self) -> Vec<T> {
        self.resolve();
        self.survivors
    }

    /// Indices into [`Pot::survivors`] in rank order (best first).
    pub fn rank_order(&mut self) -> Vec<usize> {
        self.resolve();
        let mut order: Vec<usize> = (0..self.survivors.len()).collect();
        order.sort_by(|&a, &b| self.survivors[a].rank_cmp(&self.survivors[b]));
        order
    }

    pub fn is_covered(&self, survivor: usize) -> bool {
        self.covered.get(survivor).copied().unwrap_or(false)
    }

    pub fn mark_covered(&mut self, survivor: usize) {
        if let Some(flag) = self.covered.get_mut(survivor) {
            *flag = true;
        }
    }

    pub fn clear(&mut self) {
        self.candidates.clear();
        self.keys.clear();
        self.survivors.clear();
        self.covered.clear();
        self.resolved = true;
    }

    fn resolve(&mut self) {
        if self.resolved {
            return;
        }
        let mut ranked: Vec<&T> = self.candidates.iter().collect();
        ranked.sort_by(|a, b| a.rank_cmp(b));

        // Kept candidates keyed by query start; `widest` bounds how far back a
        // query interval can start and still reach a later one.
        let mut by_query_start: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        let mut widest = 0;
        let mut kept: Vec<T> = Vec::new();

        for cand in ranked {
            let q = cand.query_range();
            let r = cand.ref_range();
            let lowest = q.start.saturating_sub(widest);
            let clash = by_query_start.range(lowest..q.end.max(lowest)).any(|(_, ids)| {
                ids.iter().any(|&i| {
                    ranges_intersect(&kept[i].query_range(), &q) && ranges_intersect(&kept[i].ref_range(), &r)
                })
            });
            if clash {
                continue;
            }
            widest = widest.max(q.end - q.start);
            by_query_start.entry(q.start).or_default().push(kept.len());
            kept.push(cand.clone());
        }

        kept.sort_by(|a, b| {
            a.ref_range()
                .start
                .cmp(&b.ref_range().start)
                .then(a.query_range().start.cmp(&b.query_range().start))
                .then_with(|| a.rank_cmp(b))
        });
        self.covered = vec![false; kept.len()];
        self.survivors = kept;
        self.resolved = true;
    }
}

impl Pot<SegmentPair> {
    /// Flag every surviving segment pair that shares a matched cell with `aln`, so it
    /// is not extended again.
    pub fn mark_covered_by(&mut self, aln: &Alignment) {
        self.resolve();
        for (sp, flag) in self.survivors.iter().zip(self.covered.iter_mut()) {
            if !*flag && aln.shares_diagonal_cell(sp) {
                *flag = true;
            }
        }
    }
}
