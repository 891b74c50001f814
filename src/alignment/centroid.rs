//! Posterior probabilities and centroid alignment over a gapped-extension band.
//!
//! Scores become Boltzmann weights `exp(score / T)`. Forward and backward sums run
//! over the cells of the band left by [`GappedXdropAligner`](super::gapped::GappedXdropAligner),
//! with the same match / deletion-piece / insertion-piece states. Each row is
//! rescaled to its maximum and the log of the running scale is kept per row, so
//! long extensions do not overflow.
//!
//! The centroid path maximises `sum((gamma + 1) * P(column) - 1)` over matched
//! columns, which favours columns the model is confident about over raw score.

use crate::scoring::GapCosts;

use super::cigar::{self, EditOp, EditRun};

const M: usize = 0;
const DEL: usize = 1;
const INS: usize = 3;
const STATES: usize = 5;

type Cell = [f64; STATES];

#[derive(Debug, Clone, Copy)]
struct GapWeights {
    open: [f64; 2],
    extend: [f64; 2],
    pieces: usize,
}

impl GapWeights {
    fn new(pieces: &[crate::scoring::GapPiece], temperature: f64) -> Self {
        let mut w = Self {
            open: [0.0; 2],
            extend: [0.0; 2],
            pieces: pieces.len().min(2),
        };
        for (p, piece) in pieces.iter().take(2).enumerate() {
            w.open[p] = (-(piece.first() as f64) / temperature).exp();
            w.extend[p] = (-(piece.extend as f64) / temperature).exp();
        }
        w
    }
}

/// Result of a centroid realignment.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CentroidPath {
    /// Operations from the anchor outwards.
    pub ops: Vec<EditRun>,
    /// Posterior probability of each column of `ops`.
    pub probabilities: Vec<f64>,
}

#[derive(Debug, Default)]
pub struct CentroidAligner {
    bands: Vec<(usize, usize)>,
    offsets: Vec<usize>,
    fwd: Vec<Cell>,
    bwd: Vec<Cell>,
    fwd_log_scale: Vec<f64>,
    bwd_log_scale: Vec<f64>,
    posterior: Vec<f64>,
    row_sums: Vec<f64>,
    col_sums: Vec<f64>,
    gains: Vec<f64>,
    moves: Vec<u8>,
}

impl CentroidAligner {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline(always)]
    fn index(&self, i: usize, j: usize) -> Option<usize> {
        let &(lo, hi) = self.bands.get(i)?;
        (lo <= j && j < hi).then(|| self.offsets[i] + j - lo)
    }

    /// Run the forward and backward passes.
    ///
    /// `col` has the same meaning as for the gapped extension that produced `bands`.
    pub fn compute<F>(&mut self, col: F, bands: &[(usize, usize)], gaps: &GapCosts, temperature: f64)
    where
        F: Fn(usize, usize) -> i32,
    {
        self.bands.clear();
        self.bands.extend_from_slice(bands);
        self.offsets.clear();
        let mut total = 0;
        for &(lo, hi) in bands {
            self.offsets.push(total);
            total += hi - lo;
        }
        self.fwd.clear();
        self.fwd.resize(total, [0.0; STATES]);
        self.bwd.clear();
        self.bwd.resize(total, [0.0; STATES]);

        let del = GapWeights::new(&gaps.deletion, temperature);
        let ins = GapWeights::new(&gaps.insertion, temperature);
        let weight = |i: usize, j: usize| (col(i - 1, j - 1) as f64 / temperature).exp();

        self.forward(&weight, &del, &ins);
        self.backward(&weight, &del, &ins);
        self.posteriors(total);
    }

    fn forward<W: Fn(usize, usize) -> f64>(&mut self, weight: &W, del: &GapWeights, ins: &GapWeights) {
        self.fwd_log_scale.clear();
        let mut log_scale = 0.0;
        for i in 0..self.bands.len() {
            let (lo, hi) = self.bands[i];
            let mut row_max: f64 = 0.0;
            for j in lo..hi {
                let mut f = [0.0; STATES];
                if i == 0 && j == 0 {
                    f[M] = 1.0;
                } else if i > 0 && j > 0 {
                    if let Some(d) = self.index(i - 1, j - 1) {
                        f[M] = weight(i, j) * self.fwd[d].iter().sum::<f64>();
                    }
                }
                if i > 0 {
                    if let Some(u) = self.index(i - 1, j) {
                        let up = self.fwd[u];
                        let from = up[M] + up[INS] + up[INS + 1];
                        for p in 0..del.pieces {
                            f[DEL + p] = from * del.open[p] + up[DEL + p] * del.extend[p];
                        }
                    }
                }
                if j > lo {
                    let left = self.fwd[self.offsets[i] + j - 1 - lo];
                    let from = left[M] + left[DEL] + left[DEL + 1];
                    for p in 0..ins.pieces {
                        f[INS + p] = from * ins.open[p] + left[INS + p] * ins.extend[p];
                    }
                }
                row_max = f.iter().fold(row_max, |m, &v| m.max(v));
                self.fwd[self.offsets[i] + j - lo] = f;
            }
            if row_max > 0.0 {
                let start = self.offsets[i];
                for cell in &mut self.fwd[start..start + hi - lo] {
                    cell.iter_mut().for_each(|v| *v /= row_max);
                }
                log_scale += row_max.ln();
            }
            self.fwd_log_scale.push(log_scale);
        }
    }

    fn backward<W: Fn(usize, usize) -> f64>(&mut self, weight: &W, del: &GapWeights, ins: &GapWeights) {
        let rows = self.bands.len();
        self.bwd_log_scale.clear();
        self.bwd_log_scale.resize(rows, 0.0);
        for i in (0..rows).rev() {
            let (lo, hi) = self.bands[i];
            let next_log_scale = if i + 1 < rows { self.bwd_log_scale[i + 1] } else { 0.0 };
            let end = (-next_log_scale).exp();
            let mut row_max: f64 = 0.0;
            for j in (lo..hi).rev() {
                let diag = self
                    .index(i + 1, j + 1)
                    .map_or(0.0, |d| weight(i + 1, j + 1) * self.bwd[d][M]);
                let down = self.index(i + 1, j).map_or([0.0; STATES], |d| self.bwd[d]);
                let right = if j + 1 < hi {
                    self.bwd[self.offsets[i] + j + 1 - lo]
                } else {
                    [0.0; STATES]
                };
                let open_del: f64 = (0..del.pieces).map(|p| del.open[p] * down[DEL + p]).sum();
                let open_ins: f64 = (0..ins.pieces).map(|p| ins.open[p] * right[INS + p]).sum();

                let mut b = [0.0; STATES];
                b[M] = end + diag + open_del + open_ins;
                for p in 0..del.pieces {
                    b[DEL + p] = diag + del.extend[p] * down[DEL + p] + open_ins;
                }
                for p in 0..ins.pieces {
                    b[INS + p] = diag + ins.extend[p] * right[INS + p] + open_del;
                }
                row_max = b.iter().fold(row_max, |m, &v| m.max(v));
                self.bwd[self.offsets[i] + j - lo] = b;
            }
            let mut log_scale = next_log_scale;
            if row_max > 0.0 {
                let start = self.offsets[i];
                for cell in &mut self.bwd[start..start + hi - lo] {
                    cell.iter_mut().for_each(|v| *v /= row_max);
                }
                log_scale += row_max.ln();
            }
            self.bwd_log_scale[i] = log_scale;
        }
    }

    fn posteriors(&mut self, total: usize) {
        self.posterior.clear();
        self.posterior.resize(total, 0.0);
        self.row_sums.clear();
        self.row_sums.resize(self.bands.len(), 0.0);
        let max_j = self.bands.iter().map(|&(_, hi)| hi).max().unwrap_or(0);
        self.col_sums.clear();
        self.col_sums.resize(max_j, 0.0);

        let Some(origin) = self.index(0, 0) else {
            return;
        };
        let z = self.bwd[origin][M];
        if z <= 0.0 {
            return;
        }
        let log_z = self.bwd_log_scale[0];
        for i in 1..self.bands.len() {
            let (lo, hi) = self.bands[i];
            let scale = (self.fwd_log_scale[i] + self.bwd_log_scale[i] - log_z).exp() / z;
            for j in lo.max(1)..hi {
                let k = self.offsets[i] + j - lo;
                let p = (self.fwd[k][M] * self.bwd[k][M] * scale).clamp(0.0, 1.0);
                self.posterior[k] = p;
                self.row_sums[i] += p;
                self.col_sums[j] += p;
            }
        }
    }

    /// Posterior probability that the `i`-th reference letter aligns to the `j`-th
    /// query letter (1-based counts from the anchor).
    pub fn match_probability(&self, i: usize, j: usize) -> f64 {
        self.index(i, j).map_or(0.0, |k| self.posterior[k])
    }

    /// Probability that query letter `j` (1-based) is aligned to some reference letter.
    pub fn query_column_sum(&self, j: usize) -> f64 {
        self.col_sums.get(j).copied().unwrap_or(0.0)
    }

    /// Probability that reference letter `i` (1-based) is aligned to some query letter.
    pub fn ref_row_sum(&self, i: usize) -> f64 {
        self.row_sums.get(i).copied().unwrap_or(0.0)
    }

    /// Posterior of every column along `ops`; a gap column gets the probability that
    /// its letter is unaligned.
    pub fn column_probabilities(&self, ops: &[EditRun]) -> Vec<f64> {
        let (mut i, mut j) = (0, 0);
        let mut probs = Vec::with_capacity(cigar::column_count(ops));
        for &(op, len) in ops {
            for _ in 0..len {
                let p = match op {
                    EditOp::Match => {
                        i += 1;
                        j += 1;
                        self.match_probability(i, j)
                    }
                    EditOp::Deletion => {
                        i += 1;
                        1.0 - self.ref_row_sum(i)
                    }
                    EditOp::Insertion => {
                        j += 1;
                        1.0 - self.query_column_sum(j)
                    }
                };
                probs.push(p.clamp(0.0, 1.0));
            }
        }
        probs
    }

    /// Path maximising expected accuracy, ending at its best cell, then trimmed at
    /// the outer end until the last column has posterior `>= min_posterior`.
    pub fn centroid(&mut self, gamma: f64, min_posterior: f64) -> CentroidPath {
        let total = self.posterior.len();
        self.gains.clear();
        self.gains.resize(total, f64::NEG_INFINITY);
        self.moves.clear();
        self.moves.resize(total, 0);

        let mut best = (0.0, 0, 0);
        for i in 0..self.bands.len() {
            let (lo, hi) = self.bands[i];
            for j in lo..hi {
                let k = self.offsets[i] + j - lo;
                if i == 0 && j == 0 {
                    self.gains[k] = 0.0;
                    continue;
                }
                let mut gain = f64::NEG_INFINITY;
                let mut mv = 0;
                if i > 0 && j > 0 {
                    if let Some(d) = self.index(i - 1, j - 1) {
                        gain = self.gains[d] + (gamma + 1.0) * self.posterior[k] - 1.0;
                    }
                }
                if i > 0 {
                    if let Some(u) = self.index(i - 1, j) {
                        if self.gains[u] > gain {
                            gain = self.gains[u];
                            mv = 1;
                        }
                    }
                }
                if j > lo && self.gains[k - 1] > gain {
                    gain = self.gains[k - 1];
                    mv = 2;
                }
                self.gains[k] = gain;
                self.moves[k] = mv;
                if gain > best.0 {
                    best = (gain, i, j);
                }
            }
        }

        let (_, mut i, mut j) = best;
        let mut ops = Vec::new();
        while i > 0 || j > 0 {
            let Some(k) = self.index(i, j) else {
                break;
            };
            match self.moves[k] {
                0 => {
                    cigar::push_run(&mut ops, EditOp::Match, 1);
                    i -= 1;
                    j -= 1;
                }
                1 => {
                    cigar::push_run(&mut ops, EditOp::Deletion, 1);
                    i -= 1;
                }
                _ => {
                    cigar::push_run(&mut ops, EditOp::Insertion, 1);
                    j -= 1;
                }
            }
        }
        ops.reverse();

        let mut probabilities = self.column_probabilities(&ops);
        while let Some(&(op, _)) = ops.last() {
            let keep = op == EditOp::Match && probabilities.last().is_some_and(|&p| p >= min_posterior);
            if keep {
                break;
            }
            if let Some(last) = ops.last_mut() {
                last.1 -= 1;
                if last.1 == 0 {
                    ops.pop();
                }
            }
            probabilities.pop();
        }
        CentroidPath { ops, probabilities }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::gapped::GappedXdropAligner;

    fn scorer<'a>(r: &'a [u8], q: &'a [u8]) -> impl Fn(usize, usize) -> i32 + 'a {
        move |i, j| if r[i] == q[j] { 2 } else { -6 }
    }

    fn prepared(r: &[u8], q: &[u8]) -> (CentroidAligner, Vec<EditRun>) {
        let gaps = GapCosts::affine(5, 1);
        let mut gapped = GappedXdropAligner::new();
        let ext = gapped
            .extend(scorer(r, q), r.len(), q.len(), &gaps, 10, 1000)
            .unwrap();
        let mut centroid = CentroidAligner::new();
        centroid.compute(scorer(r, q), gapped.bands(), &gaps, 1.0);
        (centroid, ext.ops)
    }

    #[test]
    fn test_identical_sequences_are_confident() {
        let (mut c, ops) = prepared(b"ACGTACGT", b"ACGTACGT");
        let probs = c.column_probabilities(&ops);
        assert_eq!(probs.len(), 8);
        assert!(probs.iter().all(|&p| p > 0.8 && p <= 1.0), "{:?}", probs);
        let path = c.centroid(1.0, 0.0);
        assert_eq!(cigar::to_string(&path.ops), "8M");
    }

    #[test]
    fn test_column_sums_are_probabilities() {
        let (c, _) = prepared(b"AAAACCCCGT", b"AAAAGCCCCGT");
        for j in 1..=11 {
            assert!(c.query_column_sum(j) <= 1.0 + 1e-9);
        }
        for i in 1..=10 {
            assert!(c.ref_row_sum(i) <= 1.0 + 1e-9);
        }
    }

    #[test]
    fn test_centroid_follows_insertion() {
        let (mut c, ops) = prepared(b"AAAACCCC", b"AAAAGCCCC");
        assert_eq!(cigar::to_string(&ops), "4M1I4M");
        let path = c.centroid(1.0, 0.0);
        assert_eq!(cigar::to_string(&path.ops), "4M1I4M");
        assert_eq!(path.probabilities.len(), 9);
        assert!(path.probabilities[4] > 0.5, "inserted G is unaligned");
    }

    #[test]
    fn test_min_posterior_trims_outer_end() {
        let (mut c, _) = prepared(b"AAAACCCC", b"AAAAGCCCC");
        let path = c.centroid(1.0, 0.999);
        assert!(cigar::query_length(&path.ops) < 9);
        assert!(path.probabilities.iter().last().map_or(true, |&p| p >= 0.999));
    }
}
