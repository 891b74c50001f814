//! Gapped X-drop extension by banded dynamic programming.
//!
//! The aligner extends one side of an anchor. Cell `(i, j)` holds the best score of
//! a path that has consumed `i` reference and `j` query letters from the anchor.
//! Row `i` is computed only over the columns that can still be reached from the
//! surviving cells of row `i - 1`. Cells scoring more than `max_drop` below the best
//! score seen so far are discarded, so the band follows the alignment and grows or
//! shrinks with it. A row wider than the ceiling aborts the extension with
//! [`ScanError::BandOverflow`].
//!
//! Gap costs may have one or two pieces per direction. Each piece has its own
//! deletion and insertion state, so the states per cell are:
//!
//! ```text
//! 0      M    match / mismatch column
//! 1..=2  D_p  gap in the query (reference letter skipped), piece p
//! 3..=4  I_p  gap in the reference (query letter skipped), piece p
//! ```
//!
//! Traceback codes are packed in a `u16` per cell:
//! bits 0-2 hold the predecessor state of `M`; bits `3 + 3p` hold 0 when `D_p`
//! extends, or `source + 1` when it opens; bits `9 + 3p` do the same for `I_p`.

use crate::errors::{Result, ScanError};
use crate::scoring::{GapCosts, GapPiece, INF};

use super::cigar::{self, EditOp, EditRun};

const M: usize = 0;
const DEL: usize = 1;
const INS: usize = 3;
const STATES: usize = 5;

/// Scores below this are treated as unreachable, whatever the drop threshold.
const DEAD: i32 = -INF / 2;

type Cell = [i32; STATES];

/// Outcome of a one-sided extension.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GappedExtension {
    pub score: i32,
    pub ref_len: usize,
    pub query_len: usize,
    /// Operations from the anchor outwards.
    pub ops: Vec<EditRun>,
}

#[derive(Debug, Default)]
struct Row {
    lo: usize,
    cells: Vec<Cell>,
}

impl Row {
    #[inline(always)]
    fn get(&self, j: usize) -> Option<&Cell> {
        j.checked_sub(self.lo).and_then(|k| self.cells.get(k))
    }
}

/// Reusable DP buffers; one per worker.
#[derive(Debug, Default)]
pub struct GappedXdropAligner {
    prev: Row,
    curr: Row,
    traceback: Vec<u16>,
    /// Per row: first computed column and its offset into `traceback`.
    rows: Vec<(usize, usize)>,
    /// Per row: half-open range of columns with a surviving cell.
    bands: Vec<(usize, usize)>,
}

#[inline(always)]
fn best_of(cell: &Cell, states: &[usize]) -> (usize, i32) {
    let mut best = (states[0], cell[states[0]]);
    for &s in &states[1..] {
        if cell[s] > best.1 {
            best = (s, cell[s]);
        }
    }
    best
}

impl GappedXdropAligner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Surviving column range of every row of the last extension.
    pub fn bands(&self) -> &[(usize, usize)] {
        &self.bands
    }

    /// Extend from an anchor.
    ///
    /// `col(i, j)` scores the `i`-th reference letter against the `j`-th query letter
    /// (0-based, counted from the anchor); at most `max_i` and `max_j` letters are
    /// available on each side.
    pub fn extend<F>(
        &mut self,
        col: F,
        max_i: usize,
        max_j: usize,
        gaps: &GapCosts,
        max_drop: i32,
        ceiling: usize,
    ) -> Result<GappedExtension>
    where
        F: Fn(usize, usize) -> i32,
    {
        self.traceback.clear();
        self.rows.clear();
        self.bands.clear();
        self.prev.cells.clear();
        self.prev.lo = 0;

        let deletion: &[GapPiece] = &gaps.deletion;
        let insertion: &[GapPiece] = &gaps.insertion;
        let open_del_from = [M, INS, INS + 1];
        let open_ins_from = [M, DEL, DEL + 1];

        let mut best = 0;
        let (mut best_i, mut best_j) = (0, 0);
        let mut prev_band = (0, 0);

        for i in 0..=max_i {
            let threshold = (best - max_drop).max(DEAD);
            let lo = prev_band.0;
            let offset = self.traceback.len();
            self.curr.lo = lo;
            self.curr.cells.clear();

            let mut j = lo;
            while j <= max_j {
                let mut cell = [-INF; STATES];
                let mut tb: u16 = 0;

                if i == 0 && j == 0 {
                    cell[M] = 0;
                } else if i > 0 && j > 0 {
                    if let Some(diag) = self.prev.get(j - 1) {
                        let (src, v) = best_of(diag, &[M, DEL, DEL + 1, INS, INS + 1]);
                        if v > DEAD {
                            cell[M] = v + col(i - 1, j - 1);
                            tb |= src as u16;
                        }
                    }
                }

                if i > 0 {
                    if let Some(up) = self.prev.get(j) {
                        let (src, open_from) = best_of(up, &open_del_from);
                        for (p, piece) in deletion.iter().enumerate() {
                            let extend = up[DEL + p] - piece.extend;
                            let open = open_from - piece.first();
                            if open > extend {
                                cell[DEL + p] = open;
                                tb |= ((src + 1) as u16) << (3 + 3 * p);
                            } else {
                                cell[DEL + p] = extend;
                            }
                        }
                    }
                }

                if j > lo {
                    let left = self.curr.cells[j - 1 - lo];
                    let (src, open_from) = best_of(&left, &open_ins_from);
                    for (p, piece) in insertion.iter().enumerate() {
                        let extend = left[INS + p] - piece.extend;
                        let open = open_from - piece.first();
                        if open > extend {
                            cell[INS + p] = open;
                            tb |= ((src + 1) as u16) << (9 + 3 * p);
                        } else {
                            cell[INS + p] = extend;
                        }
                    }
                }

                let mut alive = false;
                for v in cell.iter_mut() {
                    if *v < threshold {
                        *v = -INF;
                    } else {
                        alive = true;
                    }
                }
                if !alive && (i == 0 || j >= prev_band.1) {
                    break;
                }

                if cell[M] > best {
                    best = cell[M];
                    best_i = i;
                    best_j = j;
                }
                self.curr.cells.push(cell);
                self.traceback.push(tb);
                j += 1;
            }

            let alive_at = |c: &Cell| c.iter().any(|&v| v > DEAD);
            let first = self.curr.cells.iter().position(alive_at);
            let last = self.curr.cells.iter().rposition(alive_at);
            let (Some(first), Some(last)) = (first, last) else {
                break;
            };
            let band = (lo + first, lo + last + 1);
            let width = band.1 - band.0;
            if width > ceiling {
                return Err(ScanError::BandOverflow { width, ceiling });
            }
            self.rows.push((lo, offset));
            self.bands.push(band);
            prev_band = band;
            std::mem::swap(&mut self.prev, &mut self.curr);
        }

        Ok(GappedExtension {
            score: best,
            ref_len: best_i,
            query_len: best_j,
            ops: self.trace_back(best_i, best_j),
        })
    }

    fn trace_back(&self, mut i: usize, mut j: usize) -> Vec<EditRun> {
        let mut ops = Vec::new();
        let mut state = M;
        while i > 0 || j > 0 {
            let (lo, offset) = self.rows[i];
            let code = self.traceback[offset + j - lo];
            if state == M {
                cigar::push_run(&mut ops, EditOp::Match, 1);
                state = (code & 7) as usize;
                i -= 1;
                j -= 1;
            } else if state < INS {
                let shift = 3 + 3 * (state - DEL);
                cigar::push_run(&mut ops, EditOp::Deletion, 1);
                let from = (code >> shift) & 7;
                if from != 0 {
                    state = from as usize - 1;
                }
                i -= 1;
            } else {
                let shift = 9 + 3 * (state - INS);
                cigar::push_run(&mut ops, EditOp::Insertion, 1);
                let from = (code >> shift) & 7;
                if from != 0 {
                    state = from as usize - 1;
                }
                j -= 1;
            }
        }
        ops.reverse();
        ops
    }
}
