//! Per-worker workspace for reusable allocations
//!
//! Every scan worker owns one workspace and reuses it across volumes, strands and
//! queries. Nothing in here is shared between threads.

use super::centroid::CentroidAligner;
use super::diagonal_table::DiagonalTable;
use super::gapped::GappedXdropAligner;

/// Expected longest seed, for pre-allocating the match-count buffer
const MAX_SEED_DEPTH: usize = 64;

/// Reusable buffers for the scan pipeline
#[derive(Debug)]
pub struct ScanWorkspace {
    /// Gapped X-drop DP rows and traceback
    pub gapped: GappedXdropAligner,
    /// Forward/backward matrices for posterior and centroid passes
    pub centroid: CentroidAligner,
    /// Diagonals already covered by gapless extensions of the current query
    pub diagonals: DiagonalTable,
    /// Per-depth match counts for the current query record
    pub counts: Vec<u64>,
}

impl ScanWorkspace {
    pub fn new() -> Self {
        Self {
            gapped: GappedXdropAligner::new(),
            centroid: CentroidAligner::new(),
            diagonals: DiagonalTable::new(),
            counts: Vec::with_capacity(MAX_SEED_DEPTH),
        }
    }

    /// Reset per-query state (keeps capacity)
    pub fn start_query(&mut self) {
        self.diagonals.clear();
        self.counts.clear();
    }
}

impl Default for ScanWorkspace {
    fn default() -> Self {
        Self::new()
    }
}
