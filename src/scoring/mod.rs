//! Immutable scoring tables shared by every worker.
//!
//! [`ScoreProvider`] bundles the substitution matrix in its case-insensitive and
//! case-sensitive forms, the gap costs, and the optional quality-aware tables.
//! Column scorers in [`column`] borrow from it for the duration of one phase.

pub mod column;
pub mod gap_costs;
pub mod matrix;
pub mod quality;

pub use column::{unmasking_table, ColumnScore, PlainScorer, PssmScorer, TwoQualityScorer};
pub use gap_costs::{GapCosts, GapPiece, MAX_GAP_PIECES};
pub use matrix::{ScoreMatrix, INF};
pub use quality::{Pssm, TwoQualityScoreMatrix};

use crate::alphabet::Alphabet;

#[derive(Debug, Clone)]
pub struct ScoreProvider {
    pub matrix: ScoreMatrix,
    /// Lowercase-involving scores capped at zero.
    pub masked_matrix: ScoreMatrix,
    pub gap_costs: GapCosts,
    /// Insensitive and case-sensitive tables, present when both sides carry qualities.
    pub two_quality: Option<(TwoQualityScoreMatrix, TwoQualityScoreMatrix)>,
    /// Scale of the probabilistic model (1/lambda), needed by quality and posterior modes.
    pub temperature: Option<f64>,
}

impl ScoreProvider {
    pub fn new(
        alphabet: &Alphabet,
        matrix: ScoreMatrix,
        gap_costs: GapCosts,
        temperature: Option<f64>,
    ) -> Self {
        let masked_matrix = matrix.case_sensitive(alphabet);
        Self {
            matrix,
            masked_matrix,
            gap_costs,
            two_quality: None,
            temperature,
        }
    }

    /// Build the two-quality tables; requires a temperature.
    pub fn with_two_quality(mut self, alphabet: &Alphabet) -> Self {
        if let Some(t) = self.temperature {
            let plain = TwoQualityScoreMatrix::new(&self.matrix, alphabet, t);
            let masked = TwoQualityScoreMatrix::new(&self.masked_matrix, alphabet, t);
            self.two_quality = Some((plain, masked));
        }
        self
    }

    #[inline]
    pub fn matrix_for(&self, case_sensitive: bool) -> &ScoreMatrix {
        if case_sensitive {
            &self.masked_matrix
        } else {
            &self.matrix
        }
    }

    pub fn two_quality_for(&self, case_sensitive: bool) -> Option<&TwoQualityScoreMatrix> {
        self.two_quality
            .as_ref()
            .map(|(plain, masked)| if case_sensitive { masked } else { plain })
    }
}
