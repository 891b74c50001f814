//! Per-phase binding of a column-scoring variant and an X-drop threshold.
//!
//! A [`Dispatcher`] is built once per phase and query strand. It picks the
//! plain, PSSM or two-quality scorer from what the inputs carry, then every
//! extension call is routed to the generic routine for that variant through
//! [`with_scorer!`]. Changing phase means building a new dispatcher.

use crate::errors::Result;
use crate::scan_opt::Refinement;
use crate::scoring::{
    ColumnScore, GapCosts, PlainScorer, Pssm, PssmScorer, ScoreProvider, TwoQualityScorer,
};
use crate::sequence::SequenceBuffer;

use super::centroid::CentroidAligner;
use super::cigar::{self, EditOp};
use super::gapless;
use super::gapped::GappedXdropAligner;
use super::local_alignment::Alignment;
use super::segment_pair::SegmentPair;

/// Alignment phases, in order of increasing permissiveness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Gapless = 0,
    Gapped = 1,
    Final = 2,
}

impl Phase {
    /// Phases below `mask_lowercase` score lowercase letters with the capped matrix.
    #[inline]
    pub fn is_case_sensitive(self, mask_lowercase: u8) -> bool {
        (self as u8) < mask_lowercase
    }
}

/// Everything a phase may score against.
#[derive(Clone, Copy)]
pub struct ScoringInputs<'a> {
    pub provider: &'a ScoreProvider,
    pub reference: &'a SequenceBuffer,
    pub query: &'a SequenceBuffer,
    /// Query PSSMs built from the plain and the case-sensitive matrix.
    pub pssm: Option<(&'a Pssm, &'a Pssm)>,
    pub unmasked: &'a [u8],
    pub mask_lowercase: u8,
}

/// The scorer selected for one phase.
#[derive(Clone, Copy)]
pub enum ColumnScoring<'a> {
    Plain(PlainScorer<'a>),
    Pssm(PssmScorer<'a>),
    TwoQuality(TwoQualityScorer<'a>),
}

impl ColumnScoring<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Plain(_) => "plain",
            Self::Pssm(_) => "pssm",
            Self::TwoQuality(_) => "two-quality",
        }
    }
}

/// Run `$body` with `$s` bound to the active scorer, monomorphized per variant.
macro_rules! with_scorer {
    ($scoring:expr, $s:ident => $body:expr) => {
        match $scoring {
            ColumnScoring::Plain($s) => $body,
            ColumnScoring::Pssm($s) => $body,
            ColumnScoring::TwoQuality($s) => $body,
        }
    };
}

pub struct Dispatcher<'a> {
    phase: Phase,
    max_drop: i32,
    scoring: ColumnScoring<'a>,
    gaps: &'a GapCosts,
    reference: &'a SequenceBuffer,
    query: &'a SequenceBuffer,
}

impl<'a> Dispatcher<'a> {
    /// Two-quality scoring needs qualities on both sides and the tables for them;
    /// otherwise a query PSSM wins over the plain matrix.
    pub fn new(phase: Phase, max_drop: i32, inputs: &ScoringInputs<'a>) -> Self {
        let case_sensitive = phase.is_case_sensitive(inputs.mask_lowercase);
        let reference = inputs.reference.as_slice();
        let query = inputs.query.as_slice();
        let two_quality = inputs.provider.two_quality_for(case_sensitive);

        let scoring = match (
            inputs.reference.qualities(),
            inputs.query.qualities(),
            two_quality,
            inputs.pssm,
        ) {
            (Some(reference_qualities), Some(query_qualities), Some(matrix), _) => {
                ColumnScoring::TwoQuality(TwoQualityScorer {
                    matrix,
                    reference,
                    reference_qualities,
                    query,
                    query_qualities,
                    unmasked: inputs.unmasked,
                })
            }
            (_, _, _, Some((plain, masked))) => ColumnScoring::Pssm(PssmScorer {
                pssm: if case_sensitive { masked } else { plain },
                reference,
                query,
                unmasked: inputs.unmasked,
            }),
            _ => ColumnScoring::Plain(PlainScorer {
                matrix: inputs.provider.matrix_for(case_sensitive),
                reference,
                query,
                unmasked: inputs.unmasked,
            }),
        };

        log::trace!("{:?} phase: {} scoring, drop {}", phase, scoring.name(), max_drop);
        Self {
            phase,
            max_drop,
            scoring,
            gaps: &inputs.provider.gap_costs,
            reference: inputs.reference,
            query: inputs.query,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn max_drop(&self) -> i32 {
        self.max_drop
    }

    pub fn scoring(&self) -> &ColumnScoring<'a> {
        &self.scoring
    }

    // ------------------------------------------------------------------------
    // Gapless
    // ------------------------------------------------------------------------

    pub fn extend_seed(&self, x: usize, y: usize) -> SegmentPair {
        with_scorer!(&self.scoring, s => gapless::extend_seed(s, x, y, self.max_drop))
    }

    pub fn is_optimal_gapless(&self, sp: &SegmentPair) -> bool {
        with_scorer!(&self.scoring, s => {
            gapless::is_optimal(s, sp.ref_start, sp.query_start, sp.len, self.max_drop)
        })
    }

    pub fn gapless_score(&self, x: usize, y: usize, len: usize) -> i32 {
        with_scorer!(&self.scoring, s => gapless::gapless_score(s, x, y, len))
    }

    pub fn shrink_to_longest_identical_run(&self, sp: &SegmentPair) -> SegmentPair {
        with_scorer!(&self.scoring, s => gapless::shrink_to_longest_identical_run(s, sp))
    }

    // ------------------------------------------------------------------------
    // Gapped
    // ------------------------------------------------------------------------

    /// Extend a segment pair in both directions with gaps; the seed columns are kept
    /// as they are.
    pub fn extend_gapped(
        &self,
        aligner: &mut GappedXdropAligner,
        seed: &SegmentPair,
        ceiling: usize,
    ) -> Result<Alignment> {
        let limits = self.limits(seed.ref_start, seed.query_start);
        with_scorer!(&self.scoring, s => {
            extend_around_seed(s, aligner, seed, limits, self.gaps, self.max_drop, ceiling)
        })
    }

    /// Realign from the middle of the longest identical run inside `seed`.
    ///
    /// Returns the alignment and its X-drop score. With centroid refinement the
    /// alignment's own score is the replayed score of the centroid path, which can
    /// be lower; thresholds apply to the X-drop score.
    pub fn extend_final(
        &self,
        gapped: &mut GappedXdropAligner,
        centroid: &mut CentroidAligner,
        seed: &SegmentPair,
        refinement: Refinement,
        ceiling: usize,
    ) -> Result<(Alignment, i32)> {
        let core = self.shrink_to_longest_identical_run(seed);
        let mid = core.len / 2;
        let (x, y) = (core.ref_start + mid, core.query_start + mid);
        let limits = self.limits(seed.ref_start, seed.query_start);
        let job = FinalJob {
            anchor: (x, y),
            limits,
            gaps: self.gaps,
            max_drop: self.max_drop,
            ceiling,
            refinement,
        };
        let (mut aln, xdrop_score) = with_scorer!(&self.scoring, s => job.run(s, gapped, centroid))?;
        aln.seed = *seed;
        Ok((aln, xdrop_score))
    }

    pub fn is_optimal(&self, aln: &Alignment) -> bool {
        with_scorer!(&self.scoring, s => aln.is_optimal(s, self.gaps, self.max_drop))
    }

    pub fn replay_score(&self, aln: &Alignment) -> i32 {
        with_scorer!(&self.scoring, s => aln.replay_score(s, self.gaps))
    }

    /// Record bounds around a position: `(ref_lo, ref_hi, query_lo, query_hi)`.
    fn limits(&self, x: usize, y: usize) -> Limits {
        let r = self.reference.record_at(x);
        let q = self.query.record_at(y);
        Limits {
            ref_lo: self.reference.record_start(r),
            ref_hi: self.reference.record_end(r),
            query_lo: self.query.record_start(q),
            query_hi: self.query.record_end(q),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Limits {
    ref_lo: usize,
    ref_hi: usize,
    query_lo: usize,
    query_hi: usize,
}

fn extend_around_seed<S: ColumnScore>(
    s: &S,
    aligner: &mut GappedXdropAligner,
    seed: &SegmentPair,
    limits: Limits,
    gaps: &GapCosts,
    max_drop: i32,
    ceiling: usize,
) -> Result<Alignment> {
    let (x, y) = (seed.ref_start, seed.query_start);
    let left = aligner.extend(
        |i, j| s.score(x - 1 - i, y - 1 - j),
        x - limits.ref_lo,
        y - limits.query_lo,
        gaps,
        max_drop,
        ceiling,
    )?;

    let (x_end, y_end) = (seed.ref_end(), seed.query_end());
    let right = aligner.extend(
        |i, j| s.score(x_end + i, y_end + j),
        limits.ref_hi.saturating_sub(x_end),
        limits.query_hi.saturating_sub(y_end),
        gaps,
        max_drop,
        ceiling,
    )?;

    let mut ops = cigar::reverse(&left.ops);
    cigar::push_run(&mut ops, EditOp::Match, seed.len as u32);
    let ops = cigar::join(&ops, &right.ops);

    Ok(Alignment {
        ref_start: x - left.ref_len,
        query_start: y - left.query_len,
        ops,
        score: left.score + gapless::gapless_score(s, x, y, seed.len) + right.score,
        seed: *seed,
        posterior: None,
    })
}

struct FinalJob<'g> {
    anchor: (usize, usize),
    limits: Limits,
    gaps: &'g GapCosts,
    max_drop: i32,
    ceiling: usize,
    refinement: Refinement,
}

/// One side of a final extension, from the anchor outwards.
struct Side {
    score: i32,
    ref_len: usize,
    query_len: usize,
    ops: Vec<cigar::EditRun>,
    probabilities: Option<Vec<f64>>,
}

impl FinalJob<'_> {
    fn run<S: ColumnScore>(
        &self,
        s: &S,
        gapped: &mut GappedXdropAligner,
        centroid: &mut CentroidAligner,
    ) -> Result<(Alignment, i32)> {
        let (x, y) = self.anchor;
        let left = self.side(
            move |i, j| s.score(x - 1 - i, y - 1 - j),
            x - self.limits.ref_lo,
            y - self.limits.query_lo,
            gapped,
            centroid,
        )?;
        let right = self.side(
            move |i, j| s.score(x + i, y + j),
            self.limits.ref_hi.saturating_sub(x),
            self.limits.query_hi.saturating_sub(y),
            gapped,
            centroid,
        )?;

        let xdrop_score = left.score + right.score;
        let ops = cigar::join(&cigar::reverse(&left.ops), &right.ops);
        let posterior = match (left.probabilities, right.probabilities) {
            (Some(mut l), Some(r)) => {
                l.reverse();
                l.extend(r);
                Some(l)
            }
            _ => None,
        };

        let mut aln = Alignment {
            ref_start: x - left.ref_len,
            query_start: y - left.query_len,
            ops,
            score: xdrop_score,
            seed: SegmentPair::default(),
            posterior,
        };
        if matches!(self.refinement, Refinement::Centroid { .. }) {
            aln.score = aln.replay_score(s, self.gaps);
        }
        Ok((aln, xdrop_score))
    }

    fn side<F>(
        &self,
        col: F,
        max_i: usize,
        max_j: usize,
        gapped: &mut GappedXdropAligner,
        centroid: &mut CentroidAligner,
    ) -> Result<Side>
    where
        F: Fn(usize, usize) -> i32 + Copy,
    {
        let ext = gapped.extend(col, max_i, max_j, self.gaps, self.max_drop, self.ceiling)?;
        match self.refinement {
            Refinement::None => Ok(Side {
                score: ext.score,
                ref_len: ext.ref_len,
                query_len: ext.query_len,
                ops: ext.ops,
                probabilities: None,
            }),
            Refinement::Posterior { temperature } => {
                centroid.compute(col, gapped.bands(), self.gaps, temperature);
                let probabilities = centroid.column_probabilities(&ext.ops);
                Ok(Side {
                    score: ext.score,
                    ref_len: ext.ref_len,
                    query_len: ext.query_len,
                    ops: ext.ops,
                    probabilities: Some(probabilities),
                })
            }
            Refinement::Centroid {
                temperature,
                gamma,
                min_posterior,
            } => {
                centroid.compute(col, gapped.bands(), self.gaps, temperature);
                let path = centroid.centroid(gamma, min_posterior);
                Ok(Side {
                    score: ext.score,
                    ref_len: cigar::reference_length(&path.ops),
                    query_len: cigar::query_length(&path.ops),
                    ops: path.ops,
                    probabilities: Some(path.probabilities),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;
    use crate::scoring::{unmasking_table, ScoreMatrix};

    struct Fixture {
        provider: ScoreProvider,
        reference: SequenceBuffer,
        query: SequenceBuffer,
        unmasked: Vec<u8>,
    }

    impl Fixture {
        fn new(r: &[u8], q: &[u8], open: i32, extend: i32) -> Self {
            let alphabet = Alphabet::dna();
            let matrix = ScoreMatrix::from_match_mismatch(&alphabet, 1, 1);
            let provider = ScoreProvider::new(&alphabet, matrix, GapCosts::affine(open, extend), Some(1.0));
            Self {
                reference: SequenceBuffer::from_records(&alphabet, [("r", r)]),
                query: SequenceBuffer::from_records(&alphabet, [("q", q)]),
                unmasked: unmasking_table(&alphabet),
                provider,
            }
        }

        fn inputs(&self, mask_lowercase: u8) -> ScoringInputs<'_> {
            ScoringInputs {
                provider: &self.provider,
                reference: &self.reference,
                query: &self.query,
                pssm: None,
                unmasked: &self.unmasked,
                mask_lowercase,
            }
        }
    }

    #[test]
    fn test_case_sensitivity_by_phase() {
        assert!(!Phase::Gapless.is_case_sensitive(0));
        assert!(Phase::Gapless.is_case_sensitive(1));
        assert!(!Phase::Gapped.is_case_sensitive(1));
        assert!(Phase::Final.is_case_sensitive(3));
    }

    #[test]
    fn test_identical_sequences_gapless() {
        let f = Fixture::new(b"ACGTACGT", b"ACGTACGT", 5, 1);
        let d = Dispatcher::new(Phase::Gapless, 10, &f.inputs(0));
        assert_eq!(d.scoring().name(), "plain");
        let sp = d.extend_seed(3, 3);
        assert_eq!(sp, SegmentPair::new(1, 1, 8, 8));
        assert!(d.is_optimal_gapless(&sp));
        assert_eq!(d.gapless_score(1, 1, 8), 8);
    }

    #[test]
    fn test_lowercase_masked_only_when_case_sensitive() {
        let f = Fixture::new(b"ACGTacgt", b"ACGTACGT", 5, 1);
        let plain = Dispatcher::new(Phase::Gapless, 10, &f.inputs(0));
        assert_eq!(plain.extend_seed(1, 1).score, 8);
        let masked = Dispatcher::new(Phase::Gapless, 10, &f.inputs(1));
        assert_eq!(masked.extend_seed(1, 1).score, 4);
    }

    #[test]
    fn test_gapped_keeps_seed_and_adds_flanks() {
        let f = Fixture::new(b"GGGGAAAACGTACGTA", b"GGGGAAAATCGTACGTA", 2, 1);
        let d = Dispatcher::new(Phase::Gapped, 20, &f.inputs(0));
        let seed = SegmentPair::new(5, 5, 4, 4);
        let mut aligner = GappedXdropAligner::new();
        let aln = d.extend_gapped(&mut aligner, &seed, 100).unwrap();
        assert_eq!(cigar::to_string(&aln.ops), "8M1I8M");
        assert_eq!((aln.ref_start, aln.query_start), (1, 1));
        assert_eq!(aln.score, 16 - 3);
        assert_eq!(d.replay_score(&aln), aln.score);
        assert!(d.is_optimal(&aln));
    }

    #[test]
    fn test_final_matches_gapped_without_refinement() {
        let f = Fixture::new(b"GGGGAAAACGTACGTA", b"GGGGAAAATCGTACGTA", 2, 1);
        let d = Dispatcher::new(Phase::Final, 20, &f.inputs(0));
        let seed = SegmentPair::new(1, 1, 8, 8);
        let (mut gapped, mut centroid) = (GappedXdropAligner::new(), CentroidAligner::new());
        let (aln, xdrop) = d
            .extend_final(&mut gapped, &mut centroid, &seed, Refinement::None, 100)
            .unwrap();
        assert_eq!(cigar::to_string(&aln.ops), "8M1I8M");
        assert_eq!(xdrop, 13);
        assert_eq!(aln.score, 13);
        assert_eq!(aln.seed, seed);
        assert!(aln.posterior.is_none());
    }

    #[test]
    fn test_final_posterior_profile_covers_every_column() {
        let f = Fixture::new(b"ACGTACGTAC", b"ACGTACGTAC", 5, 1);
        let d = Dispatcher::new(Phase::Final, 20, &f.inputs(0));
        let seed = SegmentPair::new(1, 1, 10, 10);
        let (mut gapped, mut centroid) = (GappedXdropAligner::new(), CentroidAligner::new());
        let (aln, _) = d
            .extend_final(
                &mut gapped,
                &mut centroid,
                &seed,
                Refinement::Posterior { temperature: 1.0 },
                100,
            )
            .unwrap();
        let profile = aln.posterior.as_ref().unwrap();
        assert_eq!(profile.len(), cigar::column_count(&aln.ops));
        assert!(profile.iter().all(|&p| (0.0..=1.0).contains(&p)));
        assert!(aln.mean_posterior().unwrap() > 0.5);
    }

    #[test]
    fn test_final_centroid_reports_replayed_score() {
        let f = Fixture::new(b"ACGTACGTAC", b"ACGTACGTAC", 5, 1);
        let d = Dispatcher::new(Phase::Final, 20, &f.inputs(0));
        let seed = SegmentPair::new(1, 1, 10, 10);
        let (mut gapped, mut centroid) = (GappedXdropAligner::new(), CentroidAligner::new());
        let refinement = Refinement::Centroid {
            temperature: 1.0,
            gamma: 1.0,
            min_posterior: 0.0,
        };
        let (aln, xdrop) = d
            .extend_final(&mut gapped, &mut centroid, &seed, refinement, 100)
            .unwrap();
        assert_eq!(xdrop, 10);
        assert_eq!(aln.score, d.replay_score(&aln));
        assert!(aln.score <= xdrop);
    }

    /// Query qualities always, reference qualities only when given.
    struct QualityFixture {
        base: Fixture,
        pssm: (Pssm, Pssm),
    }

    impl QualityFixture {
        fn new(r: &[u8], q: &[u8], query_quality: &[u8], reference_quality: Option<&[u8]>) -> Self {
            let alphabet = Alphabet::dna();
            let mut base = Fixture::new(r, q, 2, 1);
            let mut query = SequenceBuffer::new(alphabet.delimiter(), true);
            query.push_record("q", &alphabet.encode(q), Some(query_quality));
            if let Some(rq) = reference_quality {
                let mut reference = SequenceBuffer::new(alphabet.delimiter(), true);
                reference.push_record("r", &alphabet.encode(r), Some(rq));
                base.reference = reference;
                base.provider = base.provider.with_two_quality(&alphabet);
            }
            let qualities = query.qualities().unwrap();
            let pssm = (
                Pssm::from_qualities(&base.provider.matrix, &alphabet, query.as_slice(), qualities, 1.0),
                Pssm::from_qualities(&base.provider.masked_matrix, &alphabet, query.as_slice(), qualities, 1.0),
            );
            base.query = query;
            Self { base, pssm }
        }

        fn inputs(&self) -> ScoringInputs<'_> {
            ScoringInputs {
                pssm: Some((&self.pssm.0, &self.pssm.1)),
                ..self.base.inputs(0)
            }
        }
    }

    #[test]
    fn test_scorer_follows_available_qualities() {
        let quals = [40u8; 8];
        let query_only = QualityFixture::new(b"ACGTACGT", b"ACGTACGT", &quals, None);
        let d = Dispatcher::new(Phase::Gapless, 10, &query_only.inputs());
        assert_eq!(d.scoring().name(), "pssm");
        // Without a PSSM the query qualities alone do not change the scorer.
        let d = Dispatcher::new(Phase::Gapless, 10, &query_only.base.inputs(0));
        assert_eq!(d.scoring().name(), "plain");

        let both = QualityFixture::new(b"ACGTACGT", b"ACGTACGT", &quals, Some(&quals[..]));
        for phase in [Phase::Gapless, Phase::Gapped, Phase::Final] {
            let d = Dispatcher::new(phase, 10, &both.inputs());
            assert_eq!(d.scoring().name(), "two-quality");
        }
    }

    #[test]
    fn test_low_quality_column_scores_less() {
        let quals = [40, 40, 40, 40, 2, 40, 40, 40];
        let f = QualityFixture::new(b"ACGTACGT", b"ACGTACGT", &quals, None);
        let d = Dispatcher::new(Phase::Gapless, 10, &f.inputs());
        assert_eq!(d.extend_seed(3, 3), SegmentPair::new(1, 1, 8, 7));
        assert_eq!(d.gapless_score(5, 5, 1), 0);

        let both = QualityFixture::new(b"ACGTACGT", b"ACGTACGT", &quals, Some(&quals[..]));
        let d = Dispatcher::new(Phase::Gapless, 10, &both.inputs());
        assert_eq!(d.scoring().name(), "two-quality");
        assert!(d.extend_seed(3, 3).score < 8);
    }

    #[test]
    fn test_quality_scorers_bridge_insertion() {
        let (r, q): (&[u8], &[u8]) = (b"GGGGAAAACGTACGTA", b"GGGGAAAATCGTACGTA");
        let fixtures = [
            QualityFixture::new(r, q, &[40u8; 17], None),
            QualityFixture::new(r, q, &[40u8; 17], Some(&[40u8; 16][..])),
        ];
        for f in &fixtures {
            let d = Dispatcher::new(Phase::Gapped, 20, &f.inputs());
            let seed = SegmentPair::new(5, 5, 4, 4);
            let mut aligner = GappedXdropAligner::new();
            let aln = d.extend_gapped(&mut aligner, &seed, 100).unwrap();
            assert_eq!(cigar::to_string(&aln.ops), "8M1I8M", "{}", d.scoring().name());
            assert_eq!(aln.score, 13, "{}", d.scoring().name());
            assert_eq!(d.replay_score(&aln), aln.score);
        }
    }

    #[test]
    fn test_quality_scorers_support_centroid() {
        let quals = [40u8; 10];
        let fixtures = [
            QualityFixture::new(b"ACGTACGTAC", b"ACGTACGTAC", &quals, None),
            QualityFixture::new(b"ACGTACGTAC", b"ACGTACGTAC", &quals, Some(&quals[..])),
        ];
        let refinement = Refinement::Centroid {
            temperature: 1.0,
            gamma: 1.0,
            min_posterior: 0.0,
        };
        for f in &fixtures {
            let d = Dispatcher::new(Phase::Final, 20, &f.inputs());
            let seed = SegmentPair::new(1, 1, 10, 10);
            let (mut gapped, mut centroid) = (GappedXdropAligner::new(), CentroidAligner::new());
            let (aln, xdrop) = d
                .extend_final(&mut gapped, &mut centroid, &seed, refinement, 100)
                .unwrap();
            assert_eq!(xdrop, 10, "{}", d.scoring().name());
            assert_eq!(aln.score, d.replay_score(&aln));
            let profile = aln.posterior.as_ref().unwrap();
            assert_eq!(profile.len(), cigar::column_count(&aln.ops));
            assert!(profile.iter().all(|&p| (0.0..=1.0).contains(&p)));
        }
    }
}
