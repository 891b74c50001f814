use std::collections::BTreeMap;

use crate::context::{QueryStrand, ScanContext, Strand};
use crate::index::Volume;
use crate::scan_opt::OutputMode;

use super::dispatch::{Dispatcher, Phase, ScoringInputs};
use super::local_alignment::Alignment;
use super::record::AlignmentRecord;
use super::redundancy::{AlignmentPot, SegmentPairPot};
use super::segment_pair::SegmentPair;
use super::workspace::ScanWorkspace;

// ============================================================================
// SCAN STATISTICS
// ============================================================================

/// Counters for one strand scan; merged per worker and per run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub seeds_tried: u64,
    pub gapless_survivors: u64,
    pub gapped_survivors: u64,
    pub final_survivors: u64,
    pub band_overflows: u64,
    pub degenerate_records: u64,
}

impl ScanStats {
    pub fn merge(&mut self, other: &ScanStats) {
        self.seeds_tried += other.seeds_tried;
        self.gapless_survivors += other.gapless_survivors;
        self.gapped_survivors += other.gapped_survivors;
        self.final_survivors += other.final_survivors;
        self.band_overflows += other.band_overflows;
        self.degenerate_records += other.degenerate_records;
    }
}

/// Output of scanning query strands against one volume.
#[derive(Debug, Default)]
pub struct StrandResults {
    pub records: Vec<AlignmentRecord>,
    /// Per `(query id, strand)`: number of reference matches at each seed depth.
    pub match_counts: BTreeMap<(usize, Strand), Vec<u64>>,
    pub stats: ScanStats,
}

impl StrandResults {
    pub fn merge(&mut self, other: StrandResults) {
        self.records.extend(other.records);
        for (key, counts) in other.match_counts {
            add_counts(self.match_counts.entry(key).or_default(), &counts);
        }
        self.stats.merge(&other.stats);
    }
}

fn add_counts(total: &mut Vec<u64>, counts: &[u64]) {
    if total.len() < counts.len() {
        total.resize(counts.len(), 0);
    }
    for (t, &c) in total.iter_mut().zip(counts) {
        *t += c;
    }
}

// ============================================================================
// STRAND SCAN
// ============================================================================
//
// For every query record of one strand:
//   seeds -> gapless extension -> segment pair pot
//         -> gapped extension in rank order -> alignment pot
//         -> final realignment -> alignment pot -> records
// ============================================================================

/// Scan every query record of `strand` against `volume`. Per-candidate failures are
/// counted in `out.stats` and never abort the scan.
pub fn scan_strand(
    ctx: &ScanContext,
    volume: &Volume,
    strand: &QueryStrand,
    ws: &mut ScanWorkspace,
    out: &mut StrandResults,
) {
    let query = &strand.sequences;
    for record in 0..query.record_count() {
        if let Err(e) = query.check_record(record) {
            log::debug!("Skipping query: {}", e);
            out.stats.degenerate_records += 1;
            continue;
        }
        ws.start_query();
        if ctx.opt.output == OutputMode::MatchCounts {
            count_matches(ctx, volume, strand, record, ws, out);
        } else {
            align_record(ctx, volume, strand, record, ws, out);
        }
    }
}

fn count_matches(
    ctx: &ScanContext,
    volume: &Volume,
    strand: &QueryStrand,
    record: usize,
    ws: &mut ScanWorkspace,
    out: &mut StrandResults,
) {
    let query = &strand.sequences;
    let seq = query.as_slice();
    for y in (query.record_start(record)..query.record_end(record)).step_by(ctx.seed.query_step) {
        for index in &volume.indexes {
            index.count_matches(seq, y, &mut ws.counts);
        }
    }
    let key = (query.original_id(record), strand.strand);
    add_counts(out.match_counts.entry(key).or_default(), &ws.counts);
}

fn align_record(
    ctx: &ScanContext,
    volume: &Volume,
    strand: &QueryStrand,
    record: usize,
    ws: &mut ScanWorkspace,
    out: &mut StrandResults,
) {
    let inputs = ctx.scoring_inputs(&volume.sequences, strand);

    let mut gapless_pot = find_segment_pairs(ctx, volume, &inputs, record, ws, &mut out.stats);
    let segment_pairs = gapless_pot.survivors().len();
    out.stats.gapless_survivors += segment_pairs as u64;
    if segment_pairs == 0 {
        return;
    }

    let emit = |aln: &Alignment, records: &mut Vec<AlignmentRecord>| {
        records.push(AlignmentRecord::new(volume.number, &volume.sequences, strand, &ctx.queries, aln));
    };

    if ctx.opt.output == OutputMode::Gapless {
        for sp in gapless_pot.survivors() {
            emit(&Alignment::from_segment_pair(sp), &mut out.records);
        }
        return;
    }

    let mut gapped_pot = extend_gapped(ctx, &inputs, &mut gapless_pot, ws, &mut out.stats);
    out.stats.gapped_survivors += gapped_pot.survivors().len() as u64;

    if ctx.opt.output == OutputMode::Gapped {
        for aln in gapped_pot.survivors() {
            emit(aln, &mut out.records);
        }
        return;
    }

    let final_pot = extend_final(ctx, &inputs, gapped_pot, ws, &mut out.stats);
    let alignments = final_pot.into_survivors();
    out.stats.final_survivors += alignments.len() as u64;
    for aln in &alignments {
        emit(aln, &mut out.records);
    }
}

/// Seed lookup and gapless extension for one query record.
fn find_segment_pairs(
    ctx: &ScanContext,
    volume: &Volume,
    inputs: &ScoringInputs<'_>,
    record: usize,
    ws: &mut ScanWorkspace,
    stats: &mut ScanStats,
) -> SegmentPairPot {
    let dispatcher = Dispatcher::new(Phase::Gapless, ctx.gapless.max_drop, inputs);
    let query = inputs.query;
    let seq = query.as_slice();
    let mut pot = SegmentPairPot::new();

    for y in (query.record_start(record)..query.record_end(record)).step_by(ctx.seed.query_step) {
        for index in &volume.indexes {
            let Some(hit) = index.match_adaptive(seq, y, ctx.seed.max_hits, ctx.seed.min_hit_depth) else {
                continue;
            };
            for &x in index.positions(hit.range) {
                stats.seeds_tried += 1;
                if ws.diagonals.is_covered(x, y) {
                    continue;
                }
                let sp = dispatcher.extend_seed(x, y);
                ws.diagonals.add_endpoint(sp.ref_end(), sp.query_end());
                if sp.score >= ctx.gapless.min_score && dispatcher.is_optimal_gapless(&sp) {
                    pot.add(sp);
                }
            }
        }
    }
    pot
}

/// Gapped extension of segment pairs, best first; pairs inside an accepted
/// alignment are skipped.
fn extend_gapped(
    ctx: &ScanContext,
    inputs: &ScoringInputs<'_>,
    gapless_pot: &mut SegmentPairPot,
    ws: &mut ScanWorkspace,
    stats: &mut ScanStats,
) -> AlignmentPot {
    let dispatcher = Dispatcher::new(Phase::Gapped, ctx.gapped.max_drop, inputs);
    let mut pot = AlignmentPot::new();

    for k in gapless_pot.rank_order() {
        if gapless_pot.is_covered(k) {
            continue;
        }
        let seed: SegmentPair = gapless_pot.survivors()[k];
        let aln = match dispatcher.extend_gapped(&mut ws.gapped, &seed, ctx.gapped.band_ceiling) {
            Ok(aln) => aln,
            Err(e) => {
                log::debug!("Dropping seed at ({}, {}): {}", seed.ref_start, seed.query_start, e);
                stats.band_overflows += 1;
                continue;
            }
        };
        if aln.score < ctx.gapped.min_score || !dispatcher.is_optimal(&aln) {
            continue;
        }
        gapless_pot.mark_covered_by(&aln);
        pot.add(aln);
    }
    pot
}

/// Most permissive pass, with optional posterior or centroid refinement.
fn extend_final(
    ctx: &ScanContext,
    inputs: &ScoringInputs<'_>,
    gapped_pot: AlignmentPot,
    ws: &mut ScanWorkspace,
    stats: &mut ScanStats,
) -> AlignmentPot {
    let dispatcher = Dispatcher::new(Phase::Final, ctx.final_pass.max_drop, inputs);
    let mut pot = AlignmentPot::new();

    for gapped in gapped_pot.into_survivors() {
        let result = dispatcher.extend_final(
            &mut ws.gapped,
            &mut ws.centroid,
            &gapped.seed,
            ctx.final_pass.refinement,
            ctx.gapped.band_ceiling,
        );
        match result {
            Ok((aln, xdrop_score)) => {
                if xdrop_score >= ctx.gapped.min_score && !aln.ops.is_empty() {
                    pot.add(aln);
                }
            }
            Err(e) => {
                log::debug!(
                    "Dropping final alignment at ({}, {}): {}",
                    gapped.ref_start,
                    gapped.query_start,
                    e
                );
                stats.band_overflows += 1;
            }
        }
    }
    pot
}
