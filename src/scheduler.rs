//! Volume scheduler.
//!
//! A fixed pool of workers pulls volume numbers from one shared cursor. Each
//! worker loads its volume, scans every query strand against it with its own
//! workspace, and keeps the results privately until the pool finishes. The
//! first fatal error stops every worker from taking more volumes and is
//! returned together with the status of each volume.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use thiserror::Error;

use crate::alignment::pipeline::{scan_strand, ScanStats, StrandResults};
use crate::alignment::record::AlignmentRecord;
use crate::alignment::workspace::ScanWorkspace;
use crate::context::{ScanContext, Strand};
use crate::errors::ScanError;
use crate::index::VolumeLoader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeStatus {
    /// Never taken by a worker.
    Pending,
    /// Every strand scanned.
    Scanned,
    /// Taken but not finished.
    Abandoned,
}

/// A halted run: the error that stopped it and how far each volume got.
#[derive(Error, Debug)]
#[error("scan halted: {error}")]
pub struct RunFailure {
    #[source]
    pub error: ScanError,
    pub volumes: Vec<VolumeStatus>,
}

impl RunFailure {
    pub fn volumes_with(&self, status: VolumeStatus) -> Vec<usize> {
        self.volumes
            .iter()
            .enumerate()
            .filter(|&(_, &s)| s == status)
            .map(|(v, _)| v)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    LoadVolume(usize),
    ScanStrand {
        volume: usize,
        strand: Strand,
        frame: Option<usize>,
    },
    Done,
}

#[derive(Debug, Clone)]
pub struct WorkerReport {
    pub worker: usize,
    /// Volumes this worker scanned, in the order it took them.
    pub volumes: Vec<usize>,
    pub final_state: WorkerState,
    pub stats: ScanStats,
}

/// Merged results of a completed run.
#[derive(Debug, Default)]
pub struct ScanOutput {
    /// Sorted by volume, strand, frame and reference position.
    pub records: Vec<AlignmentRecord>,
    pub match_counts: BTreeMap<(usize, Strand), Vec<u64>>,
    pub stats: ScanStats,
    /// One report per worker, by worker number.
    pub workers: Vec<WorkerReport>,
}

#[inline]
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

struct Shared<'a, L: VolumeLoader> {
    ctx: &'a ScanContext,
    loader: &'a L,
    volume_count: usize,
    cursor: Mutex<usize>,
    stop: AtomicBool,
    first_error: Mutex<Option<ScanError>>,
    statuses: Mutex<Vec<VolumeStatus>>,
}

type WorkerOutput = (WorkerReport, Vec<(usize, StrandResults)>);

impl<L: VolumeLoader> Shared<'_, L> {
    fn next_volume(&self) -> Option<usize> {
        if self.stop.load(Ordering::Acquire) {
            return None;
        }
        let mut cursor = lock(&self.cursor);
        if *cursor >= self.volume_count {
            return None;
        }
        let volume = *cursor;
        *cursor += 1;
        lock(&self.statuses)[volume] = VolumeStatus::Abandoned;
        Some(volume)
    }

    fn fail(&self, error: ScanError) {
        let mut slot = lock(&self.first_error);
        if slot.is_none() {
            *slot = Some(error);
        }
        self.stop.store(true, Ordering::Release);
    }

    fn run_worker(&self, worker: usize) -> WorkerOutput {
        let mut ws = ScanWorkspace::new();
        let mut state = WorkerState::Idle;
        let mut report = WorkerReport {
            worker,
            volumes: Vec::new(),
            final_state: WorkerState::Idle,
            stats: ScanStats::default(),
        };
        let mut results = Vec::new();

        while let Some(number) = self.next_volume() {
            enter(worker, &mut state, WorkerState::LoadVolume(number));
            let start = Instant::now();
            let volume = match self.loader.load(number) {
                Ok(volume) => volume,
                Err(e) => {
                    log::error!("Worker {} could not load volume {}: {}", worker, number, e);
                    self.fail(e);
                    break;
                }
            };

            let mut out = StrandResults::default();
            for strand in &self.ctx.strands {
                enter(
                    worker,
                    &mut state,
                    WorkerState::ScanStrand {
                        volume: number,
                        strand: strand.strand,
                        frame: strand.frame,
                    },
                );
                scan_strand(self.ctx, &volume, strand, &mut ws, &mut out);
            }

            log::debug!(
                "Worker {} scanned volume {} in {:.3}s: {} alignments, {} band overflows",
                worker,
                number,
                start.elapsed().as_secs_f64(),
                out.records.len(),
                out.stats.band_overflows
            );
            lock(&self.statuses)[number] = VolumeStatus::Scanned;
            report.stats.merge(&out.stats);
            report.volumes.push(number);
            results.push((number, out));
            enter(worker, &mut state, WorkerState::Idle);
        }

        enter(worker, &mut state, WorkerState::Done);
        report.final_state = state;
        (report, results)
    }
}

fn enter(worker: usize, state: &mut WorkerState, next: WorkerState) {
    log::trace!("Worker {}: {:?} -> {:?}", worker, state, next);
    *state = next;
}

/// Scan every volume of `loader` with `ctx.opt.threads` workers.
pub fn run_scan<L: VolumeLoader>(ctx: &ScanContext, loader: &L) -> Result<ScanOutput, RunFailure> {
    let start = Instant::now();
    let volume_count = loader.volume_count();
    let threads = ctx.opt.threads.max(1);

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| RunFailure {
            error: ScanError::config(format!("cannot start {} worker threads: {}", threads, e)),
            volumes: vec![VolumeStatus::Pending; volume_count],
        })?;

    let shared = Shared {
        ctx,
        loader,
        volume_count,
        cursor: Mutex::new(0),
        stop: AtomicBool::new(false),
        first_error: Mutex::new(None),
        statuses: Mutex::new(vec![VolumeStatus::Pending; volume_count]),
    };
    let outputs: Mutex<Vec<WorkerOutput>> = Mutex::new(Vec::with_capacity(threads));

    pool.scope(|scope| {
        for worker in 0..threads {
            let shared = &shared;
            let outputs = &outputs;
            scope.spawn(move |_| {
                let output = shared.run_worker(worker);
                lock(outputs).push(output);
            });
        }
    });

    let statuses = shared.statuses.into_inner().unwrap_or_else(|e| e.into_inner());
    if let Some(error) = shared.first_error.into_inner().unwrap_or_else(|e| e.into_inner()) {
        return Err(RunFailure {
            error,
            volumes: statuses,
        });
    }

    let mut outputs = outputs.into_inner().unwrap_or_else(|e| e.into_inner());
    outputs.sort_by_key(|(report, _)| report.worker);

    let mut per_volume: Vec<(usize, StrandResults)> = Vec::with_capacity(volume_count);
    let mut workers = Vec::with_capacity(outputs.len());
    for (report, results) in outputs {
        per_volume.extend(results);
        workers.push(report);
    }
    per_volume.sort_by_key(|(number, _)| *number);

    let mut merged = StrandResults::default();
    for (_, results) in per_volume {
        merged.merge(results);
    }
    merged.records.sort_by(|a, b| a.sort_cmp(b));

    log::info!(
        "Scanned {} volume(s) with {} worker(s) in {:.3}s: {} alignments, {} seeds, {} band overflows",
        volume_count,
        threads,
        start.elapsed().as_secs_f64(),
        merged.records.len(),
        merged.stats.seeds_tried,
        merged.stats.band_overflows
    );

    Ok(ScanOutput {
        records: merged.records,
        match_counts: merged.match_counts,
        stats: merged.stats,
        workers,
    })
}
