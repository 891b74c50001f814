use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use ferrous_lastal::alphabet::{Alphabet, SubsetAlphabet};
use ferrous_lastal::context::{query_alphabet, ScanContext};
use ferrous_lastal::defaults;
use ferrous_lastal::index::{FastaVolumes, SubsetSuffixArray};
use ferrous_lastal::io::{fasta_reader, tabular_output};
use ferrous_lastal::scan_opt::{OutputMode, ScanCliOptions};
use ferrous_lastal::scheduler::{run_scan, VolumeStatus};

#[derive(Parser)]
#[command(name = "ferrous-lastal")]
#[command(about = "FerrousLastal - seed-and-extend local alignment of queries against reference volumes", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Align query sequences against one or more reference volumes
    Scan(ScanCliOptions),

    /// Report the reference positions where a word occurs exactly
    Find {
        /// Reference FASTA file
        #[arg(value_name = "REF.FA")]
        reference: PathBuf,

        /// Word to look up
        #[arg(value_name = "WORD")]
        pattern: String,

        /// Report at most INT positions
        #[arg(short = 'n', long, value_name = "INT", default_value_t = 100)]
        max_occurrences: usize,

        /// Subset seed pattern [exact letters]
        #[arg(long = "seed", value_name = "PATTERN")]
        seed: Option<String>,

        /// Sequences are protein
        #[arg(long)]
        protein: bool,
    },
}

/// Map verbosity (1=error, 2=warning, 3=message, 4=debug, 5+=trace) to a log level.
fn init_logger(verbosity: i32) {
    let log_level = match verbosity {
        v if v <= 1 => log::LevelFilter::Error,
        2 => log::LevelFilter::Warn,
        3 => log::LevelFilter::Info,
        4 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn worker_count(requested: Option<usize>) -> usize {
    let mut num_threads = requested.unwrap_or_else(num_cpus::get);
    if num_threads < 1 {
        log::warn!("Invalid thread count {}, using 1 thread", num_threads);
        num_threads = 1;
    }

    // Reasonable upper bound to prevent accidental resource exhaustion
    let max_threads = num_cpus::get() * 2;
    if num_threads > max_threads {
        log::warn!(
            "Thread count {} exceeds recommended maximum {}, capping at {}",
            num_threads,
            max_threads,
            max_threads
        );
        num_threads = max_threads;
    }
    num_threads
}

fn open_output(path: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    Ok(match path {
        Some(p) => Box::new(BufWriter::new(
            File::create(p).with_context(|| format!("Error creating output file {}", p.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout())),
    })
}

fn scan(cli: ScanCliOptions) -> Result<()> {
    let threads = worker_count(cli.threads);
    let opt = cli.to_scan_opt(threads);

    let queries = fasta_reader::read_sequences(&cli.queries, &query_alphabet(&opt))
        .with_context(|| format!("Error reading queries from {}", cli.queries.display()))?;
    log::info!(
        "Read {} queries ({} letters) from {}",
        queries.record_count(),
        queries.len(),
        cli.queries.display()
    );

    let ctx = ScanContext::new(opt, queries).context("Invalid scan options")?;
    log::info!(
        "Scanning {} reference volume(s) with {} thread(s), output mode {:?}",
        cli.references.len(),
        threads,
        ctx.opt.output
    );
    if ctx.opt.verbosity >= 3 {
        log::info!("Thresholds:");
        log::info!(
            "  Gapless: min score {}, drop {}",
            ctx.gapless.min_score,
            ctx.gapless.max_drop
        );
        log::info!(
            "  Gapped: min score {}, drop {}, band ceiling {}",
            ctx.gapped.min_score,
            ctx.gapped.max_drop,
            ctx.gapped.band_ceiling
        );
        log::info!("  Final: drop {}, {:?}", ctx.final_pass.max_drop, ctx.final_pass.refinement);
    }

    let loader = FastaVolumes::new(ctx.alphabet.clone(), ctx.index_params(), cli.references.clone())
        .context("Error preparing reference volumes")?;

    let output = match run_scan(&ctx, &loader) {
        Ok(output) => output,
        Err(failure) => {
            log::error!("Scanned volumes: {:?}", failure.volumes_with(VolumeStatus::Scanned));
            log::error!("Abandoned volumes: {:?}", failure.volumes_with(VolumeStatus::Abandoned));
            log::error!("Pending volumes: {:?}", failure.volumes_with(VolumeStatus::Pending));
            return Err(failure.into());
        }
    };

    let mut writer = open_output(cli.output.as_ref())?;
    if ctx.opt.output == OutputMode::MatchCounts {
        tabular_output::write_match_counts(
            &mut writer,
            &ctx.queries,
            &output.match_counts,
            ctx.opt.min_hit_depth,
        )
        .context("Error writing match counts")?;
    } else {
        tabular_output::write_header(&mut writer, ctx.opt.output.is_probabilistic())
            .and_then(|_| tabular_output::write_records(&mut writer, &output.records))
            .context("Error writing alignments")?;
    }
    writer.flush().context("Error flushing output")?;

    log::info!(
        "{} alignments from {} seeds ({} band overflows, {} degenerate records)",
        output.records.len(),
        output.stats.seeds_tried,
        output.stats.band_overflows,
        output.stats.degenerate_records
    );
    Ok(())
}

fn find(reference: PathBuf, pattern: String, max_occurrences: usize, seed: Option<String>, protein: bool) -> Result<()> {
    let alphabet = if protein { Alphabet::protein() } else { Alphabet::dna() };
    let default_seed = if protein { defaults::PROTEIN_SEED } else { defaults::DNA_SEED };
    let seed = seed.unwrap_or_else(|| default_seed.to_string());

    let sequences = fasta_reader::read_sequences(&reference, &alphabet)
        .with_context(|| format!("Error reading reference {}", reference.display()))?;
    let subset = SubsetAlphabet::from_pattern(&alphabet, &seed, false)?;
    let index = SubsetSuffixArray::build(sequences.as_slice(), subset, 1, defaults::BUCKET_DEPTH);

    let word = alphabet.encode(pattern.as_bytes());
    if word.iter().any(|&c| !alphabet.is_letter(c)) {
        bail!("'{}' contains letters outside the alphabet", pattern);
    }
    let total = index.count_occurrences(&word)?;
    let hits = index.find(&word, max_occurrences)?;
    log::info!("{} occurrence(s) of {}, reporting {}", total, pattern, hits.len());

    let stdout = io::stdout();
    let mut writer = BufWriter::new(stdout.lock());
    for pos in hits {
        let record = sequences.record_at(pos);
        writeln!(
            writer,
            "{}\t{}",
            sequences.name(record),
            pos - sequences.record_start(record)
        )?;
    }
    writer.flush()?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Scan(options) => {
            init_logger(options.verbosity);
            scan(options)
        }
        Commands::Find {
            reference,
            pattern,
            max_occurrences,
            seed,
            protein,
        } => {
            init_logger(defaults::VERBOSITY);
            find(reference, pattern, max_occurrences, seed, protein)
        }
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}
