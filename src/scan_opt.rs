use clap::{Args, ValueEnum};
use std::path::PathBuf;

use crate::defaults;
use crate::errors::{Result, ScanError};
use crate::scoring::{GapCosts, GapPiece, INF};

/// Largest drop threshold accepted; keeps running scores far from overflow.
pub const MAX_DROP: i32 = INF / 4;

/// Largest match score or mismatch cost accepted.
pub const MAX_SCORE: i32 = MAX_DROP / defaults::GAPLESS_DROP_PER_MATCH;

/// What a scan reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputMode {
    /// Seed match counts per query and strand, no alignment.
    #[value(name = "counts")]
    MatchCounts,
    /// Gapless segment pairs.
    Gapless,
    /// Gapped alignments, without the final realignment.
    Gapped,
    /// Gapped alignments refined by the final, most permissive pass.
    #[default]
    Final,
    /// Final alignments with a per-column posterior probability profile.
    Posterior,
    /// Final pass replaced by the centroid (maximum expected accuracy) alignment.
    Centroid,
}

impl OutputMode {
    /// True when the final pass needs forward/backward probabilities.
    pub fn is_probabilistic(self) -> bool {
        matches!(self, Self::Posterior | Self::Centroid)
    }
}

/// Scan options. Optional thresholds are derived from the others when unset.
#[derive(Debug, Clone)]
pub struct ScanOpt {
    // Seeding parameters
    pub seeds: Vec<String>,    // Subset seed patterns, e.g. "A C G T"; empty = exact seeds for the alphabet
    pub max_hits: usize,       // Lengthen seeds until they have at most this many hits
    pub min_hit_depth: usize,  // Minimum seed length
    pub query_step: usize,     // Look up seeds at every step-th query position
    pub index_step: usize,     // Index every step-th reference position
    pub bucket_depth: usize,   // Depth of the seed lookup tables

    // Scoring parameters
    pub match_score: i32,             // Match score (DNA, without matrix)
    pub mismatch_cost: i32,           // Mismatch cost (DNA, without matrix)
    pub matrix: Option<String>,       // "BLOSUM62" or a matrix file
    pub gap_open: String,             // Deletion open cost(s), "a" or "a,b"
    pub gap_extend: String,           // Deletion extend cost(s)
    pub insertion_open: Option<String>,   // Insertion open cost(s); default = deletion
    pub insertion_extend: Option<String>, // Insertion extend cost(s); default = deletion
    pub temperature: Option<f64>,     // 1/lambda of the score model
    pub mask_lowercase: u8,           // Phases below this index treat lowercase as masked

    // Thresholds
    pub min_score_gapped: i32,           // Minimum reportable score
    pub min_score_gapless: Option<i32>,  // Minimum gapless score [3/5 of min_score_gapped]
    pub max_drop_gapless: Option<i32>,   // [min(10 * best match score, gapped drop)]
    pub max_drop_gapped: Option<i32>,    // [min_score_gapped - 1]
    pub max_drop_final: Option<i32>,     // [gapped drop]
    pub band_ceiling: usize,             // Widest DP row before a candidate is dropped

    // Output parameters
    pub output: OutputMode,
    pub gamma: f64,         // Centroid gain parameter
    pub min_posterior: f64, // Trim centroid alignments below this column probability

    // Search space
    pub strand: u8,                   // 0 = reverse, 1 = forward, 2 = both
    pub protein: bool,                // Reference and queries are protein
    pub translate: bool,              // DNA queries against a protein reference
    pub genetic_code: Option<String>, // 64-letter NCBI amino acid string (TCAG order)

    // Processing parameters
    pub threads: usize,
    pub verbosity: i32, // Verbosity level (1=error, 2=warning, 3=message, 4+=debug)
}

impl Default for ScanOpt {
    fn default() -> Self {
        Self {
            seeds: Vec::new(),
            max_hits: defaults::MAX_HITS,
            min_hit_depth: defaults::MIN_HIT_DEPTH,
            query_step: defaults::QUERY_STEP,
            index_step: defaults::INDEX_STEP,
            bucket_depth: defaults::BUCKET_DEPTH,

            match_score: defaults::MATCH_SCORE,
            mismatch_cost: defaults::MISMATCH_COST,
            matrix: None,
            gap_open: defaults::GAP_OPEN.to_string(),
            gap_extend: defaults::GAP_EXTEND.to_string(),
            insertion_open: None,
            insertion_extend: None,
            temperature: None,
            mask_lowercase: defaults::MASK_LOWERCASE,

            min_score_gapped: defaults::MIN_SCORE_GAPPED,
            min_score_gapless: None,
            max_drop_gapless: None,
            max_drop_gapped: None,
            max_drop_final: None,
            band_ceiling: defaults::BAND_CEILING,

            output: OutputMode::default(),
            gamma: defaults::GAMMA,
            min_posterior: defaults::MIN_POSTERIOR,

            strand: defaults::STRAND,
            protein: false,
            translate: false,
            genetic_code: None,

            threads: 1,
            verbosity: defaults::VERBOSITY,
        }
    }
}

// ============================================================================
// STAGE-SPECIFIC PARAMETER BUNDLES
// ============================================================================

/// Parameters for seed lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedParams {
    pub max_hits: usize,
    pub min_hit_depth: usize,
    pub query_step: usize,
}

/// Parameters for gapless extension and filtering
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GaplessParams {
    pub max_drop: i32,
    pub min_score: i32,
}

/// Parameters for gapped extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GappedParams {
    pub max_drop: i32,
    pub min_score: i32,
    pub band_ceiling: usize,
}

/// How the final pass refines each alignment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Refinement {
    None,
    Posterior { temperature: f64 },
    Centroid { temperature: f64, gamma: f64, min_posterior: f64 },
}

/// Parameters for the final pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FinalParams {
    pub max_drop: i32,
    pub refinement: Refinement,
}

/// Parse "INT" or "INT,INT".
pub fn parse_int_list(s: &str) -> std::result::Result<Vec<i32>, String> {
    s.split(',')
        .map(|part| {
            part.trim()
                .parse::<i32>()
                .map_err(|_| format!("Invalid integer '{}' in '{}'", part, s))
        })
        .collect()
}

/// Parse one- or two-piece gap costs, e.g. open "7,20" with extend "1,0".
pub fn parse_gap_costs(open: &str, extend: &str) -> std::result::Result<Vec<GapPiece>, String> {
    let open = parse_int_list(open)?;
    let extend = parse_int_list(extend)?;
    GapCosts::from_lists(&open, &extend).map_err(|e| e.to_string())
}

impl ScanOpt {
    pub fn seed_params(&self) -> SeedParams {
        SeedParams {
            max_hits: self.max_hits,
            min_hit_depth: self.min_hit_depth,
            query_step: self.query_step,
        }
    }

    /// Gapped X-drop threshold.
    pub fn gapped_drop(&self) -> i32 {
        self.max_drop_gapped
            .unwrap_or(self.min_score_gapped.saturating_sub(1))
    }

    /// `max_match_score` is the best entry of the substitution matrix.
    pub fn gapless_params(&self, max_match_score: i32) -> GaplessParams {
        let gapped = self.gapped_drop();
        GaplessParams {
            max_drop: self
                .max_drop_gapless
                .unwrap_or_else(|| {
                    max_match_score
                        .saturating_mul(defaults::GAPLESS_DROP_PER_MATCH)
                        .min(gapped)
                }),
            min_score: self
                .min_score_gapless
                .unwrap_or_else(|| (self.min_score_gapped as i64 * 3 / 5) as i32),
        }
    }

    pub fn gapped_params(&self) -> GappedParams {
        GappedParams {
            max_drop: self.gapped_drop(),
            min_score: self.min_score_gapped,
            band_ceiling: self.band_ceiling,
        }
    }

    pub fn final_params(&self) -> FinalParams {
        let refinement = match (self.output, self.temperature) {
            (OutputMode::Posterior, Some(temperature)) => Refinement::Posterior { temperature },
            (OutputMode::Centroid, Some(temperature)) => Refinement::Centroid {
                temperature,
                gamma: self.gamma,
                min_posterior: self.min_posterior,
            },
            _ => Refinement::None,
        };
        FinalParams {
            max_drop: self.max_drop_final.unwrap_or_else(|| self.gapped_drop()),
            refinement,
        }
    }

    /// Deletion and insertion gap costs.
    pub fn gap_costs(&self) -> Result<GapCosts> {
        let deletion = parse_gap_costs(&self.gap_open, &self.gap_extend).map_err(ScanError::config)?;
        let insertion = match (&self.insertion_open, &self.insertion_extend) {
            (None, None) => deletion.clone(),
            (open, extend) => parse_gap_costs(
                open.as_deref().unwrap_or(&self.gap_open),
                extend.as_deref().unwrap_or(&self.gap_extend),
            )
            .map_err(ScanError::config)?,
        };
        GapCosts::new(deletion, insertion)
    }

    /// Check every option; all problems are reported together.
    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.max_hits == 0 {
            errors.push("max_hits must be >= 1".to_string());
        }
        if self.min_hit_depth == 0 {
            errors.push("min_hit_depth must be >= 1".to_string());
        }
        if self.query_step == 0 || self.index_step == 0 {
            errors.push("query_step and index_step must be >= 1".to_string());
        }
        if self.bucket_depth > 16 {
            errors.push(format!("bucket_depth must be <= 16, got {}", self.bucket_depth));
        }
        if self.match_score <= 0 || self.mismatch_cost < 0 {
            errors.push(format!(
                "match score must be > 0 and mismatch cost >= 0, got {},{}",
                self.match_score, self.mismatch_cost
            ));
        }
        if self.match_score > MAX_SCORE || self.mismatch_cost > MAX_SCORE {
            errors.push(format!(
                "match score and mismatch cost must be <= {}, got {},{}",
                MAX_SCORE, self.match_score, self.mismatch_cost
            ));
        }
        if self.mask_lowercase > 3 {
            errors.push(format!("mask_lowercase must be 0..=3, got {}", self.mask_lowercase));
        }
        if self.strand > 2 {
            errors.push(format!("strand must be 0, 1 or 2, got {}", self.strand));
        }
        if !(1..=MAX_DROP).contains(&self.min_score_gapped) {
            errors.push(format!(
                "min_score_gapped must be in 1..={}, got {}",
                MAX_DROP, self.min_score_gapped
            ));
        }
        if let Some(s) = self.min_score_gapless {
            if !(1..=MAX_DROP).contains(&s) {
                errors.push(format!("min_score_gapless must be in 1..={}, got {}", MAX_DROP, s));
            }
        }
        for (label, drop) in [
            ("gapless", self.max_drop_gapless),
            ("gapped", self.max_drop_gapped),
            ("final", self.max_drop_final),
        ] {
            if let Some(d) = drop {
                if !(0..=MAX_DROP).contains(&d) {
                    errors.push(format!("{} drop must be in 0..={}, got {}", label, MAX_DROP, d));
                }
            }
        }
        let gapped = self.gapped_drop();
        if let Some(gapless) = self.max_drop_gapless {
            if gapless > gapped {
                errors.push(format!(
                    "gapless drop {} exceeds gapped drop {}",
                    gapless, gapped
                ));
            }
        }
        if let Some(fin) = self.max_drop_final {
            if fin < gapped {
                errors.push(format!("final drop {} is below gapped drop {}", fin, gapped));
            }
        }
        if self.band_ceiling == 0 {
            errors.push("band_ceiling must be >= 1".to_string());
        }
        if let Some(t) = self.temperature {
            if !(t.is_finite() && t > 0.0) {
                errors.push(format!("temperature must be > 0, got {}", t));
            }
        }
        if self.output.is_probabilistic() && self.temperature.is_none() {
            errors.push("posterior and centroid output need a temperature".to_string());
        }
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            errors.push(format!("gamma must be > 0, got {}", self.gamma));
        }
        if !(0.0..=1.0).contains(&self.min_posterior) {
            errors.push(format!("min_posterior must be in 0..=1, got {}", self.min_posterior));
        }
        if self.translate && self.protein {
            errors.push("translated search needs DNA queries; drop the protein flag".to_string());
        }
        if self.genetic_code.is_some() && !self.translate {
            errors.push("a genetic code is only used with translated search".to_string());
        }
        if self.seeds.len() > crate::index::MAX_INDEXES {
            errors.push(format!(
                "at most {} seed patterns, got {}",
                crate::index::MAX_INDEXES,
                self.seeds.len()
            ));
        }
        if self.threads == 0 {
            errors.push("threads must be >= 1".to_string());
        }
        if let Err(e) = self.gap_costs() {
            match e {
                ScanError::Configuration(msgs) => errors.extend(msgs),
                other => errors.push(other.to_string()),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ScanCliOptions {
    /// Reference FASTA/FASTQ file(s); each file is one volume
    #[arg(value_name = "REF.FA", required = true)]
    pub references: Vec<PathBuf>,

    /// Query FASTA or FASTQ file (.fq/.fastq carry qualities)
    #[arg(short = 'Q', long, value_name = "QUERY.FA")]
    pub queries: PathBuf,

    // ===== Seeding Options =====
    /// Subset seed pattern, e.g. "A C G T" (exact) or "AG CT"; repeat for several indexes
    #[arg(long = "seed", value_name = "PATTERN")]
    pub seeds: Vec<String>,

    /// Lengthen seeds until they have at most INT hits
    #[arg(short = 'm', long, value_name = "INT", default_value_t = defaults::MAX_HITS)]
    pub max_hits: usize,

    /// Minimum seed length
    #[arg(short = 'l', long, value_name = "INT", default_value_t = defaults::MIN_HIT_DEPTH)]
    pub min_hit_depth: usize,

    /// Look up seeds at every INT-th query position
    #[arg(short = 'k', long, value_name = "INT", default_value_t = defaults::QUERY_STEP)]
    pub query_step: usize,

    /// Index every INT-th reference position
    #[arg(short = 'w', long, value_name = "INT", default_value_t = defaults::INDEX_STEP)]
    pub index_step: usize,

    /// Depth of seed lookup tables
    #[arg(long, value_name = "INT", default_value_t = defaults::BUCKET_DEPTH)]
    pub bucket_depth: usize,

    // ===== Scoring Options =====
    /// Match score
    #[arg(short = 'r', long, value_name = "INT", default_value_t = defaults::MATCH_SCORE)]
    pub match_score: i32,

    /// Mismatch cost
    #[arg(short = 'q', long, value_name = "INT", default_value_t = defaults::MISMATCH_COST)]
    pub mismatch_cost: i32,

    /// Substitution matrix: BLOSUM62 or a file in BLAST format
    #[arg(short = 'p', long, value_name = "NAME|FILE")]
    pub matrix: Option<String>,

    /// Gap open cost(s); two values give two-piece gap costs
    #[arg(short = 'a', long, value_name = "INT[,INT]", default_value = defaults::GAP_OPEN)]
    pub gap_open: String,

    /// Gap extend cost(s); a gap of size k costs open + extend*k
    #[arg(short = 'b', long, value_name = "INT[,INT]", default_value = defaults::GAP_EXTEND)]
    pub gap_extend: String,

    /// Insertion open cost(s) [same as deletions]
    #[arg(short = 'A', long, value_name = "INT[,INT]")]
    pub insertion_open: Option<String>,

    /// Insertion extend cost(s) [same as deletions]
    #[arg(short = 'B', long, value_name = "INT[,INT]")]
    pub insertion_extend: Option<String>,

    /// Temperature (1/lambda) of the score model; needed for qualities and posteriors
    #[arg(short = 't', long, value_name = "FLOAT")]
    pub temperature: Option<f64>,

    /// Lowercase masking: 0=off, 1=gapless, 2=gapless+gapped, 3=all phases
    #[arg(short = 'u', long, value_name = "INT", default_value_t = defaults::MASK_LOWERCASE)]
    pub mask_lowercase: u8,

    // ===== Threshold Options =====
    /// Minimum score for gapped alignments
    #[arg(short = 'e', long, value_name = "INT", default_value_t = defaults::MIN_SCORE_GAPPED)]
    pub min_score_gapped: i32,

    /// Minimum score for gapless alignments [3/5 of -e]
    #[arg(short = 'd', long, value_name = "INT")]
    pub min_score_gapless: Option<i32>,

    /// Maximum score drop for gapless extension
    #[arg(short = 'y', long, value_name = "INT")]
    pub max_drop_gapless: Option<i32>,

    /// Maximum score drop for gapped extension [-e minus 1]
    #[arg(short = 'x', long, value_name = "INT")]
    pub max_drop_gapped: Option<i32>,

    /// Maximum score drop for the final pass [same as -x]
    #[arg(short = 'z', long, value_name = "INT")]
    pub max_drop_final: Option<i32>,

    /// Widest DP row before a candidate is dropped
    #[arg(long, value_name = "INT", default_value_t = defaults::BAND_CEILING)]
    pub band_ceiling: usize,

    // ===== Output Options =====
    /// What to report
    #[arg(short = 'j', long, value_enum, default_value_t = OutputMode::Final)]
    pub output_mode: OutputMode,

    /// Centroid gain parameter
    #[arg(long, value_name = "FLOAT", default_value_t = defaults::GAMMA)]
    pub gamma: f64,

    /// Trim centroid alignments to columns with at least this posterior
    #[arg(long, value_name = "FLOAT", default_value_t = defaults::MIN_POSTERIOR)]
    pub min_posterior: f64,

    /// Output file (default: stdout)
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    // ===== Search Space =====
    /// Query strand: 0=reverse, 1=forward, 2=both
    #[arg(short = 's', long, value_name = "INT", default_value_t = defaults::STRAND)]
    pub strand: u8,

    /// Sequences are protein
    #[arg(long)]
    pub protein: bool,

    /// Translate DNA queries against a protein reference
    #[arg(short = 'F', long)]
    pub translate: bool,

    /// Genetic code as a 64-letter NCBI amino acid string
    #[arg(long, value_name = "STR")]
    pub genetic_code: Option<String>,

    // ===== Processing Options =====
    /// Number of threads (default: all available cores)
    #[arg(short = 'P', long, value_name = "INT")]
    pub threads: Option<usize>,

    /// Verbose level: 1=error, 2=warning, 3=message, 4=debug, 5+=trace
    #[arg(short = 'v', long, value_name = "INT", default_value_t = defaults::VERBOSITY)]
    pub verbosity: i32,
}

impl ScanCliOptions {
    /// Build the scan options; `threads` is the already-capped worker count.
    pub fn to_scan_opt(&self, threads: usize) -> ScanOpt {
        ScanOpt {
            seeds: self.seeds.clone(),
            max_hits: self.max_hits,
            min_hit_depth: self.min_hit_depth,
            query_step: self.query_step,
            index_step: self.index_step,
            bucket_depth: self.bucket_depth,
            match_score: self.match_score,
            mismatch_cost: self.mismatch_cost,
            matrix: self.matrix.clone(),
            gap_open: self.gap_open.clone(),
            gap_extend: self.gap_extend.clone(),
            insertion_open: self.insertion_open.clone(),
            insertion_extend: self.insertion_extend.clone(),
            temperature: self.temperature,
            mask_lowercase: self.mask_lowercase,
            min_score_gapped: self.min_score_gapped,
            min_score_gapless: self.min_score_gapless,
            max_drop_gapless: self.max_drop_gapless,
            max_drop_gapped: self.max_drop_gapped,
            max_drop_final: self.max_drop_final,
            band_ceiling: self.band_ceiling,
            output: self.output_mode,
            gamma: self.gamma,
            min_posterior: self.min_posterior,
            strand: self.strand,
            protein: self.protein,
            translate: self.translate,
            genetic_code: self.genetic_code.clone(),
            threads,
            verbosity: self.verbosity,
        }
    }
}
