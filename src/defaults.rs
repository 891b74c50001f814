// src/defaults.rs

// Seeding Constants
pub const MAX_HITS: usize = 10;
pub const MIN_HIT_DEPTH: usize = 1;
pub const QUERY_STEP: usize = 1;
pub const INDEX_STEP: usize = 1;
pub const BUCKET_DEPTH: usize = 4;
// Exact seeds: one symbol per letter
pub const DNA_SEED: &str = "A C G T";
pub const PROTEIN_SEED: &str = "A C D E F G H I K L M N P Q R S T V W Y";

// Scoring Constants
pub const MATCH_SCORE: i32 = 1;
pub const MISMATCH_COST: i32 = 1;
pub const GAP_OPEN: &str = "7";
pub const GAP_EXTEND: &str = "1";
pub const UNKNOWN_SCORE: i32 = -1;

// Extension Constants
pub const MIN_SCORE_GAPPED: i32 = 40;
pub const GAPLESS_DROP_PER_MATCH: i32 = 10;
pub const BAND_CEILING: usize = 2000;
pub const GAMMA: f64 = 1.0;
pub const MIN_POSTERIOR: f64 = 0.0;

// Other Constants
pub const VERBOSITY: i32 = 3;
pub const STRAND: u8 = 2;
pub const MASK_LOWERCASE: u8 = 0;
pub const FASTQ_OFFSET: u8 = 33;
pub const MAX_QUALITY: u8 = 63;
