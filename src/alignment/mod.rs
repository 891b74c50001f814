//! Seed-extend alignment: gapless, gapped and final phases for one query strand.

pub mod centroid;
pub mod cigar;
pub mod diagonal_table;
pub mod dispatch;
pub mod gapless;
pub mod gapped;
pub mod local_alignment;
pub mod pipeline;
pub mod record;
pub mod redundancy;
pub mod segment_pair;
pub mod workspace;

pub use local_alignment::Alignment;
pub use record::AlignmentRecord;
pub use segment_pair::SegmentPair;
