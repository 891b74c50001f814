//! Read-only reference index.
//!
//! A [`Volume`] is one partition of the reference: its sequence buffer plus one
//! [`SubsetSuffixArray`] per seed pattern. Volumes are produced by a
//! [`VolumeLoader`] and never mutated once loaded, so workers share nothing but
//! the loader itself.

pub mod subset_suffix_array;
pub mod volume;

pub use subset_suffix_array::{SeedMatch, SubsetSuffixArray};
pub use volume::{FastaVolumes, InMemoryVolumes, IndexParams, Volume, VolumeLoader, MAX_INDEXES};
