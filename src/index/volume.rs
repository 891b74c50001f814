// Reference volumes and their loaders.

use std::io;
use std::path::PathBuf;
use std::time::Instant;

use crate::alphabet::{Alphabet, SubsetAlphabet};
use crate::errors::{Result, ScanError};
use crate::io::fasta_reader::read_sequences;
use crate::sequence::SequenceBuffer;

use super::subset_suffix_array::SubsetSuffixArray;

/// Upper limit on seed patterns (and therefore suffix arrays) per volume.
pub const MAX_INDEXES: usize = 16;

/// How a volume is indexed.
#[derive(Debug, Clone)]
pub struct IndexParams {
    /// One subset pattern per suffix array, e.g. `"A C G T"` (exact) or `"AG CT"`.
    pub seeds: Vec<String>,
    /// Index every `step`-th position.
    pub step: usize,
    pub bucket_depth: usize,
    /// Lowercase reference letters may not start or extend seeds.
    pub mask_lowercase: bool,
}

impl IndexParams {
    pub fn subsets(&self, alphabet: &Alphabet) -> Result<Vec<SubsetAlphabet>> {
        if self.seeds.is_empty() || self.seeds.len() > MAX_INDEXES {
            return Err(ScanError::config(format!(
                "need 1 to {} seed patterns, got {}",
                MAX_INDEXES,
                self.seeds.len()
            )));
        }
        self.seeds
            .iter()
            .map(|p| SubsetAlphabet::from_pattern(alphabet, p, self.mask_lowercase))
            .collect()
    }
}

/// One loaded, indexed partition of the reference.
#[derive(Debug)]
pub struct Volume {
    pub number: usize,
    pub name: String,
    pub sequences: SequenceBuffer,
    pub indexes: Vec<SubsetSuffixArray>,
}

impl Volume {
    pub fn build(
        number: usize,
        name: &str,
        sequences: SequenceBuffer,
        subsets: &[SubsetAlphabet],
        params: &IndexParams,
    ) -> Self {
        let indexes = subsets
            .iter()
            .map(|s| SubsetSuffixArray::build(sequences.as_slice(), s.clone(), params.step, params.bucket_depth))
            .collect();
        Self {
            number,
            name: name.to_string(),
            sequences,
            indexes,
        }
    }
}

/// Source of volumes. `load` blocks the calling worker until the volume is ready.
pub trait VolumeLoader: Sync {
    fn volume_count(&self) -> usize;

    fn load(&self, number: usize) -> Result<Volume>;
}

/// Volumes held in memory, indexed on load.
pub struct InMemoryVolumes {
    subsets: Vec<SubsetAlphabet>,
    params: IndexParams,
    volumes: Vec<(String, SequenceBuffer)>,
}

impl InMemoryVolumes {
    pub fn new(alphabet: &Alphabet, params: IndexParams, volumes: Vec<(String, SequenceBuffer)>) -> Result<Self> {
        Ok(Self {
            subsets: params.subsets(alphabet)?,
            params,
            volumes,
        })
    }
}

impl VolumeLoader for InMemoryVolumes {
    fn volume_count(&self) -> usize {
        self.volumes.len()
    }

    fn load(&self, number: usize) -> Result<Volume> {
        let (name, seqs) = self.volumes.get(number).ok_or_else(|| ScanError::IndexLoad {
            volume: number,
            source: io::Error::new(io::ErrorKind::NotFound, "no such volume"),
        })?;
        Ok(Volume::build(number, name, seqs.clone(), &self.subsets, &self.params))
    }
}

/// One FASTA (or FASTQ) file per volume.
pub struct FastaVolumes {
    alphabet: Alphabet,
    subsets: Vec<SubsetAlphabet>,
    params: IndexParams,
    paths: Vec<PathBuf>,
}

impl FastaVolumes {
    pub fn new(alphabet: Alphabet, params: IndexParams, paths: Vec<PathBuf>) -> Result<Self> {
        Ok(Self {
            subsets: params.subsets(&alphabet)?,
            alphabet,
            params,
            paths,
        })
    }
}

impl VolumeLoader for FastaVolumes {
    fn volume_count(&self) -> usize {
        self.paths.len()
    }

    fn load(&self, number: usize) -> Result<Volume> {
        let start = Instant::now();
        let path = self.paths.get(number).ok_or_else(|| ScanError::IndexLoad {
            volume: number,
            source: io::Error::new(io::ErrorKind::NotFound, "no such volume"),
        })?;
        let sequences = read_sequences(path, &self.alphabet).map_err(|source| ScanError::IndexLoad {
            volume: number,
            source,
        })?;
        if sequences.is_empty() {
            return Err(ScanError::IndexLoad {
                volume: number,
                source: io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("{} has no sequences", path.display()),
                ),
            });
        }
        let volume = Volume::build(number, &path.display().to_string(), sequences, &self.subsets, &self.params);
        log::info!(
            "Loaded volume {} ({}) in {:.3}s: {} sequences, {} letters, {} indexes",
            number,
            path.display(),
            start.elapsed().as_secs_f64(),
            volume.sequences.record_count(),
            volume.sequences.len(),
            volume.indexes.len()
        );
        Ok(volume)
    }
}
