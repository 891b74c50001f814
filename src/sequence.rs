//! Concatenated, delimiter-separated sequence records.
//!
//! Every record is preceded and followed by the alphabet's delimiter code, so the
//! buffer for two records `AC` and `G` looks like `# A C # G #`. Extension code
//! relies on this: the delimiter scores `-INF`, which stops any X-drop walk before
//! it can leave a record.

use crate::alphabet::{Alphabet, GeneticCode};
use crate::errors::{Result, ScanError};

#[derive(Debug, Clone)]
pub struct SequenceBuffer {
    seq: Vec<u8>,
    qualities: Option<Vec<u8>>,
    names: Vec<String>,
    /// Start offset of each record in `seq`.
    starts: Vec<usize>,
    /// Original record number, so reversed buffers can map back.
    ids: Vec<usize>,
    delimiter: u8,
}

impl SequenceBuffer {
    /// Create an empty buffer holding only the leading delimiter.
    pub fn new(delimiter: u8, with_qualities: bool) -> Self {
        Self {
            seq: vec![delimiter],
            qualities: with_qualities.then(|| vec![0]),
            names: Vec::new(),
            starts: Vec::new(),
            ids: Vec::new(),
            delimiter,
        }
    }

    /// Convenience constructor from ASCII records, mostly for tests and benches.
    pub fn from_records<'a, I>(alphabet: &Alphabet, records: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [u8])>,
    {
        let mut buf = Self::new(alphabet.delimiter(), false);
        for (name, seq) in records {
            buf.push_record(name, &alphabet.encode(seq), None);
        }
        buf
    }

    /// Append one encoded record. Qualities are phred values without the ASCII offset.
    pub fn push_record(&mut self, name: &str, codes: &[u8], qualities: Option<&[u8]>) {
        let id = self.names.len();
        self.push_record_with_id(name, codes, qualities, id);
    }

    fn push_record_with_id(&mut self, name: &str, codes: &[u8], qualities: Option<&[u8]>, id: usize) {
        self.starts.push(self.seq.len());
        self.names.push(name.to_string());
        self.ids.push(id);
        self.seq.extend_from_slice(codes);
        self.seq.push(self.delimiter);
        if let Some(buf) = self.qualities.as_mut() {
            match qualities {
                Some(q) => buf.extend_from_slice(q),
                None => buf.resize(buf.len() + codes.len(), 0),
            }
            buf.push(0);
        }
    }

    /// The full coded buffer including delimiters.
    #[inline(always)]
    pub fn as_slice(&self) -> &[u8] {
        &self.seq
    }

    pub fn qualities(&self) -> Option<&[u8]> {
        self.qualities.as_deref()
    }

    pub fn has_qualities(&self) -> bool {
        self.qualities.is_some()
    }

    pub fn delimiter(&self) -> u8 {
        self.delimiter
    }

    pub fn len(&self) -> usize {
        self.seq.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn record_count(&self) -> usize {
        self.names.len()
    }

    pub fn name(&self, record: usize) -> &str {
        &self.names[record]
    }

    /// Record number in the buffer this one was derived from.
    pub fn original_id(&self, record: usize) -> usize {
        self.ids[record]
    }

    #[inline(always)]
    pub fn record_start(&self, record: usize) -> usize {
        self.starts[record]
    }

    /// Offset one past the last residue (the trailing delimiter).
    #[inline(always)]
    pub fn record_end(&self, record: usize) -> usize {
        match self.starts.get(record + 1) {
            Some(&next) => next - 1,
            None => self.seq.len() - 1,
        }
    }

    pub fn record_len(&self, record: usize) -> usize {
        self.record_end(record) - self.record_start(record)
    }

    pub fn record(&self, record: usize) -> &[u8] {
        &self.seq[self.record_start(record)..self.record_end(record)]
    }

    /// Record containing buffer offset `pos` (which must not be the leading delimiter).
    pub fn record_at(&self, pos: usize) -> usize {
        self.starts.partition_point(|&s| s <= pos).saturating_sub(1)
    }

    /// Reverse-complement the whole buffer: record order is reversed along with residues,
    /// so offsets map as `pos -> len - 1 - pos`.
    pub fn reverse_complement(&self, alphabet: &Alphabet) -> Self {
        let mut out = Self::new(self.delimiter, self.qualities.is_some());
        for record in (0..self.record_count()).rev() {
            let codes = alphabet.reverse_complement(self.record(record));
            let quals: Option<Vec<u8>> = self.qualities.as_ref().map(|q| {
                q[self.record_start(record)..self.record_end(record)]
                    .iter()
                    .rev()
                    .copied()
                    .collect()
            });
            out.push_record_with_id(self.name(record), &codes, quals.as_deref(), self.ids[record]);
        }
        out
    }

    /// Translate every record in one reading frame. Qualities are not carried over.
    pub fn translate(
        &self,
        code: &GeneticCode,
        dna: &Alphabet,
        protein: &Alphabet,
        frame: usize,
    ) -> Self {
        let mut out = Self::new(protein.delimiter(), false);
        for record in 0..self.record_count() {
            let aa = code.translate(dna, protein, self.record(record), frame);
            out.push_record_with_id(self.name(record), &aa, None, self.ids[record]);
        }
        out
    }

    /// Reject records that cannot be scanned.
    pub fn check_record(&self, record: usize) -> Result<()> {
        if self.record_len(record) == 0 {
            return Err(ScanError::DegenerateInput(format!(
                "record '{}' is empty",
                self.name(record)
            )));
        }
        Ok(())
    }
}
