// FASTA reader module using bio::io::fasta
//
// Loads a whole file into one delimiter-separated SequenceBuffer. Gzip input is
// detected by the .gz extension. Files named .fq/.fastq are handed to the FASTQ
// reader so callers can stay format-agnostic.

use bio::io::fasta;
use std::io;
use std::path::Path;

use super::{fastq_reader, is_fastq_path, open_input};
use crate::alphabet::Alphabet;
use crate::sequence::SequenceBuffer;

/// Read every record of a FASTA or FASTQ file, encoded with `alphabet`.
///
/// # Returns
/// * `Ok(SequenceBuffer)`, with qualities when the file is FASTQ
/// * `Err(io::Error)` if the file cannot be opened or parsed
pub fn read_sequences(path: &Path, alphabet: &Alphabet) -> io::Result<SequenceBuffer> {
    if is_fastq_path(path) {
        return fastq_reader::read_sequences(path, alphabet);
    }
    let reader = fasta::Reader::new(open_input(path)?);
    let mut buffer = SequenceBuffer::new(alphabet.delimiter(), false);
    for result in reader.records() {
        let record = result.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        buffer.push_record(record.id(), &alphabet.encode(record.seq()), None);
    }
    log::debug!(
        "Read {} FASTA records ({} letters) from {}",
        buffer.record_count(),
        buffer.len(),
        path.display()
    );
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_read_plain_fasta() {
        let dna = Alphabet::dna();
        let mut file = tempfile::Builder::new().suffix(".fa").tempfile().unwrap();
        writeln!(file, ">chr1 first\nACGT\nac\n>chr2\nNNG").unwrap();
        file.flush().unwrap();

        let buf = read_sequences(file.path(), &dna).unwrap();
        assert_eq!(buf.record_count(), 2);
        assert_eq!(buf.name(0), "chr1");
        assert_eq!(buf.record(0), &dna.encode(b"ACGTac")[..]);
        assert_eq!(buf.record_len(1), 3);
        assert!(!buf.has_qualities());
    }

    #[test]
    fn test_read_gzipped_fasta() {
        let dna = Alphabet::dna();
        let file = tempfile::Builder::new().suffix(".fa.gz").tempfile().unwrap();
        let mut encoder = GzEncoder::new(file.reopen().unwrap(), Compression::default());
        encoder.write_all(b">g\nTTTT\n").unwrap();
        encoder.finish().unwrap();

        let buf = read_sequences(file.path(), &dna).unwrap();
        assert_eq!(buf.record_count(), 1);
        assert_eq!(buf.record(0), &dna.encode(b"TTTT")[..]);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dna = Alphabet::dna();
        assert!(read_sequences(Path::new("/nonexistent/ref.fa"), &dna).is_err());
    }
}
