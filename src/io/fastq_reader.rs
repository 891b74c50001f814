// FASTQ reader module using bio::io::fastq
//
// Qualities are stored as phred values (ASCII minus the offset), capped at the
// highest level the quality tables model.

use bio::io::fastq;
use std::io;
use std::path::Path;

use super::open_input;
use crate::alphabet::Alphabet;
use crate::defaults::{FASTQ_OFFSET, MAX_QUALITY};
use crate::sequence::SequenceBuffer;

/// Convert ASCII quality characters to phred values.
pub fn decode_qualities(ascii: &[u8]) -> io::Result<Vec<u8>> {
    ascii
        .iter()
        .map(|&c| {
            c.checked_sub(FASTQ_OFFSET)
                .map(|q| q.min(MAX_QUALITY))
                .ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("quality character {:?} below offset {}", c as char, FASTQ_OFFSET),
                    )
                })
        })
        .collect()
}

/// Read every record of a FASTQ file (optionally gzipped) with its qualities.
pub fn read_sequences(path: &Path, alphabet: &Alphabet) -> io::Result<SequenceBuffer> {
    let reader = fastq::Reader::new(open_input(path)?);
    let mut buffer = SequenceBuffer::new(alphabet.delimiter(), true);
    for result in reader.records() {
        let record = result.map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        if record.qual().len() != record.seq().len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("record '{}' has mismatched sequence and quality lengths", record.id()),
            ));
        }
        let qualities = decode_qualities(record.qual())?;
        buffer.push_record(record.id(), &alphabet.encode(record.seq()), Some(&qualities));
    }
    log::debug!(
        "Read {} FASTQ records ({} letters) from {}",
        buffer.record_count(),
        buffer.len(),
        path.display()
    );
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_decode_qualities() {
        assert_eq!(decode_qualities(b"!+5I").unwrap(), vec![0, 10, 20, 40]);
        assert_eq!(decode_qualities(b"~").unwrap(), vec![MAX_QUALITY]);
        assert!(decode_qualities(b" ").is_err());
    }

    #[test]
    fn test_read_fastq_with_qualities() {
        let dna = Alphabet::dna();
        let mut file = tempfile::Builder::new().suffix(".fq").tempfile().unwrap();
        writeln!(file, "@read1\nACGT\n+\nII+!\n@read2\nGG\n+\n55").unwrap();
        file.flush().unwrap();

        let buf = read_sequences(file.path(), &dna).unwrap();
        assert_eq!(buf.record_count(), 2);
        assert_eq!(buf.name(1), "read2");
        let quals = buf.qualities().unwrap();
        let start = buf.record_start(0);
        assert_eq!(&quals[start..start + 4], &[40, 40, 10, 0]);
        assert_eq!(quals.len(), buf.len());
    }
}
