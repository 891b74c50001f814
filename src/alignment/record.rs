//! Alignments in record coordinates, ready for output.
//!
//! Pipeline alignments carry buffer offsets. A record resolves them to record
//! names, 0-based in-record starts and lengths. Query coordinates are on the
//! scanned strand; for translated search they are converted back to DNA
//! letters (`frame + 3 * protein position`).

use std::cmp::Ordering;

use crate::context::{QueryStrand, Strand};
use crate::sequence::SequenceBuffer;

use super::cigar::EditRun;
use super::local_alignment::Alignment;

#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentRecord {
    pub volume: usize,
    pub strand: Strand,
    pub frame: Option<usize>,
    pub score: i32,

    pub ref_name: String,
    pub ref_id: usize,
    pub ref_start: usize,
    pub ref_len: usize,
    pub ref_record_len: usize,

    pub query_name: String,
    pub query_id: usize,
    pub query_start: usize,
    pub query_len: usize,
    pub query_record_len: usize,

    pub ops: Vec<EditRun>,
    pub mean_posterior: Option<f64>,
}

impl AlignmentRecord {
    /// `originals` is the forward query set, which gives the untranslated record length.
    pub fn new(
        volume: usize,
        reference: &SequenceBuffer,
        query: &QueryStrand,
        originals: &SequenceBuffer,
        aln: &Alignment,
    ) -> Self {
        let r = reference.record_at(aln.ref_start);
        let q = query.sequences.record_at(aln.query_start);
        let query_id = query.sequences.original_id(q);
        let query_offset = aln.query_start - query.sequences.record_start(q);
        let (query_start, query_len) = match query.frame {
            Some(frame) => (frame + 3 * query_offset, 3 * aln.query_len()),
            None => (query_offset, aln.query_len()),
        };

        Self {
            volume,
            strand: query.strand,
            frame: query.frame,
            score: aln.score,
            ref_name: reference.name(r).to_string(),
            ref_id: reference.original_id(r),
            ref_start: aln.ref_start - reference.record_start(r),
            ref_len: aln.ref_len(),
            ref_record_len: reference.record_len(r),
            query_name: query.sequences.name(q).to_string(),
            query_id,
            query_start,
            query_len,
            query_record_len: originals.record_len(query_id),
            ops: aln.ops.clone(),
            mean_posterior: aln.mean_posterior(),
        }
    }

    /// Canonical output order: volume, strand, frame, reference position, then query
    /// position and best score first.
    pub fn sort_cmp(&self, other: &Self) -> Ordering {
        self.volume
            .cmp(&other.volume)
            .then(self.strand.cmp(&other.strand))
            .then(self.frame.cmp(&other.frame))
            .then(self.ref_id.cmp(&other.ref_id))
            .then(self.ref_start.cmp(&other.ref_start))
            .then(self.query_id.cmp(&other.query_id))
            .then(self.query_start.cmp(&other.query_start))
            .then(other.score.cmp(&self.score))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::cigar;
    use crate::alignment::segment_pair::SegmentPair;
    use crate::alphabet::{Alphabet, GeneticCode};

    fn strand(strand: Strand, frame: Option<usize>, sequences: SequenceBuffer) -> QueryStrand {
        QueryStrand {
            strand,
            frame,
            sequences,
            pssm: None,
        }
    }

    #[test]
    fn test_coordinates_are_record_relative() {
        let dna = Alphabet::dna();
        let reference = SequenceBuffer::from_records(&dna, [("chr1", &b"AAAA"[..]), ("chr2", &b"ACGTACGT"[..])]);
        let queries = SequenceBuffer::from_records(&dna, [("q0", &b"TT"[..]), ("q1", &b"CGTA"[..])]);
        let query = strand(Strand::Forward, None, queries.clone());
        // chr2 starts at 6, q1 at 4.
        let aln = Alignment::from_segment_pair(&SegmentPair::new(7, 4, 4, 4));
        let rec = AlignmentRecord::new(0, &reference, &query, &queries, &aln);
        assert_eq!(rec.ref_name, "chr2");
        assert_eq!((rec.ref_id, rec.ref_start, rec.ref_len, rec.ref_record_len), (1, 1, 4, 8));
        assert_eq!((rec.query_name.as_str(), rec.query_id, rec.query_start), ("q1", 1, 0));
        assert_eq!(cigar::to_string(&rec.ops), "4M");
    }

    #[test]
    fn test_reverse_strand_maps_back_to_original_id() {
        let dna = Alphabet::dna();
        let reference = SequenceBuffer::from_records(&dna, [("chr", &b"ACGTACGT"[..])]);
        let queries = SequenceBuffer::from_records(&dna, [("q0", &b"AAA"[..]), ("q1", &b"ACGTT"[..])]);
        let query = strand(Strand::Reverse, None, queries.reverse_complement(&dna));
        // Reversed buffer holds q1 first, at offset 1.
        let aln = Alignment::from_segment_pair(&SegmentPair::new(1, 2, 3, 3));
        let rec = AlignmentRecord::new(0, &reference, &query, &queries, &aln);
        assert_eq!((rec.query_name.as_str(), rec.query_id, rec.query_start), ("q1", 1, 1));
        assert_eq!(rec.query_record_len, 5);
        assert_eq!(rec.strand, Strand::Reverse);
    }

    #[test]
    fn test_translated_coordinates_are_in_dna_letters() {
        let dna = Alphabet::dna();
        let protein = Alphabet::protein();
        let queries = SequenceBuffer::from_records(&dna, [("q", &b"CATGGCCAAA"[..])]);
        let translated = queries.translate(&GeneticCode::standard(), &dna, &protein, 1);
        let reference = SequenceBuffer::from_records(&protein, [("p", &b"MAK"[..])]);
        let query = strand(Strand::Forward, Some(1), translated);
        let aln = Alignment::from_segment_pair(&SegmentPair::new(2, 2, 2, 9));
        let rec = AlignmentRecord::new(0, &reference, &query, &queries, &aln);
        assert_eq!((rec.query_start, rec.query_len), (4, 6));
        assert_eq!(rec.query_record_len, 10);
    }

    #[test]
    fn test_sort_order() {
        let dna = Alphabet::dna();
        let reference = SequenceBuffer::from_records(&dna, [("chr", &b"ACGTACGT"[..])]);
        let queries = SequenceBuffer::from_records(&dna, [("q", &b"ACGT"[..])]);
        let fwd = strand(Strand::Forward, None, queries.clone());
        let a = AlignmentRecord::new(1, &reference, &fwd, &queries, &Alignment::from_segment_pair(&SegmentPair::new(1, 1, 2, 2)));
        let b = AlignmentRecord::new(0, &reference, &fwd, &queries, &Alignment::from_segment_pair(&SegmentPair::new(5, 1, 2, 2)));
        assert_eq!(a.sort_cmp(&b), Ordering::Greater);
        let mut c = b.clone();
        c.strand = Strand::Reverse;
        c.ref_start = 0;
        assert_eq!(b.sort_cmp(&c), Ordering::Less);
    }
}
