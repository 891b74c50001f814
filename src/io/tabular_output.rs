// Tabular output module
//
// One tab-separated line per alignment, or per seed length in match-count mode.
// Formatting lives here so the pipeline only produces records.

use std::collections::BTreeMap;
use std::io::{self, Write};

use crate::alignment::cigar;
use crate::alignment::record::AlignmentRecord;
use crate::context::Strand;
use crate::sequence::SequenceBuffer;

// ============================================================================
// ALIGNMENT LINES
// ============================================================================

pub const ALIGNMENT_COLUMNS: [&str; 12] = [
    "score",
    "ref_name",
    "ref_start",
    "ref_aligned",
    "strand",
    "ref_length",
    "query_name",
    "query_start",
    "query_aligned",
    "query_length",
    "ops",
    "mean_posterior",
];

/// Format one alignment; the posterior column is left out when not computed.
pub fn format_record(rec: &AlignmentRecord) -> String {
    let mut line = format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        rec.score,
        rec.ref_name,
        rec.ref_start,
        rec.ref_len,
        rec.strand,
        rec.ref_record_len,
        rec.query_name,
        rec.query_start,
        rec.query_len,
        rec.query_record_len,
        cigar::to_string(&rec.ops),
    );
    if let Some(p) = rec.mean_posterior {
        line.push_str(&format!("\t{:.4}", p));
    }
    line
}

pub fn write_header<W: Write>(writer: &mut W, with_posterior: bool) -> io::Result<()> {
    let columns = if with_posterior {
        &ALIGNMENT_COLUMNS[..]
    } else {
        &ALIGNMENT_COLUMNS[..ALIGNMENT_COLUMNS.len() - 1]
    };
    writeln!(writer, "# {}", columns.join("\t"))
}

pub fn write_records<W: Write>(writer: &mut W, records: &[AlignmentRecord]) -> io::Result<()> {
    for rec in records {
        writeln!(writer, "{}", format_record(rec))?;
    }
    Ok(())
}

// ============================================================================
// MATCH COUNT LINES
// ============================================================================

/// Write `query  strand  length  count` for each seed length from `min_depth` up to
/// the last non-zero count.
pub fn write_match_counts<W: Write>(
    writer: &mut W,
    queries: &SequenceBuffer,
    counts: &BTreeMap<(usize, Strand), Vec<u64>>,
    min_depth: usize,
) -> io::Result<()> {
    writeln!(writer, "# query\tstrand\tlength\tcount")?;
    for (&(query, strand), per_depth) in counts {
        let name = queries.name(query);
        for (depth, &count) in per_depth.iter().enumerate().skip(min_depth) {
            if count == 0 {
                break;
            }
            writeln!(writer, "{}\t{}\t{}\t{}", name, strand, depth, count)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alphabet::Alphabet;

    fn record(mean_posterior: Option<f64>) -> AlignmentRecord {
        AlignmentRecord {
            volume: 0,
            strand: Strand::Reverse,
            frame: None,
            score: 2,
            ref_name: "chr1".into(),
            ref_id: 0,
            ref_start: 10,
            ref_len: 8,
            ref_record_len: 100,
            query_name: "read7".into(),
            query_id: 7,
            query_start: 0,
            query_len: 9,
            query_record_len: 9,
            ops: cigar::parse("4M1I4M").unwrap(),
            mean_posterior,
        }
    }

    #[test]
    fn test_format_record() {
        assert_eq!(
            format_record(&record(None)),
            "2\tchr1\t10\t8\t-\t100\tread7\t0\t9\t9\t4M1I4M"
        );
        assert!(format_record(&record(Some(0.91234))).ends_with("\t4M1I4M\t0.9123"));
    }

    #[test]
    fn test_header_and_records() {
        let mut out = Vec::new();
        write_header(&mut out, false).unwrap();
        write_records(&mut out, &[record(None)]).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("# score\tref_name"));
        assert!(!lines[0].contains("mean_posterior"));
    }

    #[test]
    fn test_match_counts_stop_at_first_zero() {
        let dna = Alphabet::dna();
        let queries = SequenceBuffer::from_records(&dna, [("q0", &b"AC"[..]), ("q1", &b"GT"[..])]);
        let mut counts = BTreeMap::new();
        counts.insert((1, Strand::Forward), vec![0, 12, 3, 0, 5]);
        let mut out = Vec::new();
        write_match_counts(&mut out, &queries, &counts, 1).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, "# query\tstrand\tlength\tcount\nq1\t+\t1\t12\nq1\t+\t2\t3\n");
    }
}
