//! Read-only state shared by every scan worker.
//!
//! [`ScanContext`] is built once, after option validation, and handed to the
//! scheduler by reference. It owns the scoring tables, the resolved per-phase
//! parameters and the query set in every orientation that will be scanned.

use std::fmt;
use std::fs;

use crate::alignment::dispatch::ScoringInputs;
use crate::alphabet::{Alphabet, GeneticCode};
use crate::defaults;
use crate::errors::{Result, ScanError};
use crate::index::IndexParams;
use crate::scan_opt::{FinalParams, GaplessParams, GappedParams, ScanOpt, SeedParams};
use crate::scoring::{unmasking_table, Pssm, ScoreMatrix, ScoreProvider};
use crate::sequence::SequenceBuffer;

/// Query orientation. Forward sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Strand {
    Forward,
    Reverse,
}

impl Strand {
    pub fn symbol(self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// The query set in one orientation (and reading frame, for translated search).
#[derive(Debug, Clone)]
pub struct QueryStrand {
    pub strand: Strand,
    pub frame: Option<usize>,
    pub sequences: SequenceBuffer,
    /// Quality-derived PSSMs: plain and case-sensitive.
    pub pssm: Option<(Pssm, Pssm)>,
}

#[derive(Debug)]
pub struct ScanContext {
    pub opt: ScanOpt,
    /// Reference alphabet; protein for translated search.
    pub alphabet: Alphabet,
    pub query_alphabet: Alphabet,
    pub provider: ScoreProvider,
    pub unmasked: Vec<u8>,
    pub seed: SeedParams,
    pub gapless: GaplessParams,
    pub gapped: GappedParams,
    pub final_pass: FinalParams,
    /// Queries as read, forward strand; names and lengths are reported from here.
    pub queries: SequenceBuffer,
    pub strands: Vec<QueryStrand>,
}

pub fn reference_alphabet(opt: &ScanOpt) -> Alphabet {
    if opt.protein || opt.translate {
        Alphabet::protein()
    } else {
        Alphabet::dna()
    }
}

pub fn query_alphabet(opt: &ScanOpt) -> Alphabet {
    if opt.protein {
        Alphabet::protein()
    } else {
        Alphabet::dna()
    }
}

fn load_matrix(opt: &ScanOpt, alphabet: &Alphabet) -> Result<ScoreMatrix> {
    match opt.matrix.as_deref() {
        Some(name) if name.eq_ignore_ascii_case("BLOSUM62") => ScoreMatrix::blosum62(alphabet),
        Some(path) => {
            let text = fs::read_to_string(path)
                .map_err(|e| ScanError::config(format!("cannot read score matrix '{}': {}", path, e)))?;
            ScoreMatrix::from_text(alphabet, &text)
        }
        None if alphabet.is_dna() => Ok(ScoreMatrix::from_match_mismatch(
            alphabet,
            opt.match_score,
            opt.mismatch_cost,
        )),
        None => ScoreMatrix::blosum62(alphabet),
    }
}

impl ScanContext {
    /// Validate `opt` and prepare every table and query orientation it asks for.
    /// `queries` must be encoded with [`query_alphabet`].
    pub fn new(opt: ScanOpt, queries: SequenceBuffer) -> Result<Self> {
        opt.validate().map_err(ScanError::Configuration)?;

        let alphabet = reference_alphabet(&opt);
        let query_alphabet = query_alphabet(&opt);
        let matrix = load_matrix(&opt, &alphabet)?;
        let gap_costs = opt.gap_costs()?;

        let use_qualities = queries.has_qualities() && !opt.translate;
        let temperature = match (use_qualities, opt.temperature) {
            (true, None) => {
                return Err(ScanError::config(
                    "quality-annotated queries need a temperature",
                ))
            }
            (_, t) => t,
        };

        let mut provider = ScoreProvider::new(&alphabet, matrix, gap_costs, temperature);
        if use_qualities {
            provider = provider.with_two_quality(&alphabet);
        }

        let strands = build_strands(&opt, &alphabet, &query_alphabet, &provider, &queries, use_qualities)?;
        log::debug!(
            "Prepared {} query strand(s) for {} queries ({} letters)",
            strands.len(),
            queries.record_count(),
            queries.len()
        );

        Ok(Self {
            seed: opt.seed_params(),
            gapless: opt.gapless_params(provider.matrix.max_score()),
            gapped: opt.gapped_params(),
            final_pass: opt.final_params(),
            unmasked: unmasking_table(&alphabet),
            opt,
            alphabet,
            query_alphabet,
            provider,
            queries,
            strands,
        })
    }

    /// Index settings for every volume of this run.
    pub fn index_params(&self) -> IndexParams {
        let seeds = if self.opt.seeds.is_empty() {
            let default = if self.alphabet.is_dna() {
                defaults::DNA_SEED
            } else {
                defaults::PROTEIN_SEED
            };
            vec![default.to_string()]
        } else {
            self.opt.seeds.clone()
        };
        IndexParams {
            seeds,
            step: self.opt.index_step,
            bucket_depth: self.opt.bucket_depth,
            mask_lowercase: self.opt.mask_lowercase > 0,
        }
    }

    pub fn scoring_inputs<'a>(&'a self, reference: &'a SequenceBuffer, strand: &'a QueryStrand) -> ScoringInputs<'a> {
        ScoringInputs {
            provider: &self.provider,
            reference,
            query: &strand.sequences,
            pssm: strand.pssm.as_ref().map(|(plain, masked)| (plain, masked)),
            unmasked: &self.unmasked,
            mask_lowercase: self.opt.mask_lowercase,
        }
    }
}

fn build_strands(
    opt: &ScanOpt,
    alphabet: &Alphabet,
    query_alphabet: &Alphabet,
    provider: &ScoreProvider,
    queries: &SequenceBuffer,
    use_qualities: bool,
) -> Result<Vec<QueryStrand>> {
    let forward = opt.strand != 0 || !query_alphabet.is_dna();
    let reverse = opt.strand != 1 && query_alphabet.is_dna();
    if opt.strand == 0 && !query_alphabet.is_dna() {
        log::warn!("Protein queries have no reverse strand; scanning forward only");
    }

    let pssm = match (use_qualities, queries.qualities(), provider.temperature) {
        (true, Some(qualities), Some(t)) => Some((
            Pssm::from_qualities(&provider.matrix, alphabet, queries.as_slice(), qualities, t),
            Pssm::from_qualities(&provider.masked_matrix, alphabet, queries.as_slice(), qualities, t),
        )),
        _ => None,
    };

    let mut oriented = Vec::with_capacity(2);
    if forward {
        oriented.push((Strand::Forward, queries.clone(), pssm.clone()));
    }
    if reverse {
        let rc_pssm = pssm
            .as_ref()
            .map(|(plain, masked)| (plain.reverse_complement(alphabet), masked.reverse_complement(alphabet)));
        oriented.push((Strand::Reverse, queries.reverse_complement(query_alphabet), rc_pssm));
    }

    if !opt.translate {
        return Ok(oriented
            .into_iter()
            .map(|(strand, sequences, pssm)| QueryStrand {
                strand,
                frame: None,
                sequences,
                pssm,
            })
            .collect());
    }

    let code = match &opt.genetic_code {
        Some(table) => GeneticCode::from_ncbi_string(table)?,
        None => GeneticCode::standard(),
    };
    let mut strands = Vec::with_capacity(oriented.len() * 3);
    for (strand, dna, _) in oriented {
        for frame in 0..3 {
            strands.push(QueryStrand {
                strand,
                frame: Some(frame),
                sequences: dna.translate(&code, query_alphabet, alphabet, frame),
                pssm: None,
            });
        }
    }
    Ok(strands)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan_opt::OutputMode;

    fn dna_queries(seq: &[u8]) -> SequenceBuffer {
        SequenceBuffer::from_records(&Alphabet::dna(), [("q", seq)])
    }

    #[test]
    fn test_both_strands_by_default() {
        let ctx = ScanContext::new(ScanOpt::default(), dna_queries(b"ACGGT")).unwrap();
        assert_eq!(ctx.strands.len(), 2);
        assert_eq!(ctx.strands[0].strand, Strand::Forward);
        assert_eq!(ctx.strands[1].strand, Strand::Reverse);
        let dna = Alphabet::dna();
        assert_eq!(ctx.strands[1].sequences.record(0), &dna.encode(b"ACCGT")[..]);
        assert_eq!(ctx.index_params().seeds, vec!["A C G T".to_string()]);
    }

    #[test]
    fn test_strand_selection() {
        let opt = ScanOpt {
            strand: 0,
            ..Default::default()
        };
        let ctx = ScanContext::new(opt, dna_queries(b"ACGT")).unwrap();
        assert_eq!(ctx.strands.len(), 1);
        assert_eq!(ctx.strands[0].strand, Strand::Reverse);
    }

    #[test]
    fn test_translated_search_has_three_frames_per_strand() {
        let opt = ScanOpt {
            translate: true,
            ..Default::default()
        };
        let ctx = ScanContext::new(opt, dna_queries(b"ATGGCCAAATTT")).unwrap();
        assert_eq!(ctx.strands.len(), 6);
        assert!(!ctx.alphabet.is_dna());
        assert_eq!(ctx.strands[0].sequences.record_len(0), 4);
        assert_eq!(ctx.strands[1].sequences.record_len(0), 3);
        assert_eq!(ctx.strands[2].frame, Some(2));
    }

    #[test]
    fn test_qualities_need_temperature() {
        let dna = Alphabet::dna();
        let mut queries = SequenceBuffer::new(dna.delimiter(), true);
        queries.push_record("q", &dna.encode(b"ACGT"), Some(&[30, 30, 30, 30]));

        let err = ScanContext::new(ScanOpt::default(), queries.clone()).unwrap_err();
        assert!(matches!(err, ScanError::Configuration(_)));

        let opt = ScanOpt {
            temperature: Some(1.5),
            ..Default::default()
        };
        let ctx = ScanContext::new(opt, queries).unwrap();
        assert!(ctx.strands.iter().all(|s| s.pssm.is_some()));
        assert!(ctx.provider.two_quality.is_some());
    }

    #[test]
    fn test_invalid_options_are_configuration_errors() {
        let opt = ScanOpt {
            output: OutputMode::Posterior,
            ..Default::default()
        };
        let err = ScanContext::new(opt, dna_queries(b"ACGT")).unwrap_err();
        assert!(err.to_string().contains("temperature"));
    }

    #[test]
    fn test_huge_thresholds_are_configuration_errors() {
        let opt = ScanOpt {
            min_score_gapped: 1_000_000_000,
            match_score: 300_000_000,
            gap_open: "2147483647".into(),
            ..Default::default()
        };
        match ScanContext::new(opt, dna_queries(b"ACGT")) {
            Err(ScanError::Configuration(messages)) => assert!(messages.len() >= 3, "{:?}", messages),
            other => panic!("expected a configuration error, got {:?}", other.map(|_| ())),
        }
    }
}
