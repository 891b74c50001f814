//! Quality-aware scoring tables.
//!
//! Both tables fold base-call error probabilities into integer scores using the
//! scale of the substitution matrix: for a called letter `a` with phred quality
//! `q`, the true letter is `a` with probability `1 - e` and each other letter with
//! `e / (k - 1)`, where `e = 10^(-q/10)`. The expected likelihood ratio is mapped
//! back to a score with `round(ln(sum) / lambda)`, `lambda = 1 / temperature`.

use std::f64::consts::LN_10;

use crate::alphabet::Alphabet;
use crate::defaults::MAX_QUALITY;

use super::matrix::{ScoreMatrix, INF};

const QUALITY_LEVELS: usize = MAX_QUALITY as usize + 1;

/// Probability that a call of quality `q` is wrong.
#[inline]
pub fn phred_to_error_prob(q: u8) -> f64 {
    (-f64::from(q.min(MAX_QUALITY)) * LN_10 / 10.0).exp()
}

/// `(P(true == called), P(true == one specific other letter))` for an alphabet of size `k`.
#[inline]
fn letter_probabilities(k: usize, q: u8) -> (f64, f64) {
    let e = phred_to_error_prob(q);
    (1.0 - e, e / (k.saturating_sub(1).max(1)) as f64)
}

#[inline]
fn scaled_log(sum: f64, lambda: f64) -> i32 {
    if sum <= 0.0 {
        return -INF;
    }
    (sum.ln() / lambda).round() as i32
}

// ============================================================================
// POSITION-SPECIFIC SCORING MATRIX
// ============================================================================

/// One row of scores per query position, one column per reference code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pssm {
    width: usize,
    rows: Vec<i32>,
}

impl Pssm {
    /// Build from explicit rows; `rows.len()` must be a multiple of `width`.
    pub fn from_rows(width: usize, rows: Vec<i32>) -> Self {
        debug_assert!(width > 0 && rows.len() % width == 0);
        Self { width, rows }
    }

    /// Derive a PSSM for a quality-annotated query buffer.
    ///
    /// Unknown query letters copy the matrix column; delimiters get a row of `-INF`.
    pub fn from_qualities(
        matrix: &ScoreMatrix,
        alphabet: &Alphabet,
        seq: &[u8],
        qualities: &[u8],
        temperature: f64,
    ) -> Self {
        let width = alphabet.code_count();
        let k = alphabet.size();
        let lambda = 1.0 / temperature;
        let mut rows = vec![-INF; seq.len() * width];

        for (y, (&code, &q)) in seq.iter().zip(qualities).enumerate() {
            let row = &mut rows[y * width..(y + 1) * width];
            if alphabet.is_delimiter(code) {
                continue;
            }
            if !alphabet.is_letter(code) {
                for (x, slot) in row.iter_mut().enumerate() {
                    *slot = matrix.score(x as u8, code);
                }
                continue;
            }
            let called = alphabet.to_uppercase(code);
            let lowercase = alphabet.is_lowercase(code);
            let (p_same, p_other) = letter_probabilities(k, q);
            for (x, slot) in row.iter_mut().enumerate() {
                let x = x as u8;
                if alphabet.is_delimiter(x) {
                    continue;
                }
                let sum: f64 = (0..k as u8)
                    .map(|b| {
                        let p = if b == called { p_same } else { p_other };
                        let cased = if lowercase { alphabet.to_lowercase(b) } else { b };
                        p * (lambda * matrix.score(x, cased) as f64).exp()
                    })
                    .sum();
                *slot = scaled_log(sum, lambda);
            }
        }
        Self { width, rows }
    }

    #[inline(always)]
    pub fn score(&self, reference_code: u8, y: usize) -> i32 {
        self.rows[y * self.width + reference_code as usize]
    }

    pub fn row(&self, y: usize) -> &[i32] {
        &self.rows[y * self.width..(y + 1) * self.width]
    }

    /// Number of query positions covered.
    pub fn len(&self) -> usize {
        self.rows.len() / self.width
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// PSSM for the reverse-complemented query: rows reversed, columns complemented.
    pub fn reverse_complement(&self, alphabet: &Alphabet) -> Self {
        let n = self.len();
        let mut rows = vec![-INF; self.rows.len()];
        for y in 0..n {
            let src = self.row(n - 1 - y);
            let dst = &mut rows[y * self.width..(y + 1) * self.width];
            for (x, slot) in dst.iter_mut().enumerate() {
                *slot = src[alphabet.complement(x as u8) as usize];
            }
        }
        Self {
            width: self.width,
            rows,
        }
    }
}

// ============================================================================
// TWO-QUALITY SCORE MATRIX
// ============================================================================

/// Scores for pairs of quality-annotated letters, indexed by
/// `(reference code, reference quality, query code, query quality)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TwoQualityScoreMatrix {
    codes: usize,
    scores: Vec<i32>,
}

impl TwoQualityScoreMatrix {
    pub fn new(matrix: &ScoreMatrix, alphabet: &Alphabet, temperature: f64) -> Self {
        let codes = alphabet.code_count();
        let k = alphabet.size();
        let lambda = 1.0 / temperature;
        let probs: Vec<(f64, f64)> = (0..QUALITY_LEVELS as u8)
            .map(|q| letter_probabilities(k, q))
            .collect();
        let mut scores = vec![-INF; codes * QUALITY_LEVELS * codes * QUALITY_LEVELS];

        for x in 0..codes as u8 {
            for y in 0..codes as u8 {
                if alphabet.is_delimiter(x) || alphabet.is_delimiter(y) {
                    continue;
                }
                let exact = !alphabet.is_letter(x) || !alphabet.is_letter(y);
                let (xu, yu) = (alphabet.to_uppercase(x), alphabet.to_uppercase(y));
                let case_of = |letter: u8, code: u8| {
                    if alphabet.is_lowercase(code) {
                        alphabet.to_lowercase(letter)
                    } else {
                        letter
                    }
                };
                for qx in 0..QUALITY_LEVELS {
                    for qy in 0..QUALITY_LEVELS {
                        let idx = Self::index(codes, x, qx as u8, y, qy as u8);
                        if exact {
                            scores[idx] = matrix.score(x, y);
                            continue;
                        }
                        let (px_same, px_other) = probs[qx];
                        let (py_same, py_other) = probs[qy];
                        let mut sum = 0.0;
                        for a in 0..k as u8 {
                            let pa = if a == xu { px_same } else { px_other };
                            for b in 0..k as u8 {
                                let pb = if b == yu { py_same } else { py_other };
                                let s = matrix.score(case_of(a, x), case_of(b, y));
                                sum += pa * pb * (lambda * s as f64).exp();
                            }
                        }
                        scores[idx] = scaled_log(sum, lambda);
                    }
                }
            }
        }
        Self { codes, scores }
    }

    #[inline(always)]
    fn index(codes: usize, x: u8, qx: u8, y: u8, qy: u8) -> usize {
        ((x as usize * QUALITY_LEVELS + qx.min(MAX_QUALITY) as usize) * codes + y as usize)
            * QUALITY_LEVELS
            + qy.min(MAX_QUALITY) as usize
    }

    #[inline(always)]
    pub fn score(&self, x: u8, qx: u8, y: u8, qy: u8) -> i32 {
        self.scores[Self::index(self.codes, x, qx, y, qy)]
    }
}
