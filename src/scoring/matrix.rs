// Substitution matrices over the full code layout (case variants and delimiter).
//
// Scores are stored for every pair of codes so the hot loops never branch on case:
// one table for case-insensitive scoring and a derived one where any lowercase
// letter caps the score at zero.

use crate::alphabet::Alphabet;
use crate::defaults;
use crate::errors::{Result, ScanError};

/// Magnitude used for forbidden columns. Small enough that adding a few of them
/// to a running score cannot overflow `i32`.
pub const INF: i32 = i32::MAX / 4;

/// Largest magnitude accepted for a matrix entry read from text.
pub const MAX_ENTRY: i32 = INF / 64;

const BLOSUM62: &str = "\
   A  R  N  D  C  Q  E  G  H  I  L  K  M  F  P  S  T  W  Y  V
A  4 -1 -2 -2  0 -1 -1  0 -2 -1 -1 -1 -1 -2 -1  1  0 -3 -2  0
R -1  5  0 -2 -3  1  0 -2  0 -3 -2  2 -1 -3 -2 -1 -1 -3 -2 -3
N -2  0  6  1 -3  0  0  0  1 -3 -3  0 -2 -3 -2  1  0 -4 -2 -3
D -2 -2  1  6 -3  0  2 -1 -1 -3 -4 -1 -3 -3 -1  0 -1 -4 -3 -3
C  0 -3 -3 -3  9 -3 -4 -3 -3 -1 -1 -3 -1 -2 -3 -1 -1 -2 -2 -1
Q -1  1  0  0 -3  5  2 -2  0 -3 -2  1  0 -3 -1  0 -1 -2 -1 -2
E -1  0  0  2 -4  2  5 -2  0 -3 -3  1 -2 -3 -1  0 -1 -3 -2 -2
G  0 -2  0 -1 -3 -2 -2  6 -2 -4 -4 -2 -3 -3 -2  0 -2 -2 -3 -3
H -2  0  1 -1 -3  0  0 -2  8 -3 -3 -1 -2 -1 -2 -1 -2 -2  2 -3
I -1 -3 -3 -3 -1 -3 -3 -4 -3  4  2 -3  1  0 -3 -2 -1 -3 -1  3
L -1 -2 -3 -4 -1 -2 -3 -4 -3  2  4 -2  2  0 -3 -2 -1 -2 -1  1
K -1  2  0 -1 -3  1  1 -2 -1 -3 -2  5 -1 -3 -1  0 -1 -3 -2 -2
M -1 -1 -2 -3 -1  0 -2 -3 -2  1  2 -1  5  0 -2 -1 -1 -1 -1  1
F -2 -3 -3 -3 -2 -3 -3 -3 -1  0  0 -3  0  6 -4 -2 -2  1  3 -1
P -1 -2 -2 -1 -3 -1 -1 -2 -2 -3 -3 -1 -2 -4  7 -1 -1 -4 -3 -2
S  1 -1  1  0 -1  0  0  0 -1 -2 -2  0 -1 -2 -1  4  1 -3 -2 -2
T  0 -1  0 -1 -1 -1 -1 -2 -2 -1 -1 -1 -1 -2 -1  1  5 -2 -2  0
W -3 -3 -4 -4 -2 -2 -3 -2 -2 -3 -2 -3 -1  1 -4 -3 -2 11  2 -3
Y -2 -2 -2 -3 -2 -1 -2 -3  2 -1 -1 -2 -1  3 -3 -2 -2  2  7 -1
V  0 -3 -3 -3 -1 -2 -2 -3 -3  3  1 -2  1 -1 -2 -2  0 -3 -1  4
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreMatrix {
    size: usize,
    scores: Vec<i32>,
    max_score: i32,
}

impl ScoreMatrix {
    /// Uniform match/mismatch scores; unknown letters score [`defaults::UNKNOWN_SCORE`].
    pub fn from_match_mismatch(alphabet: &Alphabet, match_score: i32, mismatch_cost: i32) -> Self {
        let k = alphabet.size();
        let mut base = vec![defaults::UNKNOWN_SCORE; (k + 1) * (k + 1)];
        for i in 0..k {
            for j in 0..k {
                base[i * (k + 1) + j] = if i == j { match_score } else { -mismatch_cost };
            }
        }
        Self::expand(alphabet, &base)
    }

    /// Parse a BLAST-style matrix: a header row of letters, then one row per letter.
    ///
    /// Lines starting with `#` are comments. Letters outside the alphabet are ignored,
    /// except the alphabet's unknown letter (`N` or `X`) which sets the unknown row and column.
    pub fn from_text(alphabet: &Alphabet, text: &str) -> Result<Self> {
        let k = alphabet.size();
        let unknown_char = alphabet.decode(alphabet.unknown());
        let slot = |letter: u8| -> Option<usize> {
            let upper = letter.to_ascii_uppercase();
            let code = alphabet.encode_base(upper);
            if (code as usize) < k {
                Some(code as usize)
            } else if upper == unknown_char {
                Some(k)
            } else {
                None
            }
        };

        let mut base = vec![defaults::UNKNOWN_SCORE; (k + 1) * (k + 1)];
        let mut seen = vec![false; k];
        let mut header: Option<Vec<Option<usize>>> = None;

        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let Some(columns) = header.as_ref() else {
                header = Some(tokens.iter().map(|t| slot(t.as_bytes()[0])).collect());
                continue;
            };
            let row_letter = tokens[0].as_bytes()[0];
            if tokens.len() != columns.len() + 1 {
                return Err(ScanError::config(format!(
                    "score matrix line {}: expected {} scores, got {}",
                    line_no + 1,
                    columns.len(),
                    tokens.len() - 1
                )));
            }
            let Some(row) = slot(row_letter) else {
                continue;
            };
            if row < k {
                seen[row] = true;
            }
            for (col, token) in columns.iter().zip(&tokens[1..]) {
                let value: i32 = token.parse().map_err(|_| {
                    ScanError::config(format!(
                        "score matrix line {}: invalid score '{}'",
                        line_no + 1,
                        token
                    ))
                })?;
                if value.unsigned_abs() > MAX_ENTRY as u32 {
                    return Err(ScanError::config(format!(
                        "score matrix line {}: score {} outside -{}..={}",
                        line_no + 1,
                        value,
                        MAX_ENTRY,
                        MAX_ENTRY
                    )));
                }
                if let Some(col) = col {
                    base[row * (k + 1) + col] = value;
                }
            }
        }

        if header.is_none() {
            return Err(ScanError::config("score matrix is empty"));
        }
        if let Some(missing) = seen.iter().position(|&s| !s) {
            return Err(ScanError::config(format!(
                "score matrix has no row for letter '{}'",
                alphabet.decode(missing as u8) as char
            )));
        }
        Ok(Self::expand(alphabet, &base))
    }

    pub fn blosum62(alphabet: &Alphabet) -> Result<Self> {
        Self::from_text(alphabet, BLOSUM62)
    }

    /// Spread a `(k+1) x (k+1)` uppercase table over all codes.
    fn expand(alphabet: &Alphabet, base: &[i32]) -> Self {
        let k = alphabet.size();
        let size = alphabet.code_count();
        let mut scores = vec![-INF; size * size];
        for x in 0..size as u8 {
            for y in 0..size as u8 {
                if alphabet.is_delimiter(x) || alphabet.is_delimiter(y) {
                    continue;
                }
                let xu = alphabet.to_uppercase(x) as usize;
                let yu = alphabet.to_uppercase(y) as usize;
                scores[x as usize * size + y as usize] = base[xu * (k + 1) + yu];
            }
        }
        let max_score = (0..k)
            .flat_map(|i| (0..k).map(move |j| (i, j)))
            .map(|(i, j)| base[i * (k + 1) + j])
            .max()
            .unwrap_or(0);
        Self {
            size,
            scores,
            max_score,
        }
    }

    /// Copy where any pair involving a lowercase code scores at most zero.
    pub fn case_sensitive(&self, alphabet: &Alphabet) -> Self {
        let mut masked = self.clone();
        for x in 0..self.size as u8 {
            for y in 0..self.size as u8 {
                if alphabet.is_lowercase(x) || alphabet.is_lowercase(y) {
                    let s = &mut masked.scores[x as usize * self.size + y as usize];
                    *s = (*s).min(0);
                }
            }
        }
        masked
    }

    #[inline(always)]
    pub fn score(&self, x: u8, y: u8) -> i32 {
        self.scores[x as usize * self.size + y as usize]
    }

    #[inline(always)]
    pub fn row(&self, x: u8) -> &[i32] {
        let start = x as usize * self.size;
        &self.scores[start..start + self.size]
    }

    /// Number of codes on each axis.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Highest score between two proper letters.
    pub fn max_score(&self) -> i32 {
        self.max_score
    }
}
