// Symbol coding shared by sequences, scoring tables and the seed index.
//
// For an alphabet of k letters the codes are laid out as:
//   0..k        uppercase letters
//   k           unknown uppercase (e.g. N, X)
//   k+1..=2k    lowercase letters
//   2k+1        unknown lowercase
//   2k+2        record delimiter
//
// Keeping case in the code lets the scoring layer switch between case-sensitive
// and case-insensitive tables without re-encoding the sequence.

use crate::errors::{Result, ScanError};

pub const DNA_LETTERS: &str = "ACGT";
pub const PROTEIN_LETTERS: &str = "ACDEFGHIKLMNPQRSTVWY";

/// Subset symbol for positions that may not start or extend a seed.
pub const UNSEEDABLE: u8 = u8::MAX;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alphabet {
    letters: Vec<u8>,
    encode: [u8; 256],
}

impl Alphabet {
    pub fn new(letters: &str) -> Self {
        let letters: Vec<u8> = letters.bytes().map(|b| b.to_ascii_uppercase()).collect();
        let k = letters.len() as u8;
        let mut encode = [k; 256];
        for b in 0..=255u8 {
            if b.is_ascii_lowercase() {
                encode[b as usize] = 2 * k + 1;
            }
        }
        for (i, &letter) in letters.iter().enumerate() {
            encode[letter as usize] = i as u8;
            encode[letter.to_ascii_lowercase() as usize] = k + 1 + i as u8;
        }
        Self { letters, encode }
    }

    pub fn dna() -> Self {
        Self::new(DNA_LETTERS)
    }

    pub fn protein() -> Self {
        Self::new(PROTEIN_LETTERS)
    }

    pub fn is_dna(&self) -> bool {
        self.letters == DNA_LETTERS.as_bytes()
    }

    pub fn letters(&self) -> &[u8] {
        &self.letters
    }

    /// Number of proper letters (k).
    #[inline(always)]
    pub fn size(&self) -> usize {
        self.letters.len()
    }

    #[inline(always)]
    pub fn unknown(&self) -> u8 {
        self.letters.len() as u8
    }

    #[inline(always)]
    pub fn delimiter(&self) -> u8 {
        2 * self.letters.len() as u8 + 2
    }

    /// Total number of codes including case variants and the delimiter.
    #[inline(always)]
    pub fn code_count(&self) -> usize {
        2 * self.letters.len() + 3
    }

    #[inline(always)]
    pub fn encode_base(&self, base: u8) -> u8 {
        self.encode[base as usize]
    }

    pub fn encode(&self, seq: &[u8]) -> Vec<u8> {
        seq.iter().map(|&b| self.encode_base(b)).collect()
    }

    /// ASCII character for a code; the delimiter decodes to `#`.
    pub fn decode(&self, code: u8) -> u8 {
        let k = self.letters.len() as u8;
        match code {
            c if c < k => self.letters[c as usize],
            c if c == k => self.unknown_char(),
            c if c <= 2 * k => self.letters[(c - k - 1) as usize].to_ascii_lowercase(),
            c if c == 2 * k + 1 => self.unknown_char().to_ascii_lowercase(),
            _ => b'#',
        }
    }

    fn unknown_char(&self) -> u8 {
        if self.is_dna() {
            b'N'
        } else {
            b'X'
        }
    }

    #[inline(always)]
    pub fn is_lowercase(&self, code: u8) -> bool {
        let k = self.letters.len() as u8;
        code > k && code <= 2 * k + 1
    }

    #[inline(always)]
    pub fn is_delimiter(&self, code: u8) -> bool {
        code == self.delimiter()
    }

    /// True for proper letters of either case (not unknown, not delimiter).
    #[inline(always)]
    pub fn is_letter(&self, code: u8) -> bool {
        let k = self.letters.len() as u8;
        code < k || (code > k && code <= 2 * k)
    }

    #[inline(always)]
    pub fn to_uppercase(&self, code: u8) -> u8 {
        if self.is_lowercase(code) {
            code - self.letters.len() as u8 - 1
        } else {
            code
        }
    }

    #[inline(always)]
    pub fn to_lowercase(&self, code: u8) -> u8 {
        if code <= self.unknown() {
            code + self.letters.len() as u8 + 1
        } else {
            code
        }
    }

    /// Watson-Crick complement of a DNA code, preserving case.
    /// Non-DNA alphabets and non-letter codes map to themselves.
    #[inline(always)]
    pub fn complement(&self, code: u8) -> u8 {
        if !self.is_dna() || !self.is_letter(code) {
            return code;
        }
        let upper = self.to_uppercase(code);
        let comp = 3 - upper;
        if self.is_lowercase(code) {
            self.to_lowercase(comp)
        } else {
            comp
        }
    }

    pub fn reverse_complement(&self, seq: &[u8]) -> Vec<u8> {
        seq.iter().rev().map(|&c| self.complement(c)).collect()
    }
}

// ============================================================================
// SUBSET (SEED) ALPHABETS
// ============================================================================

/// Many-to-one mapping from alphabet codes to seed symbols.
///
/// A pattern such as `"AG CT"` groups letters into subsets; each group becomes
/// one seed symbol. Letters not named in the pattern, unknowns and the delimiter
/// are unseedable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubsetAlphabet {
    pattern: String,
    map: Vec<u8>,
    size: usize,
}

impl SubsetAlphabet {
    pub fn from_pattern(alphabet: &Alphabet, pattern: &str, mask_lowercase: bool) -> Result<Self> {
        let mut map = vec![UNSEEDABLE; alphabet.code_count()];
        let mut size = 0usize;
        for group in pattern.split_whitespace() {
            for b in group.bytes() {
                let code = alphabet.encode_base(b.to_ascii_uppercase());
                if code >= alphabet.unknown() {
                    return Err(ScanError::config(format!(
                        "seed pattern '{}' uses letter '{}' outside the alphabet",
                        pattern, b as char
                    )));
                }
                if map[code as usize] != UNSEEDABLE {
                    return Err(ScanError::config(format!(
                        "seed pattern '{}' repeats letter '{}'",
                        pattern, b as char
                    )));
                }
                map[code as usize] = size as u8;
                if !mask_lowercase {
                    map[alphabet.to_lowercase(code) as usize] = size as u8;
                }
            }
            size += 1;
        }
        if size == 0 {
            return Err(ScanError::config("seed pattern is empty"));
        }
        Ok(Self {
            pattern: pattern.to_string(),
            map,
            size,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Number of distinct seed symbols.
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline(always)]
    pub fn symbol(&self, code: u8) -> u8 {
        self.map.get(code as usize).copied().unwrap_or(UNSEEDABLE)
    }

    #[inline(always)]
    pub fn is_seedable(&self, code: u8) -> bool {
        self.symbol(code) != UNSEEDABLE
    }
}

// ============================================================================
// GENETIC CODE
// ============================================================================

/// Standard code in NCBI order (first, second, third base each cycling TCAG).
const STANDARD_CODE: &str = "FFLLSSSSYY**CC*WLLLLPPPPHHQQRRRRIIIMTTTTNNKKSSRRVVVVAAAADDEEGGGG";

/// Position of each DNA code (A, C, G, T) in NCBI's TCAG ordering.
const NCBI_BASE_ORDER: [usize; 4] = [2, 1, 3, 0];

/// Codon to amino-acid table used for translated search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneticCode {
    amino_acids: [u8; 64],
}

impl GeneticCode {
    pub fn standard() -> Self {
        let mut amino_acids = [0u8; 64];
        amino_acids.copy_from_slice(STANDARD_CODE.as_bytes());
        Self { amino_acids }
    }

    /// Parse a 64-letter amino-acid string in NCBI `TCAG` codon order.
    pub fn from_ncbi_string(table: &str) -> Result<Self> {
        if table.len() != 64 {
            return Err(ScanError::config(format!(
                "genetic code must have 64 entries, got {}",
                table.len()
            )));
        }
        let mut amino_acids = [0u8; 64];
        amino_acids.copy_from_slice(table.as_bytes());
        Ok(Self { amino_acids })
    }

    /// Translate one codon of DNA codes into a protein code.
    ///
    /// Codons with an unknown base give the protein unknown symbol, stop codons too.
    /// Any lowercase base makes the amino acid lowercase.
    pub fn translate_codon(&self, dna: &Alphabet, protein: &Alphabet, codon: [u8; 3]) -> u8 {
        let mut index = 0usize;
        let mut lowercase = false;
        for &code in &codon {
            if !dna.is_letter(code) {
                let unknown = protein.unknown();
                return if codon.iter().any(|&c| dna.is_lowercase(c)) {
                    protein.to_lowercase(unknown)
                } else {
                    unknown
                };
            }
            lowercase |= dna.is_lowercase(code);
            index = index * 4 + NCBI_BASE_ORDER[dna.to_uppercase(code) as usize];
        }
        let aa = protein.encode_base(self.amino_acids[index]);
        if lowercase {
            protein.to_lowercase(aa)
        } else {
            aa
        }
    }

    /// Translate a DNA record starting at `frame` (0, 1 or 2); trailing partial codons are dropped.
    pub fn translate(&self, dna: &Alphabet, protein: &Alphabet, seq: &[u8], frame: usize) -> Vec<u8> {
        if seq.len() <= frame {
            return Vec::new();
        }
        seq[frame..]
            .chunks_exact(3)
            .map(|c| self.translate_codon(dna, protein, [c[0], c[1], c[2]]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dna_code_layout() {
        let dna = Alphabet::dna();
        assert_eq!(dna.encode(b"ACGTN"), vec![0, 1, 2, 3, 4]);
        assert_eq!(dna.encode(b"acgtn"), vec![5, 6, 7, 8, 9]);
        assert_eq!(dna.delimiter(), 10);
        assert_eq!(dna.code_count(), 11);
        assert_eq!(dna.decode(7), b'g');
        assert_eq!(dna.decode(10), b'#');
    }

    #[test]
    fn test_reverse_complement_keeps_case() {
        let dna = Alphabet::dna();
        let seq = dna.encode(b"ACgtN");
        let rc = dna.reverse_complement(&seq);
        assert_eq!(rc, dna.encode(b"NacGT"));
    }

    #[test]
    fn test_protein_has_no_complement() {
        let protein = Alphabet::protein();
        let code = protein.encode_base(b'W');
        assert_eq!(protein.complement(code), code);
        assert_eq!(protein.decode(protein.unknown()), b'X');
    }

    #[test]
    fn test_subset_pattern_groups_letters() {
        let dna = Alphabet::dna();
        let subset = SubsetAlphabet::from_pattern(&dna, "AG CT", false).unwrap();
        assert_eq!(subset.size(), 2);
        assert_eq!(subset.symbol(dna.encode_base(b'A')), 0);
        assert_eq!(subset.symbol(dna.encode_base(b'G')), 0);
        assert_eq!(subset.symbol(dna.encode_base(b't')), 1);
        assert!(!subset.is_seedable(dna.unknown()));
        assert!(!subset.is_seedable(dna.delimiter()));
    }

    #[test]
    fn test_subset_masks_lowercase() {
        let dna = Alphabet::dna();
        let subset = SubsetAlphabet::from_pattern(&dna, "A C G T", true).unwrap();
        assert!(subset.is_seedable(dna.encode_base(b'A')));
        assert!(!subset.is_seedable(dna.encode_base(b'a')));
    }

    #[test]
    fn test_default_seeds_are_exact() {
        for (alphabet, pattern) in [
            (Alphabet::dna(), crate::defaults::DNA_SEED),
            (Alphabet::protein(), crate::defaults::PROTEIN_SEED),
        ] {
            let subset = SubsetAlphabet::from_pattern(&alphabet, pattern, false).unwrap();
            assert_eq!(subset.size(), alphabet.size());
            let symbols: std::collections::HashSet<u8> =
                (0..alphabet.size() as u8).map(|c| subset.symbol(c)).collect();
            assert_eq!(symbols.len(), alphabet.size());
        }
        // A single group is one symbol for every letter.
        let dna = Alphabet::dna();
        assert_eq!(SubsetAlphabet::from_pattern(&dna, "ACGT", false).unwrap().size(), 1);
    }

    #[test]
    fn test_subset_rejects_bad_patterns() {
        let dna = Alphabet::dna();
        assert!(SubsetAlphabet::from_pattern(&dna, "ACGTX", false).is_err());
        assert!(SubsetAlphabet::from_pattern(&dna, "AC CA", false).is_err());
        assert!(SubsetAlphabet::from_pattern(&dna, "  ", false).is_err());
    }

    #[test]
    fn test_standard_translation() {
        let dna = Alphabet::dna();
        let protein = Alphabet::protein();
        let code = GeneticCode::standard();
        let seq = dna.encode(b"ATGGCCTAAtgg");
        let aa = code.translate(&dna, &protein, &seq, 0);
        assert_eq!(aa.len(), 4);
        assert_eq!(protein.decode(aa[0]), b'M');
        assert_eq!(protein.decode(aa[1]), b'A');
        assert_eq!(aa[2], protein.unknown(), "stop codon");
        assert_eq!(protein.decode(aa[3]), b'w');
    }

    #[test]
    fn test_translation_frames() {
        let dna = Alphabet::dna();
        let protein = Alphabet::protein();
        let code = GeneticCode::standard();
        let seq = dna.encode(b"AATGTGG");
        let frame1 = code.translate(&dna, &protein, &seq, 1);
        assert_eq!(frame1.iter().map(|&c| protein.decode(c)).collect::<Vec<_>>(), b"MW");
        assert!(code.translate(&dna, &protein, &seq[..2], 2).is_empty());
    }
}
