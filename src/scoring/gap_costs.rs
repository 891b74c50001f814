// Affine and two-piece affine gap costs.
//
// A gap of length k costs `min over pieces (open + extend * k)`. With two pieces a
// cheap-extension piece takes over for long gaps, which models large indels
// without over-penalising them.

use super::matrix::INF;
use crate::errors::{Result, ScanError};

pub const MAX_GAP_PIECES: usize = 2;

/// Largest open or extend cost accepted.
pub const MAX_GAP_COST: i32 = INF / 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GapPiece {
    pub open: i32,
    pub extend: i32,
}

impl GapPiece {
    pub const fn new(open: i32, extend: i32) -> Self {
        Self { open, extend }
    }

    /// Cost of opening plus the first extension.
    #[inline(always)]
    pub const fn first(&self) -> i32 {
        self.open + self.extend
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GapCosts {
    /// Pieces for gaps in the query (reference letters skipped).
    pub deletion: Vec<GapPiece>,
    /// Pieces for gaps in the reference (query letters skipped).
    pub insertion: Vec<GapPiece>,
}

impl GapCosts {
    /// Same single-piece affine cost for insertions and deletions.
    pub fn affine(open: i32, extend: i32) -> Self {
        Self {
            deletion: vec![GapPiece::new(open, extend)],
            insertion: vec![GapPiece::new(open, extend)],
        }
    }

    pub fn new(deletion: Vec<GapPiece>, insertion: Vec<GapPiece>) -> Result<Self> {
        let costs = Self {
            deletion,
            insertion,
        };
        costs.validate().map_err(ScanError::Configuration)?;
        Ok(costs)
    }

    /// Pair up open and extend lists ("7,20" with "1,0" gives two pieces).
    pub fn from_lists(open: &[i32], extend: &[i32]) -> Result<Vec<GapPiece>> {
        if open.len() != extend.len() {
            return Err(ScanError::config(format!(
                "gap open list has {} values but gap extend list has {}",
                open.len(),
                extend.len()
            )));
        }
        Ok(open
            .iter()
            .zip(extend)
            .map(|(&o, &e)| GapPiece::new(o, e))
            .collect())
    }

    pub fn validate(&self) -> std::result::Result<(), Vec<String>> {
        let mut errors = Vec::new();
        for (label, pieces) in [("deletion", &self.deletion), ("insertion", &self.insertion)] {
            if pieces.is_empty() || pieces.len() > MAX_GAP_PIECES {
                errors.push(format!(
                    "{} gap costs need 1 to {} pieces, got {}",
                    label,
                    MAX_GAP_PIECES,
                    pieces.len()
                ));
            }
            for p in pieces.iter() {
                if p.open > MAX_GAP_COST || p.extend > MAX_GAP_COST {
                    errors.push(format!(
                        "{} gap costs must be <= {}, got {},{}",
                        label, MAX_GAP_COST, p.open, p.extend
                    ));
                    continue;
                }
                if p.open < 0 {
                    errors.push(format!("{} gap open must be >= 0, got {}", label, p.open));
                }
                if p.extend < 0 || p.first() <= 0 {
                    errors.push(format!(
                        "{} gap extend must be >= 0 with open + extend > 0, got {},{}",
                        label, p.open, p.extend
                    ));
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn cost(pieces: &[GapPiece], len: u32) -> i32 {
        pieces
            .iter()
            .map(|p| p.open.saturating_add(p.extend.saturating_mul(len as i32)))
            .min()
            .unwrap_or(0)
    }

    pub fn deletion_cost(&self, len: u32) -> i32 {
        Self::cost(&self.deletion, len)
    }

    pub fn insertion_cost(&self, len: u32) -> i32 {
        Self::cost(&self.insertion, len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affine_cost() {
        let g = GapCosts::affine(5, 1);
        assert_eq!(g.insertion_cost(1), 6);
        assert_eq!(g.deletion_cost(3), 8);
    }

    #[test]
    fn test_two_piece_cost_takes_cheaper_piece() {
        let pieces = GapCosts::from_lists(&[4, 24], &[2, 1]).unwrap();
        let g = GapCosts::new(pieces.clone(), pieces).unwrap();
        assert_eq!(g.deletion_cost(5), 14);
        assert_eq!(g.deletion_cost(30), 54);
        assert_eq!(g.insertion_cost(20), 44);
    }

    #[test]
    fn test_validate_rejects_bad_pieces() {
        assert!(GapCosts::from_lists(&[1, 2], &[1]).is_err());
        let three = vec![GapPiece::new(1, 1); 3];
        assert!(GapCosts::new(three, vec![GapPiece::new(1, 1)]).is_err());
        let free = vec![GapPiece::new(0, 0)];
        let err = GapCosts::new(free.clone(), free).unwrap_err();
        assert!(err.to_string().contains("open + extend"));
    }

    #[test]
    fn test_validate_rejects_costs_near_overflow() {
        let huge = vec![GapPiece::new(i32::MAX, 1)];
        let err = GapCosts::new(huge.clone(), huge).unwrap_err();
        assert!(matches!(err, ScanError::Configuration(_)));
        assert!(err.to_string().contains("must be <="));

        let cheap = vec![GapPiece::new(MAX_GAP_COST, MAX_GAP_COST)];
        let g = GapCosts::new(cheap.clone(), cheap).unwrap();
        assert!(g.deletion_cost(1000) > 0);
    }
}
