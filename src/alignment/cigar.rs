//! Edit operations - single authoritative implementation
//!
//! Alignments store their path as run-length encoded edit operations. All
//! merging, reversal and length accounting goes through this module.

/// Edit operation with zero-cost conversion to/from bytes
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum EditOp {
    Match = b'M',     // Aligned column (match or mismatch)
    Insertion = b'I', // Query letters absent from the reference
    Deletion = b'D',  // Reference letters absent from the query
}

/// One run of identical operations.
pub type EditRun = (EditOp, u32);

impl EditOp {
    #[inline(always)]
    pub const fn from_byte(b: u8) -> Option<Self> {
        match b {
            b'M' => Some(Self::Match),
            b'I' => Some(Self::Insertion),
            b'D' => Some(Self::Deletion),
            _ => None,
        }
    }

    #[inline(always)]
    pub const fn to_byte(self) -> u8 {
        self as u8
    }

    #[inline(always)]
    pub const fn consumes_query(self) -> bool {
        matches!(self, Self::Match | Self::Insertion)
    }

    #[inline(always)]
    pub const fn consumes_ref(self) -> bool {
        matches!(self, Self::Match | Self::Deletion)
    }
}

/// Append `len` operations, merging with the last run when it has the same op.
#[inline]
pub fn push_run(ops: &mut Vec<EditRun>, op: EditOp, len: u32) {
    if len == 0 {
        return;
    }
    match ops.last_mut() {
        Some((last, n)) if *last == op => *n += len,
        _ => ops.push((op, len)),
    }
}

/// Merge adjacent identical operations in place and drop empty runs.
///
/// E.g., `[(M, 10), (M, 5), (I, 0)]` → `[(M, 15)]`
pub fn normalize_in_place(ops: &mut Vec<EditRun>) {
    let mut merged = Vec::with_capacity(ops.len());
    for &(op, len) in ops.iter() {
        push_run(&mut merged, op, len);
    }
    *ops = merged;
}

/// Reverse the order of runs (used after extending leftwards from an anchor).
#[inline]
pub fn reverse(ops: &[EditRun]) -> Vec<EditRun> {
    ops.iter().copied().rev().collect()
}

/// Concatenate two paths, merging the runs that meet in the middle.
pub fn join(left: &[EditRun], right: &[EditRun]) -> Vec<EditRun> {
    let mut out = Vec::with_capacity(left.len() + right.len());
    for &(op, len) in left.iter().chain(right) {
        push_run(&mut out, op, len);
    }
    out
}

#[inline]
pub fn reference_length(ops: &[EditRun]) -> usize {
    ops.iter()
        .filter(|(op, _)| op.consumes_ref())
        .map(|&(_, len)| len as usize)
        .sum()
}

#[inline]
pub fn query_length(ops: &[EditRun]) -> usize {
    ops.iter()
        .filter(|(op, _)| op.consumes_query())
        .map(|&(_, len)| len as usize)
        .sum()
}

/// Number of alignment columns (every operation is one column).
#[inline]
pub fn column_count(ops: &[EditRun]) -> usize {
    ops.iter().map(|&(_, len)| len as usize).sum()
}

/// Convert to string representation (e.g., "50M2I48M").
pub fn to_string(ops: &[EditRun]) -> String {
    if ops.is_empty() {
        return "*".to_string();
    }
    let mut result = String::with_capacity(ops.len() * 4);
    for &(op, len) in ops {
        result.push_str(&len.to_string());
        result.push(op.to_byte() as char);
    }
    result
}

/// Parse the representation produced by [`to_string`].
pub fn parse(s: &str) -> Result<Vec<EditRun>, String> {
    if s == "*" {
        return Ok(Vec::new());
    }
    let mut ops = Vec::new();
    let mut len: u32 = 0;
    let mut have_digits = false;
    for b in s.bytes() {
        if b.is_ascii_digit() {
            len = len
                .checked_mul(10)
                .and_then(|v| v.checked_add((b - b'0') as u32))
                .ok_or_else(|| format!("Run length overflow in '{}'", s))?;
            have_digits = true;
        } else {
            let op = EditOp::from_byte(b)
                .ok_or_else(|| format!("Invalid edit operation '{}' in '{}'", b as char, s))?;
            if !have_digits {
                return Err(format!("Missing run length before '{}' in '{}'", b as char, s));
            }
            push_run(&mut ops, op, len);
            len = 0;
            have_digits = false;
        }
    }
    if have_digits {
        return Err(format!("Trailing run length without operation in '{}'", s));
    }
    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use EditOp::*;

    #[test]
    fn test_push_run_merges() {
        let mut ops = Vec::new();
        push_run(&mut ops, Match, 3);
        push_run(&mut ops, Match, 2);
        push_run(&mut ops, Insertion, 0);
        push_run(&mut ops, Deletion, 1);
        assert_eq!(ops, vec![(Match, 5), (Deletion, 1)]);
    }

    #[test]
    fn test_lengths() {
        let ops = vec![(Match, 4), (Insertion, 1), (Match, 4), (Deletion, 2)];
        assert_eq!(reference_length(&ops), 10);
        assert_eq!(query_length(&ops), 9);
        assert_eq!(column_count(&ops), 11);
    }

    #[test]
    fn test_join_and_reverse() {
        let left = reverse(&[(Match, 2), (Insertion, 1)]);
        assert_eq!(left, vec![(Insertion, 1), (Match, 2)]);
        let joined = join(&left, &[(Match, 3)]);
        assert_eq!(joined, vec![(Insertion, 1), (Match, 5)]);
    }

    #[test]
    fn test_string_round_trip() {
        let ops = parse("4M1I4M").unwrap();
        assert_eq!(ops, vec![(Match, 4), (Insertion, 1), (Match, 4)]);
        assert_eq!(to_string(&ops), "4M1I4M");
        assert_eq!(to_string(&[]), "*");
        assert!(parse("4X").is_err());
        assert!(parse("M").is_err());
        assert!(parse("12").is_err());
    }

    #[test]
    fn test_normalize_in_place() {
        let mut ops = vec![(Match, 10), (Match, 5), (Insertion, 0), (Deletion, 2), (Deletion, 1)];
        normalize_in_place(&mut ops);
        assert_eq!(ops, vec![(Match, 15), (Deletion, 3)]);
    }
}
