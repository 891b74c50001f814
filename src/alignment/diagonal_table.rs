// Per-query record of how far gapless extensions already reached on each diagonal.
//
// A seed hit at (x, y) whose diagonal was extended past x by an earlier hit would
// reproduce the same segment pair, so it is skipped.

use std::collections::HashMap;

#[derive(Debug, Default)]
pub struct DiagonalTable {
    ends: HashMap<isize, usize>,
}

impl DiagonalTable {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn diagonal(x: usize, y: usize) -> isize {
        x as isize - y as isize
    }

    /// True when an earlier extension on this diagonal ended beyond reference offset `x`.
    pub fn is_covered(&self, x: usize, y: usize) -> bool {
        self.ends
            .get(&Self::diagonal(x, y))
            .is_some_and(|&end| end > x)
    }

    /// Record that an extension on the diagonal of `(x_end, y_end)` reached `x_end`.
    pub fn add_endpoint(&mut self, x_end: usize, y_end: usize) {
        let end = self.ends.entry(Self::diagonal(x_end, y_end)).or_insert(0);
        *end = (*end).max(x_end);
    }

    pub fn clear(&mut self) {
        self.ends.clear();
    }

    pub fn len(&self) -> usize {
        self.ends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }
}
