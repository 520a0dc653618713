#![forbid(unsafe_code)]

//! Fixed-length digit cell storage.

/// Ordered, fixed-length set of single-character cells.
///
/// The length is fixed at construction; writes past the end are ignored.
/// A cell is either empty or holds one character. Keyboard entry only ever
/// stores ASCII digits, but a programmatic [`write`](Self::write) stores
/// whatever it is given so that validation can flag it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitCells {
    cells: Vec<Option<char>>,
}

impl DigitCells {
    /// Create `len` empty cells.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            cells: vec![None; len],
        }
    }

    /// Number of cells.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Whether every cell is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(Option::is_none)
    }

    /// Whether every cell holds exactly one ASCII digit.
    #[must_use]
    pub fn is_filled(&self) -> bool {
        self.cells
            .iter()
            .all(|c| c.is_some_and(|c| c.is_ascii_digit()))
    }

    /// Number of non-empty cells.
    #[must_use]
    pub fn filled_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Contents of cell `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<char> {
        self.cells.get(index).copied().flatten()
    }

    /// Set cell `index`. Returns `false` if `index` is out of range.
    pub fn set(&mut self, index: usize, value: Option<char>) -> bool {
        match self.cells.get_mut(index) {
            Some(cell) => {
                *cell = value;
                true
            }
            None => false,
        }
    }

    /// Empty every cell.
    pub fn clear(&mut self) {
        self.cells.iter_mut().for_each(|c| *c = None);
    }

    /// Reset all cells, then assign the leading characters of `value`
    /// positionally.
    pub fn write(&mut self, value: &str) {
        self.clear();
        for (cell, ch) in self.cells.iter_mut().zip(value.chars()) {
            *cell = Some(ch);
        }
    }

    /// Assign `digits` starting at `start`, clipped to the cell count.
    ///
    /// Returns how many cells were written.
    pub fn assign_from(&mut self, digits: &[char], start: usize) -> usize {
        let Some(tail) = self.cells.get_mut(start..) else {
            return 0;
        };
        let mut written = 0;
        for (cell, &d) in tail.iter_mut().zip(digits) {
            *cell = Some(d);
            written += 1;
        }
        written
    }

    /// Concatenation of all non-empty cells.
    #[must_use]
    pub fn value(&self) -> String {
        self.cells.iter().flatten().collect()
    }

    /// Iterate over cell contents.
    pub fn iter(&self) -> impl Iterator<Item = Option<char>> + '_ {
        self.cells.iter().copied()
    }
}
