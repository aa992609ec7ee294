//! Generation-stamped visited set over a dense ordinal domain.
//!
//! `clear()` bumps a generation counter instead of zeroing the array, so the
//! set can be reset between levels of one search without touching memory
//! proportional to the corpus. The array is only wiped when the counter
//! wraps.

/// Per-query marker set over ordinals `[0, capacity)`.
#[derive(Debug)]
pub struct VisitedSet {
    stamps: Vec<u16>,
    generation: u16,
    marked: usize,
}

impl VisitedSet {
    /// Create a set covering ordinals `[0, capacity)`.
    pub fn new(capacity: usize) -> Self {
        Self {
            stamps: vec![0; capacity],
            generation: 1,
            marked: 0,
        }
    }

    /// Number of ordinals this set can hold.
    pub fn capacity(&self) -> usize {
        self.stamps.len()
    }

    /// Grow to cover at least `capacity` ordinals. Never shrinks.
    pub fn ensure_capacity(&mut self, capacity: usize) {
        if capacity > self.stamps.len() {
            self.stamps.resize(capacity, 0);
        }
    }

    /// Forget every mark.
    pub fn clear(&mut self) {
        if self.generation == u16::MAX {
            self.stamps.fill(0);
            self.generation = 1;
        } else {
            self.generation += 1;
        }
        self.marked = 0;
    }

    /// Mark `ordinal` and return whether it was already marked.
    ///
    /// The ordinal must be below [`capacity`](Self::capacity).
    #[inline]
    pub fn get_and_set(&mut self, ordinal: u32) -> bool {
        let slot = &mut self.stamps[ordinal as usize];
        if *slot == self.generation {
            true
        } else {
            *slot = self.generation;
            self.marked += 1;
            false
        }
    }

    /// Returns true if `ordinal` is marked.
    #[inline]
    pub fn contains(&self, ordinal: u32) -> bool {
        self.stamps
            .get(ordinal as usize)
            .is_some_and(|&stamp| stamp == self.generation)
    }

    /// Number of marked ordinals since the last clear.
    ///
    /// Only used for diagnostics.
    pub fn approximate_cardinality(&self) -> usize {
        self.marked
    }
}

impl Default for VisitedSet {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_and_set() {
        let mut visited = VisitedSet::new(100);
        assert!(!visited.get_and_set(0));
        assert!(visited.get_and_set(0));
        assert!(!visited.get_and_set(50));
        assert!(visited.contains(50));
        assert!(!visited.contains(51));
        assert_eq!(visited.approximate_cardinality(), 2);
    }

    #[test]
    fn test_clear_forgets_marks() {
        let mut visited = VisitedSet::new(10);
        visited.get_and_set(3);
        visited.get_and_set(7);

        visited.clear();
        assert_eq!(visited.approximate_cardinality(), 0);
        assert!(!visited.contains(3));
        assert!(!visited.get_and_set(7));
    }

    #[test]
    fn test_generation_wraparound() {
        let mut visited = VisitedSet::new(10);
        // generation starts at 1, 65534 clears reach u16::MAX
        for _ in 0..65534 {
            visited.clear();
        }
        assert_eq!(visited.generation, u16::MAX);
        visited.get_and_set(5);

        visited.clear();
        assert_eq!(visited.generation, 1);
        assert!(!visited.get_and_set(5));
    }

    #[test]
    fn test_ensure_capacity_keeps_marks() {
        let mut visited = VisitedSet::new(4);
        visited.get_and_set(2);
        visited.ensure_capacity(16);
        assert_eq!(visited.capacity(), 16);
        assert!(visited.contains(2));
        assert!(!visited.get_and_set(15));

        visited.ensure_capacity(8);
        assert_eq!(visited.capacity(), 16);
    }

    #[test]
    fn test_contains_out_of_range() {
        let visited = VisitedSet::new(4);
        assert!(!visited.contains(100));
    }
}
