/// Per-cell modification flags for one tile layer.
///
/// Dirty cells are kept both as a flag array (for O(1) dedup) and as an
/// insertion-ordered list, so a frame that touches a handful of cells
/// costs a handful of redraws rather than a scan of the whole grid.
#[derive(Clone, Debug)]
pub struct DirtyTileCache {
    flags: Vec<bool>,
    dirty: Vec<usize>,
    mark_events: u64,
}

impl DirtyTileCache {
    pub fn new(cells: usize) -> Self {
        Self {
            flags: vec![false; cells],
            dirty: Vec::new(),
            mark_events: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    /// Flag `cell` for redraw. Returns true on a clean-to-dirty transition;
    /// marking an already dirty or out-of-range cell does nothing.
    pub fn mark_dirty(&mut self, cell: usize) -> bool {
        match self.flags.get_mut(cell) {
            Some(flag) if !*flag => {
                *flag = true;
                self.dirty.push(cell);
                self.mark_events += 1;
                true
            }
            _ => false,
        }
    }

    /// Flag every cell, in index order.
    pub fn mark_all(&mut self) {
        self.flags.fill(true);
        self.dirty.clear();
        self.dirty.extend(0..self.flags.len());
    }

    pub fn is_dirty(&self, cell: usize) -> bool {
        self.flags.get(cell).copied().unwrap_or(false)
    }

    pub fn dirty_count(&self) -> usize {
        self.dirty.len()
    }

    /// Clean-to-dirty transitions caused by [`mark_dirty`](Self::mark_dirty)
    /// since creation.
    pub fn mark_events(&self) -> u64 {
        self.mark_events
    }

    /// Hand out the dirty cells and clear their flags.
    pub fn take_dirty(&mut self) -> Vec<usize> {
        for &cell in &self.dirty {
            self.flags[cell] = false;
        }
        std::mem::take(&mut self.dirty)
    }

    pub fn clear(&mut self) {
        self.flags.fill(false);
        self.dirty.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_are_deduplicated() {
        let mut cache = DirtyTileCache::new(16);
        assert!(cache.mark_dirty(3));
        assert!(!cache.mark_dirty(3));
        assert!(cache.mark_dirty(1));
        assert_eq!(cache.mark_events(), 2);
        assert_eq!(cache.take_dirty(), vec![3, 1]);
        assert!(!cache.is_dirty(3));
        assert!(cache.take_dirty().is_empty());
    }

    #[test]
    fn mark_all_lists_every_cell_once() {
        let mut cache = DirtyTileCache::new(4);
        cache.mark_dirty(2);
        cache.mark_all();
        assert_eq!(cache.take_dirty(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn out_of_range_is_ignored() {
        let mut cache = DirtyTileCache::new(4);
        assert!(!cache.mark_dirty(4));
        assert_eq!(cache.dirty_count(), 0);
    }
}
