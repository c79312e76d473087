//! Dirty-region tracking
//!
//! Regions live in actual pixel space. The set never holds two overlapping
//! rectangles: an insert that overlaps an existing region is unioned with it
//! and the union is re-inserted, so a chain of overlaps folds into one
//! bounding rectangle.

use smallvec::SmallVec;

use bubble_core::Rect;

/// Non-overlapping set of rectangles needing a redraw
#[derive(Clone, Debug)]
pub struct DirtyRegionSet {
    regions: SmallVec<[Rect; 8]>,
    bounds: Rect,
    max_regions: usize,
    full: bool,
}

impl DirtyRegionSet {
    /// `max_regions` is the count above which the set collapses to `bounds`
    pub fn new(bounds: Rect, max_regions: usize) -> Self {
        Self {
            regions: SmallVec::new(),
            bounds,
            max_regions: max_regions.max(1),
            full: false,
        }
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    /// Track a resized canvas. Pending regions are discarded.
    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = bounds;
        self.clear();
    }

    /// Mark `rect` dirty.
    ///
    /// The rect is snapped outward to whole pixels and clipped to the canvas;
    /// anything left empty is ignored.
    pub fn insert(&mut self, rect: Rect) {
        if self.full || !rect.is_finite() {
            return;
        }
        let Some(mut rect) = rect.round_out().intersection(&self.bounds) else {
            return;
        };

        while let Some(i) = self.regions.iter().position(|r| r.intersects(&rect)) {
            rect = self.regions.swap_remove(i).union(&rect);
        }
        self.regions.push(rect);

        if self.regions.len() > self.max_regions {
            tracing::debug!(
                regions = self.regions.len(),
                max = self.max_regions,
                "too many dirty regions, redrawing full canvas"
            );
            self.collapse_to_full();
        }
    }

    /// Replace every region with the whole canvas
    pub fn collapse_to_full(&mut self) {
        self.regions.clear();
        if !self.bounds.is_empty() {
            self.regions.push(self.bounds);
        }
        self.full = true;
    }

    /// Whether the set covers the whole canvas
    pub fn is_full(&self) -> bool {
        self.full
    }

    pub fn regions(&self) -> &[Rect] {
        &self.regions
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn total_area(&self) -> f32 {
        self.regions.iter().map(Rect::area).sum()
    }

    pub fn clear(&mut self) {
        self.regions.clear();
        self.full = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set() -> DirtyRegionSet {
        DirtyRegionSet::new(Rect::new(0.0, 0.0, 800.0, 600.0), 10)
    }

    #[test]
    fn test_same_rect_twice_is_one_region() {
        let mut dirty = set();
        dirty.insert(Rect::new(10.0, 10.0, 20.0, 20.0));
        dirty.insert(Rect::new(10.0, 10.0, 20.0, 20.0));
        assert_eq!(dirty.regions(), &[Rect::new(10.0, 10.0, 20.0, 20.0)]);
    }

    #[test]
    fn test_disjoint_rects_stay_separate() {
        let mut dirty = set();
        dirty.insert(Rect::new(0.0, 0.0, 10.0, 10.0));
        dirty.insert(Rect::new(100.0, 100.0, 10.0, 10.0));
        assert_eq!(dirty.len(), 2);
    }

    #[test]
    fn test_overlapping_rects_merge_to_union() {
        let mut dirty = set();
        dirty.insert(Rect::new(0.0, 0.0, 20.0, 20.0));
        dirty.insert(Rect::new(10.0, 10.0, 20.0, 20.0));
        assert_eq!(dirty.regions(), &[Rect::new(0.0, 0.0, 30.0, 30.0)]);
    }

    #[test]
    fn test_union_cascades() {
        let mut dirty = set();
        dirty.insert(Rect::new(0.0, 0.0, 10.0, 10.0));
        dirty.insert(Rect::new(30.0, 0.0, 10.0, 10.0));
        // Bridges both existing regions
        dirty.insert(Rect::new(5.0, 0.0, 30.0, 5.0));
        assert_eq!(dirty.regions(), &[Rect::new(0.0, 0.0, 40.0, 10.0)]);
    }

    #[test]
    fn test_no_two_regions_overlap() {
        let mut dirty = DirtyRegionSet::new(Rect::new(0.0, 0.0, 800.0, 600.0), 100);
        for i in 0..40 {
            let f = i as f32;
            dirty.insert(Rect::new((f * 37.0) % 700.0, (f * 53.0) % 500.0, 40.0, 30.0));
        }
        let regions = dirty.regions();
        for (i, a) in regions.iter().enumerate() {
            for b in &regions[i + 1..] {
                assert!(!a.intersects(b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn test_clipped_and_empty_rects() {
        let mut dirty = set();
        dirty.insert(Rect::new(-10.0, -10.0, 20.0, 20.0));
        assert_eq!(dirty.regions(), &[Rect::new(0.0, 0.0, 10.0, 10.0)]);

        dirty.insert(Rect::new(50.0, 50.0, 0.0, 10.0));
        dirty.insert(Rect::new(900.0, 50.0, 10.0, 10.0));
        dirty.insert(Rect::new(f32::NAN, 0.0, 10.0, 10.0));
        assert_eq!(dirty.len(), 1);
    }

    #[test]
    fn test_fractional_rects_snap_outward() {
        let mut dirty = set();
        dirty.insert(Rect::new(10.5, 10.25, 5.0, 5.0));
        assert_eq!(dirty.regions(), &[Rect::new(10.0, 10.0, 6.0, 6.0)]);
    }

    #[test]
    fn test_collapse_above_max() {
        let mut dirty = DirtyRegionSet::new(Rect::new(0.0, 0.0, 800.0, 600.0), 3);
        for i in 0..4 {
            dirty.insert(Rect::new(i as f32 * 100.0, 0.0, 10.0, 10.0));
        }
        assert!(dirty.is_full());
        assert_eq!(dirty.regions(), &[Rect::new(0.0, 0.0, 800.0, 600.0)]);

        // Further inserts are absorbed
        dirty.insert(Rect::new(500.0, 500.0, 10.0, 10.0));
        assert_eq!(dirty.len(), 1);

        dirty.clear();
        assert!(!dirty.is_full());
        assert!(dirty.is_empty());
    }
}
