use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in the `x,y` plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Rect {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Self { min, max }
    }

    /// Parses the query-string form `minx,miny,maxx,maxy`.
    ///
    /// Returns `None` on wrong arity or unparseable numbers; callers surface
    /// that as a bad request.
    pub fn parse(raw: &str) -> Option<Self> {
        let parts: Vec<&str> = raw.split(',').collect();
        if parts.len() != 4 {
            return None;
        }
        let mut values = [0f64; 4];
        for (slot, part) in values.iter_mut().zip(parts.iter()) {
            *slot = part.trim().parse().ok()?;
        }
        Some(Self::new([values[0], values[1]], [values[2], values[3]]))
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.min[0] <= other.max[0]
            && self.max[0] >= other.min[0]
            && self.min[1] <= other.max[1]
            && self.max[1] >= other.min[1]
    }
}

/// One indexed feature: its id and the bounds it was inserted under.
#[derive(Debug, Clone, PartialEq)]
struct SpatialEntry {
    id: u64,
    bounds: Rect,
}

impl RTreeObject for SpatialEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.bounds.min, self.bounds.max)
    }
}

/// R-tree of feature bounding boxes.
///
/// Entries are identified by the `(id, bounds)` pair, so removal needs the
/// bounds the entry was inserted with.
#[derive(Debug, Default)]
pub struct SpatialIndex {
    tree: RTree<SpatialEntry>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    pub fn insert(&mut self, id: u64, bounds: Rect) {
        self.tree.insert(SpatialEntry { id, bounds });
    }

    /// Removes the entry inserted as `(id, bounds)`. Returns whether an entry
    /// was actually removed.
    pub fn remove(&mut self, id: u64, bounds: Rect) -> bool {
        self.tree.remove(&SpatialEntry { id, bounds }).is_some()
    }

    /// Visits the id of every entry whose bounds intersect `rect`. The walk
    /// stops early when `visit` returns false.
    pub fn search<F>(&self, rect: Rect, mut visit: F)
    where
        F: FnMut(u64) -> bool,
    {
        let envelope = AABB::from_corners(rect.min, rect.max);
        for entry in self.tree.locate_in_envelope_intersecting(&envelope) {
            if !visit(entry.id) {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
