//! Quadtree over feature envelopes.
//!
//! The tree partitions the world bounds (longitude ±180, latitude ±90) into
//! quadrants. An entry lives in the deepest node whose bounds contain its
//! whole envelope, so entries that straddle a split line stay on the parent.
//! Envelopes outside the world bounds are kept in an overflow list that every
//! query scans.

use std::collections::BTreeSet;

use geofeature_core::Envelope;

/// Default number of entries a leaf holds before it splits.
pub const DEFAULT_NODE_CAPACITY: usize = 16;

/// Default depth limit.
pub const DEFAULT_MAX_DEPTH: u32 = 16;

const LONGITUDE_SHIFTS: [f64; 3] = [-360.0, 0.0, 360.0];

#[derive(Debug, Clone)]
struct Entry<K> {
    key: K,
    envelope: Envelope,
}

/// A single node: bounds, depth and the entries that fit no child.
#[derive(Debug, Clone)]
struct QuadtreeNode<K> {
    bounds: Envelope,
    level: u32,
    /// Entries in this node and all descendants.
    subtree_len: usize,
    entries: Vec<Entry<K>>,
    /// Children in NW, NE, SW, SE order once split.
    children: Option<Box<[Self; 4]>>,
}

/// Spatial index from envelopes to keys.
///
/// # Examples
///
/// ```
/// use geofeature_core::Envelope;
/// use geofeature_runtime::Quadtree;
///
/// let mut tree = Quadtree::new();
/// tree.insert(7_u64, Envelope::from_bounds(1.0, 1.0, 1.0, 1.0));
/// let hits = tree.query(&Envelope::from_bounds(0.0, 0.0, 2.0, 2.0));
/// assert_eq!(hits, vec![7]);
/// ```
#[derive(Debug, Clone)]
pub struct Quadtree<K> {
    root: QuadtreeNode<K>,
    overflow: Vec<Entry<K>>,
    node_capacity: usize,
    max_depth: u32,
}

impl<K> Default for Quadtree<K>
where
    K: Copy + Ord,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Quadtree<K>
where
    K: Copy + Ord,
{
    /// Empty tree with default tuning.
    #[must_use]
    pub fn new() -> Self {
        Self::with_tuning(DEFAULT_NODE_CAPACITY, DEFAULT_MAX_DEPTH)
    }

    /// Empty tree with explicit leaf capacity and depth limit.
    #[must_use]
    pub fn with_tuning(node_capacity: usize, max_depth: u32) -> Self {
        Self {
            root: QuadtreeNode::new(Envelope::WORLD, 0),
            overflow: Vec::new(),
            node_capacity: node_capacity.max(1),
            max_depth,
        }
    }

    /// Number of indexed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.root.subtree_len + self.overflow.len()
    }

    /// Whether the tree holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index `key` under `envelope`.
    pub fn insert(&mut self, key: K, envelope: Envelope) {
        let entry = Entry { key, envelope };
        if envelope.is_finite() && Envelope::WORLD.contains(&envelope) {
            self.root.insert(entry, self.node_capacity, self.max_depth);
        } else {
            self.overflow.push(entry);
        }
    }

    /// Remove `key`, which must have been inserted under `envelope`.
    ///
    /// Returns whether an entry was removed.
    pub fn remove(&mut self, key: K, envelope: &Envelope) -> bool {
        if let Some(position) = self.overflow.iter().position(|entry| entry.key == key) {
            self.overflow.swap_remove(position);
            return true;
        }
        self.root.remove(key, envelope) || self.root.remove_anywhere(key)
    }

    /// Move `key` after its envelope changed.
    pub fn refresh(&mut self, key: K, old: &Envelope, new: Envelope) {
        if !self.remove(key, old) {
            log::warn!("quadtree refresh found no entry for the old envelope");
        }
        self.insert(key, new);
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        self.root = QuadtreeNode::new(Envelope::WORLD, 0);
        self.overflow.clear();
    }

    /// Keys whose envelope intersects `region`, in no particular order.
    #[must_use]
    pub fn query(&self, region: &Envelope) -> Vec<K> {
        let mut hits = Vec::new();
        self.root.query(region, &mut hits);
        hits.extend(
            self.overflow
                .iter()
                .filter(|entry| entry.envelope.intersects(region))
                .map(|entry| entry.key),
        );
        hits
    }

    /// Upper bound on the number of keys [`Quadtree::query`] would return.
    ///
    /// Nodes wholly inside the region contribute their subtree size without
    /// being visited; partially covered nodes contribute every entry they
    /// hold.
    #[must_use]
    pub fn approximate_count(&self, region: &Envelope) -> usize {
        self.root.approximate_count(region) + self.overflow.len()
    }

    /// [`Quadtree::query`] evaluated with the region shifted by -360, 0 and
    /// +360 degrees of longitude, deduplicated and sorted.
    #[must_use]
    pub fn query_wrapped(&self, region: &Envelope) -> Vec<K> {
        let mut hits = BTreeSet::new();
        for shifted in wrapped_regions(region) {
            hits.extend(self.query(&shifted));
        }
        hits.into_iter().collect()
    }

    /// [`Quadtree::approximate_count`] summed over the shifted regions.
    #[must_use]
    pub fn approximate_count_wrapped(&self, region: &Envelope) -> usize {
        wrapped_regions(region)
            .map(|shifted| self.root.approximate_count(&shifted))
            .sum::<usize>()
            + self.overflow.len()
    }
}

/// Copies of `region` shifted by a full turn either way that still touch
/// the world bounds.
pub(crate) fn wrapped_regions(region: &Envelope) -> impl Iterator<Item = Envelope> + '_ {
    LONGITUDE_SHIFTS
        .iter()
        .map(|shift| region.translate_x(*shift))
        .filter(|shifted| shifted.intersects(&Envelope::WORLD))
}

impl<K> QuadtreeNode<K>
where
    K: Copy + Ord,
{
    const fn new(bounds: Envelope, level: u32) -> Self {
        Self {
            bounds,
            level,
            subtree_len: 0,
            entries: Vec::new(),
            children: None,
        }
    }

    fn child_for(&mut self, envelope: &Envelope) -> Option<&mut Self> {
        self.children
            .as_mut()
            .and_then(|children| children.iter_mut().find(|child| child.bounds.contains(envelope)))
    }

    fn insert(&mut self, entry: Entry<K>, capacity: usize, max_depth: u32) {
        self.subtree_len += 1;
        if let Some(child) = self.child_for(&entry.envelope) {
            child.insert(entry, capacity, max_depth);
            return;
        }
        self.entries.push(entry);
        if self.children.is_none() && self.entries.len() > capacity && self.level < max_depth {
            self.subdivide(capacity, max_depth);
        }
    }

    #[expect(
        clippy::float_arithmetic,
        reason = "quadrant split points are midpoints of the node bounds"
    )]
    fn subdivide(&mut self, capacity: usize, max_depth: u32) {
        let Envelope {
            min_x,
            min_y,
            max_x,
            max_y,
        } = self.bounds;
        let mid_x = (min_x + max_x) / 2.0;
        let mid_y = (min_y + max_y) / 2.0;
        let level = self.level + 1;

        self.children = Some(Box::new([
            Self::new(Envelope::from_bounds(min_x, mid_y, mid_x, max_y), level),
            Self::new(Envelope::from_bounds(mid_x, mid_y, max_x, max_y), level),
            Self::new(Envelope::from_bounds(min_x, min_y, mid_x, mid_y), level),
            Self::new(Envelope::from_bounds(mid_x, min_y, max_x, mid_y), level),
        ]));

        let pending = std::mem::take(&mut self.entries);
        for entry in pending {
            if let Some(child) = self.child_for(&entry.envelope) {
                child.insert(entry, capacity, max_depth);
            } else {
                self.entries.push(entry);
            }
        }
    }

    fn remove(&mut self, key: K, envelope: &Envelope) -> bool {
        let removed = if let Some(child) = self.child_for(envelope) {
            child.remove(key, envelope)
        } else if let Some(position) = self.entries.iter().position(|entry| entry.key == key) {
            self.entries.swap_remove(position);
            true
        } else {
            false
        };
        if removed {
            self.subtree_len -= 1;
        }
        removed
    }

    fn remove_anywhere(&mut self, key: K) -> bool {
        let removed = if let Some(position) = self.entries.iter().position(|entry| entry.key == key)
        {
            self.entries.swap_remove(position);
            true
        } else {
            self.children.as_mut().is_some_and(|children| {
                children.iter_mut().any(|child| child.remove_anywhere(key))
            })
        };
        if removed {
            self.subtree_len -= 1;
        }
        removed
    }

    fn query(&self, region: &Envelope, hits: &mut Vec<K>) {
        if self.subtree_len == 0 || !self.bounds.intersects(region) {
            return;
        }
        hits.extend(
            self.entries
                .iter()
                .filter(|entry| entry.envelope.intersects(region))
                .map(|entry| entry.key),
        );
        if let Some(children) = &self.children {
            for child in children.iter() {
                child.query(region, hits);
            }
        }
    }

    fn approximate_count(&self, region: &Envelope) -> usize {
        if self.subtree_len == 0 || !self.bounds.intersects(region) {
            return 0;
        }
        if region.contains(&self.bounds) {
            return self.subtree_len;
        }
        let nested = self.children.as_ref().map_or(0, |children| {
            children
                .iter()
                .map(|child| child.approximate_count(region))
                .sum()
        });
        self.entries.len() + nested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    fn point(x: f64, y: f64) -> Envelope {
        Envelope::from_bounds(x, y, x, y)
    }

    #[fixture]
    fn grid() -> Quadtree<u32> {
        let mut tree = Quadtree::with_tuning(2, 8);
        let mut key = 0;
        for x in -5..5 {
            for y in -5..5 {
                tree.insert(key, point(f64::from(x) * 10.0, f64::from(y) * 10.0));
                key += 1;
            }
        }
        tree
    }

    #[rstest]
    fn counts_entries(grid: Quadtree<u32>) {
        assert_eq!(grid.len(), 100);
        assert!(!grid.is_empty());
    }

    #[rstest]
    fn query_returns_only_intersecting_entries(grid: Quadtree<u32>) {
        let region = Envelope::from_bounds(-1.0, -1.0, 11.0, 11.0);
        let mut hits = grid.query(&region);
        hits.sort_unstable();
        // (0,0), (0,10), (10,0), (10,10)
        assert_eq!(hits, vec![55, 56, 65, 66]);
    }

    #[rstest]
    fn approximate_count_bounds_the_query(grid: Quadtree<u32>) {
        let region = Envelope::from_bounds(-12.0, -33.0, 27.0, 8.0);
        let exact = grid.query(&region).len();
        assert!(grid.approximate_count(&region) >= exact);
        assert_eq!(grid.approximate_count(&Envelope::WORLD), 100);
    }

    #[rstest]
    fn remove_then_query_misses(mut grid: Quadtree<u32>) {
        assert!(grid.remove(55, &point(0.0, 0.0)));
        assert!(!grid.remove(55, &point(0.0, 0.0)));
        assert!(grid.query(&point(0.0, 0.0)).is_empty());
        assert_eq!(grid.len(), 99);
    }

    #[rstest]
    fn refresh_moves_entry(mut grid: Quadtree<u32>) {
        grid.refresh(0, &point(-50.0, -50.0), point(45.0, 45.0));
        assert!(grid.query(&point(-50.0, -50.0)).is_empty());
        assert_eq!(grid.query(&point(45.0, 45.0)), vec![0]);
        assert_eq!(grid.len(), 100);
    }

    #[rstest]
    fn straddling_entries_are_found() {
        let mut tree = Quadtree::with_tuning(1, 4);
        tree.insert(1_u8, Envelope::from_bounds(-1.0, -1.0, 1.0, 1.0));
        tree.insert(2, point(100.0, 45.0));
        tree.insert(3, point(-100.0, -45.0));
        assert_eq!(tree.query(&point(0.5, 0.5)), vec![1]);
        assert!(tree.remove(1, &Envelope::from_bounds(-1.0, -1.0, 1.0, 1.0)));
        assert_eq!(tree.len(), 2);
    }

    #[rstest]
    fn out_of_world_envelopes_overflow() {
        let mut tree = Quadtree::new();
        tree.insert(9_u8, Envelope::from_bounds(170.0, 0.0, 190.0, 1.0));
        assert_eq!(tree.query(&point(175.0, 0.5)), vec![9]);
        assert!(tree.remove(9, &Envelope::from_bounds(170.0, 0.0, 190.0, 1.0)));
        assert!(tree.is_empty());
    }

    #[rstest]
    fn wrapped_query_crosses_the_antimeridian() {
        let mut tree = Quadtree::new();
        tree.insert(1_u8, point(-179.5, 0.0));
        tree.insert(2, point(179.5, 0.0));
        tree.insert(3, point(0.0, 0.0));
        let region = Envelope::from_bounds(179.0, -1.0, 181.0, 1.0);
        assert_eq!(tree.query_wrapped(&region), vec![1, 2]);
        assert!(tree.approximate_count_wrapped(&region) >= 2);
    }

    #[rstest]
    fn clear_empties_the_tree(mut grid: Quadtree<u32>) {
        grid.clear();
        assert!(grid.is_empty());
        assert!(grid.query(&Envelope::WORLD).is_empty());
    }
}
