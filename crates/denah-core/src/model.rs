//! The geometry model: authoritative segments, walls and dimension offsets.

use crate::geometry::{EPSILON, LineSegment, Point3, SegmentId, WallFace, WallId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Owns every segment, wall and dimension offset of a floor plan.
///
/// Segments and walls are keyed by their monotonically assigned ids, so
/// iteration order is creation order and a segment reinserted by undo lands
/// back in its original place.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeometryModel {
    segments: BTreeMap<SegmentId, LineSegment>,
    walls: BTreeMap<WallId, WallFace>,
    /// Signed screen-pixel label offsets; absent means 0.
    dimension_offsets: HashMap<SegmentId, f64>,
    /// Ground-plane segments registered as occlusion proxies.
    occluders: BTreeSet<SegmentId>,
    next_segment_id: u64,
    next_wall_id: u64,
}

impl GeometryModel {
    /// Create an empty model.
    pub fn new() -> Self {
        Self {
            next_segment_id: 1,
            next_wall_id: 1,
            ..Self::default()
        }
    }

    /// Add a segment between two points.
    ///
    /// Returns `None` without touching the model when `start == end`.
    pub fn add_segment(&mut self, start: Point3, end: Point3) -> Option<LineSegment> {
        if start.distance(end) == 0.0 {
            return None;
        }
        let id = SegmentId(self.next_segment_id.max(1));
        self.next_segment_id = id.0 + 1;

        let segment = LineSegment::new(id, start, end);
        self.insert_segment(segment.clone());
        log::debug!(
            "added segment {} ({:.2} m, ground: {})",
            id,
            segment.length_m,
            segment.is_ground()
        );
        Some(segment)
    }

    /// Insert a segment verbatim, keeping its id.
    ///
    /// Panics if the id is already present.
    pub fn insert_segment(&mut self, segment: LineSegment) {
        let id = segment.id;
        if segment.is_ground() {
            self.occluders.insert(id);
        }
        self.next_segment_id = self.next_segment_id.max(id.0 + 1);
        let previous = self.segments.insert(id, segment);
        assert!(previous.is_none(), "segment {id} inserted twice");
    }

    /// Remove one segment together with its occlusion proxy and label offset.
    pub fn remove_segment(&mut self, id: SegmentId) -> Option<LineSegment> {
        let segment = self.segments.remove(&id)?;
        self.occluders.remove(&id);
        self.dimension_offsets.remove(&id);
        Some(segment)
    }

    /// Remove every segment whose id is in `ids`.
    ///
    /// The removed segments are returned in their original relative order.
    pub fn delete_segments(&mut self, ids: &BTreeSet<SegmentId>) -> Vec<LineSegment> {
        let removed: Vec<LineSegment> = ids.iter().filter_map(|&id| self.remove_segment(id)).collect();
        if !removed.is_empty() {
            log::debug!("deleted {} segment(s)", removed.len());
        }
        removed
    }

    /// Extrude a segment's ground footprint into a wall.
    ///
    /// Returns `None` when `|height|` is below [`EPSILON`].
    pub fn add_wall(&mut self, segment: &LineSegment, height: f64) -> Option<WallFace> {
        if height.abs() < EPSILON {
            return None;
        }
        let id = WallId(self.next_wall_id.max(1));
        self.next_wall_id = id.0 + 1;

        let wall = WallFace {
            id,
            base_start: Point3::ground(segment.start.x, segment.start.y),
            base_end: Point3::ground(segment.end.x, segment.end.y),
            height,
        };
        self.insert_wall(wall.clone());
        log::debug!("extruded {} into {} (h={:.2} m)", segment.id, id, wall.height_m());
        Some(wall)
    }

    /// Insert a wall verbatim, keeping its id.
    pub fn insert_wall(&mut self, wall: WallFace) {
        let id = wall.id;
        self.next_wall_id = self.next_wall_id.max(id.0 + 1);
        let previous = self.walls.insert(id, wall);
        assert!(previous.is_none(), "{id} inserted twice");
    }

    pub fn remove_wall(&mut self, id: WallId) -> Option<WallFace> {
        self.walls.remove(&id)
    }

    /// Drop all geometry. Id counters keep counting so ids are never reused.
    pub fn clear_all(&mut self) {
        self.segments.clear();
        self.walls.clear();
        self.dimension_offsets.clear();
        self.occluders.clear();
    }

    pub fn segment(&self, id: SegmentId) -> Option<&LineSegment> {
        self.segments.get(&id)
    }

    /// A segment by id, only if it lies on the ground plane.
    pub fn ground_segment(&self, id: SegmentId) -> Option<&LineSegment> {
        self.segment(id).filter(|s| s.is_ground())
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        self.segments.contains_key(&id)
    }

    /// Segments in creation order.
    pub fn segments(&self) -> impl DoubleEndedIterator<Item = &LineSegment> {
        self.segments.values()
    }

    /// Segments, most recently added first.
    pub fn segments_rev(&self) -> impl Iterator<Item = &LineSegment> {
        self.segments.values().rev()
    }

    pub fn walls(&self) -> impl DoubleEndedIterator<Item = &WallFace> {
        self.walls.values()
    }

    pub fn wall(&self, id: WallId) -> Option<&WallFace> {
        self.walls.get(&id)
    }

    /// Label offset of a segment, 0 when none was set.
    pub fn dimension_offset(&self, id: SegmentId) -> f64 {
        self.dimension_offsets.get(&id).copied().unwrap_or(0.0)
    }

    /// Set a label offset. Zero removes the entry. Unknown ids are ignored.
    pub fn set_dimension_offset(&mut self, id: SegmentId, offset: f64) {
        if !self.segments.contains_key(&id) {
            return;
        }
        if offset == 0.0 {
            self.dimension_offsets.remove(&id);
        } else {
            self.dimension_offsets.insert(id, offset);
        }
    }

    pub fn dimension_offsets(&self) -> impl Iterator<Item = (SegmentId, f64)> + '_ {
        self.dimension_offsets.iter().map(|(&id, &offset)| (id, offset))
    }

    pub fn is_occluder(&self, id: SegmentId) -> bool {
        self.occluders.contains(&id)
    }

    /// Ids of segments registered as occlusion proxies.
    pub fn occluders(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.occluders.iter().copied()
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn wall_count(&self) -> usize {
        self.walls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty() && self.walls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(list: &[SegmentId]) -> BTreeSet<SegmentId> {
        list.iter().copied().collect()
    }

    #[test]
    fn test_add_segment() {
        let mut model = GeometryModel::new();
        let seg = model
            .add_segment(Point3::ground(0.0, 0.0), Point3::ground(100.0, 0.0))
            .unwrap();
        assert_eq!(seg.id(), SegmentId(1));
        assert_eq!(model.segment_count(), 1);
        assert!(model.is_occluder(seg.id()));
    }

    #[test]
    fn test_zero_length_rejected() {
        let mut model = GeometryModel::new();
        let p = Point3::new(5.0, 5.0, 5.0);
        assert!(model.add_segment(p, p).is_none());
        assert_eq!(model.segment_count(), 0);

        let next = model.add_segment(p, Point3::ORIGIN).unwrap();
        assert_eq!(next.id(), SegmentId(1));
    }

    #[test]
    fn test_height_stroke_is_not_occluder() {
        let mut model = GeometryModel::new();
        let seg = model
            .add_segment(Point3::ground(10.0, 10.0), Point3::new(10.0, 10.0, 300.0))
            .unwrap();
        assert!(!model.is_occluder(seg.id()));
        assert!(model.ground_segment(seg.id()).is_none());
    }

    #[test]
    fn test_add_wall() {
        let mut model = GeometryModel::new();
        let seg = model
            .add_segment(Point3::ground(0.0, 0.0), Point3::ground(100.0, 0.0))
            .unwrap();
        assert!(model.add_wall(&seg, 0.0).is_none());
        assert!(model.add_wall(&seg, 1e-9).is_none());

        let wall = model.add_wall(&seg, -250.0).unwrap();
        assert_eq!(wall.base_end, Point3::ground(100.0, 0.0));
        assert_eq!(model.wall_count(), 1);
    }

    #[test]
    fn test_delete_segments_preserves_order() {
        let mut model = GeometryModel::new();
        let a = model.add_segment(Point3::ORIGIN, Point3::ground(1.0, 0.0)).unwrap();
        let b = model.add_segment(Point3::ORIGIN, Point3::ground(2.0, 0.0)).unwrap();
        let c = model.add_segment(Point3::ORIGIN, Point3::ground(3.0, 0.0)).unwrap();
        model.set_dimension_offset(c.id(), 8.0);

        let removed = model.delete_segments(&ids(&[c.id(), a.id()]));
        assert_eq!(removed, vec![a.clone(), c.clone()]);
        assert_eq!(model.segment_count(), 1);
        assert!(model.contains(b.id()));
        assert!(!model.is_occluder(c.id()));
        assert_eq!(model.dimension_offset(c.id()), 0.0);
    }

    #[test]
    fn test_reinsert_keeps_order() {
        let mut model = GeometryModel::new();
        let a = model.add_segment(Point3::ORIGIN, Point3::ground(1.0, 0.0)).unwrap();
        let b = model.add_segment(Point3::ORIGIN, Point3::ground(2.0, 0.0)).unwrap();
        let removed = model.remove_segment(a.id()).unwrap();
        model.insert_segment(removed);

        let order: Vec<SegmentId> = model.segments().map(|s| s.id()).collect();
        assert_eq!(order, vec![a.id(), b.id()]);
        let newest: Vec<SegmentId> = model.segments_rev().map(|s| s.id()).collect();
        assert_eq!(newest, vec![b.id(), a.id()]);
    }

    #[test]
    fn test_clear_all_never_reuses_ids() {
        let mut model = GeometryModel::new();
        model.add_segment(Point3::ORIGIN, Point3::ground(1.0, 0.0));
        model.add_segment(Point3::ORIGIN, Point3::ground(2.0, 0.0));
        model.clear_all();
        assert!(model.is_empty());

        let seg = model.add_segment(Point3::ORIGIN, Point3::ground(3.0, 0.0)).unwrap();
        assert_eq!(seg.id(), SegmentId(3));
    }

    #[test]
    fn test_dimension_offsets() {
        let mut model = GeometryModel::new();
        let seg = model.add_segment(Point3::ORIGIN, Point3::ground(1.0, 0.0)).unwrap();
        model.set_dimension_offset(seg.id(), -12.0);
        assert_eq!(model.dimension_offset(seg.id()), -12.0);
        model.set_dimension_offset(seg.id(), 0.0);
        assert_eq!(model.dimension_offsets().count(), 0);

        model.set_dimension_offset(SegmentId(99), 4.0);
        assert_eq!(model.dimension_offsets().count(), 0);
    }

    #[test]
    #[should_panic]
    fn test_double_insert_panics() {
        let mut model = GeometryModel::new();
        let seg = model.add_segment(Point3::ORIGIN, Point3::ground(1.0, 0.0)).unwrap();
        model.insert_segment(seg);
    }
}
