//! Hit-testing and selection of segments in screen space.

use crate::camera::Camera;
use crate::geometry::{LineSegment, SegmentId};
use crate::model::GeometryModel;
use kurbo::{Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Hover distance for segments, in screen pixels.
pub const HOVER_DIST_PX: f64 = 10.0;
/// Click-selection distance, in screen pixels.
pub const SELECT_DIST_PX: f64 = 12.0;
/// Hover distance for dimension labels, in screen pixels.
pub const LABEL_HOVER_DIST_PX: f64 = 2.0 * HOVER_DIST_PX;
/// Projected segments shorter than this have no usable direction.
pub const MIN_SCREEN_LENGTH: f64 = 1e-3;

/// Hit-testing radii.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitConfig {
    pub hover_radius_px: f64,
    pub select_radius_px: f64,
    pub label_radius_px: f64,
}

impl Default for HitConfig {
    fn default() -> Self {
        Self {
            hover_radius_px: HOVER_DIST_PX,
            select_radius_px: SELECT_DIST_PX,
            label_radius_px: LABEL_HOVER_DIST_PX,
        }
    }
}

/// Distance from `p` to the segment `a`-`b`.
///
/// The projection parameter is clamped to `[0, 1]`, so points beyond either
/// end measure to the nearest endpoint.
pub fn point_segment_distance(p: Point, a: Point, b: Point) -> f64 {
    let ab = b - a;
    let len_sq = ab.hypot2();
    let t = if len_sq > 0.0 {
        ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let projection = a + ab * t;
    (p - projection).hypot()
}

/// Screen positions of a segment's endpoints.
pub fn project_segment(camera: &Camera, segment: &LineSegment) -> (Point, Point) {
    (
        camera.world_to_screen(segment.start),
        camera.world_to_screen(segment.end),
    )
}

/// The candidate whose projection is closest to `screen`, strictly within `radius`.
///
/// Candidates are expected newest first; ties keep the earlier one.
pub fn nearest_segment_within_radius<'a>(
    camera: &Camera,
    candidates: impl IntoIterator<Item = &'a LineSegment>,
    screen: Point,
    radius: f64,
) -> Option<&'a LineSegment> {
    let mut best: Option<(&LineSegment, f64)> = None;
    for segment in candidates {
        let (a, b) = project_segment(camera, segment);
        let dist = point_segment_distance(screen, a, b);
        if dist >= radius {
            continue;
        }
        if best.is_none_or(|(_, best_dist)| dist < best_dist) {
            best = Some((segment, dist));
        }
    }
    best.map(|(segment, _)| segment)
}

/// Nearest segment of any kind under the cursor.
pub fn nearest_segment(
    camera: &Camera,
    model: &GeometryModel,
    screen: Point,
    radius: f64,
) -> Option<SegmentId> {
    nearest_segment_within_radius(camera, model.segments_rev(), screen, radius).map(|s| s.id())
}

/// Nearest ground-plane segment under the cursor, used to pick extrusion targets.
pub fn nearest_ground_segment(
    camera: &Camera,
    model: &GeometryModel,
    screen: Point,
    radius: f64,
) -> Option<SegmentId> {
    nearest_segment_within_radius(
        camera,
        model.segments_rev().filter(|s| s.is_ground()),
        screen,
        radius,
    )
    .map(|s| s.id())
}

/// Unit direction and left perpendicular of a segment's projection.
///
/// Returns `None` when the projection is too short to have a direction.
pub fn screen_frame(camera: &Camera, segment: &LineSegment) -> Option<(Point, Vec2, Vec2)> {
    let (a, b) = project_segment(camera, segment);
    let dir = b - a;
    let len = dir.hypot();
    if len < MIN_SCREEN_LENGTH {
        return None;
    }
    let unit = dir / len;
    let perp = Vec2::new(-unit.y, unit.x);
    Some((a.midpoint(b), unit, perp))
}

/// Screen position of a segment's dimension label.
pub fn label_position(camera: &Camera, segment: &LineSegment, offset: f64) -> Option<Point> {
    screen_frame(camera, segment).map(|(mid, _, perp)| mid + perp * offset)
}

/// Segment whose dimension label is nearest to the cursor within `radius`.
///
/// Segments that project to (almost) a point are skipped.
pub fn nearest_dimension_label(
    camera: &Camera,
    model: &GeometryModel,
    screen: Point,
    radius: f64,
) -> Option<SegmentId> {
    let mut best: Option<(SegmentId, f64)> = None;
    for segment in model.segments_rev() {
        let Some(label) = label_position(camera, segment, model.dimension_offset(segment.id())) else {
            continue;
        };
        let dist = label.distance(screen);
        if dist < radius && best.is_none_or(|(_, best_dist)| dist < best_dist) {
            best = Some((segment.id(), dist));
        }
    }
    best.map(|(id, _)| id)
}

/// Whether the line `a`-`b` touches `rect` (Liang-Barsky clipping).
pub fn rect_clips_line(rect: Rect, a: Point, b: Point) -> bool {
    let d = b - a;
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;
    let edges = [
        (-d.x, a.x - rect.x0),
        (d.x, rect.x1 - a.x),
        (-d.y, a.y - rect.y0),
        (d.y, rect.y1 - a.y),
    ];
    for (p, q) in edges {
        if p == 0.0 {
            // Parallel to this edge: reject if outside it.
            if q < 0.0 {
                return false;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return false;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return false;
            }
            t1 = t1.min(r);
        }
    }
    t0 <= t1
}

/// Segments whose projection touches a screen rectangle.
///
/// A segment qualifies if an endpoint is inside, the rectangle clips the line,
/// or its projected midpoint is inside.
pub fn lasso_select(camera: &Camera, model: &GeometryModel, rect: Rect) -> Vec<SegmentId> {
    model
        .segments()
        .filter(|segment| {
            let (a, b) = project_segment(camera, segment);
            rect.contains(a) || rect.contains(b) || rect_clips_line(rect, a, b) || rect.contains(a.midpoint(b))
        })
        .map(|segment| segment.id())
        .collect()
}

/// The set of selected segment ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    ids: BTreeSet<SegmentId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ids(&self) -> &BTreeSet<SegmentId> {
        &self.ids
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        self.ids.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn select_only(&mut self, id: SegmentId) {
        self.ids.clear();
        self.ids.insert(id);
    }

    /// Add `id` if absent, remove it otherwise.
    pub fn toggle(&mut self, id: SegmentId) {
        if !self.ids.remove(&id) {
            self.ids.insert(id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Resolve a click: a hit replaces the selection (or toggles with
    /// `additive`), a miss clears it unless `additive`.
    pub fn apply_click(&mut self, hit: Option<SegmentId>, additive: bool) {
        match (hit, additive) {
            (Some(id), true) => self.toggle(id),
            (Some(id), false) => self.select_only(id),
            (None, true) => {}
            (None, false) => self.clear(),
        }
    }

    /// Resolve a lasso: replace the selection, or toggle each id with `additive`.
    pub fn apply_lasso(&mut self, ids: &[SegmentId], additive: bool) {
        if additive {
            for &id in ids {
                self.toggle(id);
            }
        } else {
            self.ids = ids.iter().copied().collect();
        }
    }

    /// Drop ids that no longer exist in the model.
    pub fn retain_existing(&mut self, model: &GeometryModel) {
        self.ids.retain(|&id| model.contains(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point3;

    #[test]
    fn test_point_segment_distance() {
        let d = point_segment_distance(Point::new(5.0, 5.0), Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_point_segment_distance_clamps() {
        let d = point_segment_distance(Point::new(13.0, 4.0), Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert!((d - 5.0).abs() < 1e-12);
        let d = point_segment_distance(Point::new(3.0, 4.0), Point::new(0.0, 0.0), Point::new(0.0, 0.0));
        assert!((d - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_lasso_select_example() {
        let camera = Camera::new();
        let mut model = GeometryModel::new();
        let a = model.add_segment(Point3::ground(0.0, 0.0), Point3::ground(100.0, 0.0)).unwrap();
        let b = model
            .add_segment(Point3::ground(200.0, 200.0), Point3::ground(300.0, 300.0))
            .unwrap();

        let rect = Rect::from_points(Point::new(0.0, 0.0), Point::new(150.0, 150.0));
        let hits = lasso_select(&camera, &model, rect);
        assert_eq!(hits, vec![a.id()]);
        assert!(!hits.contains(&b.id()));
    }

    #[test]
    fn test_lasso_select_crossing_line() {
        let camera = Camera::new();
        let mut model = GeometryModel::new();
        let seg = model
            .add_segment(Point3::ground(-100.0, 50.0), Point3::ground(400.0, 60.0))
            .unwrap();
        let rect = Rect::new(100.0, 0.0, 150.0, 100.0);
        assert_eq!(lasso_select(&camera, &model, rect), vec![seg.id()]);

        let miss = Rect::new(100.0, 70.0, 150.0, 100.0);
        assert!(lasso_select(&camera, &model, miss).is_empty());
    }

    #[test]
    fn test_rect_clips_line() {
        let rect = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect_clips_line(rect, Point::new(-5.0, 5.0), Point::new(15.0, 5.0)));
        assert!(rect_clips_line(rect, Point::new(-5.0, -5.0), Point::new(15.0, 15.0)));
        assert!(!rect_clips_line(rect, Point::new(-5.0, 12.0), Point::new(15.0, 12.0)));
        assert!(!rect_clips_line(rect, Point::new(11.0, -5.0), Point::new(20.0, 5.0)));
    }

    #[test]
    fn test_nearest_segment_prefers_newest_on_tie() {
        let camera = Camera::new();
        let mut model = GeometryModel::new();
        let _older = model.add_segment(Point3::ground(0.0, 0.0), Point3::ground(100.0, 0.0)).unwrap();
        let newer = model.add_segment(Point3::ground(0.0, 10.0), Point3::ground(100.0, 10.0)).unwrap();

        let hit = nearest_segment(&camera, &model, Point::new(50.0, 5.0), HOVER_DIST_PX);
        assert_eq!(hit, Some(newer.id()));
    }

    #[test]
    fn test_nearest_segment_radius_is_strict() {
        let camera = Camera::new();
        let mut model = GeometryModel::new();
        model.add_segment(Point3::ground(0.0, 0.0), Point3::ground(100.0, 0.0));

        assert!(nearest_segment(&camera, &model, Point::new(50.0, 10.0), 10.0).is_none());
        assert!(nearest_segment(&camera, &model, Point::new(50.0, 9.5), 10.0).is_some());
    }

    #[test]
    fn test_nearest_ground_segment_skips_height_strokes() {
        let camera = Camera::new();
        let mut model = GeometryModel::new();
        let ground = model.add_segment(Point3::ground(0.0, 0.0), Point3::ground(100.0, 0.0)).unwrap();
        model.add_segment(Point3::ground(50.0, 0.0), Point3::new(50.0, 0.0, 100.0));

        let hit = nearest_ground_segment(&camera, &model, Point::new(50.0, 2.0), HOVER_DIST_PX);
        assert_eq!(hit, Some(ground.id()));
    }

    #[test]
    fn test_dimension_label_skips_degenerate() {
        let camera = Camera::new();
        let mut model = GeometryModel::new();
        // Vertical stroke: a single point when seen from the top.
        model.add_segment(Point3::ground(50.0, 50.0), Point3::new(50.0, 50.0, 200.0));
        assert!(nearest_dimension_label(&camera, &model, Point::new(50.0, 50.0), 20.0).is_none());

        let seg = model.add_segment(Point3::ground(0.0, 0.0), Point3::ground(100.0, 0.0)).unwrap();
        model.set_dimension_offset(seg.id(), 30.0);
        // Left perpendicular of +x on screen is +y.
        let label = label_position(&camera, &seg, 30.0).unwrap();
        assert!((label.x - 50.0).abs() < 1e-9);
        assert!((label.y - 30.0).abs() < 1e-9);
        assert_eq!(
            nearest_dimension_label(&camera, &model, Point::new(52.0, 28.0), 20.0),
            Some(seg.id())
        );
    }

    #[test]
    fn test_selection_click_and_lasso() {
        let mut selection = Selection::new();
        selection.apply_click(Some(SegmentId(1)), false);
        selection.apply_click(Some(SegmentId(2)), true);
        assert_eq!(selection.len(), 2);
        selection.apply_click(Some(SegmentId(1)), true);
        assert!(!selection.contains(SegmentId(1)));
        selection.apply_click(None, true);
        assert_eq!(selection.len(), 1);
        selection.apply_click(None, false);
        assert!(selection.is_empty());

        selection.apply_lasso(&[SegmentId(3), SegmentId(4)], false);
        selection.apply_lasso(&[SegmentId(4), SegmentId(5)], true);
        let ids: Vec<SegmentId> = selection.ids().iter().copied().collect();
        assert_eq!(ids, vec![SegmentId(3), SegmentId(5)]);
    }

    #[test]
    fn test_retain_existing() {
        let mut model = GeometryModel::new();
        let seg = model.add_segment(Point3::ORIGIN, Point3::ground(10.0, 0.0)).unwrap();
        let mut selection = Selection::new();
        selection.apply_lasso(&[seg.id(), SegmentId(42)], false);
        selection.retain_existing(&model);
        assert_eq!(selection.len(), 1);
    }
}
