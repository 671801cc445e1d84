//! Geometry primitives: world points, line segments and extruded walls.

use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;

/// World units per metre. X/Y/Z are all stored in these scaled units.
pub const PIXELS_PER_METER: f64 = 100.0;

/// Tolerance used for "is this on the ground" and "is this height zero" checks.
pub const EPSILON: f64 = 1e-6;

/// A point in world space.
///
/// `x`/`y` lie on the ground plane, `z` is the height above it.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub const ORIGIN: Point3 = Point3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// A point on the ground plane (z = 0).
    pub const fn ground(x: f64, y: f64) -> Self {
        Self::new(x, y, 0.0)
    }

    /// Same ground position, different height.
    pub fn with_z(self, z: f64) -> Self {
        Self { z, ..self }
    }

    /// Projection onto the ground plane as a 2D point.
    pub fn xy(self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_on_ground(self) -> bool {
        self.z.abs() <= EPSILON
    }

    pub fn distance(self, other: Point3) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        let dz = other.z - self.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    pub fn midpoint(self, other: Point3) -> Point3 {
        Point3::new(
            (self.x + other.x) / 2.0,
            (self.y + other.y) / 2.0,
            (self.z + other.z) / 2.0,
        )
    }
}

impl From<Point> for Point3 {
    fn from(p: Point) -> Self {
        Point3::ground(p.x, p.y)
    }
}

/// Stable identity of a line segment. Assigned monotonically, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentId(pub u64);

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable identity of a wall face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WallId(pub u64);

impl fmt::Display for WallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "wall#{}", self.0)
    }
}

/// A straight stroke between two world points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineSegment {
    pub(crate) id: SegmentId,
    pub start: Point3,
    pub end: Point3,
    /// Length in metres, derived from the endpoints at creation.
    pub length_m: f64,
}

impl LineSegment {
    pub(crate) fn new(id: SegmentId, start: Point3, end: Point3) -> Self {
        Self {
            id,
            start,
            end,
            length_m: start.distance(end) / PIXELS_PER_METER,
        }
    }

    pub fn id(&self) -> SegmentId {
        self.id
    }

    /// Both endpoints lie on the ground plane.
    pub fn is_ground(&self) -> bool {
        self.start.is_on_ground() && self.end.is_on_ground()
    }

    /// Both endpoints share a ground position and differ only in height.
    pub fn is_vertical(&self) -> bool {
        (self.start.x - self.end.x).abs() < 1e-3 && (self.start.y - self.end.y).abs() < 1e-3
    }

    /// Signed height of a vertical stroke in metres.
    pub fn height_m(&self) -> f64 {
        (self.end.z - self.start.z) / PIXELS_PER_METER
    }

    pub fn midpoint(&self) -> Point3 {
        self.start.midpoint(self.end)
    }

    pub fn endpoints(&self) -> [Point3; 2] {
        [self.start, self.end]
    }
}

/// A vertical face obtained by extruding a ground segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WallFace {
    pub(crate) id: WallId,
    pub base_start: Point3,
    pub base_end: Point3,
    /// Signed height in world units. Never zero.
    pub height: f64,
}

impl WallFace {
    pub fn id(&self) -> WallId {
        self.id
    }

    pub fn height_m(&self) -> f64 {
        self.height / PIXELS_PER_METER
    }

    /// Corners in drawing order: base start, base end, top end, top start.
    pub fn corners(&self) -> [Point3; 4] {
        [
            self.base_start,
            self.base_end,
            self.base_end.with_z(self.height),
            self.base_start.with_z(self.height),
        ]
    }
}
