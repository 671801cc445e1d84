//! Camera module for the oblique 2.5D view transform.

use crate::geometry::Point3;
use kurbo::{Point, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Zoom factor applied per wheel notch.
pub const ZOOM_STEP: f64 = 1.1;

/// Pitch (degrees) of the straight-down orthographic view.
pub const TOP_DOWN_PITCH: f64 = 90.0;

/// Below this, `cos`/`sin` of the remapped pitch is treated as zero.
const DEGENERATE: f64 = 1e-6;

/// Camera limits and initial viewport, loaded from configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.25,
            max_zoom: 8.0,
            viewport_width: 1200.0,
            viewport_height: 800.0,
        }
    }
}

/// Camera holds the viewpoint and converts between world and screen space.
///
/// The projection rotates the world by `yaw` around the camera position, then
/// tilts it by `pitch_deg - 90°` so that 90° is a top-down plan and lower
/// values reveal height, then scales by `zoom` and recentres on the viewport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Camera {
    /// Ground-plane point shown at the viewport centre.
    pub position: Vec2,
    /// Current zoom level.
    pub zoom: f64,
    /// Rotation about the vertical axis, radians in `[0, τ)`.
    pub yaw: f64,
    /// Tilt in degrees, 0 (elevation) to 90 (top-down).
    pub pitch_deg: f64,
    /// Viewport size in screen pixels.
    pub viewport: Size,
    /// Minimum allowed zoom level.
    pub min_zoom: f64,
    /// Maximum allowed zoom level.
    pub max_zoom: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl Camera {
    /// Create a new camera with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts centred on the viewport, so world and screen coordinates coincide.
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            position: Vec2::new(config.viewport_width * 0.5, config.viewport_height * 0.5),
            zoom: 1.0,
            yaw: 0.0,
            pitch_deg: TOP_DOWN_PITCH,
            viewport: Size::new(config.viewport_width, config.viewport_height),
            min_zoom: config.min_zoom,
            max_zoom: config.max_zoom,
        }
    }

    /// Create a camera with the given viewport size.
    pub fn with_viewport(viewport: Size) -> Self {
        Self {
            position: Vec2::new(viewport.width * 0.5, viewport.height * 0.5),
            viewport,
            ..Self::default()
        }
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport = Size::new(width, height);
    }

    fn center(&self) -> Point {
        Point::new(self.viewport.width * 0.5, self.viewport.height * 0.5)
    }

    /// Pitch remapped so that 0 rad is top-down.
    fn pitch_radians(&self) -> f64 {
        (self.pitch_deg - TOP_DOWN_PITCH).to_radians()
    }

    /// Rotate a ground offset from the camera position into view space.
    fn rotate_into_view(&self, x: f64, y: f64) -> (f64, f64) {
        let vx = x - self.position.x;
        let vy = y - self.position.y;
        let (sin, cos) = self.yaw.sin_cos();
        (vx * cos + vy * sin, -vx * sin + vy * cos)
    }

    /// Project a world point onto the screen.
    pub fn world_to_screen(&self, p: Point3) -> Point {
        let (rx, ry) = self.rotate_into_view(p.x, p.y);
        let (s, c) = self.pitch_radians().sin_cos();
        let py = ry * c - p.z * s;
        let center = self.center();
        Point::new(rx * self.zoom + center.x, py * self.zoom + center.y)
    }

    /// Invert [`world_to_screen`](Self::world_to_screen) onto the ground plane.
    ///
    /// In a pure elevation view the ground collapses to a line and has no
    /// inverse; the camera position is returned instead.
    pub fn screen_to_world_ground(&self, screen: Point) -> Point3 {
        let c = self.pitch_radians().cos();
        if c.abs() < DEGENERATE {
            return Point3::ground(self.position.x, self.position.y);
        }
        let center = self.center();
        let rx = (screen.x - center.x) / self.zoom;
        let ry = (screen.y - center.y) / self.zoom / c;
        let (sin, cos) = self.yaw.sin_cos();
        Point3::ground(
            rx * cos - ry * sin + self.position.x,
            rx * sin + ry * cos + self.position.y,
        )
    }

    /// Height `z` such that `(base.x, base.y, z)` projects onto `screen_y`.
    ///
    /// Returns 0 when looking straight down, where height is not observable.
    pub fn compute_height_at_screen_y(&self, base: Point3, screen_y: f64) -> f64 {
        let (s, c) = self.pitch_radians().sin_cos();
        if s.abs() < DEGENERATE {
            return 0.0;
        }
        let (_, ry) = self.rotate_into_view(base.x, base.y);
        let py = (screen_y - self.center().y) / self.zoom;
        (ry * c - py) / s
    }

    /// Change zoom while keeping the ground point under `anchor` fixed.
    pub fn zoom_at_cursor(&mut self, new_zoom: f64, anchor: Point) {
        let new_zoom = new_zoom.clamp(self.min_zoom, self.max_zoom);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return;
        }

        let before = self.screen_to_world_ground(anchor);
        self.zoom = new_zoom;
        let after = self.screen_to_world_ground(anchor);
        self.position += Vec2::new(before.x - after.x, before.y - after.y);
    }

    /// Zoom one wheel notch in (`direction > 0`) or out around `anchor`.
    pub fn zoom_step(&mut self, direction: f64, anchor: Point) {
        let factor = if direction > 0.0 { ZOOM_STEP } else { 1.0 / ZOOM_STEP };
        self.zoom_at_cursor(self.zoom * factor, anchor);
    }

    /// Pan along the camera's own axes: `right` across the screen, `up` towards its top.
    pub fn move_relative(&mut self, right: f64, up: f64) {
        let (sin, cos) = self.yaw.sin_cos();
        let right_axis = Vec2::new(cos, sin);
        let up_axis = Vec2::new(sin, -cos);
        self.position += right_axis * right + up_axis * up;
    }

    /// Pan by a ground-plane offset.
    pub fn pan(&mut self, delta: Vec2) {
        self.position += delta;
    }

    /// Rotate about the vertical axis, keeping yaw in `[0, τ)`.
    pub fn rotate(&mut self, delta: f64) {
        self.yaw = (self.yaw + delta).rem_euclid(TAU);
    }

    pub fn set_pitch(&mut self, pitch_deg: f64) {
        self.pitch_deg = pitch_deg.clamp(0.0, TOP_DOWN_PITCH);
    }

    pub fn is_top_down(&self) -> bool {
        self.pitch_deg >= TOP_DOWN_PITCH
    }

    /// Reset position, zoom and orientation. Viewport and zoom limits are kept.
    ///
    /// The position returns to the viewport centre.
    pub fn reset(&mut self) {
        self.position = self.center().to_vec2();
        self.zoom = 1.0;
        self.yaw = 0.0;
        self.pitch_deg = TOP_DOWN_PITCH;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    fn tilted_camera() -> Camera {
        let mut camera = Camera::new();
        camera.position = Vec2::new(130.0, -45.0);
        camera.zoom = 1.7;
        camera.yaw = 0.6;
        camera.pitch_deg = 35.0;
        camera
    }

    #[test]
    fn test_default_camera_is_top_down() {
        let camera = Camera::new();
        assert!(camera.is_top_down());
        let screen = camera.world_to_screen(Point3::ground(10.0, 20.0));
        assert_close(screen.x, 10.0);
        assert_close(screen.y, 20.0);
        let world = camera.screen_to_world_ground(Point::new(250.0, 75.0));
        assert_eq!(world, Point3::ground(250.0, 75.0));
    }

    #[test]
    fn test_reset_returns_to_viewport_centre() {
        let mut camera = tilted_camera();
        camera.reset();
        assert_close(camera.position.x, 600.0);
        assert_close(camera.position.y, 400.0);
        assert_close(camera.zoom, 1.0);
        assert!(camera.is_top_down());

        camera.set_viewport(800.0, 600.0);
        camera.reset();
        assert_close(camera.position.x, 400.0);
        assert_close(camera.position.y, 300.0);

        let camera = Camera::with_viewport(Size::new(640.0, 480.0));
        assert_close(camera.position.x, 320.0);
        assert_close(camera.position.y, 240.0);
    }

    #[test]
    fn test_ground_roundtrip() {
        let camera = tilted_camera();
        for p in [
            Point3::ground(0.0, 0.0),
            Point3::ground(123.0, -456.0),
            Point3::ground(-2500.0, 75.5),
        ] {
            let back = camera.screen_to_world_ground(camera.world_to_screen(p));
            assert_close(back.x, p.x);
            assert_close(back.y, p.y);
            assert_close(back.z, 0.0);
        }
    }

    #[test]
    fn test_elevation_view_falls_back_to_position() {
        let mut camera = tilted_camera();
        camera.pitch_deg = 0.0;
        let p = camera.screen_to_world_ground(Point::new(900.0, 100.0));
        assert_eq!(p, Point3::ground(130.0, -45.0));
    }

    #[test]
    fn test_height_inverts_projection() {
        let camera = tilted_camera();
        let base = Point3::ground(40.0, 90.0);
        let top = base.with_z(275.0);
        let screen_y = camera.world_to_screen(top).y;
        assert_close(camera.compute_height_at_screen_y(base, screen_y), 275.0);
    }

    #[test]
    fn test_height_unobservable_top_down() {
        let camera = Camera::new();
        assert_eq!(camera.compute_height_at_screen_y(Point3::ORIGIN, 10.0), 0.0);
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let mut camera = tilted_camera();
        let anchor = Point::new(812.0, 233.0);
        let before = camera.screen_to_world_ground(anchor);
        camera.zoom_at_cursor(3.2, anchor);
        let after = camera.screen_to_world_ground(anchor);
        assert_close(camera.zoom, 3.2);
        assert_close(before.x, after.x);
        assert_close(before.y, after.y);
    }

    #[test]
    fn test_zoom_clamp() {
        let mut camera = Camera::new();
        camera.zoom_at_cursor(0.001, Point::ZERO);
        assert_close(camera.zoom, camera.min_zoom);

        camera.zoom_at_cursor(1000.0, Point::ZERO);
        assert_close(camera.zoom, camera.max_zoom);
    }

    #[test]
    fn test_zoom_step() {
        let mut camera = Camera::new();
        camera.zoom_step(1.0, Point::new(600.0, 400.0));
        assert_close(camera.zoom, ZOOM_STEP);
        camera.zoom_step(-1.0, Point::new(600.0, 400.0));
        assert_close(camera.zoom, 1.0);
    }

    #[test]
    fn test_rotate_wraps() {
        let mut camera = Camera::new();
        camera.rotate(-0.5);
        assert_close(camera.yaw, TAU - 0.5);
        camera.rotate(1.0);
        assert_close(camera.yaw, 0.5);
    }

    #[test]
    fn test_move_relative_follows_yaw() {
        let mut camera = Camera::new();
        camera.move_relative(0.0, 10.0);
        assert_close(camera.position.x, 600.0);
        assert_close(camera.position.y, 390.0);

        camera.reset();
        camera.rotate(std::f64::consts::FRAC_PI_2);
        camera.move_relative(10.0, 0.0);
        assert_close(camera.position.x, 600.0);
        assert_close(camera.position.y, 410.0);
    }

    #[test]
    fn test_set_pitch_clamps() {
        let mut camera = Camera::new();
        camera.set_pitch(120.0);
        assert_close(camera.pitch_deg, 90.0);
        camera.set_pitch(-5.0);
        assert_close(camera.pitch_deg, 0.0);
        assert!(!camera.is_top_down());
    }
}
