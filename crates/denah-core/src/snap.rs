//! Snapping of pointer positions to the grid and to existing vertices.

use crate::camera::Camera;
use crate::geometry::Point3;
use crate::model::GeometryModel;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Fine grid spacing in world units (0.25 m).
pub const GRID_SPACING: f64 = 25.0;
/// Height snapping step in world units.
pub const HEIGHT_STEP: f64 = GRID_SPACING;
/// Screen distance at which the magnet locks onto a vertex.
pub const MAGNET_LOCK_RADIUS_PX: f64 = 12.0;
/// Screen distance a locked magnet tolerates before releasing.
pub const MAGNET_RELEASE_RADIUS_PX: f64 = 16.0;
/// Screen distance within which a vertex is tracked as a candidate.
pub const MAGNET_HOVER_RADIUS_PX: f64 = 24.0;

/// Snapping configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapConfig {
    /// Master toggle; gates both grid and magnet snapping.
    pub enabled: bool,
    /// Grid snapping of X/Y (and Z via [`height_step`](Self::height_step)).
    pub grid_enabled: bool,
    pub grid_spacing: f64,
    pub height_step: f64,
    pub lock_radius_px: f64,
    pub release_radius_px: f64,
    pub hover_radius_px: f64,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            grid_enabled: true,
            grid_spacing: GRID_SPACING,
            height_step: HEIGHT_STEP,
            lock_radius_px: MAGNET_LOCK_RADIUS_PX,
            release_radius_px: MAGNET_RELEASE_RADIUS_PX,
            hover_radius_px: MAGNET_HOVER_RADIUS_PX,
        }
    }
}

/// Round a value to the nearest multiple of `step`.
pub fn snap_to_step(value: f64, step: f64) -> f64 {
    (value / step).round() * step
}

/// Snap X and Y independently to the grid, leaving Z untouched.
pub fn snap_to_grid(point: Point3, grid_spacing: f64) -> Point3 {
    Point3::new(
        snap_to_step(point.x, grid_spacing),
        snap_to_step(point.y, grid_spacing),
        point.z,
    )
}

/// Magnet lock state, carried across frames.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum MagnetState {
    #[default]
    Unlocked,
    Locked(Point3),
}

/// Turns screen positions into committed world points.
#[derive(Debug, Clone, Default)]
pub struct SnapEngine {
    pub config: SnapConfig,
    state: MagnetState,
    /// Nearest vertex inside the hover radius, locked or not.
    candidate: Option<Point3>,
}

impl SnapEngine {
    pub fn new(config: SnapConfig) -> Self {
        Self {
            config,
            state: MagnetState::Unlocked,
            candidate: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Grid rounding applies only when both the master and grid toggles are on.
    pub fn grid_active(&self) -> bool {
        self.config.enabled && self.config.grid_enabled
    }

    /// Flip the master toggle. Disabling drops any magnet lock.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
        if !enabled {
            self.reset_magnet();
        }
    }

    pub fn toggle(&mut self) {
        self.set_enabled(!self.config.enabled);
    }

    pub fn state(&self) -> MagnetState {
        self.state
    }

    /// The locked magnet point, if any.
    pub fn magnet_point(&self) -> Option<Point3> {
        match self.state {
            MagnetState::Locked(p) => Some(p),
            MagnetState::Unlocked => None,
        }
    }

    /// The vertex currently tracked for the indicator, locked or merely hovered.
    pub fn candidate(&self) -> Option<Point3> {
        self.candidate
    }

    pub fn reset_magnet(&mut self) {
        self.state = MagnetState::Unlocked;
        self.candidate = None;
    }

    /// Grid-snap a ground point when grid snapping is active.
    pub fn snap_xy(&self, point: Point3) -> Point3 {
        if self.grid_active() {
            snap_to_grid(point, self.config.grid_spacing)
        } else {
            point
        }
    }

    /// Snap a height to the height step when grid snapping is active.
    pub fn snap_z(&self, z: f64) -> f64 {
        if self.grid_active() {
            snap_to_step(z, self.config.height_step)
        } else {
            z
        }
    }

    /// Advance the magnet state machine for the current pointer position.
    pub fn update_magnet(&mut self, screen: Point, camera: &Camera, model: &GeometryModel) {
        if !self.config.enabled {
            self.reset_magnet();
            return;
        }

        if let MagnetState::Locked(p) = self.state {
            if camera.world_to_screen(p).distance(screen) <= self.config.release_radius_px {
                return;
            }
            log::trace!("magnet released at ({:.1}, {:.1})", p.x, p.y);
            self.state = MagnetState::Unlocked;
        }

        let mut best: Option<(Point3, f64)> = None;
        for segment in model.segments_rev() {
            for p in segment.endpoints() {
                if !p.is_on_ground() {
                    continue;
                }
                let dist = camera.world_to_screen(p).distance(screen);
                if dist > self.config.hover_radius_px {
                    continue;
                }
                if best.is_none_or(|(_, best_dist)| dist < best_dist) {
                    best = Some((p, dist));
                }
            }
        }

        self.candidate = best.map(|(p, _)| p);
        if let Some((p, dist)) = best {
            if dist <= self.config.lock_radius_px {
                log::trace!("magnet locked at ({:.1}, {:.1})", p.x, p.y);
                self.state = MagnetState::Locked(p);
            }
        }
    }

    /// Resolve a pointer position to a world point.
    ///
    /// Priority: locked magnet vertex, then grid-snapped ground point, then the
    /// raw ground projection. `suppress_magnet` is set while a typed length is
    /// pending so the typed value wins over a nearby vertex.
    pub fn resolve(
        &mut self,
        screen: Point,
        camera: &Camera,
        model: &GeometryModel,
        suppress_magnet: bool,
    ) -> Point3 {
        self.update_magnet(screen, camera, model);
        if self.config.enabled && !suppress_magnet {
            if let Some(p) = self.magnet_point() {
                return p;
            }
        }
        self.snap_xy(camera.screen_to_world_ground(screen))
    }
}
