//! Denah Core Library
//!
//! Geometry and interaction engine for a 2.5D floor-plan drafting tool:
//! camera projection, grid and vertex snapping, the segment/wall model,
//! undo/redo, hit-testing and dimension labels. Painting is left to the host.

pub mod camera;
pub mod canvas;
pub mod config;
pub mod dimension;
pub mod geometry;
pub mod history;
pub mod input;
pub mod measure;
pub mod model;
pub mod selection;
pub mod snap;
pub mod tools;

pub use camera::{Camera, CameraConfig};
pub use canvas::Canvas;
pub use config::{ConfigError, EngineConfig};
pub use dimension::{DimensionConfig, DimensionLabel, DimensionLayout};
pub use geometry::{LineSegment, PIXELS_PER_METER, Point3, SegmentId, WallFace, WallId};
pub use history::{Command, CommandHistory};
pub use input::{MeasureKey, Modifiers, MouseButton, PointerEvent};
pub use measure::{MeasureError, MeasureInput, MeasureMode};
pub use model::GeometryModel;
pub use selection::{HitConfig, Selection};
pub use snap::{MagnetState, SnapConfig, SnapEngine, snap_to_grid};
pub use tools::{ExtrudePreview, ToolKind, ToolState};
