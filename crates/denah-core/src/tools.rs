//! Tool modes and the state of the interaction in progress.

use crate::geometry::{Point3, SegmentId};
use crate::model::GeometryModel;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Pointer travel after which a select drag becomes a lasso.
pub const LASSO_DRAG_THRESHOLD_PX: f64 = 4.0;

/// Available tools. Exactly one is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ToolKind {
    /// Two clicks place a ground-plane segment.
    #[default]
    Draw,
    /// Two clicks place a vertical stroke; needs a tilted camera.
    HeightDraw,
    /// Raise ground segments into walls.
    Extrude,
    /// Click or lasso selection.
    Select,
    /// Drag dimension labels.
    Size,
}

impl ToolKind {
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Draw => "draw",
            ToolKind::HeightDraw => "height",
            ToolKind::Extrude => "extrude",
            ToolKind::Select => "select",
            ToolKind::Size => "size",
        }
    }
}

/// Ground segments being raised together, with the preview height.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtrudePreview {
    pub targets: Vec<SegmentId>,
    /// Signed height in world units.
    pub height: f64,
}

impl ExtrudePreview {
    pub fn new(targets: Vec<SegmentId>) -> Self {
        Self { targets, height: 0.0 }
    }

    /// Ground point the preview height is measured from.
    pub fn base(&self, model: &GeometryModel) -> Option<Point3> {
        let first = self.targets.first()?;
        let segment = model.segment(*first)?;
        let mid = segment.midpoint();
        Some(Point3::ground(mid.x, mid.y))
    }

    /// Corners of each preview face, in wall drawing order.
    pub fn faces(&self, model: &GeometryModel) -> Vec<[Point3; 4]> {
        self.targets
            .iter()
            .filter_map(|id| model.segment(*id))
            .map(|segment| {
                let a = Point3::ground(segment.start.x, segment.start.y);
                let b = Point3::ground(segment.end.x, segment.end.y);
                [a, b, b.with_z(self.height), a.with_z(self.height)]
            })
            .collect()
    }
}

/// State of a tool interaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ToolState {
    /// Waiting for interaction.
    #[default]
    Idle,
    /// First point placed, waiting for the second.
    Placing { start: Point3 },
    /// Extrusion targets chosen, height being adjusted.
    Extruding(ExtrudePreview),
    /// Left button held in the select tool.
    Selecting {
        origin: Point,
        current: Point,
        /// The drag travelled far enough to be a lasso.
        lasso: bool,
    },
}

/// Manages the current tool and its state.
#[derive(Debug, Clone, Default)]
pub struct ToolManager {
    /// Currently selected tool.
    pub current_tool: ToolKind,
    /// Current state of the tool.
    pub state: ToolState,
    /// Direction of the last non-degenerate draw preview.
    last_direction: Option<Vec2>,
}

impl ToolManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch tool, dropping any interaction in progress.
    pub fn set_tool(&mut self, tool: ToolKind) {
        if self.current_tool != tool {
            log::debug!("tool {} -> {}", self.current_tool.name(), tool.name());
        }
        self.current_tool = tool;
        self.state = ToolState::Idle;
    }

    pub fn is_idle(&self) -> bool {
        self.state == ToolState::Idle
    }

    /// Start point of a segment being placed.
    pub fn placing_start(&self) -> Option<Point3> {
        match self.state {
            ToolState::Placing { start } => Some(start),
            _ => None,
        }
    }

    pub fn begin_placing(&mut self, start: Point3) {
        self.state = ToolState::Placing { start };
    }

    pub fn begin_extrude(&mut self, targets: Vec<SegmentId>) {
        self.state = ToolState::Extruding(ExtrudePreview::new(targets));
    }

    pub fn extrude_preview(&self) -> Option<&ExtrudePreview> {
        match &self.state {
            ToolState::Extruding(preview) => Some(preview),
            _ => None,
        }
    }

    pub fn extrude_preview_mut(&mut self) -> Option<&mut ExtrudePreview> {
        match &mut self.state {
            ToolState::Extruding(preview) => Some(preview),
            _ => None,
        }
    }

    pub fn begin_selecting(&mut self, origin: Point) {
        self.state = ToolState::Selecting {
            origin,
            current: origin,
            lasso: false,
        };
    }

    /// Track the select drag; it turns into a lasso past the threshold and stays one.
    pub fn update_selecting(&mut self, point: Point) {
        if let ToolState::Selecting { origin, current, lasso } = &mut self.state {
            *current = point;
            if !*lasso && origin.distance(point) > LASSO_DRAG_THRESHOLD_PX {
                *lasso = true;
            }
        }
    }

    /// Drop the interaction in progress. Returns false if there was none.
    pub fn cancel(&mut self) -> bool {
        let was_active = !self.is_idle();
        self.state = ToolState::Idle;
        was_active
    }

    /// Take the finished interaction, leaving the tool idle.
    pub fn take_state(&mut self) -> ToolState {
        std::mem::take(&mut self.state)
    }

    pub fn last_direction(&self) -> Option<Vec2> {
        self.last_direction
    }

    /// Unit ground direction from `start` towards `current`.
    ///
    /// When the two coincide, the last known direction (or +X) is reused.
    pub fn direction_towards(&mut self, start: Point3, current: Point3) -> Vec2 {
        let delta = current.xy() - start.xy();
        if delta.hypot2() < 1e-6 {
            return self.last_direction.unwrap_or(Vec2::new(1.0, 0.0));
        }
        let dir = delta / delta.hypot();
        self.last_direction = Some(dir);
        dir
    }
}
