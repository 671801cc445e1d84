//! Dimension labels: per-segment perpendicular offsets and their drag gesture.

use crate::camera::Camera;
use crate::geometry::{LineSegment, SegmentId};
use crate::history::{Command, CommandHistory};
use crate::input::Modifiers;
use crate::model::GeometryModel;
use crate::selection::screen_frame;
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Base quantisation step for label offsets, in screen pixels.
pub const OFFSET_STEP_PX: f64 = 2.0;
/// How far the helper line overshoots the extension lines.
pub const OVERSHOOT_PX: f64 = 12.0;

/// Label drag configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionConfig {
    pub offset_step_px: f64,
    /// Multiplier applied with the coarse modifier.
    pub coarse_factor: f64,
    /// Divisor applied with the fine modifier.
    pub fine_divisor: f64,
    pub overshoot_px: f64,
}

impl Default for DimensionConfig {
    fn default() -> Self {
        Self {
            offset_step_px: OFFSET_STEP_PX,
            coarse_factor: 5.0,
            fine_divisor: 2.0,
            overshoot_px: OVERSHOOT_PX,
        }
    }
}

impl DimensionConfig {
    /// Quantisation step for the given modifiers.
    pub fn step(&self, modifiers: Modifiers) -> f64 {
        let mut step = self.offset_step_px;
        if modifiers.coarse() {
            step *= self.coarse_factor;
        }
        if modifiers.fine() {
            step /= self.fine_divisor;
        }
        step
    }
}

/// An in-progress label drag.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DimensionDrag {
    pub segment: SegmentId,
    /// Screen point where the drag began.
    pub anchor: Point,
    /// Offset before the drag, restored on cancel.
    pub start_offset: f64,
}

/// Screen-space geometry of one dimension label, recomputed every frame.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionLabel {
    pub segment: SegmentId,
    pub text: String,
    pub position: Point,
    /// Offset helper line, `None` when the offset is zero.
    pub helper: Option<(Point, Point)>,
    /// Extension lines from each endpoint to the helper line.
    pub extensions: Option<[(Point, Point); 2]>,
}

/// Screen position of a label and the perpendicular it slides along.
pub fn label_anchor(camera: &Camera, segment: &LineSegment, offset: f64) -> Option<(Point, Vec2)> {
    let (mid, _, perp) = screen_frame(camera, segment)?;
    Some((mid + perp * offset, perp))
}

/// Label text: length for plan strokes, signed height for vertical strokes.
pub fn label_text(segment: &LineSegment) -> String {
    if segment.is_vertical() {
        format!("h={:.2} m", segment.height_m())
    } else {
        format!("{:.2} m", segment.length_m)
    }
}

/// Maintains label offsets and the drag that edits them.
#[derive(Debug, Clone, Default)]
pub struct DimensionLayout {
    pub config: DimensionConfig,
    drag: Option<DimensionDrag>,
}

impl DimensionLayout {
    pub fn new(config: DimensionConfig) -> Self {
        Self { config, drag: None }
    }

    pub fn drag(&self) -> Option<&DimensionDrag> {
        self.drag.as_ref()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Current offset of a segment's label.
    pub fn offset(&self, model: &GeometryModel, id: SegmentId) -> f64 {
        model.dimension_offset(id)
    }

    /// Start dragging a label, snapshotting its offset.
    ///
    /// Returns false if the segment does not exist.
    pub fn begin_drag(&mut self, model: &GeometryModel, id: SegmentId, anchor: Point) -> bool {
        if !model.contains(id) {
            return false;
        }
        self.drag = Some(DimensionDrag {
            segment: id,
            anchor,
            start_offset: model.dimension_offset(id),
        });
        true
    }

    /// Move the dragged label to follow `pointer`.
    ///
    /// The pointer travel since the anchor is projected onto the segment's
    /// current screen perpendicular and, when `quantize` is set, rounded to the
    /// modifier-dependent step.
    pub fn update_drag(
        &mut self,
        camera: &Camera,
        model: &mut GeometryModel,
        pointer: Point,
        modifiers: Modifiers,
        quantize: bool,
    ) {
        let Some(drag) = self.drag else {
            return;
        };
        let Some(segment) = model.segment(drag.segment) else {
            return;
        };
        let Some((_, _, perp)) = screen_frame(camera, segment) else {
            return;
        };
        let mut offset = drag.start_offset + (pointer - drag.anchor).dot(perp);
        if quantize {
            let step = self.config.step(modifiers);
            offset = (offset / step).round() * step;
        }
        model.set_dimension_offset(drag.segment, offset);
    }

    /// Finish the drag, recording one history entry if the offset changed.
    pub fn end_drag(&mut self, model: &GeometryModel, history: &mut CommandHistory) -> bool {
        let Some(drag) = self.drag.take() else {
            return false;
        };
        if model.dimension_offset(drag.segment) == drag.start_offset {
            return false;
        }
        history.record(Command::SetDimensionOffset {
            segment: drag.segment,
            offset: drag.start_offset,
        });
        true
    }

    /// Abandon the drag and restore the pre-drag offset. History is untouched.
    pub fn cancel_drag(&mut self, model: &mut GeometryModel) -> bool {
        let Some(drag) = self.drag.take() else {
            return false;
        };
        model.set_dimension_offset(drag.segment, drag.start_offset);
        true
    }

    /// Move a label back onto its segment as a recorded edit.
    pub fn reset_offset(&mut self, model: &mut GeometryModel, history: &mut CommandHistory, id: SegmentId) -> bool {
        let old = model.dimension_offset(id);
        if old == 0.0 || !model.contains(id) {
            return false;
        }
        model.set_dimension_offset(id, 0.0);
        history.record(Command::SetDimensionOffset { segment: id, offset: old });
        true
    }

    /// Lay out the label of one segment for the current camera.
    ///
    /// `None` when the segment projects to (almost) a point.
    pub fn label(&self, camera: &Camera, model: &GeometryModel, segment: &LineSegment) -> Option<DimensionLabel> {
        let (mid, unit, perp) = screen_frame(camera, segment)?;
        let offset = model.dimension_offset(segment.id());
        let position = mid + perp * offset;

        let (helper, extensions) = if offset != 0.0 {
            let a = camera.world_to_screen(segment.start);
            let b = camera.world_to_screen(segment.end);
            let shift = perp * offset;
            let overshoot = unit * self.config.overshoot_px;
            (
                Some((a + shift - overshoot, b + shift + overshoot)),
                Some([(a, a + shift), (b, b + shift)]),
            )
        } else {
            (None, None)
        };

        Some(DimensionLabel {
            segment: segment.id(),
            text: label_text(segment),
            position,
            helper,
            extensions,
        })
    }

    /// Labels for every segment that currently has a screen direction.
    pub fn labels(&self, camera: &Camera, model: &GeometryModel) -> Vec<DimensionLabel> {
        model
            .segments()
            .filter_map(|segment| self.label(camera, model, segment))
            .collect()
    }
}
