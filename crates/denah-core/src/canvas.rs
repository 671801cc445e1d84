//! The drafting session: routes pointer and key input through the engine.

use crate::camera::Camera;
use crate::config::EngineConfig;
use crate::dimension::{DimensionLabel, DimensionLayout};
use crate::geometry::{EPSILON, PIXELS_PER_METER, Point3, SegmentId};
use crate::history::{self, Command, CommandHistory};
use crate::input::{MeasureKey, Modifiers, MouseButton, PointerEvent};
use crate::measure::{MeasureError, MeasureInput, MeasureMode};
use crate::model::GeometryModel;
use crate::selection::{self, HitConfig, Selection};
use crate::snap::SnapEngine;
use crate::tools::{ExtrudePreview, ToolKind, ToolManager, ToolState};
use kurbo::{Point, Rect};

/// Everything one drawing session needs: camera, snapping, geometry, history,
/// selection, label layout and the active tool.
///
/// The host forwards pointer events and keys, calls [`update`](Self::update)
/// once per frame and reads geometry and previews back for painting.
#[derive(Debug, Clone)]
pub struct Canvas {
    pub camera: Camera,
    pub snap: SnapEngine,
    model: GeometryModel,
    history: CommandHistory,
    selection: Selection,
    dimensions: DimensionLayout,
    tools: ToolManager,
    measure: MeasureInput,
    hit: HitConfig,
    /// Last known pointer position in screen space.
    pointer: Point,
    /// Segment under the cursor for the active tool.
    hover: Option<SegmentId>,
    /// Segment that the next click would commit.
    preview: Option<(Point3, Point3)>,
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Canvas {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            camera: Camera::from_config(&config.camera),
            snap: SnapEngine::new(config.snap),
            model: GeometryModel::new(),
            history: CommandHistory::new(),
            selection: Selection::new(),
            dimensions: DimensionLayout::new(config.dimension),
            tools: ToolManager::new(),
            measure: MeasureInput::new(),
            hit: config.hit,
            pointer: Point::ZERO,
            hover: None,
            preview: None,
        }
    }

    pub fn model(&self) -> &GeometryModel {
        &self.model
    }

    pub fn history(&self) -> &CommandHistory {
        &self.history
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn dimensions(&self) -> &DimensionLayout {
        &self.dimensions
    }

    pub fn tool(&self) -> ToolKind {
        self.tools.current_tool
    }

    pub fn tool_state(&self) -> &ToolState {
        &self.tools.state
    }

    pub fn measure(&self) -> &MeasureInput {
        &self.measure
    }

    pub fn pointer(&self) -> Point {
        self.pointer
    }

    /// Segment (or, in the size tool, label) under the cursor.
    pub fn hovered(&self) -> Option<SegmentId> {
        self.hover
    }

    /// Start and end of the segment being placed.
    pub fn segment_preview(&self) -> Option<(Point3, Point3)> {
        self.preview
    }

    pub fn extrude_preview(&self) -> Option<&ExtrudePreview> {
        self.tools.extrude_preview()
    }

    /// Screen rectangle of the lasso being dragged.
    pub fn lasso_rect(&self) -> Option<Rect> {
        match self.tools.state {
            ToolState::Selecting {
                origin,
                current,
                lasso: true,
            } => Some(Rect::from_points(origin, current)),
            _ => None,
        }
    }

    pub fn dimension_labels(&self) -> Vec<DimensionLabel> {
        self.dimensions.labels(&self.camera, &self.model)
    }

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.camera.set_viewport(width, height);
    }

    /// Feed one pointer event and refresh derived state.
    pub fn handle_pointer(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down {
                position,
                button,
                modifiers,
            } => self.pointer_down(position, button, modifiers),
            PointerEvent::Up {
                position,
                button,
                modifiers,
            } => self.pointer_up(position, button, modifiers),
            PointerEvent::Move { position, modifiers } => self.pointer_move(position, modifiers),
            PointerEvent::Scroll { position, notches } => self.scroll(position, notches),
        }
        self.update();
    }

    pub fn pointer_down(&mut self, position: Point, button: MouseButton, _modifiers: Modifiers) {
        self.pointer = position;
        match button {
            MouseButton::Left => self.primary_down(position),
            MouseButton::Right => self.secondary_down(),
            MouseButton::Middle => {}
        }
    }

    fn primary_down(&mut self, position: Point) {
        match self.tools.current_tool {
            ToolKind::Select => self.tools.begin_selecting(position),
            ToolKind::Size => {
                let hit = selection::nearest_dimension_label(
                    &self.camera,
                    &self.model,
                    position,
                    self.hit.label_radius_px,
                );
                if let Some(id) = hit {
                    self.dimensions.begin_drag(&self.model, id, position);
                }
            }
            ToolKind::Extrude => {
                if let Some(preview) = self.tools.extrude_preview().cloned() {
                    self.tools.cancel();
                    self.commit_extrude(&preview.targets, preview.height);
                } else if let Some(id) =
                    selection::nearest_ground_segment(&self.camera, &self.model, position, self.hit.hover_radius_px)
                {
                    self.tools.begin_extrude(vec![id]);
                }
            }
            ToolKind::HeightDraw => match self.tools.placing_start() {
                Some(start) => {
                    let z = self
                        .snap
                        .snap_z(self.camera.compute_height_at_screen_y(start, position.y));
                    self.tools.cancel();
                    self.commit_segment(start, start.with_z(z));
                }
                None => {
                    let base = self.resolve(position);
                    self.tools.begin_placing(base);
                }
            },
            ToolKind::Draw => {
                let world = self.resolve(position);
                match self.tools.placing_start() {
                    Some(start) => {
                        self.tools.cancel();
                        self.commit_segment(start, world);
                    }
                    None => self.tools.begin_placing(world),
                }
            }
        }
    }

    fn secondary_down(&mut self) {
        match self.tools.current_tool {
            ToolKind::Select => {
                if !self.tools.cancel() {
                    self.selection.clear();
                }
            }
            ToolKind::Size => {
                self.dimensions.cancel_drag(&mut self.model);
            }
            _ => {
                self.tools.cancel();
            }
        }
    }

    pub fn pointer_move(&mut self, position: Point, modifiers: Modifiers) {
        self.pointer = position;
        match self.tools.current_tool {
            ToolKind::Select => self.tools.update_selecting(position),
            ToolKind::Size => {
                if self.dimensions.is_dragging() {
                    let quantize = self.snap.grid_active();
                    self.dimensions
                        .update_drag(&self.camera, &mut self.model, position, modifiers, quantize);
                }
            }
            ToolKind::Extrude => self.track_extrude_height(position),
            ToolKind::Draw | ToolKind::HeightDraw => {}
        }
    }

    /// Follow the pointer with the extrusion height, when height is visible
    /// and no value has been typed.
    fn track_extrude_height(&mut self, position: Point) {
        if self.camera.is_top_down() || self.measure.value_m().is_some() {
            return;
        }
        let Some(base) = self.tools.extrude_preview().and_then(|p| p.base(&self.model)) else {
            return;
        };
        let height = self
            .snap
            .snap_z(self.camera.compute_height_at_screen_y(base, position.y));
        if let Some(preview) = self.tools.extrude_preview_mut() {
            preview.height = height;
        }
    }

    pub fn pointer_up(&mut self, position: Point, button: MouseButton, modifiers: Modifiers) {
        self.pointer = position;
        if button != MouseButton::Left {
            return;
        }
        match self.tools.current_tool {
            ToolKind::Select => self.finish_selecting(position, modifiers.shift),
            ToolKind::Size => {
                self.dimensions.end_drag(&self.model, &mut self.history);
            }
            _ => {}
        }
    }

    fn finish_selecting(&mut self, position: Point, additive: bool) {
        self.tools.update_selecting(position);
        self.refresh_hover();
        let ToolState::Selecting { origin, lasso, .. } = self.tools.take_state() else {
            return;
        };
        if lasso {
            let rect = Rect::from_points(origin, position);
            let ids = selection::lasso_select(&self.camera, &self.model, rect);
            self.selection.apply_lasso(&ids, additive);
        } else {
            let hit = self.hover.filter(|&id| self.within_select_radius(id, position));
            self.selection.apply_click(hit, additive);
        }
        log::debug!("{} segment(s) selected", self.selection.len());
    }

    /// A click only selects the hovered segment, and only this close to it.
    fn within_select_radius(&self, id: SegmentId, position: Point) -> bool {
        self.model.segment(id).is_some_and(|segment| {
            let (a, b) = selection::project_segment(&self.camera, segment);
            selection::point_segment_distance(position, a, b) < self.hit.select_radius_px
        })
    }

    /// Wheel: nudges the extrusion height while extruding, zooms otherwise.
    pub fn scroll(&mut self, position: Point, notches: f64) {
        self.pointer = position;
        if notches == 0.0 {
            return;
        }
        if let Some(preview) = self.tools.extrude_preview_mut() {
            let height = preview.height + notches * self.snap.config.height_step;
            preview.height = self.snap.snap_z(height);
        } else {
            self.camera.zoom_step(notches, position);
        }
    }

    /// Per-frame refresh of hover, previews and the numeric entry box.
    pub fn update(&mut self) {
        self.sync_measure();
        if let Some(value) = self.measure.value_m() {
            let height = self.snap.snap_z(value * PIXELS_PER_METER);
            if let Some(preview) = self.tools.extrude_preview_mut() {
                preview.height = height;
            }
        }
        self.refresh_hover();
        self.refresh_preview();
    }

    /// Open the entry box while a point is pending, close it otherwise.
    fn sync_measure(&mut self) {
        let wanted = match (&self.tools.state, self.tools.current_tool) {
            (ToolState::Placing { .. }, ToolKind::HeightDraw) => Some(MeasureMode::Height),
            (ToolState::Placing { .. }, _) => Some(MeasureMode::Length),
            (ToolState::Extruding(_), _) => Some(MeasureMode::Height),
            _ => None,
        };
        match wanted {
            Some(mode) if !self.measure.is_active() || self.measure.mode() != Some(mode) => {
                self.measure.start(mode);
            }
            None if self.measure.is_active() => self.measure.stop(),
            _ => {}
        }
    }

    fn refresh_hover(&mut self) {
        let pointer = self.pointer;
        self.hover = match (&self.tools.state, self.tools.current_tool) {
            (ToolState::Idle | ToolState::Selecting { lasso: false, .. }, ToolKind::Select) => {
                selection::nearest_segment(&self.camera, &self.model, pointer, self.hit.hover_radius_px)
            }
            (ToolState::Idle, ToolKind::Extrude) => {
                selection::nearest_ground_segment(&self.camera, &self.model, pointer, self.hit.hover_radius_px)
            }
            (_, ToolKind::Size) if !self.dimensions.is_dragging() => {
                selection::nearest_dimension_label(&self.camera, &self.model, pointer, self.hit.label_radius_px)
            }
            _ => None,
        };
    }

    fn refresh_preview(&mut self) {
        self.preview = None;
        let tool = self.tools.current_tool;
        if !matches!(tool, ToolKind::Draw | ToolKind::HeightDraw) {
            self.snap.reset_magnet();
            return;
        }
        let Some(start) = self.tools.placing_start() else {
            self.snap.update_magnet(self.pointer, &self.camera, &self.model);
            return;
        };

        let typed = self.measure.value_m();
        let end = if tool == ToolKind::HeightDraw {
            let z = match typed {
                Some(value) => value * PIXELS_PER_METER,
                None => self.camera.compute_height_at_screen_y(start, self.pointer.y),
            };
            start.with_z(self.snap.snap_z(z))
        } else {
            let current = self.resolve(self.pointer);
            let dir = self.tools.direction_towards(start, current);
            match typed {
                Some(value) => {
                    let length = value * PIXELS_PER_METER;
                    self.snap
                        .snap_xy(Point3::ground(start.x + dir.x * length, start.y + dir.y * length))
                }
                None => current,
            }
        };
        self.preview = Some((start, end));
    }

    fn resolve(&mut self, screen: Point) -> Point3 {
        let suppress_magnet = self.measure.overrides_magnet();
        self.snap.resolve(screen, &self.camera, &self.model, suppress_magnet)
    }

    fn commit_segment(&mut self, start: Point3, end: Point3) -> Option<SegmentId> {
        let segment = self.model.add_segment(start, end)?;
        let id = segment.id();
        self.history.record(Command::Create(segment));
        Some(id)
    }

    fn commit_extrude(&mut self, targets: &[SegmentId], height: f64) -> bool {
        if height.abs() < EPSILON {
            return false;
        }
        let mut walls = Vec::new();
        for &id in targets {
            let Some(segment) = self.model.ground_segment(id).cloned() else {
                continue;
            };
            if let Some(wall) = self.model.add_wall(&segment, height) {
                walls.push(wall);
            }
        }
        if walls.is_empty() {
            return false;
        }
        self.history.record(Command::Extrude(walls));
        true
    }

    /// Switch tool. Height drawing is refused while looking straight down.
    ///
    /// Entering the extrude tool with ground segments selected starts
    /// extruding them right away.
    pub fn set_tool(&mut self, tool: ToolKind) -> bool {
        if tool == ToolKind::HeightDraw && self.camera.is_top_down() {
            log::warn!("height drawing needs a tilted camera");
            return false;
        }
        self.dimensions.cancel_drag(&mut self.model);
        self.tools.set_tool(tool);
        if tool == ToolKind::Extrude {
            let targets: Vec<SegmentId> = self
                .selection
                .ids()
                .iter()
                .copied()
                .filter(|&id| self.model.ground_segment(id).is_some())
                .collect();
            if !targets.is_empty() {
                self.tools.begin_extrude(targets);
            }
        }
        self.update();
        true
    }

    /// Tilt the camera. Returning to top-down leaves height drawing.
    pub fn set_pitch(&mut self, pitch_deg: f64) {
        self.camera.set_pitch(pitch_deg);
        if self.tools.current_tool == ToolKind::HeightDraw && self.camera.is_top_down() {
            self.tools.set_tool(ToolKind::Draw);
        }
        self.update();
    }

    pub fn undo(&mut self) -> bool {
        self.dimensions.cancel_drag(&mut self.model);
        if !self.history.undo(&mut self.model) {
            return false;
        }
        self.revalidate();
        true
    }

    pub fn redo(&mut self) -> bool {
        self.dimensions.cancel_drag(&mut self.model);
        if !self.history.redo(&mut self.model) {
            return false;
        }
        self.revalidate();
        true
    }

    /// Drop references to geometry that no longer exists.
    fn revalidate(&mut self) {
        self.snap.reset_magnet();
        self.selection.retain_existing(&self.model);
        let stale = self
            .tools
            .extrude_preview()
            .is_some_and(|p| p.targets.iter().any(|&id| !self.model.contains(id)));
        if stale {
            self.tools.cancel();
        }
        self.update();
    }

    /// Delete the selected segments as one undoable step.
    pub fn delete_selected(&mut self) -> bool {
        self.dimensions.cancel_drag(&mut self.model);
        let Some(command) = history::delete_batch(&mut self.model, self.selection.ids()) else {
            return false;
        };
        self.history.record(command);
        self.selection.clear();
        self.revalidate();
        true
    }

    /// Remove all geometry. History is cleared too, so this cannot be undone.
    pub fn clear(&mut self) {
        self.dimensions.cancel_drag(&mut self.model);
        self.model.clear_all();
        self.history.clear();
        self.selection.clear();
        self.snap.reset_magnet();
        self.tools.cancel();
        log::info!("canvas cleared");
        self.update();
    }

    /// Back out of the innermost interaction (Escape).
    ///
    /// Returns false when there was nothing to back out of.
    pub fn cancel(&mut self) -> bool {
        let consumed = match self.tools.current_tool {
            ToolKind::Size => {
                if !self.dimensions.cancel_drag(&mut self.model) {
                    self.tools.set_tool(ToolKind::Draw);
                }
                true
            }
            ToolKind::Select => {
                if !self.tools.cancel() {
                    self.selection.clear();
                    self.tools.set_tool(ToolKind::Draw);
                }
                true
            }
            ToolKind::Extrude => {
                if !self.tools.cancel() {
                    self.tools.set_tool(ToolKind::Draw);
                }
                true
            }
            ToolKind::Draw | ToolKind::HeightDraw => self.tools.cancel(),
        };
        self.update();
        consumed
    }

    /// Route a key to the numeric entry box. Returns false if the box is closed.
    pub fn measure_key(&mut self, key: MeasureKey, modifiers: Modifiers) -> bool {
        if !self.measure.is_active() {
            return false;
        }
        let consumed = match key {
            MeasureKey::Char(c) => self.measure.push_char(c),
            MeasureKey::Backspace => {
                self.measure.backspace();
                true
            }
            MeasureKey::Up | MeasureKey::Down => {
                self.measure.step(key == MeasureKey::Up, modifiers.coarse());
                true
            }
            MeasureKey::Enter => {
                if let Err(err) = self.commit_measure() {
                    log::debug!("typed value rejected: {err}");
                }
                true
            }
            MeasureKey::Escape => {
                self.measure.clear();
                true
            }
        };
        self.update();
        consumed
    }

    /// Finish the pending gesture with the typed value.
    ///
    /// Lengths follow the direction from the start point to the resolved
    /// pointer, as the preview does (or the last known direction when the
    /// pointer sits on the start).
    pub fn commit_measure(&mut self) -> Result<bool, MeasureError> {
        if !self.measure.is_active() {
            return Ok(false);
        }
        let value = self.measure.parsed()?;
        let committed = match (self.tools.take_state(), self.tools.current_tool) {
            (ToolState::Extruding(preview), _) => {
                let height = self.snap.snap_z(value * PIXELS_PER_METER);
                self.commit_extrude(&preview.targets, height);
                true
            }
            (ToolState::Placing { start }, ToolKind::HeightDraw) => {
                let z = self.snap.snap_z(value * PIXELS_PER_METER);
                if z.abs() > EPSILON {
                    self.commit_segment(start, start.with_z(z));
                }
                true
            }
            (ToolState::Placing { start }, _) => {
                let current = self.resolve(self.pointer);
                let dir = self.tools.direction_towards(start, current);
                let length = value * PIXELS_PER_METER;
                let end = self
                    .snap
                    .snap_xy(Point3::ground(start.x + dir.x * length, start.y + dir.y * length));
                if length > 0.0 {
                    self.commit_segment(start, end);
                }
                true
            }
            (state, _) => {
                self.tools.state = state;
                false
            }
        };
        if committed {
            self.measure.stop();
            self.update();
        }
        Ok(committed)
    }

    /// Put the dragged (or hovered) label back onto its segment.
    pub fn reset_dimension_offset(&mut self) -> bool {
        if self.tools.current_tool != ToolKind::Size {
            return false;
        }
        let Some(id) = self.dimensions.drag().map(|drag| drag.segment).or(self.hover) else {
            return false;
        };
        self.dimensions.cancel_drag(&mut self.model);
        self.dimensions.reset_offset(&mut self.model, &mut self.history, id)
    }
}
