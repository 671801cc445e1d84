//! Reversible command log for undo/redo.

use crate::geometry::{LineSegment, SegmentId, WallFace};
use crate::model::GeometryModel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A deleted segment together with the label offset it carried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletedSegment {
    pub segment: LineSegment,
    pub dimension_offset: f64,
}

/// One reversible edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Command {
    /// A segment was drawn.
    Create(LineSegment),
    /// Walls were extruded in one gesture.
    Extrude(Vec<WallFace>),
    /// Segments were deleted in one gesture; full copies kept for reinsertion.
    DeleteBatch(Vec<DeletedSegment>),
    /// A label offset changed; `offset` is the value to restore when applied.
    SetDimensionOffset { segment: SegmentId, offset: f64 },
}

impl Command {
    /// Short name for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Create(_) => "create",
            Command::Extrude(_) => "extrude",
            Command::DeleteBatch(_) => "delete",
            Command::SetDimensionOffset { .. } => "dimension offset",
        }
    }

    /// Undo this command on the model, returning the entry for the redo stack.
    fn revert(self, model: &mut GeometryModel) -> Command {
        match self {
            Command::Create(segment) => {
                let removed = model.remove_segment(segment.id());
                assert!(removed.is_some(), "history out of sync: segment {} missing", segment.id());
                Command::Create(segment)
            }
            Command::Extrude(walls) => {
                for wall in &walls {
                    let removed = model.remove_wall(wall.id());
                    assert!(removed.is_some(), "history out of sync: {} missing", wall.id());
                }
                Command::Extrude(walls)
            }
            Command::DeleteBatch(deleted) => {
                for entry in &deleted {
                    model.insert_segment(entry.segment.clone());
                    model.set_dimension_offset(entry.segment.id(), entry.dimension_offset);
                }
                Command::DeleteBatch(deleted)
            }
            Command::SetDimensionOffset { segment, offset } => swap_offset(model, segment, offset),
        }
    }

    /// Redo this command on the model, returning the entry for the undo stack.
    fn apply(self, model: &mut GeometryModel) -> Command {
        match self {
            Command::Create(segment) => {
                model.insert_segment(segment.clone());
                Command::Create(segment)
            }
            Command::Extrude(walls) => {
                for wall in &walls {
                    model.insert_wall(wall.clone());
                }
                Command::Extrude(walls)
            }
            Command::DeleteBatch(deleted) => {
                for entry in &deleted {
                    let removed = model.remove_segment(entry.segment.id());
                    assert!(
                        removed.is_some(),
                        "history out of sync: segment {} missing",
                        entry.segment.id()
                    );
                }
                Command::DeleteBatch(deleted)
            }
            Command::SetDimensionOffset { segment, offset } => swap_offset(model, segment, offset),
        }
    }
}

fn swap_offset(model: &mut GeometryModel, segment: SegmentId, offset: f64) -> Command {
    assert!(model.contains(segment), "history out of sync: segment {segment} missing");
    let current = model.dimension_offset(segment);
    model.set_dimension_offset(segment, offset);
    Command::SetDimensionOffset {
        segment,
        offset: current,
    }
}

/// Delete `ids` from the model and describe the deletion as one command.
///
/// Returns `None` when none of the ids exist.
pub fn delete_batch(model: &mut GeometryModel, ids: &BTreeSet<SegmentId>) -> Option<Command> {
    let offsets: Vec<(SegmentId, f64)> = ids.iter().map(|&id| (id, model.dimension_offset(id))).collect();
    let removed = model.delete_segments(ids);
    if removed.is_empty() {
        return None;
    }
    let deleted = removed
        .into_iter()
        .map(|segment| {
            let dimension_offset = offsets
                .iter()
                .find(|(id, _)| *id == segment.id())
                .map_or(0.0, |&(_, offset)| offset);
            DeletedSegment {
                segment,
                dimension_offset,
            }
        })
        .collect();
    Some(Command::DeleteBatch(deleted))
}

/// Undo and redo stacks over a [`GeometryModel`].
#[derive(Debug, Clone, Default)]
pub struct CommandHistory {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
}

impl CommandHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a command that has already been applied to the model.
    pub fn record(&mut self, command: Command) {
        log::debug!("recorded {}", command.kind());
        self.undo_stack.push(command);
        self.redo_stack.clear();
    }

    /// Undo the last command.
    /// Returns true if undo was performed, false if nothing to undo.
    pub fn undo(&mut self, model: &mut GeometryModel) -> bool {
        let Some(command) = self.undo_stack.pop() else {
            return false;
        };
        log::debug!("undo {}", command.kind());
        let inverse = command.revert(model);
        self.redo_stack.push(inverse);
        true
    }

    /// Redo the last undone command.
    /// Returns true if redo was performed, false if nothing to redo.
    pub fn redo(&mut self, model: &mut GeometryModel) -> bool {
        let Some(command) = self.redo_stack.pop() else {
            return false;
        };
        log::debug!("redo {}", command.kind());
        let forward = command.apply(model);
        self.undo_stack.push(forward);
        true
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    /// The command the next undo would revert.
    pub fn last(&self) -> Option<&Command> {
        self.undo_stack.last()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point3;

    fn draw(model: &mut GeometryModel, history: &mut CommandHistory, x: f64) -> LineSegment {
        let seg = model.add_segment(Point3::ORIGIN, Point3::ground(x, 0.0)).unwrap();
        history.record(Command::Create(seg.clone()));
        seg
    }

    #[test]
    fn test_undo_redo_create() {
        let mut model = GeometryModel::new();
        let mut history = CommandHistory::new();
        let seg = draw(&mut model, &mut history, 100.0);

        assert!(history.undo(&mut model));
        assert!(model.is_empty());
        assert!(history.can_redo());

        assert!(history.redo(&mut model));
        assert_eq!(model.segment(seg.id()), Some(&seg));
        assert!(model.is_occluder(seg.id()));
    }

    #[test]
    fn test_undo_empty_stack() {
        let mut model = GeometryModel::new();
        let mut history = CommandHistory::new();
        assert!(!history.undo(&mut model));
        assert!(!history.redo(&mut model));
    }

    #[test]
    fn test_record_clears_redo() {
        let mut model = GeometryModel::new();
        let mut history = CommandHistory::new();
        draw(&mut model, &mut history, 100.0);
        history.undo(&mut model);
        assert!(history.can_redo());

        draw(&mut model, &mut history, 50.0);
        assert!(!history.can_redo());
        assert_eq!(history.undo_len(), 1);
    }

    #[test]
    fn test_delete_undo_restores_ids_and_offsets() {
        let mut model = GeometryModel::new();
        let mut history = CommandHistory::new();
        let a = draw(&mut model, &mut history, 100.0);
        let b = draw(&mut model, &mut history, 200.0);
        let c = draw(&mut model, &mut history, 300.0);
        model.set_dimension_offset(b.id(), 14.0);

        let ids: BTreeSet<SegmentId> = [a.id(), b.id()].into_iter().collect();
        let command = delete_batch(&mut model, &ids).unwrap();
        history.record(command);
        assert_eq!(model.segment_count(), 1);

        assert!(history.undo(&mut model));
        assert_eq!(model.segment(a.id()), Some(&a));
        assert_eq!(model.segment(b.id()), Some(&b));
        assert_eq!(model.dimension_offset(b.id()), 14.0);
        let order: Vec<SegmentId> = model.segments().map(|s| s.id()).collect();
        assert_eq!(order, vec![a.id(), b.id(), c.id()]);

        assert!(history.redo(&mut model));
        assert_eq!(model.segment_count(), 1);
    }

    #[test]
    fn test_delete_batch_nothing_to_delete() {
        let mut model = GeometryModel::new();
        let ids: BTreeSet<SegmentId> = [SegmentId(7)].into_iter().collect();
        assert!(delete_batch(&mut model, &ids).is_none());
    }

    #[test]
    fn test_dimension_offset_symmetry() {
        let mut model = GeometryModel::new();
        let mut history = CommandHistory::new();
        let seg = draw(&mut model, &mut history, 100.0);

        model.set_dimension_offset(seg.id(), 20.0);
        history.record(Command::SetDimensionOffset {
            segment: seg.id(),
            offset: 0.0,
        });

        assert!(history.undo(&mut model));
        assert_eq!(model.dimension_offset(seg.id()), 0.0);
        assert!(history.redo(&mut model));
        assert_eq!(model.dimension_offset(seg.id()), 20.0);
        assert!(history.undo(&mut model));
        assert_eq!(model.dimension_offset(seg.id()), 0.0);
        assert_eq!(history.undo_len(), 1);
        assert_eq!(history.redo_len(), 1);
    }

    #[test]
    fn test_extrude_undo() {
        let mut model = GeometryModel::new();
        let mut history = CommandHistory::new();
        let seg = draw(&mut model, &mut history, 100.0);
        let wall = model.add_wall(&seg, 250.0).unwrap();
        history.record(Command::Extrude(vec![wall.clone()]));

        assert!(history.undo(&mut model));
        assert_eq!(model.wall_count(), 0);
        assert!(history.redo(&mut model));
        assert_eq!(model.wall(wall.id()), Some(&wall));
    }

    #[test]
    #[should_panic(expected = "history out of sync")]
    fn test_desync_is_fatal() {
        let mut model = GeometryModel::new();
        let mut history = CommandHistory::new();
        let seg = draw(&mut model, &mut history, 100.0);
        model.remove_segment(seg.id());
        history.undo(&mut model);
    }
}
