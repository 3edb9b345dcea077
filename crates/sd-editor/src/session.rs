//! Live editing session.
//!
//! `EditorSession` owns the object graph and the undo stack. Every UI-level
//! operation mutates the graph first and then records the matching commands
//! with the names the graph actually used. A failed operation records
//! nothing and leaves the redo branch alone.

use crate::clipboard;
use crate::config::HistoryConfig;
use crate::history::HistoryView;
use crate::undo::{HistoryError, PostKind, UndoStack};
use sd_core::{
    Command, ConnectorSpec, DecodeError, EntityName, GraphError, ObjectGraph, Point, PortRef, Rotation,
};
use smallvec::SmallVec;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EditError {
    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("no connection is being drawn")]
    NoPendingConnection,

    #[error("clipboard is empty")]
    EmptyClipboard,
}

/// Axis for `align_selection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Share the x coordinate (stacked vertically).
    X,
    /// Share the y coordinate (lined up horizontally).
    Y,
}

/// A connector being dragged from a port. It does not exist in the graph
/// until `finish_connection` succeeds.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingConnection {
    pub start: PortRef,
    pub waypoints: Vec<Point>,
}

#[derive(Debug, Default)]
pub struct EditorSession {
    pub graph: ObjectGraph,
    pub undo: UndoStack,
    pending: Option<PendingConnection>,
    clipboard: Option<String>,
}

type Moves = SmallVec<[(EntityName, Point); 8]>;

impl EditorSession {
    pub fn new(graph: ObjectGraph, config: &HistoryConfig) -> Self {
        Self {
            graph,
            undo: UndoStack::new(config),
            pending: None,
            clipboard: None,
        }
    }

    pub fn history(&self) -> HistoryView {
        HistoryView::from_stack(&self.undo)
    }

    fn require_all(&self, names: &[EntityName]) -> Result<(), GraphError> {
        match names.iter().find(|n| !self.graph.contains(**n)) {
            Some(missing) => Err(GraphError::EntityNotFound(*missing)),
            None => Ok(()),
        }
    }

    // ─── Entities ────────────────────────────────────────────────────────

    /// Add an entity; a colliding name is replaced and the result returned.
    pub fn add_entity(&mut self, type_name: &str, requested_name: &str, position: Point) -> Result<EntityName, EditError> {
        let name = self
            .graph
            .create_entity(type_name, requested_name, position, Rotation::Deg0)?;
        let name_visible = self.graph.entity(name).is_some_and(|e| e.name_visible);

        self.undo.new_post(None);
        self.undo.record(Command::AddEntity {
            type_name: type_name.to_string(),
            name,
            position,
            rotation: Rotation::Deg0,
            name_visible,
        });
        Ok(name)
    }

    /// Delete the selection as one post.
    pub fn delete_selection(&mut self, selection: &[EntityName]) -> Result<(), EditError> {
        self.delete_entities(selection, None)
    }

    /// Connectors are deleted (and recorded) before their entities so that
    /// undo recreates the entities first.
    pub(crate) fn delete_entities(&mut self, selection: &[EntityName], kind: Option<PostKind>) -> Result<(), EditError> {
        self.require_all(selection)?;
        if selection.is_empty() {
            return Ok(());
        }
        let connectors: Vec<ConnectorSpec> = self
            .graph
            .connectors()
            .into_iter()
            .filter(|c| selection.iter().any(|n| c.touches(*n)))
            .collect();

        self.undo.new_post(kind);
        for spec in connectors {
            let removed = self.graph.disconnect(&spec.start, &spec.end)?;
            self.undo.record(Command::DeleteConnector(removed));
        }
        for name in selection {
            // Duplicates in the selection are already gone.
            if !self.graph.contains(*name) {
                continue;
            }
            let removed = self.graph.delete_entity(*name)?;
            self.undo.record(Command::DeleteEntity {
                snapshot: removed.snapshot,
            });
        }
        Ok(())
    }

    /// Rename; returns the name actually used.
    pub fn rename(&mut self, name: EntityName, requested: &str) -> Result<EntityName, EditError> {
        let new = self.graph.rename_entity(name, requested)?;
        if new != name {
            self.undo.new_post(None);
            self.undo.record(Command::RenameEntity { old: name, new });
        }
        Ok(new)
    }

    /// Move one entity to an absolute position.
    pub fn move_entity(&mut self, name: EntityName, to: Point) -> Result<(), EditError> {
        let old = self.graph.set_position(name, to)?;
        if old != to {
            self.undo.new_post(None);
            self.undo.record(Command::MoveEntity { name, old, new: to });
        }
        Ok(())
    }

    /// Move every selected entity by `(dx, dy)` as one post.
    pub fn move_selection(&mut self, selection: &[EntityName], dx: f64, dy: f64) -> Result<(), EditError> {
        self.require_all(selection)?;
        let mut moves = Moves::new();
        for name in selection {
            let old = self.graph.pose(*name)?.position;
            moves.push((*name, old.offset(dx, dy)));
        }
        let kind = (selection.len() > 1).then_some(PostKind::MovedMultiple);
        self.apply_moves(moves, kind)
    }

    /// Align the selection to the last selected entity along `axis`.
    pub fn align_selection(&mut self, selection: &[EntityName], axis: Axis) -> Result<(), EditError> {
        self.require_all(selection)?;
        let [others @ .., anchor] = selection else {
            return Ok(());
        };
        if others.is_empty() {
            return Ok(());
        }
        let target = self.graph.pose(*anchor)?.position;

        let mut moves = Moves::new();
        for name in others {
            let old = self.graph.pose(*name)?.position;
            let new = match axis {
                Axis::X => Point::new(target.x, old.y),
                Axis::Y => Point::new(old.x, target.y),
            };
            moves.push((*name, new));
        }
        let kind = match axis {
            Axis::X => PostKind::AlignX,
            Axis::Y => PostKind::AlignY,
        };
        self.apply_moves(moves, Some(kind))
    }

    fn apply_moves(&mut self, moves: Moves, kind: Option<PostKind>) -> Result<(), EditError> {
        self.undo.new_post(kind);
        for (name, new) in moves {
            let old = self.graph.set_position(name, new)?;
            if old != new {
                self.undo.record(Command::MoveEntity { name, old, new });
            }
        }
        Ok(())
    }

    /// Rotate each selected entity a quarter turn.
    pub fn rotate_selection(&mut self, selection: &[EntityName]) -> Result<(), EditError> {
        self.require_all(selection)?;
        self.undo.new_post(None);
        for name in selection {
            let old = self.graph.pose(*name)?.rotation;
            let new = old.quarter_turn();
            self.graph.rotate_to(*name, new)?;
            self.undo.record(Command::RotateEntity { name: *name, old, new });
        }
        Ok(())
    }

    pub fn flip_horizontal(&mut self, selection: &[EntityName]) -> Result<(), EditError> {
        self.require_all(selection)?;
        self.undo.new_post(None);
        for name in selection {
            self.graph.flip_horizontal(*name)?;
            self.undo.record(Command::FlipHorizontal { name: *name });
        }
        Ok(())
    }

    pub fn flip_vertical(&mut self, selection: &[EntityName]) -> Result<(), EditError> {
        self.require_all(selection)?;
        self.undo.new_post(None);
        for name in selection {
            self.graph.flip_vertical(*name)?;
            self.undo.record(Command::FlipVertical { name: *name });
        }
        Ok(())
    }

    // ─── Parameters & flags ──────────────────────────────────────────────

    pub fn set_parameter(&mut self, entity: EntityName, parameter: &str, value: &str) -> Result<(), EditError> {
        let old = self.graph.set_parameter(entity, parameter, value)?;
        if old != value {
            self.undo.new_post(None);
            self.undo.record(Command::ChangedParameter {
                entity,
                parameter: parameter.to_string(),
                old,
                new: value.to_string(),
            });
        }
        Ok(())
    }

    /// Set several parameters of one entity as a single post.
    pub fn set_parameters(&mut self, entity: EntityName, values: &[(&str, &str)]) -> Result<(), EditError> {
        self.require_all(&[entity])?;
        if let Some((missing, _)) = values
            .iter()
            .find(|(p, _)| self.graph.parameter(entity, p).is_none())
        {
            return Err(GraphError::ParameterNotFound {
                entity,
                parameter: missing.to_string(),
            }
            .into());
        }

        self.undo.new_post(Some(PostKind::ChangedParameters));
        for (parameter, value) in values {
            let old = self.graph.set_parameter(entity, parameter, value)?;
            if old != *value {
                self.undo.record(Command::ChangedParameter {
                    entity,
                    parameter: parameter.to_string(),
                    old,
                    new: value.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn set_name_visible(&mut self, entity: EntityName, visible: bool) -> Result<(), EditError> {
        let old = self.graph.set_name_visible(entity, visible)?;
        if old != visible {
            self.undo.new_post(None);
            self.undo.record(Command::ChangedNameVisibility {
                entity,
                old,
                new: visible,
            });
        }
        Ok(())
    }

    pub fn hide_all_names(&mut self) -> Result<(), EditError> {
        self.set_all_names_visible(false, PostKind::HideAllNames)
    }

    pub fn show_all_names(&mut self) -> Result<(), EditError> {
        self.set_all_names_visible(true, PostKind::ShowAllNames)
    }

    fn set_all_names_visible(&mut self, visible: bool, kind: PostKind) -> Result<(), EditError> {
        self.undo.new_post(Some(kind));
        for entity in self.graph.entity_names() {
            let old = self.graph.set_name_visible(entity, visible)?;
            if old != visible {
                self.undo.record(Command::ChangedNameVisibility {
                    entity,
                    old,
                    new: visible,
                });
            }
        }
        Ok(())
    }

    pub fn set_always_visible(&mut self, entity: EntityName, visible: bool) -> Result<(), EditError> {
        let old = self.graph.set_always_visible(entity, visible)?;
        if old != visible {
            self.undo.new_post(None);
            self.undo.record(Command::ChangedAlwaysVisible {
                entity,
                old,
                new: visible,
            });
        }
        Ok(())
    }

    // ─── Connectors ──────────────────────────────────────────────────────

    pub fn connect(&mut self, start: &PortRef, end: &PortRef) -> Result<(), EditError> {
        self.graph.connect(start, end)?;
        self.undo.new_post(None);
        self.undo
            .record(Command::AddConnector(ConnectorSpec::new(start.clone(), end.clone())));
        Ok(())
    }

    /// Start dragging a connector from `start`.
    pub fn begin_connection(&mut self, start: PortRef) -> Result<(), EditError> {
        let has_port = self
            .graph
            .entity(start.entity)
            .ok_or(GraphError::EntityNotFound(start.entity))?
            .port(&start.port)
            .is_some();
        if !has_port {
            return Err(GraphError::PortNotFound(start).into());
        }
        self.pending = Some(PendingConnection {
            start,
            waypoints: Vec::new(),
        });
        Ok(())
    }

    pub fn pending_connection(&self) -> Option<&PendingConnection> {
        self.pending.as_ref()
    }

    pub fn add_waypoint(&mut self, point: Point) -> Result<(), EditError> {
        let pending = self.pending.as_mut().ok_or(EditError::NoPendingConnection)?;
        pending.waypoints.push(point);
        Ok(())
    }

    pub fn cancel_connection(&mut self) {
        self.pending = None;
    }

    /// Drop the dragged connector on `end`. The pending connection is
    /// consumed whether or not the ports accept it.
    pub fn finish_connection(&mut self, end: PortRef) -> Result<ConnectorSpec, EditError> {
        let pending = self.pending.take().ok_or(EditError::NoPendingConnection)?;
        let spec = ConnectorSpec {
            start: pending.start,
            end,
            waypoints: pending.waypoints,
        };
        self.graph.connect_spec(&spec)?;
        self.undo.new_post(None);
        self.undo.record(Command::AddConnector(spec.clone()));
        Ok(spec)
    }

    pub fn disconnect(&mut self, a: &PortRef, b: &PortRef) -> Result<(), EditError> {
        let removed = self.graph.disconnect(a, b)?;
        self.undo.new_post(None);
        self.undo.record(Command::DeleteConnector(removed));
        Ok(())
    }

    pub fn move_connector(&mut self, a: &PortRef, b: &PortRef, dx: f64, dy: f64) -> Result<(), EditError> {
        self.graph.move_connector(a, b, dx, dy)?;
        self.undo.new_post(None);
        self.undo.record(Command::MoveConnector {
            start: a.clone(),
            end: b.clone(),
            dx,
            dy,
        });
        Ok(())
    }

    /// Drag one line segment of a connector from `old` to `new`.
    pub fn move_connector_line(
        &mut self,
        a: &PortRef,
        b: &PortRef,
        line: usize,
        old: Point,
        new: Point,
    ) -> Result<(), EditError> {
        self.graph
            .move_connector_line(a, b, line, new.x - old.x, new.y - old.y)?;
        self.undo.new_post(None);
        self.undo.record(Command::ModifiedConnector {
            start: a.clone(),
            end: b.clone(),
            line,
            old,
            new,
        });
        Ok(())
    }

    // ─── Clipboard ───────────────────────────────────────────────────────

    pub fn copy(&mut self, selection: &[EntityName]) -> Result<(), EditError> {
        self.clipboard = Some(clipboard::copy(&self.graph, selection)?);
        Ok(())
    }

    /// Copy, then delete the selection as one `Cut` post.
    pub fn cut(&mut self, selection: &[EntityName]) -> Result<(), EditError> {
        self.copy(selection)?;
        self.delete_entities(selection, Some(PostKind::Cut))
    }

    /// Paste the clipboard, shifted by `offset`. Returns the pasted names.
    pub fn paste(&mut self, offset: Point) -> Result<Vec<EntityName>, EditError> {
        let text = self.clipboard.as_deref().ok_or(EditError::EmptyClipboard)?;
        clipboard::paste(&mut self.graph, &mut self.undo, text, offset)
    }

    pub fn clipboard_text(&self) -> Option<&str> {
        self.clipboard.as_deref()
    }

    /// Replace the clipboard, e.g. with text from the system clipboard.
    pub fn set_clipboard_text(&mut self, text: impl Into<String>) {
        self.clipboard = Some(text.into());
    }

    // ─── History ─────────────────────────────────────────────────────────

    /// Undo one post. A pending connection is dropped first.
    pub fn undo(&mut self) -> Result<Option<&'static str>, EditError> {
        self.pending = None;
        Ok(self.undo.undo(&mut self.graph)?)
    }

    pub fn redo(&mut self) -> Result<Option<&'static str>, EditError> {
        self.pending = None;
        Ok(self.undo.redo(&mut self.graph)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn session() -> EditorSession {
        EditorSession::default()
    }

    #[test]
    fn failed_operation_records_nothing() {
        let mut s = session();
        assert!(s.add_entity("Turbine", "X", Point::default()).is_err());
        assert!(s.undo.posts().is_empty());

        let err = s.move_entity(EntityName::intern("Nobody"), Point::default()).unwrap_err();
        assert!(matches!(err, EditError::Graph(GraphError::EntityNotFound(_))));
        assert!(s.undo.posts().is_empty());
    }

    #[test]
    fn rename_records_resolved_name() {
        let mut s = session();
        let a = s.add_entity("Tank", "Tank", Point::default()).unwrap();
        s.add_entity("Tank", "Other", Point::default()).unwrap();
        let renamed = s.rename(EntityName::intern("Other"), "Tank").unwrap();
        assert_eq!(renamed.as_str(), "Tank_1");

        let last = s.undo.posts().last().unwrap();
        assert_eq!(
            last.commands,
            vec![Command::RenameEntity {
                old: EntityName::intern("Other"),
                new: renamed,
            }]
        );
        assert_eq!(a.as_str(), "Tank");
    }

    #[test]
    fn align_moves_to_last_selected() {
        let mut s = session();
        let a = s.add_entity("Tank", "A", Point::new(0.0, 0.0)).unwrap();
        let b = s.add_entity("Tank", "B", Point::new(10.0, 40.0)).unwrap();
        let c = s.add_entity("Tank", "C", Point::new(30.0, 20.0)).unwrap();
        s.align_selection(&[a, b, c], Axis::X).unwrap();

        assert_eq!(s.graph.pose(a).unwrap().position, Point::new(30.0, 0.0));
        assert_eq!(s.graph.pose(b).unwrap().position, Point::new(30.0, 40.0));
        assert_eq!(s.undo.posts().last().unwrap().kind, Some(PostKind::AlignX));
    }

    #[test]
    fn pending_connection_needs_a_start() {
        let mut s = session();
        let err = s.finish_connection(PortRef::new("A", "P1")).unwrap_err();
        assert_eq!(err, EditError::NoPendingConnection);
    }

    #[test]
    fn finish_connection_records_waypoints() {
        let mut s = session();
        s.add_entity("Valve", "V1", Point::default()).unwrap();
        s.add_entity("Tank", "T1", Point::new(100.0, 0.0)).unwrap();

        s.begin_connection(PortRef::new("V1", "PA")).unwrap();
        s.add_waypoint(Point::new(50.0, 0.0)).unwrap();
        let spec = s.finish_connection(PortRef::new("T1", "P1")).unwrap();
        assert!(s.pending_connection().is_none());
        assert_eq!(spec.waypoints, vec![Point::new(50.0, 0.0)]);

        s.undo().unwrap();
        assert_eq!(s.graph.connector_count(), 0);
        s.redo().unwrap();
        let restored = s
            .graph
            .find_connector(&PortRef::new("V1", "PA"), &PortRef::new("T1", "P1"))
            .unwrap();
        assert_eq!(restored.waypoints, vec![Point::new(50.0, 0.0)]);
    }

    #[test]
    fn hide_all_names_is_one_post() {
        let mut s = session();
        s.add_entity("Tank", "A", Point::default()).unwrap();
        s.add_entity("Tank", "B", Point::default()).unwrap();
        s.hide_all_names().unwrap();

        let labels = s.history().labels();
        assert_eq!(labels[0], "Hide All Name Text");
        s.undo().unwrap();
        assert!(s.graph.entity(EntityName::intern("A")).unwrap().name_visible);
    }
}
