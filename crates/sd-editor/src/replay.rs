//! Applying recorded commands to the object graph.
//!
//! Replay uses the exact-name graph primitives: a recorded name that is
//! missing, or already taken, means the history no longer matches the
//! graph and the error is returned rather than worked around.

use sd_core::{Command, GraphError, ObjectGraph, PersistenceBridge};

/// Which way a post is being replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replay {
    /// Inverse of each command, newest first.
    Undo,
    /// Each command as recorded, oldest first.
    Redo,
}

/// Re-apply a command.
pub fn redo_command(graph: &mut ObjectGraph, command: &Command) -> Result<(), GraphError> {
    match command {
        Command::AddEntity {
            type_name,
            name,
            position,
            rotation,
            name_visible,
        } => {
            graph.create_entity_exact(type_name, *name, *position, *rotation)?;
            graph.set_name_visible(*name, *name_visible)?;
        }
        Command::DeleteEntity { snapshot } => {
            graph.delete_entity(snapshot.name)?;
        }
        Command::AddConnector(spec) => graph.connect_spec(spec)?,
        Command::DeleteConnector(spec) => {
            graph.disconnect(&spec.start, &spec.end)?;
        }
        Command::RenameEntity { old, new } => {
            graph.rename_entity_exact(*old, *new)?;
        }
        Command::MoveEntity { name, new, .. } => {
            graph.set_position(*name, *new)?;
        }
        Command::RotateEntity { name, new, .. } => {
            graph.rotate_to(*name, *new)?;
        }
        Command::FlipVertical { name } => graph.flip_vertical(*name)?,
        Command::FlipHorizontal { name } => graph.flip_horizontal(*name)?,
        Command::ChangedParameter {
            entity, parameter, new, ..
        } => {
            graph.set_parameter(*entity, parameter, new)?;
        }
        Command::ChangedNameVisibility { entity, new, .. } => {
            graph.set_name_visible(*entity, *new)?;
        }
        Command::ChangedAlwaysVisible { entity, new, .. } => {
            graph.set_always_visible(*entity, *new)?;
        }
        Command::MoveConnector { start, end, dx, dy } => graph.move_connector(start, end, *dx, *dy)?,
        Command::ModifiedConnector {
            start,
            end,
            line,
            old,
            new,
        } => graph.move_connector_line(start, end, *line, new.x - old.x, new.y - old.y)?,
    }
    Ok(())
}

/// Apply the inverse of a command.
pub fn undo_command(graph: &mut ObjectGraph, command: &Command) -> Result<(), GraphError> {
    match command {
        Command::AddEntity { name, .. } => {
            graph.delete_entity(*name)?;
        }
        Command::DeleteEntity { snapshot } => {
            graph.restore_entity_from_snapshot(snapshot)?;
        }
        Command::AddConnector(spec) => {
            graph.disconnect(&spec.start, &spec.end)?;
        }
        Command::DeleteConnector(spec) => graph.connect_spec(spec)?,
        Command::RenameEntity { old, new } => {
            graph.rename_entity_exact(*new, *old)?;
        }
        Command::MoveEntity { name, old, .. } => {
            graph.set_position(*name, *old)?;
        }
        Command::RotateEntity { name, old, .. } => {
            graph.rotate_to(*name, *old)?;
        }
        Command::FlipVertical { name } => graph.flip_vertical(*name)?,
        Command::FlipHorizontal { name } => graph.flip_horizontal(*name)?,
        Command::ChangedParameter {
            entity, parameter, old, ..
        } => {
            graph.set_parameter(*entity, parameter, old)?;
        }
        Command::ChangedNameVisibility { entity, old, .. } => {
            graph.set_name_visible(*entity, *old)?;
        }
        Command::ChangedAlwaysVisible { entity, old, .. } => {
            graph.set_always_visible(*entity, *old)?;
        }
        Command::MoveConnector { start, end, dx, dy } => graph.move_connector(start, end, -dx, -dy)?,
        Command::ModifiedConnector {
            start,
            end,
            line,
            old,
            new,
        } => graph.move_connector_line(start, end, *line, old.x - new.x, old.y - new.y)?,
    }
    Ok(())
}

/// Replay a whole post. On failure the commands already applied in this
/// call are reverted (best effort) before the error is returned.
pub fn replay_post(graph: &mut ObjectGraph, commands: &[Command], direction: Replay) -> Result<(), GraphError> {
    match direction {
        Replay::Undo => {
            for (i, command) in commands.iter().enumerate().rev() {
                if let Err(err) = undo_command(graph, command) {
                    log::warn!("undo of {} failed: {err}", command.tag());
                    for applied in &commands[i + 1..] {
                        if let Err(rollback) = redo_command(graph, applied) {
                            log::warn!("rollback of {} failed: {rollback}", applied.tag());
                        }
                    }
                    return Err(err);
                }
            }
        }
        Replay::Redo => {
            for (i, command) in commands.iter().enumerate() {
                if let Err(err) = redo_command(graph, command) {
                    log::warn!("redo of {} failed: {err}", command.tag());
                    for applied in commands[..i].iter().rev() {
                        if let Err(rollback) = undo_command(graph, applied) {
                            log::warn!("rollback of {} failed: {rollback}", applied.tag());
                        }
                    }
                    return Err(err);
                }
            }
        }
    }
    Ok(())
}
