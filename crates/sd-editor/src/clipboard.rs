//! Copy and paste through the command text encoding.
//!
//! A copied selection is a list of command lines: `ADDEDOBJECT` per entity,
//! followed by the edits that turn a fresh entity into the copied one
//! (non-default `PARAMETER`s, flips, `ALWAYSVISIBLE`), then `ADDEDCONNECTOR`
//! for every connector with both ends inside the selection.

use crate::session::EditError;
use crate::undo::{PostKind, UndoStack};
use sd_core::{
    Command, ConnectorSpec, EntityName, GraphError, ObjectGraph, Point, PortRef, decode, encode_all,
};
use std::collections::HashMap;

/// Encode the selection as clipboard text.
pub fn copy(graph: &ObjectGraph, selection: &[EntityName]) -> Result<String, GraphError> {
    let mut commands = Vec::new();
    let mut copied: Vec<EntityName> = Vec::with_capacity(selection.len());

    for name in selection {
        if copied.contains(name) {
            continue;
        }
        let entity = graph.entity(*name).ok_or(GraphError::EntityNotFound(*name))?;
        let defaults = graph.library().get(&entity.type_name);

        commands.push(Command::AddEntity {
            type_name: entity.type_name.clone(),
            name: *name,
            position: entity.pose.position,
            rotation: entity.pose.rotation,
            name_visible: entity.name_visible,
        });
        for param in &entity.parameters {
            let default = defaults.and_then(|t| t.default_parameter(&param.name));
            if default != Some(param.value.as_str()) {
                commands.push(Command::ChangedParameter {
                    entity: *name,
                    parameter: param.name.clone(),
                    old: default.unwrap_or_default().to_string(),
                    new: param.value.clone(),
                });
            }
        }
        if entity.pose.flip.horizontal {
            commands.push(Command::FlipHorizontal { name: *name });
        }
        if entity.pose.flip.vertical {
            commands.push(Command::FlipVertical { name: *name });
        }
        if entity.always_visible {
            commands.push(Command::ChangedAlwaysVisible {
                entity: *name,
                old: false,
                new: true,
            });
        }
        copied.push(*name);
    }

    commands.extend(
        graph
            .connectors()
            .into_iter()
            .filter(|c| copied.contains(&c.start.entity) && copied.contains(&c.end.entity))
            .map(Command::AddConnector),
    );

    Ok(encode_all(&commands))
}

/// Paste clipboard text as one `Paste` post. Entities get fresh names on
/// collision and are shifted by `offset`; connectors and edits follow the
/// renamed entities. Lines referring to entities outside the clipboard are
/// skipped.
pub fn paste(
    graph: &mut ObjectGraph,
    undo: &mut UndoStack,
    text: &str,
    offset: Point,
) -> Result<Vec<EntityName>, EditError> {
    let commands = decode(text)?;
    if let Some(unknown) = commands.iter().find_map(|c| match c {
        Command::AddEntity { type_name, .. } if !graph.library().contains(type_name) => Some(type_name),
        _ => None,
    }) {
        return Err(GraphError::UnknownType(unknown.clone()).into());
    }

    undo.new_post(Some(PostKind::Paste));
    let mut renamed: HashMap<EntityName, EntityName> = HashMap::new();
    let mut pasted = Vec::new();

    for command in commands {
        if !matches!(command, Command::AddEntity { .. }) {
            if let Some(outside) = command.entities().into_iter().find(|n| !renamed.contains_key(n)) {
                log::warn!("paste: skipping {} line for `{outside}` outside the clipboard", command.tag());
                continue;
            }
        }
        match command {
            Command::AddEntity {
                type_name,
                name,
                position,
                rotation,
                name_visible,
            } => {
                let position = position.offset(offset.x, offset.y);
                let actual = graph.create_entity(&type_name, name.as_str(), position, rotation)?;
                graph.set_name_visible(actual, name_visible)?;
                renamed.insert(name, actual);
                pasted.push(actual);
                undo.record(Command::AddEntity {
                    type_name,
                    name: actual,
                    position,
                    rotation,
                    name_visible,
                });
            }
            Command::ChangedParameter {
                entity, parameter, new, ..
            } => {
                let target = remap(&renamed, entity);
                match graph.set_parameter(target, &parameter, &new) {
                    Ok(old) => undo.record(Command::ChangedParameter {
                        entity: target,
                        parameter,
                        old,
                        new,
                    }),
                    Err(err) => log::warn!("paste: skipping parameter: {err}"),
                }
            }
            Command::FlipHorizontal { name } => {
                let target = remap(&renamed, name);
                graph.flip_horizontal(target)?;
                undo.record(Command::FlipHorizontal { name: target });
            }
            Command::FlipVertical { name } => {
                let target = remap(&renamed, name);
                graph.flip_vertical(target)?;
                undo.record(Command::FlipVertical { name: target });
            }
            Command::ChangedAlwaysVisible { entity, new, .. } => {
                let target = remap(&renamed, entity);
                let old = graph.set_always_visible(target, new)?;
                undo.record(Command::ChangedAlwaysVisible {
                    entity: target,
                    old,
                    new,
                });
            }
            Command::AddConnector(spec) => {
                let remapped = ConnectorSpec {
                    start: PortRef::new(remap(&renamed, spec.start.entity), spec.start.port),
                    end: PortRef::new(remap(&renamed, spec.end.entity), spec.end.port),
                    waypoints: spec
                        .waypoints
                        .iter()
                        .map(|p| p.offset(offset.x, offset.y))
                        .collect(),
                };
                match graph.connect_spec(&remapped) {
                    Ok(()) => undo.record(Command::AddConnector(remapped)),
                    Err(err) => log::warn!("paste: skipping connector: {err}"),
                }
            }
            other => log::warn!("paste: ignoring {} line", other.tag()),
        }
    }

    log::debug!("pasted {} entities", pasted.len());
    Ok(pasted)
}

fn remap(renamed: &HashMap<EntityName, EntityName>, name: EntityName) -> EntityName {
    renamed.get(&name).copied().unwrap_or(name)
}
