//! Reversible graph mutations.
//!
//! A `Command` carries everything needed to apply it again and to reverse
//! it: names are always the *resolved* names the graph actually used, and
//! every overwrite stores the value it replaced.

use crate::id::EntityName;
use crate::model::*;

/// One reversible mutation of the object graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddEntity {
        type_name: String,
        name: EntityName,
        position: Point,
        rotation: Rotation,
        name_visible: bool,
    },
    DeleteEntity {
        snapshot: EntitySnapshot,
    },
    AddConnector(ConnectorSpec),
    DeleteConnector(ConnectorSpec),
    RenameEntity {
        old: EntityName,
        new: EntityName,
    },
    MoveEntity {
        name: EntityName,
        old: Point,
        new: Point,
    },
    RotateEntity {
        name: EntityName,
        old: Rotation,
        new: Rotation,
    },
    FlipVertical {
        name: EntityName,
    },
    FlipHorizontal {
        name: EntityName,
    },
    ChangedParameter {
        entity: EntityName,
        parameter: String,
        old: String,
        new: String,
    },
    ChangedNameVisibility {
        entity: EntityName,
        old: bool,
        new: bool,
    },
    ChangedAlwaysVisible {
        entity: EntityName,
        old: bool,
        new: bool,
    },
    MoveConnector {
        start: PortRef,
        end: PortRef,
        dx: f64,
        dy: f64,
    },
    /// One line segment of a connector dragged from `old` to `new`.
    ModifiedConnector {
        start: PortRef,
        end: PortRef,
        line: usize,
        old: Point,
        new: Point,
    },
}

impl Command {
    /// The leading token of the command's text line.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::AddEntity { .. } => "ADDEDOBJECT",
            Self::DeleteEntity { .. } => "DELETEDOBJECT",
            Self::AddConnector(_) => "ADDEDCONNECTOR",
            Self::DeleteConnector(_) => "DELETEDCONNECTOR",
            Self::RenameEntity { .. } => "RENAMEDOBJECT",
            Self::MoveEntity { .. } => "MOVEDOBJECT",
            Self::RotateEntity { .. } => "ROTATEDOBJECT",
            Self::FlipVertical { .. } => "VERTICALFLIP",
            Self::FlipHorizontal { .. } => "HORIZONTALFLIP",
            Self::ChangedParameter { .. } => "PARAMETER",
            Self::ChangedNameVisibility { .. } => "NAMEVISIBILITY",
            Self::ChangedAlwaysVisible { .. } => "ALWAYSVISIBLE",
            Self::MoveConnector { .. } => "MOVEDCONNECTOR",
            Self::ModifiedConnector { .. } => "MODIFIEDCONNECTOR",
        }
    }

    /// Human-readable label shown in the history view.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AddEntity { .. } => "Added Object",
            Self::DeleteEntity { .. } => "Deleted Object",
            Self::AddConnector(_) => "Added Connector",
            Self::DeleteConnector(_) => "Deleted Connector",
            Self::RenameEntity { .. } => "Renamed Object",
            Self::MoveEntity { .. } => "Moved Object",
            Self::RotateEntity { .. } => "Rotated Object",
            Self::FlipVertical { .. } => "Flipped Vertical",
            Self::FlipHorizontal { .. } => "Flipped Horizontal",
            Self::ChangedParameter { .. } => "Changed Parameter",
            Self::ChangedNameVisibility { .. } => "Changed Name Visibility",
            Self::ChangedAlwaysVisible { .. } => "Toggle Component Always Visible",
            Self::MoveConnector { .. } => "Moved Connector",
            Self::ModifiedConnector { .. } => "Modified Connector",
        }
    }

    /// Entities this command reads or writes, in payload order.
    pub fn entities(&self) -> Vec<EntityName> {
        match self {
            Self::AddEntity { name, .. }
            | Self::MoveEntity { name, .. }
            | Self::RotateEntity { name, .. }
            | Self::FlipVertical { name }
            | Self::FlipHorizontal { name } => vec![*name],
            Self::DeleteEntity { snapshot } => vec![snapshot.name],
            Self::AddConnector(spec) | Self::DeleteConnector(spec) => {
                vec![spec.start.entity, spec.end.entity]
            }
            Self::MoveConnector { start, end, .. } | Self::ModifiedConnector { start, end, .. } => {
                vec![start.entity, end.entity]
            }
            Self::RenameEntity { old, new } => vec![*old, *new],
            Self::ChangedParameter { entity, .. }
            | Self::ChangedNameVisibility { entity, .. }
            | Self::ChangedAlwaysVisible { entity, .. } => vec![*entity],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_and_labels() {
        let cmd = Command::MoveEntity {
            name: EntityName::intern("V1"),
            old: Point::new(0.0, 0.0),
            new: Point::new(1.0, 2.0),
        };
        assert_eq!(cmd.tag(), "MOVEDOBJECT");
        assert_eq!(cmd.label(), "Moved Object");

        let flip = Command::FlipHorizontal {
            name: EntityName::intern("V1"),
        };
        assert_eq!(flip.label(), "Flipped Horizontal");
    }

    #[test]
    fn connector_commands_touch_both_endpoints() {
        let spec = ConnectorSpec::new(PortRef::new("P1", "P2"), PortRef::new("V1", "PA"));
        let names: Vec<String> = Command::AddConnector(spec)
            .entities()
            .iter()
            .map(|n| n.to_string())
            .collect();
        assert_eq!(names, vec!["P1", "V1"]);
    }
}
