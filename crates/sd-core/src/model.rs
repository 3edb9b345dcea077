//! Core data model for system diagrams.
//!
//! A diagram is a set of named entities (components) whose ports are joined
//! by connectors. Entities carry a pose (position, rotation, flips), display
//! flags, and textual parameters. Connectors refer to their endpoints by
//! entity *name* and port name, never by pointer; the `ObjectGraph` owns
//! everything.

use crate::id::EntityName;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

// ─── Geometry ────────────────────────────────────────────────────────────

/// A point on the diagram canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Entity rotation. Only quarter turns exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Build from degrees. Any multiple of 90 (including negative) is
    /// normalized into `[0, 360)`; other angles are rejected.
    pub fn from_degrees(degrees: i64) -> Option<Self> {
        match degrees.rem_euclid(360) {
            0 => Some(Self::Deg0),
            90 => Some(Self::Deg90),
            180 => Some(Self::Deg180),
            270 => Some(Self::Deg270),
            _ => None,
        }
    }

    pub fn degrees(self) -> u16 {
        match self {
            Self::Deg0 => 0,
            Self::Deg90 => 90,
            Self::Deg180 => 180,
            Self::Deg270 => 270,
        }
    }

    /// One quarter turn forward (the editor's only rotate gesture).
    pub fn quarter_turn(self) -> Self {
        match self {
            Self::Deg0 => Self::Deg90,
            Self::Deg90 => Self::Deg180,
            Self::Deg180 => Self::Deg270,
            Self::Deg270 => Self::Deg0,
        }
    }
}

/// Mirror state of an entity. Each flip is its own inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Flip {
    pub horizontal: bool,
    pub vertical: bool,
}

/// Position, rotation and flip state, overwritten as a unit by
/// `ObjectGraph::set_entity_pose`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Point,
    pub rotation: Rotation,
    pub flip: Flip,
}

// ─── Ports ───────────────────────────────────────────────────────────────

/// How many connectors a port accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Multiplicity {
    /// Exactly one connector (power ports).
    Single,
    /// Any number of connectors (signal read ports).
    Multiple,
}

/// Named connection point on an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub name: String,
    pub multiplicity: Multiplicity,
    pub connected: bool,
}

/// Address of a port by entity name and port name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub entity: EntityName,
    pub port: String,
}

impl PortRef {
    pub fn new(entity: impl Into<EntityName>, port: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for PortRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity, self.port)
    }
}

// ─── Parameters ──────────────────────────────────────────────────────────

/// A parameter value as the user typed it.
///
/// The text is either a plain number or the name of a system parameter;
/// the graph stores the text and resolves references on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

/// Interpretation of a parameter's text.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue<'a> {
    Literal(f64),
    Reference(&'a str),
}

impl<'a> ParameterValue<'a> {
    pub fn parse(text: &'a str) -> Self {
        let trimmed = text.trim();
        match trimmed.parse::<f64>() {
            Ok(v) => Self::Literal(v),
            Err(_) => Self::Reference(trimmed),
        }
    }
}

// ─── Entities & Connectors ───────────────────────────────────────────────

/// A named diagram node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub name: EntityName,
    /// Component type tag (key into the `ComponentLibrary`).
    pub type_name: String,
    pub pose: Pose,
    /// Whether the name label is drawn.
    pub name_visible: bool,
    /// Keep drawing this entity even in simplified views.
    pub always_visible: bool,
    pub parameters: Vec<Parameter>,
    pub ports: SmallVec<[Port; 4]>,
}

impl Entity {
    pub fn port(&self, name: &str) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub fn port_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.ports.iter_mut().find(|p| p.name == name)
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }
}

/// Edge weight of the object graph. Endpoint entities are the edge's
/// source and target nodes; only the port names live here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub start_port: String,
    pub end_port: String,
    pub waypoints: SmallVec<[Point; 4]>,
    /// False only while a connection is still being dragged.
    pub connected: bool,
}

/// Self-contained description of a connector, used by commands and the
/// clipboard. Stores names, so it survives the entity being recreated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorSpec {
    pub start: PortRef,
    pub end: PortRef,
    pub waypoints: Vec<Point>,
}

impl ConnectorSpec {
    pub fn new(start: PortRef, end: PortRef) -> Self {
        Self {
            start,
            end,
            waypoints: Vec::new(),
        }
    }

    /// True when this connector joins `a` and `b`, in either orientation.
    pub fn joins(&self, a: &PortRef, b: &PortRef) -> bool {
        (&self.start == a && &self.end == b) || (&self.start == b && &self.end == a)
    }

    pub fn touches(&self, entity: EntityName) -> bool {
        self.start.entity == entity || self.end.entity == entity
    }
}

/// Everything needed to recreate an entity: the Persistence Bridge contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub type_name: String,
    pub name: EntityName,
    pub pose: Pose,
    pub name_visible: bool,
    pub always_visible: bool,
    pub parameters: Vec<Parameter>,
}

impl EntitySnapshot {
    pub fn of(entity: &Entity) -> Self {
        Self {
            type_name: entity.type_name.clone(),
            name: entity.name,
            pose: entity.pose,
            name_visible: entity.name_visible,
            always_visible: entity.always_visible,
            parameters: entity.parameters.clone(),
        }
    }
}
