//! The object graph: single source of truth for entities and connectors.
//!
//! Entities are nodes of a `StableDiGraph`, connectors are its edges
//! (source = start entity, target = end entity). A name index maps each
//! live `EntityName` to its node. Everything outside the graph addresses
//! entities by name only.
//!
//! Live editing and undo/redo replay call the very same operations, so a
//! replayed command can never take a code path that a live edit did not.

use crate::id::{EntityName, sanitize_name, unique_name};
use crate::library::ComponentLibrary;
use crate::model::*;
use crate::params::SystemParameters;
use petgraph::Direction;
use petgraph::graph::{EdgeIndex, NodeIndex};
use petgraph::stable_graph::StableDiGraph;
use petgraph::visit::EdgeRef;
use smallvec::SmallVec;
use std::collections::HashMap;
use thiserror::Error;

// ─── Errors ──────────────────────────────────────────────────────────────

/// Failure of a graph operation. Nothing is mutated when one is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GraphError {
    #[error("no entity named `{0}`")]
    EntityNotFound(EntityName),

    #[error("no port `{0}`")]
    PortNotFound(PortRef),

    #[error("no connector between `{start}` and `{end}`")]
    ConnectorNotFound { start: PortRef, end: PortRef },

    #[error("connector `{start}` -> `{end}` has no line {line}")]
    LineNotFound { start: PortRef, end: PortRef, line: usize },

    #[error("entity `{entity}` has no parameter `{parameter}`")]
    ParameterNotFound {
        entity: EntityName,
        parameter: String,
    },

    #[error("unknown component type `{0}`")]
    UnknownType(String),

    #[error("name `{0}` is already taken")]
    NameTaken(EntityName),

    #[error("cannot connect `{start}` to `{end}`: {reason}")]
    InvalidConnection {
        start: PortRef,
        end: PortRef,
        reason: String,
    },
}

/// What `delete_entity` removed: the entity itself and, in edge order, every
/// connector that was attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedEntity {
    pub snapshot: EntitySnapshot,
    pub connectors: Vec<ConnectorSpec>,
}

/// Canonical, order-independent view of the whole graph for comparisons.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphState {
    pub entities: Vec<EntitySnapshot>,
    pub connectors: Vec<ConnectorSpec>,
    pub connected_ports: Vec<PortRef>,
}

/// The Persistence Bridge contract: shared by file loading and by undoing
/// a deletion, so both rebuild entities from the same snapshot form.
pub trait PersistenceBridge {
    /// Create an entity from a snapshot, substituting a free name on collision.
    fn create_entity_from_snapshot(&mut self, snapshot: &EntitySnapshot) -> Result<EntityName, GraphError>;

    /// Recreate an entity under exactly its snapshot name; `NameTaken` if
    /// that name is in use.
    fn restore_entity_from_snapshot(&mut self, snapshot: &EntitySnapshot) -> Result<EntityName, GraphError>;

    fn write_entity_snapshot(&self, name: EntityName) -> Result<EntitySnapshot, GraphError>;
}

// ─── Object Graph ────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ObjectGraph {
    graph: StableDiGraph<Entity, Connector>,
    name_index: HashMap<EntityName, NodeIndex>,
    library: ComponentLibrary,
    /// System parameters that entity parameter texts may reference.
    pub parameters: SystemParameters,
}

impl Default for ObjectGraph {
    fn default() -> Self {
        Self::new(ComponentLibrary::standard())
    }
}

impl ObjectGraph {
    pub fn new(library: ComponentLibrary) -> Self {
        Self {
            graph: StableDiGraph::new(),
            name_index: HashMap::new(),
            library,
            parameters: SystemParameters::new(),
        }
    }

    pub fn library(&self) -> &ComponentLibrary {
        &self.library
    }

    // ─── Lookup ──────────────────────────────────────────────────────────

    pub fn contains(&self, name: EntityName) -> bool {
        self.name_index.contains_key(&name)
    }

    pub fn entity(&self, name: EntityName) -> Option<&Entity> {
        self.name_index.get(&name).map(|idx| &self.graph[*idx])
    }

    pub fn entity_count(&self) -> usize {
        self.name_index.len()
    }

    pub fn connector_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Live entity names, sorted alphabetically.
    pub fn entity_names(&self) -> Vec<EntityName> {
        let mut names: Vec<EntityName> = self.name_index.keys().copied().collect();
        names.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        names
    }

    /// Every connector, in edge-index order.
    pub fn connectors(&self) -> Vec<ConnectorSpec> {
        let mut edges: Vec<EdgeIndex> = self.graph.edge_indices().collect();
        edges.sort();
        edges.into_iter().filter_map(|e| self.edge_spec(e)).collect()
    }

    /// Connectors attached to `name`, in edge-index order.
    pub fn connectors_of(&self, name: EntityName) -> Vec<ConnectorSpec> {
        self.index_of(name)
            .map(|idx| {
                self.incident_edges(idx)
                    .into_iter()
                    .filter_map(|e| self.edge_spec(e))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn index_of(&self, name: EntityName) -> Option<NodeIndex> {
        self.name_index.get(&name).copied()
    }

    fn require(&self, name: EntityName) -> Result<NodeIndex, GraphError> {
        self.index_of(name).ok_or(GraphError::EntityNotFound(name))
    }

    fn is_taken(&self, name: &str) -> bool {
        EntityName::lookup(name).is_some_and(|n| self.name_index.contains_key(&n))
    }

    /// Sanitize `requested` and make it unique among live entities.
    fn free_name(&self, requested: &str) -> EntityName {
        let clean = sanitize_name(requested);
        EntityName::intern(&unique_name(&clean, |n| self.is_taken(n)))
    }

    // ─── Entity lifecycle ────────────────────────────────────────────────

    /// Create an entity. A colliding name is silently replaced by a free one;
    /// the name actually used is returned.
    pub fn create_entity(
        &mut self,
        type_name: &str,
        requested_name: &str,
        position: Point,
        rotation: Rotation,
    ) -> Result<EntityName, GraphError> {
        let mut entity = self.instantiate(type_name)?;
        entity.name = self.free_name(requested_name);
        entity.pose.position = position;
        entity.pose.rotation = rotation;
        Ok(self.insert(entity))
    }

    /// Create an entity under exactly `name`; fails with `NameTaken` instead
    /// of substituting. Used when replaying history.
    pub fn create_entity_exact(
        &mut self,
        type_name: &str,
        name: EntityName,
        position: Point,
        rotation: Rotation,
    ) -> Result<EntityName, GraphError> {
        if self.contains(name) {
            return Err(GraphError::NameTaken(name));
        }
        let mut entity = self.instantiate(type_name)?;
        entity.name = name;
        entity.pose.position = position;
        entity.pose.rotation = rotation;
        Ok(self.insert(entity))
    }

    fn instantiate(&self, type_name: &str) -> Result<Entity, GraphError> {
        let component = self
            .library
            .get(type_name)
            .ok_or_else(|| GraphError::UnknownType(type_name.to_string()))?;
        Ok(Entity {
            name: EntityName::intern(&component.display_name),
            type_name: component.type_name.clone(),
            pose: Pose::default(),
            name_visible: true,
            always_visible: false,
            parameters: component.default_parameters.clone(),
            ports: component.instantiate_ports(),
        })
    }

    fn build_from_snapshot(&self, snapshot: &EntitySnapshot, name: EntityName) -> Result<Entity, GraphError> {
        let mut entity = self.instantiate(&snapshot.type_name)?;
        entity.name = name;
        entity.pose = snapshot.pose;
        entity.name_visible = snapshot.name_visible;
        entity.always_visible = snapshot.always_visible;
        entity.parameters = snapshot.parameters.clone();
        Ok(entity)
    }

    fn insert(&mut self, entity: Entity) -> EntityName {
        let name = entity.name;
        log::debug!("create entity `{name}` ({})", entity.type_name);
        let idx = self.graph.add_node(entity);
        self.name_index.insert(name, idx);
        name
    }

    /// Delete an entity, cascading to every connector attached to it.
    pub fn delete_entity(&mut self, name: EntityName) -> Result<RemovedEntity, GraphError> {
        let idx = self.require(name)?;
        let connectors = self
            .incident_edges(idx)
            .into_iter()
            .filter_map(|e| self.remove_edge(e))
            .collect();
        let snapshot = EntitySnapshot::of(&self.graph[idx]);
        self.graph.remove_node(idx);
        self.name_index.remove(&name);
        log::debug!("delete entity `{name}`");
        Ok(RemovedEntity {
            snapshot,
            connectors,
        })
    }

    /// Rename an entity. Collisions are resolved like `create_entity`; the
    /// name actually used is returned. Renaming to the same name is a no-op.
    pub fn rename_entity(&mut self, old: EntityName, requested: &str) -> Result<EntityName, GraphError> {
        self.require(old)?;
        if old.as_str() == requested || old.as_str() == sanitize_name(requested) {
            return Ok(old);
        }
        let new = self.free_name(requested);
        self.apply_rename(old, new)
    }

    /// Rename to exactly `new`; fails with `NameTaken` instead of substituting.
    pub fn rename_entity_exact(&mut self, old: EntityName, new: EntityName) -> Result<EntityName, GraphError> {
        self.require(old)?;
        if old == new {
            return Ok(old);
        }
        if self.contains(new) {
            return Err(GraphError::NameTaken(new));
        }
        self.apply_rename(old, new)
    }

    fn apply_rename(&mut self, old: EntityName, new: EntityName) -> Result<EntityName, GraphError> {
        let idx = self.require(old)?;
        self.graph[idx].name = new;
        self.name_index.remove(&old);
        self.name_index.insert(new, idx);
        log::debug!("rename entity `{old}` -> `{new}`");
        Ok(new)
    }

    // ─── Pose & flags ────────────────────────────────────────────────────

    fn entity_mut(&mut self, name: EntityName) -> Result<&mut Entity, GraphError> {
        let idx = self.require(name)?;
        Ok(&mut self.graph[idx])
    }

    pub fn pose(&self, name: EntityName) -> Result<Pose, GraphError> {
        self.entity(name)
            .map(|e| e.pose)
            .ok_or(GraphError::EntityNotFound(name))
    }

    /// Overwrite position, rotation and flips. Returns the previous pose.
    pub fn set_entity_pose(&mut self, name: EntityName, pose: Pose) -> Result<Pose, GraphError> {
        let entity = self.entity_mut(name)?;
        log::trace!("pose `{name}` -> {pose:?}");
        Ok(std::mem::replace(&mut entity.pose, pose))
    }

    /// Read-modify-write of the pose; every pose edit goes through
    /// `set_entity_pose`.
    fn update_pose(&mut self, name: EntityName, edit: impl FnOnce(&mut Pose)) -> Result<Pose, GraphError> {
        let mut pose = self.pose(name)?;
        edit(&mut pose);
        self.set_entity_pose(name, pose)
    }

    /// Returns the previous position.
    pub fn set_position(&mut self, name: EntityName, position: Point) -> Result<Point, GraphError> {
        self.update_pose(name, |pose| pose.position = position)
            .map(|old| old.position)
    }

    /// Set an absolute rotation. Returns the previous rotation.
    pub fn rotate_to(&mut self, name: EntityName, rotation: Rotation) -> Result<Rotation, GraphError> {
        self.update_pose(name, |pose| pose.rotation = rotation)
            .map(|old| old.rotation)
    }

    pub fn flip_horizontal(&mut self, name: EntityName) -> Result<(), GraphError> {
        self.update_pose(name, |pose| pose.flip.horizontal = !pose.flip.horizontal)?;
        Ok(())
    }

    pub fn flip_vertical(&mut self, name: EntityName) -> Result<(), GraphError> {
        self.update_pose(name, |pose| pose.flip.vertical = !pose.flip.vertical)?;
        Ok(())
    }

    /// Returns the previous flag.
    pub fn set_name_visible(&mut self, name: EntityName, visible: bool) -> Result<bool, GraphError> {
        let entity = self.entity_mut(name)?;
        Ok(std::mem::replace(&mut entity.name_visible, visible))
    }

    /// Returns the previous flag.
    pub fn set_always_visible(&mut self, name: EntityName, visible: bool) -> Result<bool, GraphError> {
        let entity = self.entity_mut(name)?;
        Ok(std::mem::replace(&mut entity.always_visible, visible))
    }

    // ─── Parameters ──────────────────────────────────────────────────────

    pub fn parameter(&self, entity: EntityName, parameter: &str) -> Option<&str> {
        self.entity(entity)?.parameter(parameter)
    }

    /// Overwrite a parameter's text. Returns the previous text.
    pub fn set_parameter(&mut self, entity: EntityName, parameter: &str, value: &str) -> Result<String, GraphError> {
        let target = self.entity_mut(entity)?;
        let slot = target
            .parameters
            .iter_mut()
            .find(|p| p.name == parameter)
            .ok_or_else(|| GraphError::ParameterNotFound {
                entity,
                parameter: parameter.to_string(),
            })?;
        log::trace!("parameter `{entity}.{parameter}` = {value:?}");
        Ok(std::mem::replace(&mut slot.value, value.to_string()))
    }

    /// Numeric value of a parameter, resolving system-parameter references.
    pub fn resolve_parameter(&self, entity: EntityName, parameter: &str) -> Option<f64> {
        let text = self.parameter(entity, parameter)?;
        self.parameters.evaluate(text)
    }

    // ─── Connectors ──────────────────────────────────────────────────────

    fn incident_edges(&self, idx: NodeIndex) -> Vec<EdgeIndex> {
        let mut edges: Vec<EdgeIndex> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .chain(self.graph.edges_directed(idx, Direction::Incoming))
            .map(|e| e.id())
            .collect();
        edges.sort();
        edges.dedup();
        edges
    }

    fn edge_spec(&self, edge: EdgeIndex) -> Option<ConnectorSpec> {
        let (source, target) = self.graph.edge_endpoints(edge)?;
        let connector = self.graph.edge_weight(edge)?;
        Some(ConnectorSpec {
            start: PortRef::new(self.graph[source].name, connector.start_port.clone()),
            end: PortRef::new(self.graph[target].name, connector.end_port.clone()),
            waypoints: connector.waypoints.to_vec(),
        })
    }

    fn find_edge(&self, a: &PortRef, b: &PortRef) -> Option<EdgeIndex> {
        let ia = self.index_of(a.entity)?;
        let ib = self.index_of(b.entity)?;
        let forward = self
            .graph
            .edges_directed(ia, Direction::Outgoing)
            .find(|e| e.target() == ib && e.weight().start_port == a.port && e.weight().end_port == b.port);
        let backward = || {
            self.graph
                .edges_directed(ib, Direction::Outgoing)
                .find(|e| e.target() == ia && e.weight().start_port == b.port && e.weight().end_port == a.port)
        };
        forward.or_else(backward).map(|e| e.id())
    }

    /// Symmetric lookup: matches regardless of which side is passed as start.
    pub fn find_connector(&self, a: &PortRef, b: &PortRef) -> Option<ConnectorSpec> {
        self.find_edge(a, b).and_then(|e| self.edge_spec(e))
    }

    fn port_in_use(&self, idx: NodeIndex, port: &str) -> bool {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .any(|e| e.weight().start_port == port)
            || self
                .graph
                .edges_directed(idx, Direction::Incoming)
                .any(|e| e.weight().end_port == port)
    }

    fn check_port(&self, port: &PortRef) -> Result<(NodeIndex, &Port), GraphError> {
        let idx = self.require(port.entity)?;
        let found = self.graph[idx]
            .port(&port.port)
            .ok_or_else(|| GraphError::PortNotFound(port.clone()))?;
        Ok((idx, found))
    }

    /// Connect two ports. Fails without mutating when a port is missing, a
    /// port would connect to itself, the pair is already connected, or a
    /// single-connection port is already in use.
    pub fn connect(&mut self, start: &PortRef, end: &PortRef) -> Result<(), GraphError> {
        let invalid = |reason: &str| GraphError::InvalidConnection {
            start: start.clone(),
            end: end.clone(),
            reason: reason.to_string(),
        };

        let (si, start_port) = self.check_port(start)?;
        let (ie, end_port) = self.check_port(end)?;
        if start == end {
            return Err(invalid("a port cannot connect to itself"));
        }
        if self.find_edge(start, end).is_some() {
            return Err(invalid("ports are already connected"));
        }
        if start_port.multiplicity == Multiplicity::Single && start_port.connected {
            return Err(invalid(&format!("`{start}` accepts a single connector")));
        }
        if end_port.multiplicity == Multiplicity::Single && end_port.connected {
            return Err(invalid(&format!("`{end}` accepts a single connector")));
        }

        self.graph.add_edge(
            si,
            ie,
            Connector {
                start_port: start.port.clone(),
                end_port: end.port.clone(),
                waypoints: SmallVec::new(),
                connected: true,
            },
        );
        self.mark_port(si, &start.port, true);
        self.mark_port(ie, &end.port, true);
        log::debug!("connect `{start}` -> `{end}`");
        Ok(())
    }

    /// Connect and restore recorded waypoints.
    pub fn connect_spec(&mut self, spec: &ConnectorSpec) -> Result<(), GraphError> {
        self.connect(&spec.start, &spec.end)?;
        self.set_waypoints(&spec.start, &spec.end, &spec.waypoints)
    }

    /// Remove the connector joining `a` and `b` (either orientation).
    pub fn disconnect(&mut self, a: &PortRef, b: &PortRef) -> Result<ConnectorSpec, GraphError> {
        let spec = self
            .find_edge(a, b)
            .and_then(|edge| self.remove_edge(edge))
            .ok_or_else(|| GraphError::ConnectorNotFound {
                start: a.clone(),
                end: b.clone(),
            })?;
        log::debug!("disconnect `{}` -> `{}`", spec.start, spec.end);
        Ok(spec)
    }

    /// Remove an edge and recompute the `connected` flag of both ports.
    fn remove_edge(&mut self, edge: EdgeIndex) -> Option<ConnectorSpec> {
        let spec = self.edge_spec(edge)?;
        let (source, target) = self.graph.edge_endpoints(edge)?;
        self.graph.remove_edge(edge);
        let start_used = self.port_in_use(source, &spec.start.port);
        self.mark_port(source, &spec.start.port, start_used);
        let end_used = self.port_in_use(target, &spec.end.port);
        self.mark_port(target, &spec.end.port, end_used);
        Some(spec)
    }

    fn mark_port(&mut self, idx: NodeIndex, port: &str, connected: bool) {
        if let Some(p) = self.graph[idx].port_mut(port) {
            p.connected = connected;
        }
    }

    pub fn set_waypoints(&mut self, a: &PortRef, b: &PortRef, waypoints: &[Point]) -> Result<(), GraphError> {
        let edge = self.find_edge(a, b).ok_or_else(|| GraphError::ConnectorNotFound {
            start: a.clone(),
            end: b.clone(),
        })?;
        self.graph[edge].waypoints = waypoints.iter().copied().collect();
        Ok(())
    }

    /// Shift every waypoint of a connector.
    pub fn move_connector(&mut self, a: &PortRef, b: &PortRef, dx: f64, dy: f64) -> Result<(), GraphError> {
        let edge = self.find_edge(a, b).ok_or_else(|| GraphError::ConnectorNotFound {
            start: a.clone(),
            end: b.clone(),
        })?;
        for point in self.graph[edge].waypoints.iter_mut() {
            *point = point.offset(dx, dy);
        }
        Ok(())
    }

    /// Drag one line segment of a connector. Line `i` runs from route point
    /// `i` to `i + 1`, where the route is the start port, the waypoints and
    /// the end port; the waypoints at its ends are shifted by `(dx, dy)`.
    pub fn move_connector_line(
        &mut self,
        a: &PortRef,
        b: &PortRef,
        line: usize,
        dx: f64,
        dy: f64,
    ) -> Result<(), GraphError> {
        let edge = self.find_edge(a, b).ok_or_else(|| GraphError::ConnectorNotFound {
            start: a.clone(),
            end: b.clone(),
        })?;
        let waypoints = &mut self.graph[edge].waypoints;
        if line > waypoints.len() {
            return Err(GraphError::LineNotFound {
                start: a.clone(),
                end: b.clone(),
                line,
            });
        }
        let first = line.saturating_sub(1);
        let last = line.min(waypoints.len().saturating_sub(1));
        if !waypoints.is_empty() {
            for point in &mut waypoints[first..=last] {
                *point = point.offset(dx, dy);
            }
        }
        Ok(())
    }

    // ─── Snapshots ───────────────────────────────────────────────────────

    pub fn snapshot(&self, name: EntityName) -> Result<EntitySnapshot, GraphError> {
        self.entity(name)
            .map(EntitySnapshot::of)
            .ok_or(GraphError::EntityNotFound(name))
    }

    /// Canonical state: entities sorted by name, connectors and connected
    /// ports sorted by their textual endpoints.
    pub fn state(&self) -> GraphState {
        let entities = self
            .entity_names()
            .into_iter()
            .filter_map(|n| self.entity(n).map(EntitySnapshot::of))
            .collect();

        let mut connectors = self.connectors();
        connectors.sort_by_key(|c| (c.start.to_string(), c.end.to_string()));

        let mut connected_ports: Vec<PortRef> = self
            .name_index
            .iter()
            .flat_map(|(name, idx)| {
                self.graph[*idx]
                    .ports
                    .iter()
                    .filter(|p| p.connected)
                    .map(move |p| PortRef::new(*name, p.name.clone()))
            })
            .collect();
        connected_ports.sort_by_key(|p| p.to_string());

        GraphState {
            entities,
            connectors,
            connected_ports,
        }
    }
}

impl PersistenceBridge for ObjectGraph {
    fn create_entity_from_snapshot(&mut self, snapshot: &EntitySnapshot) -> Result<EntityName, GraphError> {
        let name = self.free_name(snapshot.name.as_str());
        let entity = self.build_from_snapshot(snapshot, name)?;
        Ok(self.insert(entity))
    }

    fn restore_entity_from_snapshot(&mut self, snapshot: &EntitySnapshot) -> Result<EntityName, GraphError> {
        if self.contains(snapshot.name) {
            return Err(GraphError::NameTaken(snapshot.name));
        }
        let entity = self.build_from_snapshot(snapshot, snapshot.name)?;
        Ok(self.insert(entity))
    }

    fn write_entity_snapshot(&self, name: EntityName) -> Result<EntitySnapshot, GraphError> {
        self.snapshot(name)
    }
}
