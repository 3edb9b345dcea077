//! Component library: which ports and default parameters each entity type has.
//!
//! `ObjectGraph::create_entity` looks the requested type up here to build the
//! entity's ports and initial parameter list. `ComponentLibrary::standard`
//! provides a small hydraulic/signal catalogue; callers may register more.

use crate::model::{Multiplicity, Parameter, Port};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Port declared by a component type.
#[derive(Debug, Clone, PartialEq)]
pub struct PortSpec {
    pub name: String,
    pub multiplicity: Multiplicity,
}

/// One entry in the library.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentType {
    /// Type tag stored on entities (e.g. `"Valve"`).
    pub type_name: String,
    /// Human-readable name, also the default name for new entities.
    pub display_name: String,
    pub ports: Vec<PortSpec>,
    pub default_parameters: Vec<Parameter>,
}

impl ComponentType {
    /// Fresh, unconnected ports for a new entity of this type.
    pub fn instantiate_ports(&self) -> SmallVec<[Port; 4]> {
        self.ports
            .iter()
            .map(|spec| Port {
                name: spec.name.clone(),
                multiplicity: spec.multiplicity,
                connected: false,
            })
            .collect()
    }

    pub fn default_parameter(&self, name: &str) -> Option<&str> {
        self.default_parameters
            .iter()
            .find(|p| p.name == name)
            .map(|p| p.value.as_str())
    }
}

/// Registry of component types keyed by type tag.
#[derive(Debug, Clone, Default)]
pub struct ComponentLibrary {
    types: HashMap<String, ComponentType>,
}

impl ComponentLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a component type.
    pub fn register(&mut self, component: ComponentType) {
        self.types.insert(component.type_name.clone(), component);
    }

    pub fn get(&self, type_name: &str) -> Option<&ComponentType> {
        self.types.get(type_name)
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    /// Type tags in alphabetical order.
    pub fn type_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.types.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// The built-in catalogue used by default graphs.
    pub fn standard() -> Self {
        use Multiplicity::{Multiple, Single};

        let mut lib = Self::new();
        // ── Hydraulic ──
        lib.register(entry("Valve", "Valve", &[("PA", Single), ("PB", Single), ("xv", Multiple)], &[("Kv", "1e-05"), ("x_max", "0.01")]));
        lib.register(entry("Tank", "Tank", &[("P1", Single)], &[("p_atm", "100000")]));
        lib.register(entry("Pump", "Pump", &[("P1", Single), ("P2", Single)], &[("D", "5e-05"), ("n", "100")]));
        lib.register(entry("Orifice", "Orifice", &[("P1", Single), ("P2", Single)], &[("Kc", "1e-11")]));
        lib.register(entry("Volume", "Volume", &[("P1", Multiple), ("P2", Multiple)], &[("V", "0.001"), ("Beta_e", "1e+09")]));
        // ── Signal ──
        lib.register(entry("Gain", "Gain", &[("in", Single), ("out", Multiple)], &[("k", "1")]));
        lib.register(entry("Source", "Source", &[("out", Multiple)], &[("y", "0")]));
        lib.register(entry("Sink", "Sink", &[("in", Multiple)], &[]));
        lib
    }
}

fn entry(
    type_name: &str,
    display_name: &str,
    ports: &[(&str, Multiplicity)],
    defaults: &[(&str, &str)],
) -> ComponentType {
    ComponentType {
        type_name: type_name.to_string(),
        display_name: display_name.to_string(),
        ports: ports
            .iter()
            .map(|(name, multiplicity)| PortSpec {
                name: name.to_string(),
                multiplicity: *multiplicity,
            })
            .collect(),
        default_parameters: defaults
            .iter()
            .map(|(name, value)| Parameter {
                name: name.to_string(),
                value: value.to_string(),
            })
            .collect(),
    }
}
