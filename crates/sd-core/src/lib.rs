pub mod command;
pub mod emitter;
pub mod graph;
pub mod id;
pub mod library;
pub mod model;
pub mod params;
pub mod parser;

pub use command::Command;
pub use emitter::{encode, encode_all};
pub use graph::{GraphError, GraphState, ObjectGraph, PersistenceBridge, RemovedEntity};
pub use id::{EntityName, sanitize_name, unique_name};
pub use library::{ComponentLibrary, ComponentType, PortSpec};
pub use model::*;
pub use params::{ParameterStore, SystemParameters};
pub use parser::{DecodeError, decode, decode_line};
