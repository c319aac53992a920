//! Circuit topology: editor snapshot, integrity checks and graph building.
//!
//! The editor owns the canonical element and wire collections. This module
//! only reads an immutable [`CircuitSnapshot`] and turns it into a [`Graph`]
//! whose nodes are terminals merged by wires and whose edges are elements.

mod graph;
mod snapshot;
mod types;
mod union_find;
mod validate;

pub use graph::{Graph, GraphElement, GraphNode, MAX_INFERRED_TERMINALS};
pub use snapshot::{
    CircuitSnapshot, Element, ElementConfig, ElementKind, MeterMode, Wire, BREAKOUT_TERMINALS,
    MICROBIT_TERMINALS,
};
pub use types::*;
pub use union_find::UnionFind;
pub use validate::{sanitize_elements, validate_snapshot, IntegrityWarning};
