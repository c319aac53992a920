//! Snapshot integrity checks.
//!
//! Nothing here rejects a snapshot: the editor routinely hands over circuits
//! in the middle of an edit. Problems are reported as [`IntegrityWarning`]s
//! and the offending item is dropped or clamped to a usable value.

use std::collections::HashSet;

use serde::Serialize;
use thiserror::Error;

use super::graph::Graph;
use super::snapshot::{CircuitSnapshot, Element, ElementKind};
use super::types::{ElementId, TerminalRef};

/// A tolerated integrity problem found while building the graph.
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityWarning {
    /// A wire endpoint names an element or terminal that does not exist.
    #[error("Wire {from} -> {to} references missing terminal {missing}; wire dropped")]
    DanglingWire {
        from: TerminalRef,
        to: TerminalRef,
        missing: TerminalRef,
    },

    /// A wire joins a terminal to itself.
    #[error("Wire joins terminal {terminal} to itself; wire dropped")]
    SelfWire { terminal: TerminalRef },

    /// Two elements share an id; the later one is ignored.
    #[error("Duplicate element id '{id}'; later element ignored")]
    DuplicateElement { id: ElementId },

    /// The element type is not modeled by the solver.
    #[error("Element '{id}' has unmodeled type '{element_type}'")]
    UnmodeledElement { id: ElementId, element_type: String },

    /// A configuration value was outside its valid range and was clamped.
    #[error("Element '{id}': {field} = {value} out of range, clamped to {clamped}")]
    ValueClamped {
        id: ElementId,
        field: &'static str,
        value: f64,
        clamped: f64,
    },

    /// A configuration value was NaN or infinite and was replaced by the default.
    #[error("Element '{id}': {field} is not finite, default used")]
    NonFiniteValue { id: ElementId, field: &'static str },

    /// A measurement mode was set on an element that does not measure.
    #[error("Element '{id}' is not a multimeter; mode ignored")]
    UnexpectedMode { id: ElementId },
}

/// Every integrity warning the snapshot would raise when built.
pub fn validate_snapshot(snapshot: &CircuitSnapshot) -> Vec<IntegrityWarning> {
    Graph::build(snapshot).warnings
}

/// Check every element's configuration and drop duplicates.
///
/// Returns the usable elements, in snapshot order, with their configuration
/// clamped into range.
pub fn sanitize_elements(
    snapshot: &CircuitSnapshot,
    warnings: &mut Vec<IntegrityWarning>,
) -> Vec<Element> {
    let mut seen = HashSet::with_capacity(snapshot.elements.len());
    let mut elements = Vec::with_capacity(snapshot.elements.len());

    for element in &snapshot.elements {
        if !seen.insert(element.id.clone()) {
            warnings.push(IntegrityWarning::DuplicateElement {
                id: element.id.clone(),
            });
            continue;
        }

        let mut element = element.clone();
        let id = &element.id;
        let config = &mut element.config;

        config.resistance = check_value(id, "resistance", config.resistance, 0.0, f64::MAX, warnings);
        config.voltage = check_value(id, "voltage", config.voltage, f64::MIN, f64::MAX, warnings);
        config.ratio = check_value(id, "ratio", config.ratio, 0.0, 1.0, warnings);
        config.internal_resistance = check_value(
            id,
            "internal_resistance",
            config.internal_resistance,
            0.0,
            f64::MAX,
            warnings,
        );
        config.forward_voltage =
            check_value(id, "forward_voltage", config.forward_voltage, 0.0, f64::MAX, warnings);
        config.rated_power =
            check_value(id, "rated_power", config.rated_power, f64::MIN_POSITIVE, f64::MAX, warnings);

        if config.mode.is_some() && element.kind != ElementKind::Multimeter {
            warnings.push(IntegrityWarning::UnexpectedMode { id: id.clone() });
            config.mode = None;
        }

        if let ElementKind::Unknown(name) = &element.kind {
            warnings.push(IntegrityWarning::UnmodeledElement {
                id: id.clone(),
                element_type: name.clone(),
            });
        }

        elements.push(element);
    }

    elements
}

fn check_value(
    id: &ElementId,
    field: &'static str,
    value: Option<f64>,
    min: f64,
    max: f64,
    warnings: &mut Vec<IntegrityWarning>,
) -> Option<f64> {
    let value = value?;
    if !value.is_finite() {
        warnings.push(IntegrityWarning::NonFiniteValue {
            id: id.clone(),
            field,
        });
        return None;
    }
    let clamped = value.clamp(min, max);
    if clamped != value {
        warnings.push(IntegrityWarning::ValueClamped {
            id: id.clone(),
            field,
            value,
            clamped,
        });
    }
    Some(clamped)
}
