//! Element behavior models.
//!
//! This module provides a model for every placeable element type:
//! - Linear: Resistor, Lightbulb
//! - Sources: Battery
//! - Semiconductor: LED (ideal diode with forward resistance)
//! - Controls: Potentiometer
//! - Instruments: Multimeter
//! - Boards: micro:bit, micro:bit with breakout, ultrasonic sensor
//!
//! [`ElementModel`] is a closed set of variants with one exhaustive match per
//! operation: [`ElementModel::stamps`] for the electrical contribution and
//! [`ElementModel::derive`] for the display state. Adding an element type is
//! a compile-checked addition to both.

mod board;
mod controls;
mod diode;
mod linear;
mod meter;
mod sources;

pub use board::{Board, BoardVariant, PinReading, UltrasonicSensor};
pub use controls::Potentiometer;
pub use diode::Led;
pub use linear::{brightness, dissipated_power, resistive, Lightbulb, Resistor};
pub use meter::{Measurement, Multimeter};
pub use sources::Battery;

use serde::Serialize;

use crate::circuit::{ElementKind, GraphElement, MeterMode, NodeId};

/// Electrical contribution of one element part.
///
/// Current through a stamp is signed by convention: for `Conductance` and
/// `Short` it flows from `a` to `b` through the element; for sources it is the
/// current delivered out of `pos`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stamp {
    /// A resistance, as its conductance.
    Conductance { a: NodeId, b: NodeId, conductance: f64 },
    /// Zero resistance: `a` and `b` are the same electrical point.
    Short { a: NodeId, b: NodeId },
    /// Ideal voltage source, `V(pos) - V(neg) = emf`.
    VoltageSource { pos: NodeId, neg: NodeId, emf: f64 },
    /// Voltage source behind a series resistance.
    Norton {
        pos: NodeId,
        neg: NodeId,
        emf: f64,
        resistance: f64,
    },
}

impl Stamp {
    /// Nodes the stamp's current leaves and enters, in that order.
    pub fn flow_nodes(&self) -> (NodeId, NodeId) {
        match *self {
            Stamp::Conductance { a, b, .. } | Stamp::Short { a, b } => (a, b),
            Stamp::VoltageSource { pos, neg, .. } | Stamp::Norton { pos, neg, .. } => (neg, pos),
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self, Stamp::VoltageSource { .. } | Stamp::Norton { .. })
    }
}

/// Solved potential of one terminal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TerminalPotential {
    /// Volts relative to the reference node of the terminal's component.
    pub potential: f64,
    /// Connected component the terminal's node belongs to.
    pub component: usize,
}

/// Everything the solver learned about one element.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation<'a> {
    /// Voltage across the element's primary terminal pair.
    pub voltage: f64,
    /// Current through the element's primary part.
    pub current: f64,
    /// Current of every stamp, in [`ElementModel::stamps`] order.
    pub branch_currents: &'a [f64],
    pub terminals: &'a [TerminalPotential],
    /// Set when the current through a zero-resistance part cannot be split.
    pub current_indeterminate: bool,
    /// Ohmmeter outcome, for multimeters in resistance mode.
    pub resistance: Option<Measurement>,
}

/// Derived state an element shows on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayState {
    /// Nothing beyond voltage and current.
    Basic,
    Lightbulb {
        brightness: f64,
    },
    Led {
        brightness: f64,
        lit: bool,
    },
    Potentiometer {
        ratio: f64,
        /// Currents through the a-wiper and wiper-b legs.
        leg_currents: [f64; 2],
    },
    Multimeter {
        mode: MeterMode,
        reading: Measurement,
    },
    Board {
        supply_voltage: f64,
        pins: Vec<PinReading>,
    },
    Sensor {
        powered: bool,
    },
    Unmodeled,
}

impl DisplayState {
    pub fn is_indeterminate(&self) -> bool {
        matches!(self, DisplayState::Multimeter { reading, .. } if reading.is_indeterminate())
    }
}

/// Behavior model of one element.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementModel {
    Battery(Battery),
    Resistor(Resistor),
    Lightbulb(Lightbulb),
    Led(Led),
    Potentiometer(Potentiometer),
    Multimeter(Multimeter),
    Board(Board),
    UltrasonicSensor(UltrasonicSensor),
    /// Element type the solver does not know; contributes nothing.
    Unmodeled,
}

impl ElementModel {
    /// Build the model of a graph element from its kind and configuration.
    pub fn from_element(element: &GraphElement) -> Self {
        let nodes = &element.nodes;
        let config = &element.config;
        match element.kind {
            ElementKind::Battery => Self::Battery(Battery::from_config([nodes[0], nodes[1]], config)),
            ElementKind::Resistor => {
                Self::Resistor(Resistor::from_config([nodes[0], nodes[1]], config))
            }
            ElementKind::Lightbulb => {
                Self::Lightbulb(Lightbulb::from_config([nodes[0], nodes[1]], config))
            }
            ElementKind::Led => Self::Led(Led::from_config([nodes[0], nodes[1]], config)),
            ElementKind::Potentiometer => Self::Potentiometer(Potentiometer::from_config(
                [nodes[0], nodes[1], nodes[2]],
                config,
            )),
            ElementKind::Multimeter => {
                Self::Multimeter(Multimeter::from_config([nodes[0], nodes[1]], config))
            }
            ElementKind::Microbit => {
                Self::Board(Board::from_config(BoardVariant::Microbit, nodes.clone(), config))
            }
            ElementKind::MicrobitWithBreakout => {
                Self::Board(Board::from_config(BoardVariant::Breakout, nodes.clone(), config))
            }
            ElementKind::UltrasonicSensor => Self::UltrasonicSensor(UltrasonicSensor::from_config(
                [nodes[0], nodes[1], nodes[2], nodes[3]],
                config,
            )),
            ElementKind::Unknown(_) => Self::Unmodeled,
        }
    }

    /// Electrical contribution for the current state.
    pub fn stamps(&self) -> Vec<Stamp> {
        match self {
            ElementModel::Battery(b) => vec![b.stamp()],
            ElementModel::Resistor(r) => vec![r.stamp()],
            ElementModel::Lightbulb(l) => vec![l.stamp()],
            ElementModel::Led(d) => d.stamp().into_iter().collect(),
            ElementModel::Potentiometer(p) => p.stamps().to_vec(),
            ElementModel::Multimeter(m) => m.stamp().into_iter().collect(),
            ElementModel::Board(b) => vec![b.stamp()],
            ElementModel::UltrasonicSensor(s) => vec![s.stamp()],
            ElementModel::Unmodeled => Vec::new(),
        }
    }

    /// Terminal pair whose potential difference is the element's voltage.
    pub fn voltage_terminals(&self) -> Option<(usize, usize)> {
        match self {
            ElementModel::Battery(_)
            | ElementModel::Resistor(_)
            | ElementModel::Lightbulb(_)
            | ElementModel::Led(_)
            | ElementModel::Multimeter(_) => Some((0, 1)),
            ElementModel::Potentiometer(_) => Some((0, 2)),
            ElementModel::Board(b) => Some((b.supply_terminal(), b.ground_terminal())),
            ElementModel::UltrasonicSensor(_) => Some((0, 3)),
            ElementModel::Unmodeled => None,
        }
    }

    /// Display state from the solved operating point. Pure.
    pub fn derive(&self, obs: &Observation<'_>) -> DisplayState {
        match self {
            ElementModel::Battery(_) | ElementModel::Resistor(_) => DisplayState::Basic,
            ElementModel::Lightbulb(l) => DisplayState::Lightbulb {
                brightness: l.brightness(obs.current),
            },
            ElementModel::Led(d) => DisplayState::Led {
                brightness: d.brightness(obs.current),
                lit: d.is_lit(obs.voltage, obs.current),
            },
            ElementModel::Potentiometer(p) => DisplayState::Potentiometer {
                ratio: p.ratio,
                leg_currents: [
                    obs.branch_currents.first().copied().unwrap_or(0.0),
                    obs.branch_currents.get(1).copied().unwrap_or(0.0),
                ],
            },
            ElementModel::Multimeter(m) => DisplayState::Multimeter {
                mode: m.mode,
                reading: m.read(obs),
            },
            ElementModel::Board(b) => DisplayState::Board {
                supply_voltage: obs.voltage,
                pins: b.pin_readings(obs.terminals),
            },
            ElementModel::UltrasonicSensor(s) => DisplayState::Sensor {
                powered: s.is_powered(obs.voltage),
            },
            ElementModel::Unmodeled => DisplayState::Unmodeled,
        }
    }

    pub fn is_unmodeled(&self) -> bool {
        matches!(self, ElementModel::Unmodeled)
    }

    /// Whether an ohmmeter reading through this element would be a guess.
    pub fn defeats_ohmmeter(&self) -> bool {
        matches!(self, ElementModel::Led(_) | ElementModel::Potentiometer(_))
    }

    pub fn as_multimeter(&self) -> Option<&Multimeter> {
        match self {
            ElementModel::Multimeter(m) => Some(m),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{ElementConfig, ElementId};

    fn element(kind: ElementKind, terminals: usize) -> GraphElement {
        GraphElement {
            id: ElementId::new("e"),
            kind,
            config: ElementConfig::new(),
            nodes: (0..terminals).map(NodeId).collect(),
        }
    }

    #[test]
    fn test_dispatch_covers_every_kind() {
        let kinds = [
            ElementKind::Battery,
            ElementKind::Resistor,
            ElementKind::Lightbulb,
            ElementKind::Led,
            ElementKind::Potentiometer,
            ElementKind::Multimeter,
            ElementKind::Microbit,
            ElementKind::MicrobitWithBreakout,
            ElementKind::UltrasonicSensor,
        ];
        for kind in kinds {
            let count = kind.terminal_count().unwrap();
            let model = ElementModel::from_element(&element(kind.clone(), count));
            assert!(!model.is_unmodeled(), "{kind} should be modeled");
            let (a, b) = model.voltage_terminals().unwrap();
            assert!(a < count && b < count);
        }
    }

    #[test]
    fn test_unknown_kind_is_unmodeled() {
        let model = ElementModel::from_element(&element(ElementKind::from("servo"), 1));
        assert!(model.is_unmodeled());
        assert!(model.stamps().is_empty());
        let obs = Observation {
            voltage: 0.0,
            current: 0.0,
            branch_currents: &[],
            terminals: &[],
            current_indeterminate: false,
            resistance: None,
        };
        assert_eq!(model.derive(&obs), DisplayState::Unmodeled);
    }

    #[test]
    fn test_source_flow_runs_negative_to_positive() {
        let stamp = Stamp::VoltageSource {
            pos: NodeId(3),
            neg: NodeId(5),
            emf: 1.0,
        };
        assert_eq!(stamp.flow_nodes(), (NodeId(5), NodeId(3)));
        assert!(stamp.is_source());
    }
}
