//! Multimeter model.
//!
//! The meter never perturbs the circuit in voltage or resistance mode: it
//! contributes no stamp at all and is read afterwards. In current mode it is
//! a zero-resistance edge between its probes.

use serde::Serialize;

use crate::circuit::{ElementConfig, MeterMode, NodeId};

use super::{Observation, Stamp};

/// Value shown on an instrument display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "unit", content = "value", rename_all = "snake_case")]
pub enum Measurement {
    Volts(f64),
    Amps(f64),
    Ohms(f64),
    /// No conducting path between the probes ("OL" on a real meter).
    Open,
    /// The topology does not allow a meaningful reading. Distinct from zero.
    Indeterminate,
}

impl Measurement {
    pub fn value(&self) -> Option<f64> {
        match *self {
            Measurement::Volts(v) | Measurement::Amps(v) | Measurement::Ohms(v) => Some(v),
            Measurement::Open | Measurement::Indeterminate => None,
        }
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Measurement::Indeterminate)
    }
}

/// A two-probe multimeter.
#[derive(Debug, Clone, PartialEq)]
pub struct Multimeter {
    pub nodes: [NodeId; 2], // [probe, com]
    pub mode: MeterMode,
}

impl Multimeter {
    pub fn from_config(nodes: [NodeId; 2], config: &ElementConfig) -> Self {
        Self {
            nodes,
            mode: config.mode.unwrap_or_default(),
        }
    }

    pub fn probe(&self) -> NodeId {
        self.nodes[0]
    }

    pub fn com(&self) -> NodeId {
        self.nodes[1]
    }

    /// Ammeter edge in current mode, nothing otherwise.
    pub fn stamp(&self) -> Option<Stamp> {
        (self.mode == MeterMode::Current).then_some(Stamp::Short {
            a: self.probe(),
            b: self.com(),
        })
    }

    /// Reading for the solved circuit.
    pub fn read(&self, obs: &Observation<'_>) -> Measurement {
        match self.mode {
            MeterMode::Voltage => {
                // Potentials of unrelated components share no reference.
                if obs.terminals[0].component == obs.terminals[1].component {
                    Measurement::Volts(obs.voltage)
                } else {
                    Measurement::Indeterminate
                }
            }
            MeterMode::Current => {
                if obs.current_indeterminate {
                    Measurement::Indeterminate
                } else {
                    Measurement::Amps(obs.current)
                }
            }
            MeterMode::Resistance => obs.resistance.unwrap_or(Measurement::Indeterminate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::TerminalPotential;

    fn observe<'a>(terminals: &'a [TerminalPotential], voltage: f64) -> Observation<'a> {
        Observation {
            voltage,
            current: 0.0,
            branch_currents: &[],
            terminals,
            current_indeterminate: false,
            resistance: None,
        }
    }

    #[test]
    fn test_voltage_mode_has_no_stamp() {
        let m = Multimeter::from_config([NodeId(0), NodeId(1)], &ElementConfig::new());
        assert_eq!(m.mode, MeterMode::Voltage);
        assert!(m.stamp().is_none());
    }

    #[test]
    fn test_voltage_across_components_is_indeterminate() {
        let m = Multimeter::from_config([NodeId(0), NodeId(1)], &ElementConfig::new());
        let same = [
            TerminalPotential { potential: 3.0, component: 0 },
            TerminalPotential { potential: 1.0, component: 0 },
        ];
        assert_eq!(m.read(&observe(&same, 2.0)), Measurement::Volts(2.0));

        let apart = [
            TerminalPotential { potential: 3.0, component: 0 },
            TerminalPotential { potential: 0.0, component: 4 },
        ];
        assert_eq!(m.read(&observe(&apart, 3.0)), Measurement::Indeterminate);
    }

    #[test]
    fn test_resistance_defaults_to_indeterminate() {
        let config = ElementConfig::new().with_mode(MeterMode::Resistance);
        let m = Multimeter::from_config([NodeId(0), NodeId(1)], &config);
        let t = [
            TerminalPotential { potential: 0.0, component: 0 },
            TerminalPotential { potential: 0.0, component: 0 },
        ];
        assert_eq!(m.read(&observe(&t, 0.0)), Measurement::Indeterminate);
    }
}
