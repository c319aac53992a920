//! LED model.
//!
//! The LED is treated as an ideal diode in series with its forward
//! resistance:
//!
//! ```text
//!   conducting:  anode ----[R]---- cathode
//!   blocking:    anode ----    ---- cathode   (open, zero reverse current)
//! ```
//!
//! Which state applies depends on the rest of the circuit, so the solver
//! iterates: solve, re-classify every LED from its solved current or voltage,
//! and solve again until no LED changes state.

use crate::circuit::{ElementConfig, NodeId};

use super::linear::{brightness, dissipated_power, resistive};
use super::Stamp;

/// A light-emitting diode.
#[derive(Debug, Clone, PartialEq)]
pub struct Led {
    pub nodes: [NodeId; 2], // [anode, cathode]
    pub resistance: f64,
    /// Voltage at or above which the LED reports itself lit.
    pub forward_voltage: f64,
    pub rated_power: f64,
    /// Current switching state. LEDs start out conducting.
    pub conducting: bool,
}

impl Led {
    pub const DEFAULT_RESISTANCE: f64 = 100.0;
    pub const DEFAULT_FORWARD_VOLTAGE: f64 = 2.0;
    pub const DEFAULT_RATED_POWER: f64 = 0.05;

    pub fn from_config(nodes: [NodeId; 2], config: &ElementConfig) -> Self {
        Self {
            nodes,
            resistance: config.resistance.unwrap_or(Self::DEFAULT_RESISTANCE).max(0.0),
            forward_voltage: config
                .forward_voltage
                .unwrap_or(Self::DEFAULT_FORWARD_VOLTAGE),
            rated_power: config.rated_power.unwrap_or(Self::DEFAULT_RATED_POWER),
            conducting: true,
        }
    }

    pub fn anode(&self) -> NodeId {
        self.nodes[0]
    }

    pub fn cathode(&self) -> NodeId {
        self.nodes[1]
    }

    /// Stamp for the current switching state; nothing when blocking.
    pub fn stamp(&self) -> Option<Stamp> {
        self.conducting
            .then(|| resistive(self.anode(), self.cathode(), self.resistance))
    }

    /// Decide the next switching state from a solved operating point.
    ///
    /// `current` is the anode-to-cathode current while conducting and
    /// `voltage` the anode-to-cathode voltage. Returns `true` if the state
    /// changed.
    pub fn update_state(&mut self, voltage: f64, current: f64, tolerance: f64) -> bool {
        let next = if self.conducting {
            current >= -tolerance
        } else {
            voltage > tolerance
        };
        let changed = next != self.conducting;
        self.conducting = next;
        changed
    }

    pub fn brightness(&self, current: f64) -> f64 {
        if !self.conducting || current <= 0.0 {
            return 0.0;
        }
        brightness(dissipated_power(current, self.resistance), self.rated_power)
    }

    pub fn is_lit(&self, voltage: f64, current: f64) -> bool {
        self.conducting && current > 0.0 && voltage >= self.forward_voltage
    }
}
