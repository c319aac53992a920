//! Microcontroller boards and peripherals: micro:bit and ultrasonic sensor.
//!
//! Program execution is outside the solver. A board is modeled as its
//! regulated supply between the 3V and GND pins; the I/O pins are
//! high-impedance inputs whose voltages are reported back for the program
//! runtime to read.

use serde::Serialize;

use crate::circuit::{ElementConfig, NodeId, BREAKOUT_TERMINALS, MICROBIT_TERMINALS};

use super::linear::resistive;
use super::{Stamp, TerminalPotential};

/// Which board layout is in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardVariant {
    Microbit,
    Breakout,
}

impl BoardVariant {
    pub fn terminal_names(self) -> &'static [&'static str] {
        match self {
            BoardVariant::Microbit => MICROBIT_TERMINALS,
            BoardVariant::Breakout => BREAKOUT_TERMINALS,
        }
    }
}

/// Voltage of one I/O pin relative to GND.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PinReading {
    pub pin: &'static str,
    /// `None` when the pin is not connected to anything sharing GND's reference.
    pub voltage: Option<f64>,
}

/// A micro:bit, bare or on a breakout board.
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    pub variant: BoardVariant,
    /// Terminal nodes; the last two are 3V and GND.
    pub nodes: Vec<NodeId>,
    pub supply_voltage: f64,
}

impl Board {
    pub const SUPPLY_VOLTAGE: f64 = 3.3;

    pub fn from_config(variant: BoardVariant, nodes: Vec<NodeId>, config: &ElementConfig) -> Self {
        debug_assert_eq!(nodes.len(), variant.terminal_names().len());
        Self {
            variant,
            nodes,
            supply_voltage: config.voltage.unwrap_or(Self::SUPPLY_VOLTAGE),
        }
    }

    /// Terminal index of the 3V pin.
    pub fn supply_terminal(&self) -> usize {
        self.nodes.len() - 2
    }

    /// Terminal index of the GND pin.
    pub fn ground_terminal(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn stamp(&self) -> Stamp {
        Stamp::VoltageSource {
            pos: self.nodes[self.supply_terminal()],
            neg: self.nodes[self.ground_terminal()],
            emf: self.supply_voltage,
        }
    }

    pub fn pin_readings(&self, terminals: &[TerminalPotential]) -> Vec<PinReading> {
        let ground = terminals[self.ground_terminal()];
        self.variant.terminal_names()[..self.supply_terminal()]
            .iter()
            .zip(terminals)
            .map(|(&pin, t)| PinReading {
                pin,
                voltage: (t.component == ground.component).then(|| t.potential - ground.potential),
            })
            .collect()
    }
}

/// An HC-SR04 style ultrasonic ranging module.
///
/// Electrically a resistive load between VCC and GND; TRIG and ECHO are
/// high-impedance.
#[derive(Debug, Clone, PartialEq)]
pub struct UltrasonicSensor {
    pub nodes: [NodeId; 4], // [VCC, TRIG, ECHO, GND]
    pub resistance: f64,
}

impl UltrasonicSensor {
    pub const DEFAULT_RESISTANCE: f64 = 330.0;
    /// Supply voltage below which the module does not operate.
    pub const MIN_SUPPLY_VOLTAGE: f64 = 3.0;

    pub fn from_config(nodes: [NodeId; 4], config: &ElementConfig) -> Self {
        Self {
            nodes,
            resistance: config.resistance.unwrap_or(Self::DEFAULT_RESISTANCE).max(0.0),
        }
    }

    pub fn stamp(&self) -> Stamp {
        resistive(self.nodes[0], self.nodes[3], self.resistance)
    }

    pub fn is_powered(&self, supply_voltage: f64) -> bool {
        supply_voltage >= Self::MIN_SUPPLY_VOLTAGE
    }
}
