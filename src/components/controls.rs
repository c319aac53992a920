//! Control elements: Potentiometer.

use crate::circuit::{ElementConfig, NodeId};

use super::linear::resistive;
use super::Stamp;

/// A potentiometer.
///
/// Modeled as two resistors in series with a wiper tap:
///   a ----[R1]---- wiper ----[R2]---- b
///
/// where R1 = ratio * resistance
/// and   R2 = (1 - ratio) * resistance
///
/// A leg of zero resistance is a direct short, so ratio 0 and ratio 1 are
/// exact rather than approximated.
#[derive(Debug, Clone, PartialEq)]
pub struct Potentiometer {
    pub nodes: [NodeId; 3], // [a, wiper, b]
    pub resistance: f64,
    /// Wiper position from 0.0 (at a) to 1.0 (at b)
    pub ratio: f64,
}

impl Potentiometer {
    pub const DEFAULT_RESISTANCE: f64 = 10_000.0;
    pub const DEFAULT_RATIO: f64 = 0.5;

    pub fn new(nodes: [NodeId; 3], resistance: f64, ratio: f64) -> Self {
        Self {
            nodes,
            resistance: resistance.max(0.0),
            ratio: ratio.clamp(0.0, 1.0),
        }
    }

    pub fn from_config(nodes: [NodeId; 3], config: &ElementConfig) -> Self {
        Self::new(
            nodes,
            config.resistance.unwrap_or(Self::DEFAULT_RESISTANCE),
            config.ratio.unwrap_or(Self::DEFAULT_RATIO),
        )
    }

    /// Resistance from a to wiper.
    pub fn r1(&self) -> f64 {
        self.ratio * self.resistance
    }

    /// Resistance from wiper to b.
    pub fn r2(&self) -> f64 {
        (1.0 - self.ratio) * self.resistance
    }

    pub fn a(&self) -> NodeId {
        self.nodes[0]
    }

    pub fn wiper(&self) -> NodeId {
        self.nodes[1]
    }

    pub fn b(&self) -> NodeId {
        self.nodes[2]
    }

    /// Stamps for both legs, a-wiper first.
    pub fn stamps(&self) -> [Stamp; 2] {
        [
            resistive(self.a(), self.wiper(), self.r1()),
            resistive(self.wiper(), self.b(), self.r2()),
        ]
    }
}
