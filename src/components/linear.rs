//! Linear passive elements: Resistor and Lightbulb.

use crate::circuit::{ElementConfig, NodeId};

use super::Stamp;

/// Stamp for a resistance between two nodes.
///
/// A resistance of exactly zero (or one so small its conductance overflows)
/// is a direct short rather than an infinite conductance.
pub fn resistive(a: NodeId, b: NodeId, resistance: f64) -> Stamp {
    let conductance = 1.0 / resistance;
    if resistance <= 0.0 || !conductance.is_finite() {
        Stamp::Short { a, b }
    } else {
        Stamp::Conductance { a, b, conductance }
    }
}

/// Power dissipated in a resistance carrying `current`.
pub fn dissipated_power(current: f64, resistance: f64) -> f64 {
    current * current * resistance
}

/// A fixed resistor.
#[derive(Debug, Clone, PartialEq)]
pub struct Resistor {
    pub nodes: [NodeId; 2],
    pub resistance: f64,
}

impl Resistor {
    pub const DEFAULT_RESISTANCE: f64 = 1000.0;

    pub fn new(nodes: [NodeId; 2], resistance: f64) -> Self {
        Self {
            nodes,
            resistance: resistance.max(0.0),
        }
    }

    pub fn from_config(nodes: [NodeId; 2], config: &ElementConfig) -> Self {
        Self::new(nodes, config.resistance.unwrap_or(Self::DEFAULT_RESISTANCE))
    }

    pub fn stamp(&self) -> Stamp {
        resistive(self.nodes[0], self.nodes[1], self.resistance)
    }
}

/// An incandescent lamp, modeled as its filament resistance.
///
/// Brightness is the dissipated power relative to the rated power, clamped
/// to [0, 1].
#[derive(Debug, Clone, PartialEq)]
pub struct Lightbulb {
    pub nodes: [NodeId; 2],
    pub resistance: f64,
    pub rated_power: f64,
}

impl Lightbulb {
    pub const DEFAULT_RESISTANCE: f64 = 10.0;
    pub const DEFAULT_RATED_POWER: f64 = 1.0;

    pub fn from_config(nodes: [NodeId; 2], config: &ElementConfig) -> Self {
        Self {
            nodes,
            resistance: config.resistance.unwrap_or(Self::DEFAULT_RESISTANCE).max(0.0),
            rated_power: config.rated_power.unwrap_or(Self::DEFAULT_RATED_POWER),
        }
    }

    pub fn stamp(&self) -> Stamp {
        resistive(self.nodes[0], self.nodes[1], self.resistance)
    }

    pub fn brightness(&self, current: f64) -> f64 {
        brightness(dissipated_power(current, self.resistance), self.rated_power)
    }
}

/// Normalised brightness of a lamp dissipating `power`.
pub fn brightness(power: f64, rated_power: f64) -> f64 {
    if rated_power <= 0.0 {
        return 0.0;
    }
    (power / rated_power).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resistor_conductance() {
        let r = Resistor::new([NodeId(1), NodeId(0)], 1000.0);
        match r.stamp() {
            Stamp::Conductance { conductance, .. } => assert!((conductance - 0.001).abs() < 1e-15),
            other => panic!("unexpected stamp {other:?}"),
        }
    }

    #[test]
    fn test_zero_resistance_is_a_short() {
        let r = Resistor::new([NodeId(1), NodeId(2)], 0.0);
        assert_eq!(
            r.stamp(),
            Stamp::Short {
                a: NodeId(1),
                b: NodeId(2)
            }
        );
        assert!(matches!(resistive(NodeId(0), NodeId(1), 1e-320), Stamp::Short { .. }));
    }

    #[test]
    fn test_brightness_is_monotonic_and_clamped() {
        let bulb = Lightbulb::from_config([NodeId(0), NodeId(1)], &ElementConfig::new());
        let dim = bulb.brightness(0.1);
        let bright = bulb.brightness(0.2);
        assert!(dim > 0.0 && bright > dim);
        assert_eq!(bulb.brightness(10.0), 1.0);
        assert_eq!(bulb.brightness(0.0), 0.0);
        // Direction of current does not matter.
        assert_eq!(bulb.brightness(-0.2), bright);
    }
}
