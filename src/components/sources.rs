//! Voltage sources: batteries.

use crate::circuit::{ElementConfig, NodeId};

use super::Stamp;

/// A battery.
///
/// With no internal resistance the battery is an ideal voltage source and
/// needs an extra branch-current row in the MNA system. A positive internal
/// resistance is folded in as the Norton equivalent instead: a current source
/// `emf / r` in parallel with conductance `1 / r`.
#[derive(Debug, Clone, PartialEq)]
pub struct Battery {
    pub nodes: [NodeId; 2], // [positive, negative]
    pub emf: f64,
    pub internal_resistance: f64,
}

impl Battery {
    pub const DEFAULT_VOLTAGE: f64 = 9.0;

    pub fn new(nodes: [NodeId; 2], emf: f64, internal_resistance: f64) -> Self {
        Self {
            nodes,
            emf,
            internal_resistance: internal_resistance.max(0.0),
        }
    }

    pub fn from_config(nodes: [NodeId; 2], config: &ElementConfig) -> Self {
        Self::new(
            nodes,
            config.voltage.unwrap_or(Self::DEFAULT_VOLTAGE),
            config.internal_resistance.unwrap_or(0.0),
        )
    }

    pub fn is_ideal(&self) -> bool {
        !(1.0 / self.internal_resistance).is_finite()
    }

    pub fn stamp(&self) -> Stamp {
        let [pos, neg] = self.nodes;
        if self.is_ideal() {
            Stamp::VoltageSource {
                pos,
                neg,
                emf: self.emf,
            }
        } else {
            Stamp::Norton {
                pos,
                neg,
                emf: self.emf,
                resistance: self.internal_resistance,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ideal_battery_is_voltage_source() {
        let b = Battery::from_config([NodeId(0), NodeId(1)], &ElementConfig::new());
        assert!(b.is_ideal());
        assert_eq!(
            b.stamp(),
            Stamp::VoltageSource {
                pos: NodeId(0),
                neg: NodeId(1),
                emf: 9.0
            }
        );
    }

    #[test]
    fn test_internal_resistance_gives_norton_stamp() {
        let config = ElementConfig::new().with_voltage(1.5).with_internal_resistance(0.5);
        let b = Battery::from_config([NodeId(2), NodeId(3)], &config);
        assert!(!b.is_ideal());
        assert!(matches!(b.stamp(), Stamp::Norton { emf, resistance, .. } if emf == 1.5 && resistance == 0.5));
    }
}
