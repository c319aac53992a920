//! Immutable editor snapshot: the `(elements, wires)` pair the solver reads.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::types::{ElementId, TerminalRef};
use crate::error::{Result, WirebenchError};

/// The kind of a placed element.
///
/// Type strings the editor sends but the core does not know are kept as
/// [`ElementKind::Unknown`] so the element can be reported as unmodeled.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ElementKind {
    Lightbulb,
    Battery,
    Resistor,
    Multimeter,
    Potentiometer,
    Led,
    Microbit,
    MicrobitWithBreakout,
    UltrasonicSensor,
    Unknown(String),
}

/// Terminal names of a micro:bit without breakout.
pub const MICROBIT_TERMINALS: &[&str] = &["P0", "P1", "P2", "3V", "GND"];

/// Terminal names of a micro:bit mounted on a breakout board.
pub const BREAKOUT_TERMINALS: &[&str] = &[
    "P0", "P1", "P2", "P3", "P4", "P5", "P6", "P7", "P8", "P9", "P10", "P11", "P12", "P13",
    "P14", "P15", "P16", "P19", "P20", "3V", "GND",
];

impl ElementKind {
    pub fn as_str(&self) -> &str {
        match self {
            ElementKind::Lightbulb => "lightbulb",
            ElementKind::Battery => "battery",
            ElementKind::Resistor => "resistor",
            ElementKind::Multimeter => "multimeter",
            ElementKind::Potentiometer => "potentiometer",
            ElementKind::Led => "led",
            ElementKind::Microbit => "microbit",
            ElementKind::MicrobitWithBreakout => "microbit-with-breakout",
            ElementKind::UltrasonicSensor => "ultrasonic-sensor",
            ElementKind::Unknown(name) => name,
        }
    }

    /// Names of the element's terminals, in terminal-index order.
    ///
    /// Returns `None` for unknown kinds, whose terminal count is inferred from
    /// the wires that reference them.
    pub fn terminal_names(&self) -> Option<&'static [&'static str]> {
        let names: &'static [&'static str] = match self {
            ElementKind::Battery => &["+", "-"],
            ElementKind::Resistor | ElementKind::Lightbulb => &["1", "2"],
            ElementKind::Led => &["anode", "cathode"],
            ElementKind::Multimeter => &["probe", "com"],
            ElementKind::Potentiometer => &["a", "wiper", "b"],
            ElementKind::Microbit => MICROBIT_TERMINALS,
            ElementKind::MicrobitWithBreakout => BREAKOUT_TERMINALS,
            ElementKind::UltrasonicSensor => &["VCC", "TRIG", "ECHO", "GND"],
            ElementKind::Unknown(_) => return None,
        };
        Some(names)
    }

    /// Number of terminals, when the kind is known.
    pub fn terminal_count(&self) -> Option<usize> {
        self.terminal_names().map(<[_]>::len)
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, ElementKind::Unknown(_))
    }
}

impl From<String> for ElementKind {
    fn from(name: String) -> Self {
        match name.as_str() {
            "lightbulb" => ElementKind::Lightbulb,
            "battery" => ElementKind::Battery,
            "resistor" => ElementKind::Resistor,
            "multimeter" => ElementKind::Multimeter,
            "potentiometer" => ElementKind::Potentiometer,
            "led" => ElementKind::Led,
            "microbit" => ElementKind::Microbit,
            "microbit-with-breakout" => ElementKind::MicrobitWithBreakout,
            "ultrasonic-sensor" => ElementKind::UltrasonicSensor,
            _ => ElementKind::Unknown(name),
        }
    }
}

impl From<&str> for ElementKind {
    fn from(name: &str) -> Self {
        ElementKind::from(name.to_string())
    }
}

impl From<ElementKind> for String {
    fn from(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Unknown(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a multimeter measures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeterMode {
    #[default]
    Voltage,
    Current,
    Resistance,
}

/// Type-dependent configuration of an element.
///
/// Every field is optional; absent fields fall back to the element type's
/// defaults when the element model is built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementConfig {
    /// Resistance in ohms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resistance: Option<f64>,
    /// Source electromotive force in volts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
    /// Wiper position of a potentiometer, 0.0 to 1.0.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<f64>,
    /// Measurement mode of a multimeter.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<MeterMode>,
    /// Series resistance of a battery in ohms.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_resistance: Option<f64>,
    /// LED on/off threshold in volts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forward_voltage: Option<f64>,
    /// Power in watts at which a lamp reaches full brightness.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rated_power: Option<f64>,
}

impl ElementConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resistance(mut self, ohms: f64) -> Self {
        self.resistance = Some(ohms);
        self
    }

    pub fn with_voltage(mut self, volts: f64) -> Self {
        self.voltage = Some(volts);
        self
    }

    pub fn with_ratio(mut self, ratio: f64) -> Self {
        self.ratio = Some(ratio);
        self
    }

    pub fn with_mode(mut self, mode: MeterMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_internal_resistance(mut self, ohms: f64) -> Self {
        self.internal_resistance = Some(ohms);
        self
    }

    pub fn with_forward_voltage(mut self, volts: f64) -> Self {
        self.forward_voltage = Some(volts);
        self
    }

    pub fn with_rated_power(mut self, watts: f64) -> Self {
        self.rated_power = Some(watts);
        self
    }
}

/// An element placed on the canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub id: ElementId,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    /// Canvas position. Presentation only, never read by the solver.
    #[serde(default)]
    pub position: [f64; 2],
    #[serde(default)]
    pub config: ElementConfig,
}

impl Element {
    pub fn new(id: impl Into<ElementId>, kind: ElementKind, config: ElementConfig) -> Self {
        Self {
            id: id.into(),
            kind,
            position: [0.0, 0.0],
            config,
        }
    }
}

/// A wire between two terminals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wire {
    pub from: TerminalRef,
    pub to: TerminalRef,
    /// Routing points. Presentation only.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub waypoints: Vec<[f64; 2]>,
}

impl Wire {
    pub fn new(from: TerminalRef, to: TerminalRef) -> Self {
        Self {
            from,
            to,
            waypoints: Vec::new(),
        }
    }
}

/// A point-in-time copy of the editor's element and wire collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CircuitSnapshot {
    #[serde(default)]
    pub elements: Vec<Element>,
    #[serde(default)]
    pub wires: Vec<Wire>,
}

impl CircuitSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a snapshot from its JSON form.
    pub fn from_json(input: &str) -> Result<Self> {
        serde_json::from_str(input).map_err(|source| WirebenchError::SnapshotFormat { source })
    }

    /// Read a snapshot from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| WirebenchError::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|source| WirebenchError::SnapshotFormat { source })
    }

    /// Add an element and return `self` for chaining.
    pub fn add(
        &mut self,
        id: impl Into<ElementId>,
        kind: impl Into<ElementKind>,
        config: ElementConfig,
    ) -> &mut Self {
        self.elements.push(Element::new(id, kind.into(), config));
        self
    }

    /// Wire terminal `a_terminal` of `a` to terminal `b_terminal` of `b`.
    pub fn connect(
        &mut self,
        a: impl Into<ElementId>,
        a_terminal: usize,
        b: impl Into<ElementId>,
        b_terminal: usize,
    ) -> &mut Self {
        self.wires.push(Wire::new(
            TerminalRef::new(a, a_terminal),
            TerminalRef::new(b, b_terminal),
        ));
        self
    }

    pub fn element(&self, id: &ElementId) -> Option<&Element> {
        self.elements.iter().find(|e| &e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_kind_round_trips_its_name() {
        let kind = ElementKind::from("flux-capacitor");
        assert_eq!(kind, ElementKind::Unknown("flux-capacitor".to_string()));
        assert_eq!(String::from(kind), "flux-capacitor");
        assert_eq!(ElementKind::from("microbit-with-breakout"), ElementKind::MicrobitWithBreakout);
    }

    #[test]
    fn test_terminal_counts() {
        assert_eq!(ElementKind::Battery.terminal_count(), Some(2));
        assert_eq!(ElementKind::Potentiometer.terminal_count(), Some(3));
        assert_eq!(ElementKind::Microbit.terminal_count(), Some(5));
        assert_eq!(ElementKind::MicrobitWithBreakout.terminal_count(), Some(21));
        assert_eq!(ElementKind::Unknown("x".into()).terminal_count(), None);
    }

    #[test]
    fn test_parse_snapshot_json() {
        let json = r#"{
            "elements": [
                {"id": "b1", "type": "battery", "position": [10, 20], "config": {"voltage": 9}},
                {"id": "m1", "type": "multimeter", "config": {"mode": "current"}},
                {"id": "z1", "type": "servo"}
            ],
            "wires": [
                {"from": {"element": "b1", "terminal": 0},
                 "to": {"element": "m1", "terminal": 0},
                 "waypoints": [[1, 2]]}
            ]
        }"#;
        let snapshot = CircuitSnapshot::from_json(json).unwrap();
        assert_eq!(snapshot.elements.len(), 3);
        assert_eq!(snapshot.elements[0].config.voltage, Some(9.0));
        assert_eq!(snapshot.elements[1].config.mode, Some(MeterMode::Current));
        assert!(snapshot.elements[2].kind.is_unknown());
        assert_eq!(snapshot.wires[0].waypoints, vec![[1.0, 2.0]]);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let err = CircuitSnapshot::from_json("{\"elements\": 3}").unwrap_err();
        assert!(matches!(err, WirebenchError::SnapshotFormat { .. }));
    }
}
