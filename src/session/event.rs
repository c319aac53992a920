//! Editor change events.

use serde::{Deserialize, Serialize};

use crate::circuit::{ElementId, TerminalRef};

/// Something the editor changed.
///
/// Only topology and configuration changes affect the electrical solution;
/// the rest are presentational and never trigger a solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChangeEvent {
    ElementAdded { id: ElementId },
    ElementRemoved { id: ElementId },
    /// Resistance, voltage, ratio, mode or any other configuration field.
    ElementReconfigured { id: ElementId },
    WireAdded { from: TerminalRef, to: TerminalRef },
    WireRemoved { from: TerminalRef, to: TerminalRef },
    /// A whole circuit replaced the current one.
    SnapshotLoaded,
    ElementMoved { id: ElementId },
    WireRerouted { from: TerminalRef, to: TerminalRef },
    ViewportChanged,
    SelectionChanged,
}

impl ChangeEvent {
    /// Whether the event can change any potential or current.
    pub fn affects_solution(&self) -> bool {
        match self {
            ChangeEvent::ElementAdded { .. }
            | ChangeEvent::ElementRemoved { .. }
            | ChangeEvent::ElementReconfigured { .. }
            | ChangeEvent::WireAdded { .. }
            | ChangeEvent::WireRemoved { .. }
            | ChangeEvent::SnapshotLoaded => true,
            ChangeEvent::ElementMoved { .. }
            | ChangeEvent::WireRerouted { .. }
            | ChangeEvent::ViewportChanged
            | ChangeEvent::SelectionChanged => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presentational_events_do_not_affect_solution() {
        assert!(!ChangeEvent::ElementMoved { id: "r1".into() }.affects_solution());
        assert!(!ChangeEvent::ViewportChanged.affects_solution());
        assert!(ChangeEvent::ElementReconfigured { id: "r1".into() }.affects_solution());
        assert!(ChangeEvent::SnapshotLoaded.affects_solution());
    }

    #[test]
    fn test_event_from_json() {
        let event: ChangeEvent = serde_json::from_str(
            r#"{"event": "wire_added",
                "from": {"element": "b1", "terminal": 0},
                "to": {"element": "r1", "terminal": 1}}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ChangeEvent::WireAdded {
                from: TerminalRef::new("b1", 0),
                to: TerminalRef::new("r1", 1),
            }
        );
        let event: ChangeEvent = serde_json::from_str(r#"{"event": "selection_changed"}"#).unwrap();
        assert_eq!(event, ChangeEvent::SelectionChanged);
    }
}
