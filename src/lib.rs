//! # Wirebench Core
//!
//! Live DC circuit solver for a breadboard-style circuit editor.
//!
//! This library provides:
//! - A serde snapshot format for the editor's elements and wires
//! - A graph builder that merges wired terminals into electrical nodes
//! - A Modified Nodal Analysis (MNA) based DC solver that tolerates short
//!   circuits, floating parts and unknown element types
//! - Behavior models deriving what each element shows (brightness, meter
//!   readings, board pin voltages)
//! - A session that re-solves on change and publishes results atomically
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`circuit`] - Snapshot, integrity checks and graph building
//! - [`components`] - Element models (batteries, resistors, LEDs, meters, boards)
//! - [`solver`] - Network reduction, MNA assembly and solving
//! - [`session`] - Change handling and result publication
//!
//! ## Usage
//!
//! ### Native CLI
//!
//! ```bash
//! wirebench circuit.json --format json
//! ```
//!
//! ### Library
//!
//! ```no_run
//! use wirebench_core::{ChangeEvent, CircuitSnapshot, Session, SolverConfig};
//!
//! let session = Session::new(SolverConfig::default())?;
//! let snapshot = CircuitSnapshot::from_json(r#"{"elements": [], "wires": []}"#)?;
//! session.notify(&ChangeEvent::SnapshotLoaded, snapshot);
//! let result = session.solve_pending();
//! println!("{} elements", result.elements.len());
//! # Ok::<(), wirebench_core::WirebenchError>(())
//! ```
//!
//! ### WASM
//!
//! ```javascript
//! import { WasmSession } from 'wirebench_core';
//!
//! const session = new WasmSession('{}');
//! session.notify('{"event": "snapshot_loaded"}', snapshotJson);
//! const result = JSON.parse(session.solve());
//! ```
//!
//! ## Circuit Solution Method
//!
//! For every change that can affect the circuit:
//!
//! 1. Merge wired terminals into nodes and collapse zero-resistance edges
//! 2. Assemble one MNA system per connected component and solve it with LU
//! 3. Re-classify LEDs as conducting or blocking and repeat until stable
//! 4. Recover currents through collapsed edges and derive display states

pub mod circuit;
pub mod components;
pub mod error;
pub mod session;
pub mod solver;

// Re-export main types for convenience
pub use circuit::{CircuitSnapshot, ElementId, ElementKind, Graph, TerminalRef};
pub use components::{DisplayState, Measurement};
pub use error::{Result, WirebenchError};
pub use session::{ChangeEvent, Cycle, Phase, Session, WorkerHandle};
pub use solver::{solve, ElementState, SolveResult, SolverConfig};

// WASM bindings
#[cfg(feature = "wasm")]
mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::WasmSession;
