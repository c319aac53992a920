//! WASM bindings for Wirebench Core.
//!
//! This module provides JavaScript-friendly bindings for the browser editor.
//! Everything crosses the boundary as JSON strings.
//!
//! ## Usage (JavaScript)
//!
//! ```javascript
//! import init, { WasmSession } from 'wirebench_core';
//!
//! await init();
//!
//! const session = new WasmSession('{"max_short_current": 5}');
//!
//! // On every editor change:
//! if (session.notify(JSON.stringify(event), JSON.stringify(snapshot))) {
//!   const result = JSON.parse(session.solve());
//!   redraw(result);
//! }
//! ```

use wasm_bindgen::prelude::*;

use crate::circuit::{CircuitSnapshot, ElementId};
use crate::error::WirebenchError;
use crate::session::{ChangeEvent, Session};
use crate::solver::SolverConfig;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

fn to_js(error: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn wasm_error(message: impl std::fmt::Display) -> JsValue {
    to_js(WirebenchError::WasmError {
        message: message.to_string(),
    })
}

/// WASM-compatible solver session.
///
/// The browser has no worker threads here, so results are computed on
/// demand by [`WasmSession::solve`].
#[wasm_bindgen]
pub struct WasmSession {
    session: Session,
}

#[wasm_bindgen]
impl WasmSession {
    /// Create a session from a JSON `SolverConfig`; missing fields use defaults.
    ///
    /// # Example
    /// ```javascript
    /// const session = new WasmSession('{}');
    /// ```
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> Result<WasmSession, JsValue> {
        let config: SolverConfig = if config_json.trim().is_empty() {
            SolverConfig::default()
        } else {
            serde_json::from_str(config_json).map_err(wasm_error)?
        };
        let session = Session::new(config).map_err(to_js)?;
        Ok(WasmSession { session })
    }

    /// Report an editor change with the editor's current snapshot.
    ///
    /// Returns `true` when the change needs a re-solve.
    #[wasm_bindgen]
    pub fn notify(&self, event_json: &str, snapshot_json: &str) -> Result<bool, JsValue> {
        let event: ChangeEvent = serde_json::from_str(event_json).map_err(wasm_error)?;
        if !event.affects_solution() {
            return Ok(false);
        }
        let snapshot = CircuitSnapshot::from_json(snapshot_json).map_err(to_js)?;
        Ok(self.session.notify(&event, snapshot).is_some())
    }

    /// Solve any pending change and return the published result as JSON.
    #[wasm_bindgen]
    pub fn solve(&self) -> Result<String, JsValue> {
        let result = self.session.solve_pending();
        serde_json::to_string(&*result).map_err(wasm_error)
    }

    /// State of one element in the published result, as JSON.
    #[wasm_bindgen]
    pub fn element_state(&self, id: &str) -> Result<String, JsValue> {
        let state = self
            .session
            .element_state(&ElementId::new(id))
            .map_err(to_js)?;
        serde_json::to_string(&state).map_err(wasm_error)
    }

    /// Revision of the latest solution-affecting change.
    #[wasm_bindgen(getter)]
    pub fn revision(&self) -> u64 {
        self.session.revision()
    }
}

/// Get the library version.
#[wasm_bindgen]
pub fn version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}
