//! Solver configuration.

use serde::{Deserialize, Serialize};

use crate::error::{Result, WirebenchError};

use super::{DEFAULT_MAX_ITERATIONS, DEFAULT_MAX_SHORT_CURRENT, DEFAULT_SWITCHING_TOLERANCE};

/// Configuration for the network solver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Current reported for a shorted ideal source, in amperes.
    pub max_short_current: f64,
    /// Maximum solve passes while settling LED switching states.
    pub max_iterations: usize,
    /// Current/voltage margin used when re-classifying LEDs.
    pub switching_tolerance: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_short_current: DEFAULT_MAX_SHORT_CURRENT,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            switching_tolerance: DEFAULT_SWITCHING_TOLERANCE,
        }
    }
}

impl SolverConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the fault current reported for short circuits.
    pub fn with_max_short_current(mut self, amperes: f64) -> Self {
        self.max_short_current = amperes;
        self
    }

    /// Set the maximum number of LED switching passes.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the LED switching tolerance.
    pub fn with_switching_tolerance(mut self, tolerance: f64) -> Self {
        self.switching_tolerance = tolerance;
        self
    }

    /// Reject settings the solver cannot work with.
    pub fn validate(&self) -> Result<()> {
        if !(self.max_short_current.is_finite() && self.max_short_current > 0.0) {
            return Err(WirebenchError::invalid_config(format!(
                "max_short_current must be a positive finite number, got {}",
                self.max_short_current
            )));
        }
        if self.max_iterations == 0 {
            return Err(WirebenchError::invalid_config(
                "max_iterations must be at least 1",
            ));
        }
        if !(self.switching_tolerance.is_finite() && self.switching_tolerance >= 0.0) {
            return Err(WirebenchError::invalid_config(format!(
                "switching_tolerance must be a non-negative finite number, got {}",
                self.switching_tolerance
            )));
        }
        Ok(())
    }
}
