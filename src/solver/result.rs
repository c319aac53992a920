//! Published solve results.

use std::collections::HashMap;

use serde::Serialize;

use crate::circuit::{ElementId, ElementKind, IntegrityWarning, NodeId};
use crate::components::DisplayState;
use crate::error::{Result, WirebenchError};

/// Per-element fault and modeling flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ElementFlags {
    /// Source current was clipped to the configured short-circuit maximum.
    pub shorted: bool,
    /// Element type has no electrical model.
    pub unmodeled: bool,
    /// Current or reading could not be determined from the topology.
    pub indeterminate: bool,
}

/// Solved state of one element.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElementState {
    pub id: ElementId,
    #[serde(rename = "type")]
    pub kind: ElementKind,
    /// Node of every terminal.
    pub nodes: Vec<NodeId>,
    /// Voltage across the element's primary terminal pair.
    pub voltage: f64,
    /// Current through the element's primary part.
    pub current: f64,
    pub display: DisplayState,
    pub flags: ElementFlags,
}

/// Current flowing from one node to another through one branch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Flow {
    pub from: NodeId,
    pub to: NodeId,
    pub current: f64,
}

/// Outcome of a KCL check over a [`SolveResult`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KclReport {
    /// Worst net node current, relative to the largest branch current.
    pub residual: f64,
    /// Node with the worst residual; `None` for a circuit without nodes.
    pub node: Option<NodeId>,
    pub tolerance: f64,
}

impl KclReport {
    pub fn passed(&self) -> bool {
        self.residual <= self.tolerance
    }
}

/// A complete, immutable solve result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolveResult {
    /// Session revision this result was computed for.
    pub revision: u64,
    /// Potential of every node, indexed by [`NodeId`].
    pub potentials: Vec<f64>,
    pub elements: Vec<ElementState>,
    pub warnings: Vec<IntegrityWarning>,
    /// Solve passes used while settling LED states.
    pub iterations: usize,
    pub converged: bool,
    #[serde(skip)]
    pub(crate) flows: Vec<Flow>,
    #[serde(skip)]
    pub(crate) index: HashMap<ElementId, usize>,
}

impl SolveResult {
    /// Result of an empty circuit, published before the first solve.
    pub fn empty() -> Self {
        Self {
            revision: 0,
            potentials: Vec::new(),
            elements: Vec::new(),
            warnings: Vec::new(),
            iterations: 0,
            converged: true,
            flows: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn element(&self, id: &ElementId) -> Option<&ElementState> {
        self.index.get(id).map(|&i| &self.elements[i])
    }

    /// Like [`SolveResult::element`], but missing ids are an error.
    pub fn element_state(&self, id: &ElementId) -> Result<&ElementState> {
        self.element(id)
            .ok_or_else(|| WirebenchError::element_not_found(id))
    }

    pub fn potential(&self, node: NodeId) -> Option<f64> {
        self.potentials.get(node.0).copied()
    }

    /// Elements flagged shorted.
    pub fn shorted(&self) -> impl Iterator<Item = &ElementState> {
        self.elements.iter().filter(|e| e.flags.shorted)
    }

    /// Check Kirchhoff's current law at every node.
    pub fn check_kcl(&self, tolerance: f64) -> KclReport {
        let mut net = vec![0.0f64; self.potentials.len()];
        let mut scale = f64::MIN_POSITIVE;
        for flow in &self.flows {
            net[flow.from.0] -= flow.current;
            net[flow.to.0] += flow.current;
            scale = scale.max(flow.current.abs());
        }

        let mut residual = 0.0;
        let mut node = None;
        for (i, value) in net.iter().enumerate() {
            let relative = value.abs() / scale;
            if node.is_none() || relative > residual {
                residual = relative;
                node = Some(NodeId(i));
            }
        }
        KclReport {
            residual,
            node,
            tolerance,
        }
    }
}

impl Default for SolveResult {
    fn default() -> Self {
        Self::empty()
    }
}
