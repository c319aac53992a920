//! DC network solver.
//!
//! This module turns a [`Graph`] into node potentials and branch currents.
//!
//! ## Modified Nodal Analysis
//!
//! Each connected component is assembled into a system Ax = z where:
//! - x contains supernode voltages and ideal-source branch currents
//! - A is the conductance/coefficient matrix
//! - z is the source vector
//!
//! The matrix structure is:
//! ```text
//! [ G   B ] [ v ]   [ i ]
//! [ C   D ] [ j ] = [ e ]
//! ```
//!
//! where:
//! - G is the conductance matrix (node equations)
//! - B, C connect ideal voltage sources to nodes
//! - D is 0 (ideal voltage sources)
//! - v is the vector of supernode voltages
//! - j is the vector of voltage source currents
//! - i is the sum of Norton source currents into each node
//! - e is the vector of source EMFs
//!
//! ## Faults
//!
//! Zero-resistance edges are collapsed before assembly instead of being
//! stamped, so short circuits never make the system singular. Ideal sources
//! that end up shorted, or in parallel with a different EMF, are flagged and
//! report a clipped fault current. A loop of ideal sources whose EMFs cancel
//! is solved with one source left out of the matrix; its current is
//! reported as indeterminate. A loop with a net EMF, or any system that is
//! still singular, flags its sources and reads 0 V everywhere.

mod config;
mod dc;
mod mna;
mod network;
mod result;
mod switching;

use std::collections::HashMap;

use log::debug;

use crate::circuit::{ElementId, Graph, MeterMode};
use crate::components::{ElementModel, Observation, TerminalPotential};

pub use config::SolverConfig;
pub use dc::{measure_resistance, solve_network, Solution};
pub use mna::{ComponentSystem, MnaMatrix};
pub use network::{Branch, Network, Role, SourceGroup};
pub use result::{ElementFlags, ElementState, KclReport, SolveResult};
pub use switching::{settle, Settled};

use result::Flow;

/// Default fault current reported for a shorted ideal source, in amperes.
pub const DEFAULT_MAX_SHORT_CURRENT: f64 = 10.0;

/// Default limit on LED switching passes.
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Default margin for LED re-classification.
pub const DEFAULT_SWITCHING_TOLERANCE: f64 = 1e-9;

/// Relative KCL residual every solve must stay within.
pub const DEFAULT_KCL_TOLERANCE: f64 = 1e-9;

/// A pivot smaller than this fraction of the largest entry in its column
/// marks a singular system.
pub const PIVOT_TOLERANCE: f64 = 1e-13;

/// Solve a graph. Never fails; faults are reported on the result.
///
/// The returned result has revision 0; sessions stamp their own revision.
pub fn solve(graph: &Graph, config: &SolverConfig) -> SolveResult {
    let mut models: Vec<ElementModel> = graph.elements.iter().map(ElementModel::from_element).collect();
    let settled = settle(graph.num_nodes(), &mut models, config);
    let Settled {
        network,
        solution,
        iterations,
        converged,
    } = &settled;

    let mut elements = Vec::with_capacity(graph.elements.len());
    for (index, (element, model)) in graph.elements.iter().zip(&models).enumerate() {
        let terminals: Vec<TerminalPotential> = element
            .nodes
            .iter()
            .map(|&n| TerminalPotential {
                potential: solution.potentials[n.0],
                component: network.component_of(n),
            })
            .collect();

        let voltage = match model.voltage_terminals() {
            Some((a, b)) if terminals[a].component == terminals[b].component => {
                terminals[a].potential - terminals[b].potential
            }
            _ => 0.0,
        };

        let branches = network.element_branches[index].clone();
        let branch_currents = &solution.branch_currents[branches.clone()];
        let current = branch_currents.first().copied().unwrap_or(0.0);
        let current_indeterminate = branches.clone().any(|b| solution.indeterminate[b]);
        let shorted = branches.clone().any(|b| solution.shorted[b]);

        let resistance = model
            .as_multimeter()
            .filter(|m| m.mode == MeterMode::Resistance)
            .map(|m| measure_resistance(network, graph, &models, m.probe(), m.com()));

        let observation = Observation {
            voltage,
            current,
            branch_currents,
            terminals: &terminals,
            current_indeterminate,
            resistance,
        };
        let display = model.derive(&observation);
        let flags = ElementFlags {
            shorted,
            unmodeled: model.is_unmodeled(),
            indeterminate: current_indeterminate || display.is_indeterminate(),
        };

        elements.push(ElementState {
            id: element.id.clone(),
            kind: element.kind.clone(),
            nodes: element.nodes.clone(),
            voltage,
            current,
            display,
            flags,
        });
    }

    let flows = network
        .branches
        .iter()
        .zip(&solution.branch_currents)
        .map(|(branch, &current)| {
            let (from, to) = branch.stamp.flow_nodes();
            Flow { from, to, current }
        })
        .collect();

    let index: HashMap<ElementId, usize> = elements
        .iter()
        .enumerate()
        .map(|(i, e)| (e.id.clone(), i))
        .collect();

    let result = SolveResult {
        revision: 0,
        potentials: solution.potentials.clone(),
        elements,
        warnings: graph.warnings.clone(),
        iterations: *iterations,
        converged: *converged,
        flows,
        index,
    };

    let kcl = result.check_kcl(DEFAULT_KCL_TOLERANCE);
    debug!(
        "Solved {} elements, {} nodes, {} branches in {} passes; KCL residual {:.3e}",
        result.elements.len(),
        result.potentials.len(),
        network.branches.len(),
        iterations,
        kcl.residual
    );

    result
}
