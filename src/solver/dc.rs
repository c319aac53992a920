//! DC operating point of a reduced network.
//!
//! Each connected component is solved on its own: its lowest supernode is
//! the 0 V reference, the remaining supernodes get one MNA row each and every
//! primary ideal source gets one branch-current row. Currents through
//! collapsed zero-resistance edges are recovered afterwards from KCL.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use log::{debug, warn};

use crate::circuit::{Graph, NodeId, UnionFind};
use crate::components::{ElementModel, Measurement, Stamp};

use super::mna::ComponentSystem;
use super::network::{Network, Role};
use super::SolverConfig;

/// Solved state of a network.
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Potential of every node relative to its component's reference.
    pub potentials: Vec<f64>,
    /// Current of every branch, signed per [`Stamp`] convention.
    pub branch_currents: Vec<f64>,
    /// Branch current could not be determined (zero-resistance loop).
    pub indeterminate: Vec<bool>,
    /// Branch is a source in a fault state.
    pub shorted: Vec<bool>,
}

/// Solve every component of the network.
pub fn solve_network(net: &Network, config: &SolverConfig) -> Solution {
    let num_nodes = net.num_nodes();
    let num_branches = net.branches.len();
    let mut supernode_potential = vec![0.0; num_nodes];
    let mut branch_currents = vec![0.0; num_branches];
    let mut indeterminate = vec![false; num_branches];
    let mut shorted = vec![false; num_branches];

    // Primary sources per component, in branch order.
    let mut components: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for node in 0..num_nodes {
        components.entry(net.component[node]).or_default();
    }
    for (index, branch) in net.branches.iter().enumerate() {
        if let Role::Primary { .. } = branch.role {
            components
                .entry(net.branch_component(branch))
                .or_default()
                .push(index);
        }
    }

    // A loop of ideal sources with a net EMF has no solution at all.
    let mut failed_components = BTreeSet::new();
    for branch in &net.branches {
        if let Role::Looped { .. } = branch.role {
            let component = net.branch_component(branch);
            if failed_components.insert(component) {
                warn!("Component N{component}: ideal sources form a loop with a net EMF; sources flagged as shorted");
            }
        }
    }

    for (&component, primaries) in &components {
        if failed_components.contains(&component) {
            continue;
        }
        let mut system = ComponentSystem::new(net, component, component, primaries.len());
        if system.is_empty() {
            continue;
        }
        system.stamp_passive();
        for (k, &index) in primaries.iter().enumerate() {
            if let Stamp::VoltageSource { pos, neg, emf } = net.branches[index].stamp {
                system.stamp_source(k, pos, neg, emf);
            }
        }

        if let Err(e) = system.solve() {
            warn!("Component N{component}: {e}; sources flagged as shorted");
            failed_components.insert(component);
            continue;
        }

        for node in 0..num_nodes {
            if net.supernode[node] == node && net.component[node] == component {
                supernode_potential[node] = system.potential(NodeId(node));
            }
        }
        for (k, &index) in primaries.iter().enumerate() {
            branch_currents[index] = system.source_current(k);
        }
    }

    let potentials: Vec<f64> = (0..num_nodes)
        .map(|node| supernode_potential[net.supernode[node]])
        .collect();
    let v = |node: NodeId| potentials[node.0];

    for (index, branch) in net.branches.iter().enumerate() {
        if failed_components.contains(&net.branch_component(branch)) {
            shorted[index] = branch.stamp.is_source();
            branch_currents[index] = 0.0;
            continue;
        }
        match (branch.stamp, branch.role) {
            (Stamp::Conductance { a, b, conductance }, _) => {
                branch_currents[index] = conductance * (v(a) - v(b));
            }
            (
                Stamp::Norton {
                    pos,
                    neg,
                    emf,
                    resistance,
                },
                _,
            ) => {
                branch_currents[index] = (emf - (v(pos) - v(neg))) / resistance;
            }
            (Stamp::VoltageSource { emf, .. }, Role::Shorted) => {
                shorted[index] = true;
                branch_currents[index] = if emf == 0.0 {
                    0.0
                } else {
                    config.max_short_current.copysign(emf)
                };
            }
            _ => {}
        }
    }

    for group in &net.groups {
        if failed_components.contains(&net.component[group.lo]) {
            continue;
        }
        if group.conflicting {
            // Current circulates from the highest EMF source to the lowest.
            let emf_of = |&(index, sign): &(usize, f64)| match net.branches[index].stamp {
                Stamp::VoltageSource { emf, .. } => emf * sign,
                _ => 0.0,
            };
            let winner = group
                .members
                .iter()
                .max_by(|a, b| emf_of(*a).total_cmp(&emf_of(*b)));
            let loser = group
                .members
                .iter()
                .min_by(|a, b| emf_of(*a).total_cmp(&emf_of(*b)));
            for &(index, _) in &group.members {
                shorted[index] = true;
            }
            if let (Some(&(w, w_sign)), Some(&(l, l_sign))) = (winner, loser) {
                branch_currents[w] = config.max_short_current * w_sign;
                branch_currents[l] = -config.max_short_current * l_sign;
            }
        } else if let Role::Redundant { .. } = net.branches[group.members[0].0].role {
            // Any current may circulate around the loop; report none.
            for &(index, _) in &group.members {
                indeterminate[index] = true;
            }
        } else {
            let (primary, primary_sign) = group.members[0];
            let share = branch_currents[primary] * primary_sign / group.members.len() as f64;
            for &(index, sign) in &group.members {
                branch_currents[index] = share * sign;
            }
        }
    }

    let mut solution = Solution {
        potentials,
        branch_currents,
        indeterminate,
        shorted,
    };
    distribute_short_currents(net, &mut solution);
    solution
}

/// Recover currents through zero-resistance branches from KCL.
///
/// Within each supernode the short branches are split into a spanning forest
/// and the remaining loop-closing branches. Loop-closing branches carry an
/// undetermined share; they are reported as zero and flagged. Forest currents
/// follow by peeling leaves, so no recursion is involved.
fn distribute_short_currents(net: &Network, solution: &mut Solution) {
    let num_nodes = net.num_nodes();

    // Net current leaving each node through non-short branches.
    let mut need = vec![0.0; num_nodes];
    for (index, branch) in net.branches.iter().enumerate() {
        if matches!(branch.stamp, Stamp::Short { .. }) {
            continue;
        }
        let (from, to) = branch.stamp.flow_nodes();
        need[from.0] += solution.branch_currents[index];
        need[to.0] -= solution.branch_currents[index];
    }
    // The short branches must take the opposite away from each node.
    for value in &mut need {
        *value = -*value;
    }

    let mut forest = UnionFind::new(num_nodes);
    let mut incident: Vec<Vec<usize>> = vec![Vec::new(); num_nodes];
    let mut degree = vec![0usize; num_nodes];
    for (index, branch) in net.branches.iter().enumerate() {
        let Stamp::Short { a, b } = branch.stamp else {
            continue;
        };
        solution.branch_currents[index] = 0.0;
        if a != b && forest.union(a.0, b.0) {
            incident[a.0].push(index);
            incident[b.0].push(index);
            degree[a.0] += 1;
            degree[b.0] += 1;
        } else {
            solution.indeterminate[index] = true;
        }
    }

    let mut removed = vec![false; net.branches.len()];
    let mut leaves: VecDeque<usize> = (0..num_nodes).filter(|&n| degree[n] == 1).collect();
    while let Some(node) = leaves.pop_front() {
        if degree[node] != 1 {
            continue;
        }
        let Some(&edge) = incident[node].iter().find(|&&e| !removed[e]) else {
            continue;
        };
        let Stamp::Short { a, b } = net.branches[edge].stamp else {
            continue;
        };
        let (other, current) = if a.0 == node {
            (b.0, need[node])
        } else {
            (a.0, -need[node])
        };
        solution.branch_currents[edge] = current;
        need[other] += need[node];
        need[node] = 0.0;
        removed[edge] = true;
        degree[node] -= 1;
        degree[other] -= 1;
        if degree[other] == 1 {
            leaves.push_back(other);
        }
    }
}

/// Ohmmeter reading between `probe` and `com`.
///
/// Only meaningful when the meter is the sole energy source in the measured
/// network: any source, LED or potentiometer in the probed component makes
/// the reading indeterminate.
pub fn measure_resistance(
    net: &Network,
    graph: &Graph,
    models: &[ElementModel],
    probe: NodeId,
    com: NodeId,
) -> Measurement {
    let (p, c) = (net.supernode_of(probe), net.supernode_of(com));
    if p == c {
        return Measurement::Ohms(0.0);
    }
    let component = net.component[p];
    if component != net.component[c] {
        return Measurement::Open;
    }

    let powered = net
        .branches
        .iter()
        .any(|b| b.stamp.is_source() && net.branch_component(b) == component);
    let guessing = graph.elements.iter().zip(models).any(|(element, model)| {
        model.defeats_ohmmeter()
            && element
                .nodes
                .iter()
                .any(|&n| net.component_of(n) == component)
    });
    if powered || guessing {
        return Measurement::Indeterminate;
    }

    let mut system = ComponentSystem::new(net, component, c, 0);
    system.stamp_passive();
    // 1 A test current pushed from com into the probe.
    system.inject(probe, 1.0);
    match system.solve() {
        Ok(()) => {
            let ohms = system.potential(probe);
            debug!("Ohmmeter {probe}-{com}: {ohms:.6} ohm");
            Measurement::Ohms(ohms)
        }
        Err(_) => Measurement::Indeterminate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Battery, Resistor};
    use approx::assert_relative_eq;

    fn battery(pos: usize, neg: usize, emf: f64) -> ElementModel {
        ElementModel::Battery(Battery::new([NodeId(pos), NodeId(neg)], emf, 0.0))
    }

    fn resistor(a: usize, b: usize, r: f64) -> ElementModel {
        ElementModel::Resistor(Resistor::new([NodeId(a), NodeId(b)], r))
    }

    fn solve(num_nodes: usize, models: &[ElementModel]) -> (Network, Solution) {
        let net = Network::assemble(num_nodes, models);
        let solution = solve_network(&net, &SolverConfig::default());
        (net, solution)
    }

    #[test]
    fn test_battery_and_resistor() {
        let (_, s) = solve(2, &[battery(0, 1, 9.0), resistor(0, 1, 5.0)]);
        assert_eq!(s.potentials[0], 0.0);
        assert_relative_eq!(s.potentials[1], -9.0, max_relative = 1e-12);
        assert_relative_eq!(s.branch_currents[0], 1.8, max_relative = 1e-12);
        assert_relative_eq!(s.branch_currents[1], 1.8, max_relative = 1e-12);
    }

    #[test]
    fn test_norton_battery_with_internal_resistance() {
        let b = ElementModel::Battery(Battery::new([NodeId(1), NodeId(0)], 10.0, 1.0));
        let (_, s) = solve(2, &[b, resistor(1, 0, 4.0)]);
        assert_relative_eq!(s.potentials[1], 8.0, max_relative = 1e-12);
        assert_relative_eq!(s.branch_currents[0], 2.0, max_relative = 1e-12);
    }

    #[test]
    fn test_series_short_carries_loop_current() {
        // Battery 0(+)/1(-), 0 ohm link 1-2, 9 ohm 2-0.
        let (_, s) = solve(3, &[battery(0, 1, 9.0), resistor(2, 0, 9.0), resistor(1, 2, 0.0)]);
        assert_relative_eq!(s.branch_currents[1], -1.0, max_relative = 1e-12);
        // Current returns from node 2 to the negative terminal at node 1.
        assert_relative_eq!(s.branch_currents[2], -1.0, max_relative = 1e-12);
        assert!(!s.indeterminate[2]);
    }

    #[test]
    fn test_parallel_shorts_are_indeterminate() {
        let models = [
            battery(0, 1, 9.0),
            resistor(1, 2, 0.0),
            resistor(1, 2, 0.0),
            resistor(2, 0, 9.0),
        ];
        let (_, s) = solve(3, &models);
        assert!(!s.indeterminate[1]);
        assert!(s.indeterminate[2]);
        assert_eq!(s.branch_currents[2], 0.0);
        assert_relative_eq!(s.branch_currents[1].abs(), 1.0, max_relative = 1e-12);
    }

    #[test]
    fn test_shorted_battery_reports_clipped_current() {
        let (_, s) = solve(2, &[battery(0, 1, 9.0), resistor(0, 1, 0.0)]);
        assert!(s.shorted[0]);
        assert_eq!(s.branch_currents[0], SolverConfig::default().max_short_current);
        // The fault current returns through the short, from + to -.
        assert_eq!(s.branch_currents[1], SolverConfig::default().max_short_current);
    }

    #[test]
    fn test_parallel_equal_batteries_share_current() {
        let models = [battery(0, 1, 9.0), battery(0, 1, 9.0), resistor(0, 1, 9.0)];
        let (_, s) = solve(2, &models);
        assert_relative_eq!(s.branch_currents[0], 0.5, max_relative = 1e-12);
        assert_relative_eq!(s.branch_currents[1], 0.5, max_relative = 1e-12);
        assert!(!s.shorted[0]);
    }

    #[test]
    fn test_conflicting_batteries_circulate_clipped_current() {
        let models = [battery(0, 1, 9.0), battery(0, 1, 6.0), resistor(0, 1, 9.0)];
        let (_, s) = solve(2, &models);
        let max = SolverConfig::default().max_short_current;
        assert!(s.shorted[0] && s.shorted[1]);
        assert_eq!(s.branch_currents[0], max);
        assert_eq!(s.branch_currents[1], -max);
        assert_eq!(s.branch_currents[2], 0.0);
    }

    #[test]
    fn test_consistent_source_loop_solves() {
        // 9 V + 9 V in series with an 18 V source and 18 ohm across the pair.
        let models = [
            battery(0, 1, 9.0),
            battery(1, 2, 9.0),
            battery(0, 2, 18.0),
            resistor(0, 2, 18.0),
        ];
        let (_, s) = solve(3, &models);
        assert!(s.shorted.iter().all(|&f| !f));
        assert_relative_eq!(s.potentials[2], -18.0, max_relative = 1e-12);
        assert_relative_eq!(s.branch_currents[0], 1.0, max_relative = 1e-12);
        assert_relative_eq!(s.branch_currents[1], 1.0, max_relative = 1e-12);
        assert_relative_eq!(s.branch_currents[3], 1.0, max_relative = 1e-12);
        assert_eq!(s.branch_currents[2], 0.0);
        assert_eq!(s.indeterminate, vec![false, false, true, false]);
    }

    #[test]
    fn test_huge_resistances_still_solve() {
        let models = [
            battery(0, 2, 1.0),
            resistor(0, 1, 1e16),
            resistor(1, 2, 1e16),
        ];
        let (_, s) = solve(3, &models);
        assert!(!s.shorted[0]);
        assert_relative_eq!(s.potentials[1], -0.5, max_relative = 1e-9);
        assert_relative_eq!(s.potentials[2], -1.0, max_relative = 1e-9);
        assert_relative_eq!(s.branch_currents[0], 5e-17, max_relative = 1e-9);
    }

    #[test]
    fn test_source_loop_is_flagged_not_fatal() {
        // Three ideal sources around a triangle with a net EMF.
        let models = [battery(0, 1, 1.0), battery(1, 2, 1.0), battery(2, 0, 1.0)];
        let (_, s) = solve(3, &models);
        assert!(s.shorted.iter().all(|&f| f));
        assert!(s.potentials.iter().all(|&v| v == 0.0));
        assert!(s.branch_currents.iter().all(|&i| i == 0.0));
    }
}
