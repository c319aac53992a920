//! LED switching iteration.

use log::{debug, warn};

use crate::components::ElementModel;

use super::dc::{solve_network, Solution};
use super::network::Network;
use super::SolverConfig;

/// Outcome of settling every LED into a consistent switching state.
#[derive(Debug, Clone)]
pub struct Settled {
    pub network: Network,
    pub solution: Solution,
    /// Solve passes used.
    pub iterations: usize,
    /// `false` if the pass limit was reached with LEDs still changing state.
    pub converged: bool,
}

/// Solve repeatedly, re-classifying LEDs after each pass, until no LED
/// changes state or `config.max_iterations` passes have run.
///
/// Every LED starts out conducting. A conducting LED whose current runs
/// backwards turns off; a blocking LED whose anode sits above its cathode
/// turns back on. LEDs spanning two disconnected components stay off.
pub fn settle(num_nodes: usize, models: &mut [ElementModel], config: &SolverConfig) -> Settled {
    let tolerance = config.switching_tolerance;
    let mut iterations = 0;

    loop {
        let network = Network::assemble(num_nodes, models);
        let solution = solve_network(&network, config);
        iterations += 1;

        let mut changed = 0;
        for (index, model) in models.iter_mut().enumerate() {
            let ElementModel::Led(led) = model else {
                continue;
            };
            let (anode, cathode) = (led.anode(), led.cathode());
            let connected = network.component_of(anode) == network.component_of(cathode);
            let voltage = if connected {
                solution.potentials[anode.0] - solution.potentials[cathode.0]
            } else {
                0.0
            };
            let current = network.element_branches[index]
                .clone()
                .next()
                .map_or(0.0, |b| solution.branch_currents[b]);
            if led.update_state(voltage, current, tolerance) {
                debug!(
                    "LED #{index} -> {}",
                    if led.conducting { "conducting" } else { "blocking" }
                );
                changed += 1;
            }
        }

        if changed == 0 {
            return Settled {
                network,
                solution,
                iterations,
                converged: true,
            };
        }
        if iterations >= config.max_iterations {
            warn!(
                "LED states did not settle after {iterations} passes ({changed} still switching); keeping the last solve"
            );
            // The reported solve must match the reported LED states.
            let network = Network::assemble(num_nodes, models);
            let solution = solve_network(&network, config);
            return Settled {
                network,
                solution,
                iterations,
                converged: false,
            };
        }
    }
}
