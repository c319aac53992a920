//! MNA matrix assembly and solving.

use crate::circuit::NodeId;
use crate::components::Stamp;
use crate::error::{Result, WirebenchError};

use super::network::Network;
use super::PIVOT_TOLERANCE;

/// Dense system Ax = z.
///
/// Node rows are `Option<usize>`: `None` is the reference node, which is
/// fixed at 0 V and has no row.
#[derive(Debug, Clone)]
pub struct MnaMatrix {
    /// System matrix A (row-major)
    pub a: Vec<f64>,
    /// Source vector z
    pub z: Vec<f64>,
    /// Solution vector x
    pub x: Vec<f64>,
    /// Matrix dimension
    pub size: usize,
    /// LU factors of the row-permuted A, L below the diagonal (unit diagonal implied)
    lu: Vec<f64>,
    /// Row of A that ended up in each row of `lu`
    pivots: Vec<usize>,
}

impl MnaMatrix {
    /// Create a zeroed system of the given dimension.
    pub fn new(size: usize) -> Self {
        Self {
            a: vec![0.0; size * size],
            z: vec![0.0; size],
            x: vec![0.0; size],
            size,
            lu: vec![0.0; size * size],
            pivots: (0..size).collect(),
        }
    }

    pub fn add(&mut self, row: usize, col: usize, value: f64) {
        self.a[row * self.size + col] += value;
    }

    /// Stamp a conductance `g` between two node rows.
    pub fn stamp_conductance(&mut self, n1: Option<usize>, n2: Option<usize>, g: f64) {
        if let Some(i) = n1 {
            self.add(i, i, g);
        }
        if let Some(j) = n2 {
            self.add(j, j, g);
        }
        if let (Some(i), Some(j)) = (n1, n2) {
            self.add(i, j, -g);
            self.add(j, i, -g);
        }
    }

    /// Stamp `V[n+] - V[n-] = voltage` with its branch current on row `br`.
    ///
    /// The solved branch current flows into the source at n+.
    pub fn stamp_voltage_source(
        &mut self,
        n_pos: Option<usize>,
        n_neg: Option<usize>,
        br: usize,
        voltage: f64,
    ) {
        for (node, sign) in [(n_pos, 1.0), (n_neg, -1.0)] {
            if let Some(i) = node {
                self.add(br, i, sign);
                self.add(i, br, sign);
            }
        }
        self.z[br] = voltage;
    }

    /// Stamp a current source; current flows from n+ through the source to n-.
    pub fn stamp_current_source(&mut self, n_pos: Option<usize>, n_neg: Option<usize>, current: f64) {
        if let Some(i) = n_pos {
            self.z[i] -= current;
        }
        if let Some(j) = n_neg {
            self.z[j] += current;
        }
    }

    /// LU decomposition with partial pivoting.
    ///
    /// A pivot is rejected when it is below [`PIVOT_TOLERANCE`] times the
    /// largest entry of its column in A, so the test does not depend on the
    /// magnitude of the conductances.
    pub fn factor(&mut self) -> Result<()> {
        let n = self.size;
        self.lu.copy_from_slice(&self.a);
        for (i, p) in self.pivots.iter_mut().enumerate() {
            *p = i;
        }

        let column_scale: Vec<f64> = (0..n)
            .map(|k| self.a.iter().skip(k).step_by(n).fold(0.0, |m: f64, v| m.max(v.abs())))
            .collect();

        for k in 0..n {
            let (pivot_row, pivot_abs) = (k..n)
                .map(|i| (i, self.lu[i * n + k].abs()))
                .fold((k, f64::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });
            // An all-zero column fails too: 0 <= 0.
            if pivot_abs <= PIVOT_TOLERANCE * column_scale[k] {
                return Err(WirebenchError::SingularMatrix);
            }
            if pivot_row != k {
                self.pivots.swap(k, pivot_row);
                let (upper, lower) = self.lu.split_at_mut(pivot_row * n);
                upper[k * n..(k + 1) * n].swap_with_slice(&mut lower[..n]);
            }

            let (upper, lower) = self.lu.split_at_mut((k + 1) * n);
            let pivot = &upper[k * n..];
            for row in lower.chunks_exact_mut(n) {
                let factor = row[k] / pivot[k];
                row[k] = factor;
                if factor != 0.0 {
                    for (value, &p) in row[k + 1..].iter_mut().zip(&pivot[k + 1..]) {
                        *value -= factor * p;
                    }
                }
            }
        }

        Ok(())
    }

    /// Solve with the factors from [`MnaMatrix::factor`].
    pub fn solve(&mut self) -> Result<()> {
        let n = self.size;
        for (x, &p) in self.x.iter_mut().zip(&self.pivots) {
            *x = self.z[p];
        }

        // L y = P z
        for i in 0..n {
            let row = &self.lu[i * n..i * n + i];
            let sum: f64 = row.iter().zip(&self.x[..i]).map(|(l, y)| l * y).sum();
            self.x[i] -= sum;
        }

        // U x = y
        for i in (0..n).rev() {
            let row = &self.lu[i * n..(i + 1) * n];
            let sum: f64 = row[i + 1..].iter().zip(&self.x[i + 1..]).map(|(u, x)| u * x).sum();
            if row[i] == 0.0 {
                return Err(WirebenchError::SingularMatrix);
            }
            self.x[i] = (self.x[i] - sum) / row[i];
        }

        if self.x.iter().any(|v| !v.is_finite()) {
            return Err(WirebenchError::SingularMatrix);
        }
        Ok(())
    }

    pub fn factor_and_solve(&mut self) -> Result<()> {
        self.factor()?;
        self.solve()
    }

    /// Voltage of a node row; the reference node reads 0 V.
    pub fn voltage(&self, node: Option<usize>) -> f64 {
        node.map_or(0.0, |i| self.x[i])
    }
}

/// The MNA system of one connected component, addressed by node.
///
/// Every supernode of the component except the reference gets a row,
/// followed by one branch-current row per primary ideal source.
pub struct ComponentSystem<'a> {
    net: &'a Network,
    component: usize,
    /// Row of each supernode label; `None` for the reference and outsiders.
    row_of: Vec<Option<usize>>,
    node_rows: usize,
    pub matrix: MnaMatrix,
}

impl<'a> ComponentSystem<'a> {
    pub fn new(net: &'a Network, component: usize, reference: usize, sources: usize) -> Self {
        let mut row_of = vec![None; net.num_nodes()];
        let mut node_rows = 0;
        for node in 0..net.num_nodes() {
            let is_supernode = net.supernode[node] == node;
            if is_supernode && net.component[node] == component && node != reference {
                row_of[node] = Some(node_rows);
                node_rows += 1;
            }
        }
        Self {
            net,
            component,
            row_of,
            node_rows,
            matrix: MnaMatrix::new(node_rows + sources),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.size == 0
    }

    fn row(&self, node: NodeId) -> Option<usize> {
        self.row_of[self.net.supernode_of(node)]
    }

    /// Stamp every conductance and Norton source of the component.
    pub fn stamp_passive(&mut self) {
        let net = self.net;
        for branch in &net.branches {
            if net.branch_component(branch) != self.component {
                continue;
            }
            match branch.stamp {
                Stamp::Conductance { a, b, conductance } => {
                    let (a, b) = (self.row(a), self.row(b));
                    self.matrix.stamp_conductance(a, b, conductance);
                }
                Stamp::Norton {
                    pos,
                    neg,
                    emf,
                    resistance,
                } => {
                    let (p, n) = (self.row(pos), self.row(neg));
                    self.matrix.stamp_conductance(p, n, 1.0 / resistance);
                    // Source current enters the circuit at the positive terminal.
                    self.matrix.stamp_current_source(n, p, emf / resistance);
                }
                Stamp::Short { .. } | Stamp::VoltageSource { .. } => {}
            }
        }
    }

    /// Stamp the `k`-th ideal source of the component.
    pub fn stamp_source(&mut self, k: usize, pos: NodeId, neg: NodeId, emf: f64) {
        let (p, n) = (self.row(pos), self.row(neg));
        self.matrix.stamp_voltage_source(p, n, self.node_rows + k, emf);
    }

    /// Push `current` from the reference into `node`.
    pub fn inject(&mut self, node: NodeId, current: f64) {
        let row = self.row(node);
        self.matrix.stamp_current_source(None, row, current);
    }

    pub fn solve(&mut self) -> Result<()> {
        self.matrix.factor_and_solve()
    }

    /// Potential of `node` relative to the reference.
    pub fn potential(&self, node: NodeId) -> f64 {
        self.matrix.voltage(self.row(node))
    }

    /// Current delivered by the `k`-th ideal source, out of its positive terminal.
    pub fn source_current(&self, k: usize) -> f64 {
        -self.matrix.x[self.node_rows + k]
    }
}
