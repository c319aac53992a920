//! Network reduction: branches, collapsed shorts, ideal-source screening and
//! connected components.
//!
//! Zero-resistance edges never enter the MNA system. Their endpoints are
//! collapsed into one *supernode* first, labeled by its lowest node id. Ideal
//! sources are then screened against the supernodes: a source whose two
//! terminals collapsed together is shorted, and ideal sources in parallel
//! are grouped so that only one of them gets a branch-current row. A group
//! that closes a loop of ideal sources gets no row either: it is redundant
//! when the EMFs around the loop cancel and a fault when they do not.

use std::collections::HashMap;
use std::ops::Range;

use crate::circuit::{NodeId, UnionFind};
use crate::components::{ElementModel, Stamp};

/// One stamp of one element.
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    /// Index of the owning element in the graph.
    pub element: usize,
    pub stamp: Stamp,
    pub role: Role,
}

/// How a branch takes part in the solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Conductance, Norton source or collapsed short.
    Passive,
    /// Ideal source carrying the branch-current row of its parallel group.
    Primary { group: usize },
    /// Ideal source in parallel with an identical primary; shares its current.
    Follower { group: usize },
    /// Ideal source whose terminals are joined by zero resistance.
    Shorted,
    /// Ideal source in parallel with a source of different EMF.
    Conflicting { group: usize },
    /// Ideal source closing a loop of sources whose EMFs cancel; its
    /// current is not determined by the circuit.
    Redundant { group: usize },
    /// Ideal source closing a loop of sources with a net EMF.
    Looped { group: usize },
}

/// Ideal sources connected across the same pair of supernodes.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceGroup {
    /// Lower supernode label of the pair.
    pub lo: usize,
    /// Higher supernode label of the pair.
    pub hi: usize,
    /// `(branch, sign)`; sign is +1 when the source's positive terminal is on `lo`.
    pub members: Vec<(usize, f64)>,
    pub conflicting: bool,
}

impl SourceGroup {
    /// EMF of a member expressed as `V(lo) - V(hi)`.
    fn signed_emf(&self, branches: &[Branch], member: (usize, f64)) -> f64 {
        match branches[member.0].stamp {
            Stamp::VoltageSource { emf, .. } => emf * member.1,
            _ => 0.0,
        }
    }
}

/// The solver's view of a circuit for one switching state.
#[derive(Debug, Clone)]
pub struct Network {
    pub branches: Vec<Branch>,
    /// Branches of each element, in stamp order.
    pub element_branches: Vec<Range<usize>>,
    /// Supernode label of every node.
    pub supernode: Vec<usize>,
    /// Connected-component label of every node (lowest node id in it).
    pub component: Vec<usize>,
    pub groups: Vec<SourceGroup>,
}

impl Network {
    pub fn assemble(num_nodes: usize, models: &[ElementModel]) -> Self {
        let mut branches = Vec::new();
        let mut element_branches = Vec::with_capacity(models.len());
        for (element, model) in models.iter().enumerate() {
            let start = branches.len();
            branches.extend(model.stamps().into_iter().map(|stamp| Branch {
                element,
                stamp,
                role: Role::Passive,
            }));
            element_branches.push(start..branches.len());
        }

        let mut shorts = UnionFind::new(num_nodes);
        for branch in &branches {
            if let Stamp::Short { a, b } = branch.stamp {
                shorts.union(a.0, b.0);
            }
        }
        let supernode = shorts.min_labels();

        let groups = screen_sources(&mut branches, &supernode);

        let mut connected = shorts;
        for branch in &branches {
            let joins = match (branch.stamp, branch.role) {
                (Stamp::Conductance { a, b, .. }, _) => Some((a, b)),
                (Stamp::Norton { pos, neg, .. }, _) => Some((pos, neg)),
                (Stamp::VoltageSource { pos, neg, .. }, Role::Primary { .. } | Role::Follower { .. }) => {
                    Some((pos, neg))
                }
                _ => None,
            };
            if let Some((a, b)) = joins {
                connected.union(a.0, b.0);
            }
        }
        let component = connected.min_labels();

        Network {
            branches,
            element_branches,
            supernode,
            component,
            groups,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.supernode.len()
    }

    pub fn supernode_of(&self, node: NodeId) -> usize {
        self.supernode[node.0]
    }

    pub fn component_of(&self, node: NodeId) -> usize {
        self.component[node.0]
    }

    /// Component a branch belongs to.
    pub fn branch_component(&self, branch: &Branch) -> usize {
        let (from, _) = branch.stamp.flow_nodes();
        self.component_of(from)
    }
}

/// Classify every ideal voltage source and group parallel ones.
fn screen_sources(branches: &mut [Branch], supernode: &[usize]) -> Vec<SourceGroup> {
    let mut groups: Vec<SourceGroup> = Vec::new();
    let mut group_of_pair: HashMap<(usize, usize), usize> = HashMap::new();

    for index in 0..branches.len() {
        let Stamp::VoltageSource { pos, neg, .. } = branches[index].stamp else {
            continue;
        };
        let (sp, sn) = (supernode[pos.0], supernode[neg.0]);
        if sp == sn {
            branches[index].role = Role::Shorted;
            continue;
        }
        let (lo, hi, sign) = if sp < sn { (sp, sn, 1.0) } else { (sn, sp, -1.0) };
        let group = *group_of_pair.entry((lo, hi)).or_insert_with(|| {
            groups.push(SourceGroup {
                lo,
                hi,
                members: Vec::new(),
                conflicting: false,
            });
            groups.len() - 1
        });
        groups[group].members.push((index, sign));
    }

    let mut forest = SourceForest::new(supernode.len());
    for (g, group) in groups.iter_mut().enumerate() {
        let first = group.signed_emf(branches, group.members[0]);
        let conflicting = group.members[1..]
            .iter()
            .any(|&m| !same_emf(group.signed_emf(branches, m), first));
        group.conflicting = conflicting;

        let role = if group.conflicting {
            Role::Conflicting { group: g }
        } else {
            match forest.join(group.lo, group.hi, first) {
                None => Role::Primary { group: g },
                Some(implied) if same_emf(implied, first) => Role::Redundant { group: g },
                Some(_) => Role::Looped { group: g },
            }
        };
        for (i, &(branch, _)) in group.members.iter().enumerate() {
            branches[branch].role = match role {
                Role::Primary { group } if i > 0 => Role::Follower { group },
                role => role,
            };
        }
    }

    groups
}

fn same_emf(a: f64, b: f64) -> bool {
    (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
}

/// Supernodes tied together by primary ideal sources, with the potential
/// each one sits at relative to its root.
struct SourceForest {
    parent: Vec<usize>,
    /// `V(node) - V(parent)`.
    offset: Vec<f64>,
}

impl SourceForest {
    fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            offset: vec![0.0; size],
        }
    }

    /// Root of `x` and `V(x) - V(root)`.
    fn find(&mut self, x: usize) -> (usize, f64) {
        let mut path = Vec::new();
        let mut root = x;
        while self.parent[root] != root {
            path.push(root);
            root = self.parent[root];
        }
        let mut drop = 0.0;
        for &node in path.iter().rev() {
            drop += self.offset[node];
            self.offset[node] = drop;
            self.parent[node] = root;
        }
        (root, drop)
    }

    /// Tie `a` to `b` with `V(a) - V(b) = drop`.
    ///
    /// Returns the drop already implied when the two are tied, leaving the
    /// forest unchanged.
    fn join(&mut self, a: usize, b: usize, drop: f64) -> Option<f64> {
        let (ra, va) = self.find(a);
        let (rb, vb) = self.find(b);
        if ra == rb {
            return Some(va - vb);
        }
        self.parent[ra] = rb;
        self.offset[ra] = drop - va + vb;
        None
    }
}
