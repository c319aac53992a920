//! Circuit graph: snapshot terminals merged into electrical nodes.

use std::collections::HashMap;

use log::warn;

use super::snapshot::{CircuitSnapshot, ElementConfig, ElementKind};
use super::types::{ElementId, NodeId, TerminalRef};
use super::union_find::UnionFind;
use super::validate::{sanitize_elements, IntegrityWarning};

/// Most terminals an unknown element can be given, matching the widest
/// known layout (the micro:bit breakout). Wires past it are dangling.
pub const MAX_INFERRED_TERMINALS: usize = 21;

/// An element as seen by the solver: sanitized configuration plus the node
/// each of its terminals landed on.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphElement {
    pub id: ElementId,
    pub kind: ElementKind,
    pub config: ElementConfig,
    /// Node of each terminal, indexed by terminal index.
    pub nodes: Vec<NodeId>,
}

/// One electrical node and the terminals that share it.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphNode {
    pub id: NodeId,
    /// `(element index, terminal index)` pairs incident to this node.
    pub terminals: Vec<(usize, usize)>,
}

/// Undirected multigraph of a circuit: nodes are wire-merged terminals,
/// elements are labeled edges between them.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph {
    pub elements: Vec<GraphElement>,
    pub nodes: Vec<GraphNode>,
    /// Integrity problems found while building.
    pub warnings: Vec<IntegrityWarning>,
    index: HashMap<ElementId, usize>,
}

impl Graph {
    /// Build the graph of a snapshot.
    ///
    /// Never fails: dangling wires and invalid configuration become
    /// warnings, and the remaining circuit is still built.
    pub fn build(snapshot: &CircuitSnapshot) -> Self {
        let mut warnings = Vec::new();
        let elements = sanitize_elements(snapshot, &mut warnings);

        let index: HashMap<ElementId, usize> = elements
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id.clone(), i))
            .collect();

        // Unknown kinds get as many terminals as the wires ask for.
        let mut counts: Vec<usize> = elements
            .iter()
            .map(|e| e.kind.terminal_count().unwrap_or(1))
            .collect();
        for wire in &snapshot.wires {
            for end in [&wire.from, &wire.to] {
                if let Some(&i) = index.get(&end.element) {
                    if elements[i].kind.is_unknown() && end.terminal < MAX_INFERRED_TERMINALS {
                        counts[i] = counts[i].max(end.terminal + 1);
                    }
                }
            }
        }

        // Every terminal gets a slot; slots are what the union-find merges.
        let mut offsets = Vec::with_capacity(counts.len());
        let mut total = 0usize;
        for &count in &counts {
            offsets.push(total);
            total += count;
        }

        let slot = |end: &TerminalRef| -> Option<usize> {
            let &i = index.get(&end.element)?;
            (end.terminal < counts[i]).then(|| offsets[i] + end.terminal)
        };

        let mut uf = UnionFind::new(total);
        for wire in &snapshot.wires {
            match (slot(&wire.from), slot(&wire.to)) {
                (Some(a), Some(b)) if a == b => {
                    warnings.push(IntegrityWarning::SelfWire {
                        terminal: wire.from.clone(),
                    });
                }
                (Some(a), Some(b)) => {
                    uf.union(a, b);
                }
                (from, _) => {
                    let missing = if from.is_none() { &wire.from } else { &wire.to };
                    warnings.push(IntegrityWarning::DanglingWire {
                        from: wire.from.clone(),
                        to: wire.to.clone(),
                        missing: missing.clone(),
                    });
                }
            }
        }

        // Number nodes in slot order so ids only depend on the snapshot.
        let mut node_of_root: HashMap<usize, NodeId> = HashMap::new();
        let mut nodes: Vec<GraphNode> = Vec::new();
        let mut graph_elements = Vec::with_capacity(elements.len());
        for (i, element) in elements.into_iter().enumerate() {
            let mut element_nodes = Vec::with_capacity(counts[i]);
            for terminal in 0..counts[i] {
                let root = uf.find(offsets[i] + terminal);
                let node = *node_of_root.entry(root).or_insert_with(|| {
                    let id = NodeId(nodes.len());
                    nodes.push(GraphNode {
                        id,
                        terminals: Vec::new(),
                    });
                    id
                });
                nodes[node.0].terminals.push((i, terminal));
                element_nodes.push(node);
            }
            graph_elements.push(GraphElement {
                id: element.id,
                kind: element.kind,
                config: element.config,
                nodes: element_nodes,
            });
        }

        for warning in &warnings {
            warn!("{warning}");
        }

        Graph {
            elements: graph_elements,
            nodes,
            warnings,
            index,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Index of an element in [`Graph::elements`].
    pub fn element_index(&self, id: &ElementId) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn element(&self, id: &ElementId) -> Option<&GraphElement> {
        self.element_index(id).map(|i| &self.elements[i])
    }

    /// Node that a terminal belongs to.
    pub fn node_of(&self, terminal: &TerminalRef) -> Option<NodeId> {
        self.element(&terminal.element)?.nodes.get(terminal.terminal).copied()
    }
}
