//! In-memory justification graph with snapshot-identity indexing.
//!
//! Uses `petgraph` for the graph structure and a `HashMap` from
//! `(atom set, rule_nr)` to node index, so inserting a snapshot that already
//! exists returns the existing node instead of adding a duplicate.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use petgraph::Direction;
use petgraph::algo::{is_isomorphic_matching, toposort};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::error::GraphError;
use crate::program::Transformation;
use crate::symbol::{NodeId, Symbol};

use super::{EdgeData, Node, Recursion};

/// Result type for graph operations.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Merge identity of a snapshot: its atoms and its rule number.
pub type NodeKey = (BTreeSet<Symbol>, i64);

/// Directed acyclic graph of derivation snapshots.
///
/// Edges are labeled with the transformation that produced the target's diff.
#[derive(Clone, Default)]
pub struct ReasonGraph {
    /// The directed graph: nodes are snapshots, edges carry EdgeData.
    graph: DiGraph<Node, EdgeData>,
    /// Snapshot identity → NodeIndex for O(1) collapse on insert.
    index: HashMap<NodeKey, NodeIndex>,
}

impl ReasonGraph {
    /// Create a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a snapshot, or return the index of the existing equal snapshot.
    ///
    /// When the snapshot already exists the first instance is kept; it adopts
    /// the incoming `recursive` value only if it has none itself.
    pub fn add_node(&mut self, node: Node) -> NodeIndex {
        if let Some(idx) = self.index_of(&node) {
            let existing = &mut self.graph[idx];
            if !existing.recursive.is_recursive() && node.recursive.is_recursive() {
                existing.recursive = node.recursive;
            }
            return idx;
        }
        let key = node.key();
        let idx = self.graph.add_node(node);
        self.index.insert(key, idx);
        idx
    }

    /// Connect two snapshots. An existing edge between them is kept as is.
    pub fn add_edge(
        &mut self,
        source: NodeIndex,
        target: NodeIndex,
        transformation: Option<Arc<Transformation>>,
    ) -> EdgeIndex {
        if let Some(edge) = self.graph.find_edge(source, target) {
            return edge;
        }
        let data = transformation
            .map(EdgeData::new)
            .unwrap_or_else(EdgeData::unlabeled);
        self.graph.add_edge(source, target, data)
    }

    /// Insert both snapshots and the edge between them.
    pub fn add_step(
        &mut self,
        source: Node,
        target: Node,
        transformation: Option<Arc<Transformation>>,
    ) -> (NodeIndex, NodeIndex) {
        let a = self.add_node(source);
        let b = self.add_node(target);
        self.add_edge(a, b, transformation);
        (a, b)
    }

    /// Snapshot at `idx`.
    pub fn node(&self, idx: NodeIndex) -> Option<&Node> {
        self.graph.node_weight(idx)
    }

    /// Mutable snapshot at `idx`.
    pub fn node_mut(&mut self, idx: NodeIndex) -> Option<&mut Node> {
        self.graph.node_weight_mut(idx)
    }

    /// Index of the snapshot equal to `node`, if present.
    pub fn index_of(&self, node: &Node) -> Option<NodeIndex> {
        self.index.get(&node.key()).copied()
    }

    /// Index of the node with this id in this graph (sub-graphs not searched).
    pub fn index_by_id(&self, id: NodeId) -> Option<NodeIndex> {
        self.graph
            .node_indices()
            .find(|&idx| self.graph[idx].id == id)
    }

    /// All node indices.
    pub fn node_indices(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.graph.node_indices()
    }

    /// All snapshots, in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// All edges as `(source, target, data)`.
    pub fn edges(&self) -> impl Iterator<Item = (&Node, &Node, &EdgeData)> {
        self.graph
            .edge_references()
            .map(|e| (&self.graph[e.source()], &self.graph[e.target()], e.weight()))
    }

    /// Data on the edge `source -> target`, if any.
    pub fn edge(&self, source: NodeIndex, target: NodeIndex) -> Option<&EdgeData> {
        self.graph
            .find_edge(source, target)
            .and_then(|e| self.graph.edge_weight(e))
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// True if the graph has no snapshots.
    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Direct predecessors, lowest index first.
    pub fn predecessors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Incoming)
            .collect();
        out.sort();
        out
    }

    /// Direct successors, lowest index first.
    pub fn successors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(idx, Direction::Outgoing)
            .collect();
        out.sort();
        out
    }

    /// Number of incoming edges.
    pub fn in_degree(&self, idx: NodeIndex) -> usize {
        self.graph
            .edges_directed(idx, Direction::Incoming)
            .count()
    }

    /// Number of outgoing edges.
    pub fn out_degree(&self, idx: NodeIndex) -> usize {
        self.graph
            .edges_directed(idx, Direction::Outgoing)
            .count()
    }

    /// Nodes without incoming edges.
    pub fn roots(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&idx| self.in_degree(idx) == 0)
            .collect()
    }

    /// Nodes without outgoing edges.
    pub fn leaves(&self) -> Vec<NodeIndex> {
        self.graph
            .node_indices()
            .filter(|&idx| self.out_degree(idx) == 0)
            .collect()
    }

    /// The single node without incoming edges.
    pub fn fact_node(&self) -> GraphResult<NodeIndex> {
        match self.roots().as_slice() {
            [root] => Ok(*root),
            roots => Err(GraphError::FactNode { count: roots.len() }),
        }
    }

    /// Node indices in topological order; insertion order if the graph has a cycle.
    pub fn topological_order(&self) -> Vec<NodeIndex> {
        toposort(&self.graph, None).unwrap_or_else(|_| self.graph.node_indices().collect())
    }

    /// Add every node and edge of `other`, collapsing equal snapshots.
    pub fn union(&mut self, other: &ReasonGraph) {
        let mut mapping: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        for idx in other.graph.node_indices() {
            mapping.insert(idx, self.add_node(other.graph[idx].clone()));
        }
        for edge in other.graph.edge_references() {
            self.add_edge(
                mapping[&edge.source()],
                mapping[&edge.target()],
                edge.weight().transformation.clone(),
            );
        }
    }

    /// Structural equality up to node ids and atom identities.
    ///
    /// Snapshots must agree on atoms, diff, rule number and reasons; edges on
    /// their transformation id; embedded recursion graphs recursively.
    pub fn is_isomorphic(&self, other: &ReasonGraph) -> bool {
        is_isomorphic_matching(
            &self.graph,
            &other.graph,
            |a: &Node, b: &Node| {
                a.same_snapshot(b)
                    && match (&a.recursive, &b.recursive) {
                        (Recursion::Expanded(x), Recursion::Expanded(y)) => x.is_isomorphic(y),
                        (x, y) => x.is_recursive() == y.is_recursive()
                            && x.subgraph().is_none()
                            && y.subgraph().is_none(),
                    }
            },
            |x: &EdgeData, y: &EdgeData| x.transformation_id() == y.transformation_id(),
        )
    }

    /// The underlying petgraph graph.
    pub fn inner(&self) -> &DiGraph<Node, EdgeData> {
        &self.graph
    }
}

impl std::fmt::Debug for ReasonGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReasonGraph")
            .field("nodes", &self.node_count())
            .field("edges", &self.edge_count())
            .finish()
    }
}
