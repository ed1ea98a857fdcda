//! Read-only inspection of a finished justification graph.
//!
//! All functions take the graph explicitly; nothing here keeps state between calls.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;

use petgraph::graph::NodeIndex;
use serde::{Deserialize, Serialize};

use crate::program::Transformation;
use crate::symbol::{NodeId, Signature, Symbol};

use super::{Node, ReasonGraph};

/// What a snapshot represents to a reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Facts,
    Model,
    StableModel,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NodeKind::Facts => "Facts",
            NodeKind::Model => "Model",
            NodeKind::StableModel => "Stable Model",
        })
    }
}

/// One search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchHit {
    Signature(Signature),
    Node(NodeId),
    Transformation(usize),
}

/// The fact snapshot.
pub fn fact_node(graph: &ReasonGraph) -> Option<&Node> {
    graph.fact_node().ok().and_then(|idx| graph.node(idx))
}

/// Snapshots without outgoing edges, i.e. the explained stable models.
pub fn leaves(graph: &ReasonGraph) -> Vec<&Node> {
    graph
        .leaves()
        .into_iter()
        .filter_map(|idx| graph.node(idx))
        .collect()
}

/// Distinct edge transformations, ordered by id.
pub fn transformations(graph: &ReasonGraph) -> Vec<Arc<Transformation>> {
    let mut by_id: BTreeMap<usize, Arc<Transformation>> = BTreeMap::new();
    for (_, _, edge) in graph.edges() {
        if let Some(t) = &edge.transformation {
            by_id.entry(t.id).or_insert_with(|| t.clone());
        }
    }
    by_id.into_values().collect()
}

pub fn transformation(graph: &ReasonGraph, id: usize) -> Option<Arc<Transformation>> {
    graph
        .edges()
        .find_map(|(_, _, edge)| edge.transformation.clone().filter(|t| t.id == id))
}

/// Targets of the edges labeled with transformation `id`.
pub fn children_of(graph: &ReasonGraph, id: usize) -> Vec<&Node> {
    graph
        .edges()
        .filter(|(_, _, edge)| edge.transformation_id() == Some(id))
        .map(|(_, target, _)| target)
        .collect()
}

/// Find a node by id, descending into recursion sub-graphs.
pub fn find_node(graph: &ReasonGraph, id: NodeId) -> Option<&Node> {
    if let Some(node) = graph.nodes().find(|n| n.id == id) {
        return Some(node);
    }
    graph
        .nodes()
        .filter_map(|n| n.recursive.subgraph())
        .find_map(|sub| find_node(sub, id))
}

/// Kind of the node with `id`. Nodes inside recursion traces are always models.
pub fn node_kind(graph: &ReasonGraph, id: NodeId) -> Option<NodeKind> {
    match graph.index_by_id(id) {
        Some(idx) => Some(kind_at(graph, idx)),
        None => find_node(graph, id).map(|_| NodeKind::Model),
    }
}

fn kind_at(graph: &ReasonGraph, idx: NodeIndex) -> NodeKind {
    if graph.out_degree(idx) == 0 {
        NodeKind::StableModel
    } else if graph.in_degree(idx) == 0 {
        NodeKind::Facts
    } else {
        NodeKind::Model
    }
}

/// Atoms of a node grouped by predicate signature.
pub fn atoms_by_signature(
    graph: &ReasonGraph,
    id: NodeId,
) -> Option<BTreeMap<Signature, BTreeSet<Symbol>>> {
    let node = find_node(graph, id)?;
    let mut grouped: BTreeMap<Signature, BTreeSet<Symbol>> = BTreeMap::new();
    for atom in &node.atoms {
        if let Some(signature) = atom.symbol.signature() {
            grouped.entry(signature).or_default().insert(atom.symbol.clone());
        }
    }
    Some(grouped)
}

/// Signatures of every atom derived anywhere in the graph.
pub fn signatures(graph: &ReasonGraph) -> BTreeSet<Signature> {
    graph
        .nodes()
        .flat_map(|n| n.diff.iter())
        .filter_map(|a| a.symbol.signature())
        .collect()
}

/// Signatures first, then nodes whose atoms mention `query`, then
/// transformations whose rule text mentions it; at most `limit` hits.
pub fn search(graph: &ReasonGraph, query: &str, limit: usize) -> Vec<SearchHit> {
    let mut hits: Vec<SearchHit> = signatures(graph)
        .into_iter()
        .map(SearchHit::Signature)
        .collect();
    hits.extend(
        graph
            .nodes()
            .filter(|n| n.atoms.iter().any(|a| a.symbol.to_string().contains(query)))
            .map(|n| SearchHit::Node(n.id)),
    );
    hits.extend(
        transformations(graph)
            .into_iter()
            .filter(|t| t.rule_texts().iter().any(|r| r.contains(query)))
            .map(|t| SearchHit::Transformation(t.id)),
    );
    hits.truncate(limit);
    hits
}

/// Edges a viewer draws: hidden nodes are bridged, expanded recursion traces added.
///
/// With `shown == None` every node of the top-level graph is visible.
/// Bridging one hidden node connects each of its sources to each of its targets.
pub fn visible_edges(
    graph: &ReasonGraph,
    shown: Option<&HashSet<NodeId>>,
    expanded: &[NodeId],
) -> Vec<(NodeId, NodeId)> {
    let mut edges: BTreeSet<(NodeId, NodeId)> = graph
        .edges()
        .map(|(source, target, _)| (source.id, target.id))
        .collect();

    for id in expanded {
        if let Some(trace) = find_node(graph, *id).and_then(|n| n.recursive.subgraph()) {
            edges.extend(trace.edges().map(|(s, t, _)| (s.id, t.id)));
        }
    }

    let Some(shown) = shown else {
        return edges.into_iter().collect();
    };
    let hidden: Vec<NodeId> = graph
        .nodes()
        .map(|n| n.id)
        .filter(|id| !shown.contains(id))
        .collect();
    for node in hidden {
        let sources: Vec<NodeId> = edges.iter().filter(|e| e.1 == node).map(|e| e.0).collect();
        let targets: Vec<NodeId> = edges.iter().filter(|e| e.0 == node).map(|e| e.1).collect();
        edges.retain(|e| e.0 != node && e.1 != node);
        for &s in &sources {
            for &t in &targets {
                edges.insert((s, t));
            }
        }
    }
    edges.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::program::{Literal, Rule, SymbolicAtom, Term};
    use crate::symbol::{AtomicIdAllocator, IdentifiedAtom};

    fn atoms(alloc: &AtomicIdAllocator, items: &[Symbol]) -> BTreeSet<IdentifiedAtom> {
        items.iter().map(|s| alloc.identify(s.clone()).unwrap()).collect()
    }

    fn p(name: &str, n: i64) -> Symbol {
        Symbol::function(name, vec![Symbol::number(n)])
    }

    /// facts → b-step → a-step, plus a trace inside the a-step.
    fn chain(alloc: &AtomicIdAllocator) -> (ReasonGraph, [NodeId; 3], NodeId) {
        let rule = |head: &str, body: &str| {
            Rule::new(
                SymbolicAtom::new(head, vec![Term::variable("X")]),
                vec![Literal::positive(SymbolicAtom::new(body, vec![Term::variable("X")]))],
            )
        };
        let t0 = Arc::new(Transformation::new(0, vec![rule("b", "c")]));
        let t1 = Arc::new(Transformation::new(1, vec![rule("a", "b")]));

        let facts = Node::facts(alloc.next_node_id().unwrap(), atoms(alloc, &[p("c", 1)]));
        let b = Node::new(
            alloc.next_node_id().unwrap(),
            atoms(alloc, &[p("b", 1)]),
            0,
            atoms(alloc, &[p("c", 1), p("b", 1)]),
        );
        let mut trace = ReasonGraph::new();
        let inner = Node::new(
            alloc.next_node_id().unwrap(),
            atoms(alloc, &[p("a", 1)]),
            1,
            atoms(alloc, &[p("c", 1), p("b", 1), p("a", 1)]),
        );
        let inner_id = inner.id;
        trace.add_step(
            inner,
            Node::new(
                alloc.next_node_id().unwrap(),
                BTreeSet::new(),
                2,
                atoms(alloc, &[p("c", 1), p("b", 1), p("a", 1)]),
            ),
            None,
        );
        let mut a = Node::new(
            alloc.next_node_id().unwrap(),
            atoms(alloc, &[p("a", 1)]),
            1,
            atoms(alloc, &[p("c", 1), p("b", 1), p("a", 1)]),
        );
        a.recursive = crate::graph::Recursion::Expanded(Box::new(trace));
        let ids = [facts.id, b.id, a.id];

        let mut graph = ReasonGraph::new();
        let (_, bi) = graph.add_step(facts, b, Some(t0));
        let ai = graph.add_node(a);
        graph.add_edge(bi, ai, Some(t1));
        (graph, ids, inner_id)
    }

    #[test]
    fn kinds_and_lookup() {
        let alloc = AtomicIdAllocator::new();
        let (graph, [f, b, a], inner) = chain(&alloc);
        assert_eq!(node_kind(&graph, f), Some(NodeKind::Facts));
        assert_eq!(node_kind(&graph, b), Some(NodeKind::Model));
        assert_eq!(node_kind(&graph, a), Some(NodeKind::StableModel));
        assert_eq!(node_kind(&graph, inner), Some(NodeKind::Model));
        assert_eq!(find_node(&graph, inner).unwrap().rule_nr, 1);
        assert_eq!(fact_node(&graph).unwrap().id, f);
        assert_eq!(leaves(&graph)[0].id, a);
        assert_eq!(NodeKind::StableModel.to_string(), "Stable Model");
    }

    #[test]
    fn transformations_and_children() {
        let alloc = AtomicIdAllocator::new();
        let (graph, [_, b, a], _) = chain(&alloc);
        let ids: Vec<usize> = transformations(&graph).iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(children_of(&graph, 0)[0].id, b);
        assert_eq!(children_of(&graph, 1)[0].id, a);
        assert!(transformation(&graph, 7).is_none());
        assert_eq!(
            transformation(&graph, 1).unwrap().rule_texts(),
            vec!["a(X) :- b(X).".to_string()]
        );
    }

    #[test]
    fn signatures_and_grouping() {
        let alloc = AtomicIdAllocator::new();
        let (graph, [_, _, a], _) = chain(&alloc);
        let sigs: Vec<String> = signatures(&graph).iter().map(ToString::to_string).collect();
        assert_eq!(sigs, vec!["a/1", "b/1", "c/1"]);
        let grouped = atoms_by_signature(&graph, a).unwrap();
        assert_eq!(grouped.len(), 3);
        assert!(grouped[&Signature::new("a", 1)].contains(&p("a", 1)));
    }

    #[test]
    fn search_orders_hits_and_limits() {
        let alloc = AtomicIdAllocator::new();
        let (graph, [_, b, a], _) = chain(&alloc);
        let hits = search(&graph, "b(", 10);
        assert_eq!(hits.len(), 3 + 2 + 2);
        assert!(hits[..3].iter().all(|h| matches!(h, SearchHit::Signature(_))));
        assert!(hits.contains(&SearchHit::Node(b)));
        assert!(hits.contains(&SearchHit::Node(a)));
        assert!(hits.contains(&SearchHit::Transformation(0)));
        assert!(hits.contains(&SearchHit::Transformation(1)));
        assert_eq!(search(&graph, "b(", 2).len(), 2);
    }

    #[test]
    fn hidden_nodes_are_bridged() {
        let alloc = AtomicIdAllocator::new();
        let (graph, [f, b, a], inner) = chain(&alloc);
        assert_eq!(visible_edges(&graph, None, &[]).len(), 2);

        let shown: HashSet<NodeId> = [f, a].into_iter().collect();
        assert_eq!(visible_edges(&graph, Some(&shown), &[]), vec![(f, a)]);

        let expanded = visible_edges(&graph, None, &[a]);
        assert_eq!(expanded.len(), 3);
        assert!(expanded.iter().any(|e| e.0 == inner));
        assert!(!expanded.contains(&(f, a)));
        let _ = b;
    }
}
