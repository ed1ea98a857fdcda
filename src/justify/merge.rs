//! Merging the per-model chains and closing the graph with pass-through steps.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::SymbolError;
use crate::graph::{Node, ReasonGraph};
use crate::program::{AnalyzedProgram, Transformation};
use crate::symbol::AtomicIdAllocator;

/// Union of all chains. Equal snapshots collapse, so shared prefixes are shared nodes.
///
/// The fact node is inserted first so it is present even when `paths` is empty.
pub fn join_paths(fact_node: &Node, paths: &[ReasonGraph]) -> ReasonGraph {
    let mut merged = ReasonGraph::new();
    merged.add_node(fact_node.clone());
    for path in paths {
        merged.union(path);
    }
    merged
}

/// Append one empty step per leaf for the rules no model exercises.
///
/// All new edges share one transformation whose id follows the last real one.
pub fn append_pass_through(
    graph: &mut ReasonGraph,
    analyzed: &AnalyzedProgram,
    ids: &AtomicIdAllocator,
) -> Result<(), SymbolError> {
    if analyzed.pass_through.is_empty() {
        return Ok(());
    }
    let next_id = analyzed
        .transformations
        .iter()
        .map(|t| t.id + 1)
        .max()
        .unwrap_or(0);
    let transformation = Arc::new(Transformation::new(next_id, analyzed.pass_through.clone()));

    for leaf in graph.leaves() {
        let Some(atoms) = graph.node(leaf).map(|n| n.atoms.clone()) else {
            continue;
        };
        let node = Node::new(ids.next_node_id()?, BTreeSet::new(), next_id as i64, atoms);
        let target = graph.add_node(node);
        graph.add_edge(leaf, target, Some(transformation.clone()));
    }
    tracing::debug!(
        transformation = next_id,
        rules = analyzed.pass_through.len(),
        "appended pass-through steps"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{Literal, Rule, SymbolicAtom};
    use crate::symbol::{IdentifiedAtom, Symbol};

    fn atoms(ids: &AtomicIdAllocator, names: &[&str]) -> BTreeSet<IdentifiedAtom> {
        names
            .iter()
            .map(|n| ids.identify(Symbol::constant(*n)).unwrap())
            .collect()
    }

    fn two_leaves(ids: &AtomicIdAllocator) -> (Node, Vec<ReasonGraph>) {
        let t = Arc::new(Transformation::new(0, vec![]));
        let facts = Node::facts(ids.next_node_id().unwrap(), atoms(ids, &["f"]));
        let paths = ["x", "y"]
            .into_iter()
            .map(|leaf| {
                let mut g = ReasonGraph::new();
                g.add_step(
                    facts.clone(),
                    Node::new(ids.next_node_id().unwrap(), atoms(ids, &[leaf]), 0, atoms(ids, &["f", leaf])),
                    Some(t.clone()),
                );
                g
            })
            .collect();
        (facts, paths)
    }

    #[test]
    fn join_shares_the_fact_node() {
        let ids = AtomicIdAllocator::new();
        let (facts, paths) = two_leaves(&ids);
        let merged = join_paths(&facts, &paths);
        assert_eq!(merged.node_count(), 3);
        assert_eq!(merged.edge_count(), 2);
        assert!(merged.fact_node().is_ok());

        let lonely = join_paths(&facts, &[]);
        assert_eq!(lonely.node_count(), 1);
    }

    #[test]
    fn pass_through_closes_every_leaf() {
        let ids = AtomicIdAllocator::new();
        let (facts, paths) = two_leaves(&ids);
        let mut merged = join_paths(&facts, &paths);
        let analyzed = AnalyzedProgram {
            transformations: vec![Arc::new(Transformation::new(0, vec![]))],
            pass_through: vec![Rule::constraint(vec![Literal::positive(SymbolicAtom::new(
                "z",
                vec![],
            ))])],
            ..Default::default()
        };
        append_pass_through(&mut merged, &analyzed, &ids).unwrap();

        assert_eq!(merged.node_count(), 5);
        let leaves = merged.leaves();
        assert_eq!(leaves.len(), 2);
        let labels: Vec<Arc<Transformation>> = leaves
            .iter()
            .flat_map(|&l| merged.predecessors(l).into_iter().map(move |p| (p, l)))
            .filter_map(|(p, l)| merged.edge(p, l)?.transformation.clone())
            .collect();
        assert_eq!(labels.len(), 2);
        assert!(Arc::ptr_eq(&labels[0], &labels[1]));
        assert_eq!(labels[0].id, 1);
        assert_eq!(labels[0].rule_texts(), vec![":- z.".to_string()]);
        for leaf in leaves {
            let node = merged.node(leaf).unwrap();
            assert!(node.diff.is_empty());
            assert_eq!(node.rule_nr, 1);
        }
    }

    #[test]
    fn nothing_to_pass_through() {
        let ids = AtomicIdAllocator::new();
        let (facts, paths) = two_leaves(&ids);
        let mut merged = join_paths(&facts, &paths);
        append_pass_through(&mut merged, &AnalyzedProgram::default(), &ids).unwrap();
        assert_eq!(merged.node_count(), 3);
    }
}
