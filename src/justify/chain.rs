//! The linear derivation chain of one stable model.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::error::{GraphError, JustifyResult};
use crate::graph::{Node, ReasonGraph, Recursion};
use crate::program::{AnalyzedProgram, StableModel, Transformation};
use crate::symbol::AtomicIdAllocator;

use super::assemble::{assemble_nodes, insert_atoms};
use super::production::ProductionPoint;
use super::recursion::RecursionExpander;

fn transformation_at(analyzed: &AnalyzedProgram, rule_nr: i64) -> JustifyResult<Arc<Transformation>> {
    usize::try_from(rule_nr)
        .ok()
        .and_then(|i| analyzed.transformations.iter().find(|t| t.id == i))
        .cloned()
        .ok_or_else(|| GraphError::UnknownTransformation { rule_nr }.into())
}

/// Chain `fact_node → step 0 → step 1 → …` for one model.
///
/// Every transformation gets a snapshot, with an empty diff where it derived
/// nothing. Steps of recursive transformations get an expanded trace when
/// one can be built. A model without any production point yields a single
/// edge from the fact node to an empty snapshot of the first transformation.
pub fn build_chain(
    analyzed: &AnalyzedProgram,
    model: &StableModel,
    points: &[ProductionPoint],
    fact_node: &Node,
    expander: &RecursionExpander<'_>,
    ids: &AtomicIdAllocator,
) -> JustifyResult<ReasonGraph> {
    let mut graph = ReasonGraph::new();

    if points.is_empty() {
        tracing::warn!(model = %model, "adding a model without reasons");
        let Some(first) = analyzed.transformations.iter().min_by_key(|t| t.id) else {
            graph.add_node(fact_node.clone());
            return Ok(graph);
        };
        let mut facts = fact_node.clone();
        if analyzed.is_recursive(first.id) {
            facts.recursive = Recursion::Marked;
        }
        let rule_nr = first.id as i64;
        let empty = Node::new(ids.next_node_id()?, BTreeSet::new(), rule_nr, facts.atoms.clone());
        graph.add_step(facts, empty, Some(first.clone()));
        return Ok(graph);
    }

    let relevant: Vec<i64> = analyzed.transformations.iter().map(|t| t.id as i64).collect();
    let mut nodes = vec![fact_node.clone()];
    nodes.extend(assemble_nodes(points, &relevant, true, &BTreeSet::new(), ids)?);
    insert_atoms(&mut nodes);

    for i in 1..nodes.len() {
        let transformation = transformation_at(analyzed, nodes[i].rule_nr)?;
        if analyzed.is_recursive(transformation.id) {
            let (before, rest) = nodes.split_at_mut(i);
            let step = &mut rest[0];
            step.recursive = expander.expand(&before[i - 1].atoms, &step.diff, &transformation)?;
        }
        let source = graph.add_node(nodes[i - 1].clone());
        let target = graph.add_node(nodes[i].clone());
        graph.add_edge(source, target, Some(transformation));
    }

    tracing::debug!(model = %model, steps = graph.edge_count(), "built derivation chain");
    Ok(graph)
}
