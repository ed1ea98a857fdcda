//! Reason identification on a merged graph.
//!
//! Reasons come out of the evaluator as plain atoms. Once chains of several
//! stable models are merged, one snapshot can be reached along several paths,
//! each holding its own occurrence of an antecedent. A [`ReasonDeduplicator`]
//! decides which occurrence each reason points at.

use std::collections::BTreeSet;

use crate::symbol::IdentifiedAtom;

use super::{ReasonGraph, Recursion};

/// Post-processing strategy applied to the merged graph.
pub trait ReasonDeduplicator: Send + Sync {
    fn identify(&self, graph: ReasonGraph) -> ReasonGraph;
}

/// Leaves every reason unbound.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepReasons;

impl ReasonDeduplicator for KeepReasons {
    fn identify(&self, graph: ReasonGraph) -> ReasonGraph {
        graph
    }
}

/// First-wins identification.
///
/// Each reason is bound to the occurrence held by the lowest-index predecessor
/// that contains it. Nodes without predecessors inside a recursion trace fall
/// back to the atoms before the enclosing step. Reasons found nowhere stay
/// unbound.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentifyReasons;

impl IdentifyReasons {
    fn identify_in(graph: &mut ReasonGraph, fallback: Option<&BTreeSet<IdentifiedAtom>>) {
        for idx in graph.topological_order() {
            let predecessors = graph.predecessors(idx);
            let sources: Vec<BTreeSet<IdentifiedAtom>> = if predecessors.is_empty() {
                fallback.into_iter().cloned().collect()
            } else {
                predecessors
                    .iter()
                    .filter_map(|&p| graph.node(p).map(|n| n.atoms.clone()))
                    .collect()
            };

            let Some(node) = graph.node_mut(idx) else {
                continue;
            };
            for reasons in node.reason.values_mut() {
                for reason in reasons.iter_mut() {
                    reason.occurrence = sources
                        .iter()
                        .find_map(|atoms| atoms.get(&reason.symbol))
                        .map(|atom| atom.id);
                }
            }

            // The trace starts from what held before this step.
            let before = sources.into_iter().next();
            if let Recursion::Expanded(trace) = &mut node.recursive {
                Self::identify_in(trace, before.as_ref());
            }
        }
    }
}

impl ReasonDeduplicator for IdentifyReasons {
    fn identify(&self, mut graph: ReasonGraph) -> ReasonGraph {
        Self::identify_in(&mut graph, None);
        graph
    }
}
