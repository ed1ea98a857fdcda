//! Iteration-by-iteration explanation of a recursive step.
//!
//! The recursive transformation is rewritten into a justification program
//! (see [`crate::program::rewrite`]) and handed to the [`RecursionSolver`],
//! seeded with the atoms that held before the step. The reported
//! `(iteration, atom, reasons)` triples become a small chain of snapshots.
//! Expansion is best effort: any solver failure means "no explanation".

use std::collections::BTreeSet;

use crate::error::SymbolError;
use crate::graph::{Node, ReasonGraph, Recursion};
use crate::oracle::{RecursionRequest, RecursionSolver};
use crate::program::{ReservedNames, Transformation, rewrite};
use crate::symbol::{AtomicIdAllocator, IdentifiedAtom, Symbol};

use super::assemble::{assemble_nodes, insert_atoms};
use super::production::ProductionPoint;

/// Expands recursive steps of one chain into traces.
pub struct RecursionExpander<'a> {
    solver: &'a dyn RecursionSolver,
    names: &'a ReservedNames,
    max_iterations: usize,
    ids: &'a AtomicIdAllocator,
}

impl<'a> RecursionExpander<'a> {
    pub fn new(
        solver: &'a dyn RecursionSolver,
        names: &'a ReservedNames,
        max_iterations: usize,
        ids: &'a AtomicIdAllocator,
    ) -> Self {
        Self {
            solver,
            names,
            max_iterations,
            ids,
        }
    }

    /// Explain how `transformation` produced `produced` starting from `before`.
    ///
    /// Returns [`Recursion::No`] when the solver fails, reports a malformed
    /// atom, or the trace has no edge. The identities of `produced` are
    /// reused inside the trace.
    pub fn expand(
        &self,
        before: &BTreeSet<IdentifiedAtom>,
        produced: &BTreeSet<IdentifiedAtom>,
        transformation: &Transformation,
    ) -> Result<Recursion, SymbolError> {
        let init: Vec<Symbol> = before.iter().map(|a| a.symbol.clone()).collect();
        let program = rewrite::recursion_program(transformation, self.names);
        let request = RecursionRequest {
            init: &init,
            program: &program,
            justification: &self.names.justification,
            model: &self.names.model,
            iteration: &self.names.iteration,
            max_iterations: self.max_iterations,
        };

        let mut reported: BTreeSet<Symbol> = BTreeSet::new();
        let outcome = self.solver.solve(&request, &mut |atom: Symbol| {
            reported.insert(atom);
        });
        if let Err(e) = outcome {
            tracing::warn!(
                transformation = transformation.id,
                error = %e,
                "recursion expansion abandoned"
            );
            return Ok(Recursion::No);
        }

        let points = match reported
            .iter()
            .map(ProductionPoint::try_from)
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(points) => points,
            Err(e) => {
                tracing::warn!(
                    transformation = transformation.id,
                    error = %e,
                    "recursion expansion abandoned"
                );
                return Ok(Recursion::No);
            }
        };

        let mut nodes = vec![Node::facts(self.ids.next_node_id()?, before.clone())];
        nodes.extend(assemble_nodes(&points, &[], false, produced, self.ids)?);
        insert_atoms(&mut nodes);

        let mut trace = ReasonGraph::new();
        for pair in nodes[1..].windows(2) {
            trace.add_step(pair[0].clone(), pair[1].clone(), None);
        }
        if trace.edge_count() == 0 {
            return Ok(Recursion::No);
        }
        tracing::debug!(
            transformation = transformation.id,
            iterations = trace.node_count(),
            "expanded recursive step"
        );
        Ok(Recursion::Expanded(Box::new(trace)))
    }
}
