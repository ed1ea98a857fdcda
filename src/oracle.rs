//! Evaluator collaborators.
//!
//! The engine never grounds or solves anything itself. It builds program text
//! and asks an [`Oracle`] for ground atoms, and hands recursive transformations
//! to a [`RecursionSolver`] that runs the iteration-by-iteration fixpoint trace.
//! Both are narrow traits so tests can script them.

use crate::error::{OracleError, SolverError};
use crate::program::Program;
use crate::symbol::{Signature, Symbol};

/// Result type for oracle calls.
pub type OracleResult<T> = std::result::Result<T, OracleError>;

/// What to read back after grounding and solving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// Every ground atom the grounder classifies as a fact.
    Facts,
    /// Every derived atom with this name and arity.
    Signature(Signature),
}

/// A stateless logic-program evaluator.
pub trait Oracle: Send + Sync {
    /// Ground and solve `program` in one pass, returning the atoms selected by `query`.
    fn ground_and_solve(&self, program: &Program, query: &Query) -> OracleResult<Vec<Symbol>>;
}

impl<T: Oracle + ?Sized> Oracle for &T {
    fn ground_and_solve(&self, program: &Program, query: &Query) -> OracleResult<Vec<Symbol>> {
        (**self).ground_and_solve(program, query)
    }
}

/// Input of one recursion trace.
#[derive(Debug, Clone, Copy)]
pub struct RecursionRequest<'a> {
    /// Atoms true before the recursive step.
    pub init: &'a [Symbol],
    /// Justification program from [`crate::program::rewrite::recursion_program`].
    pub program: &'a str,
    /// Justification predicate whose `(iteration, atom, reasons)` atoms are reported.
    pub justification: &'a str,
    /// Model-accumulator predicate.
    pub model: &'a str,
    /// Iteration-index predicate.
    pub iteration: &'a str,
    /// Abort with [`SolverError::IterationLimit`] after this many iterations.
    pub max_iterations: usize,
}

/// Iterative solver for recursive transformations.
///
/// Grounds and solves a growing program one iteration at a time, calling
/// `on_atom` once per derived justification atom, until no new atom appears.
pub trait RecursionSolver: Send + Sync {
    fn solve(
        &self,
        request: &RecursionRequest<'_>,
        on_atom: &mut dyn FnMut(Symbol),
    ) -> Result<(), SolverError>;
}

impl<T: RecursionSolver + ?Sized> RecursionSolver for &T {
    fn solve(
        &self,
        request: &RecursionRequest<'_>,
        on_atom: &mut dyn FnMut(Symbol),
    ) -> Result<(), SolverError> {
        (**self).solve(request, on_atom)
    }
}

/// A solver for programs without recursive transformations.
///
/// Every request fails, which the recursion expander reports as "no internal
/// explanation".
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRecursionSolver;

impl RecursionSolver for NoRecursionSolver {
    fn solve(
        &self,
        _request: &RecursionRequest<'_>,
        _on_atom: &mut dyn FnMut(Symbol),
    ) -> Result<(), SolverError> {
        Err(SolverError::Oracle {
            message: "no recursion solver configured".into(),
        })
    }
}
