//! Base facts of the input program.

use std::collections::BTreeSet;

use crate::oracle::{Oracle, OracleResult, Query};
use crate::program::Program;
use crate::symbol::Symbol;

/// Ground `source` once and return every atom the grounder classifies as a fact.
pub fn extract_facts<O: Oracle + ?Sized>(oracle: &O, source: &str) -> OracleResult<BTreeSet<Symbol>> {
    let mut program = Program::new();
    program.add(source);
    let facts = oracle.ground_and_solve(&program, &Query::Facts)?;
    tracing::debug!(count = facts.len(), "extracted base facts");
    Ok(facts.into_iter().collect())
}
