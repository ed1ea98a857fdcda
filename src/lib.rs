// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # asp-justify
//!
//! Justification graphs for answer set programs: for each stable model, which
//! atoms became true at which transformation, and which earlier atoms justify
//! them.
//!
//! ## Architecture
//!
//! - **Atoms** (`symbol`): ground symbols, identity tokens, atomic id allocation
//! - **Programs** (`program`): rule AST, ordered transformations, meta-program text
//! - **Evaluator** (`oracle`): narrow traits over grounding/solving and the recursion trace
//! - **Graph** (`graph`): petgraph DAG of derivation snapshots, node-link JSON, queries
//! - **Construction** (`justify`): facts → production points → chains → merged graph
//! - **Persistence** (`store`, `config`): graph documents and TOML configuration
//!
//! ## Library usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use asp_justify::config::JustifyConfig;
//! use asp_justify::justify::Justifier;
//! use asp_justify::oracle::{Oracle, OracleResult, Query};
//! use asp_justify::program::{AnalyzedProgram, Program, StableModel};
//! use asp_justify::symbol::Symbol;
//!
//! struct MyEvaluator;
//! impl Oracle for MyEvaluator {
//!     fn ground_and_solve(&self, _: &Program, _: &Query) -> OracleResult<Vec<Symbol>> {
//!         Ok(vec![])
//!     }
//! }
//!
//! let justifier = Justifier::new(Arc::new(MyEvaluator), JustifyConfig::default()).unwrap();
//! let graph = justifier
//!     .build_graph(&AnalyzedProgram::default(), &[StableModel::default()])
//!     .unwrap();
//! println!("{} snapshots", graph.node_count());
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod justify;
pub mod oracle;
pub mod program;
pub mod store;
pub mod symbol;
