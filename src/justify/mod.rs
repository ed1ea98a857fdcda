//! Justification graph construction.
//!
//! [`Justifier`] runs the whole pipeline for an analyzed program and its
//! stable models:
//!
//! 1. [`facts`]: ground the source once and collect the base facts.
//! 2. [`production`]: per model, find the earliest transformation that
//!    justifies each atom.
//! 3. [`assemble`] and [`chain`]: turn those points into a linear chain of
//!    snapshots, expanding recursive steps with [`recursion`].
//! 4. [`merge`]: union the chains, identify reasons and append pass-through
//!    steps.

pub mod assemble;
pub mod chain;
pub mod facts;
pub mod merge;
pub mod production;
pub mod recursion;

use std::collections::BTreeSet;
use std::sync::Arc;

use rayon::prelude::*;

use crate::config::{FailurePolicy, JustifyConfig};
use crate::error::JustifyResult;
use crate::graph::reasons::{IdentifyReasons, ReasonDeduplicator};
use crate::graph::{Node, ReasonGraph};
use crate::oracle::{NoRecursionSolver, Oracle, RecursionSolver};
use crate::program::{AnalyzedProgram, StableModel};
use crate::symbol::{AtomicIdAllocator, IdentifiedAtom, Symbol};

use production::ProductionPoint;
use recursion::RecursionExpander;

/// Builds justification graphs.
///
/// Owns the evaluator collaborators, the reason strategy and the identity
/// allocator. Node and atom ids stay unique across every graph built by the
/// same `Justifier`.
pub struct Justifier {
    oracle: Arc<dyn Oracle>,
    solver: Arc<dyn RecursionSolver>,
    reasons: Box<dyn ReasonDeduplicator>,
    config: JustifyConfig,
    ids: AtomicIdAllocator,
}

impl Justifier {
    /// Create a justifier with [`IdentifyReasons`] and no recursion solver.
    pub fn new(oracle: Arc<dyn Oracle>, config: JustifyConfig) -> JustifyResult<Self> {
        config.validate()?;
        tracing::debug!(
            max_recursion_iterations = config.max_recursion_iterations,
            parallel = config.parallel,
            "initializing justifier"
        );
        Ok(Self {
            oracle,
            solver: Arc::new(NoRecursionSolver),
            reasons: Box::new(IdentifyReasons),
            config,
            ids: AtomicIdAllocator::new(),
        })
    }

    /// Use `solver` to explain recursive steps.
    pub fn with_recursion_solver(mut self, solver: Arc<dyn RecursionSolver>) -> Self {
        self.solver = solver;
        self
    }

    /// Replace the reason identification strategy.
    pub fn with_reason_deduplicator(mut self, reasons: impl ReasonDeduplicator + 'static) -> Self {
        self.reasons = Box::new(reasons);
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &JustifyConfig {
        &self.config
    }

    /// Base facts of `analyzed.source`.
    pub fn extract_facts(&self, analyzed: &AnalyzedProgram) -> JustifyResult<BTreeSet<Symbol>> {
        Ok(facts::extract_facts(self.oracle.as_ref(), &analyzed.source)?)
    }

    /// Production points of one model.
    pub fn production_points(
        &self,
        analyzed: &AnalyzedProgram,
        facts: &BTreeSet<Symbol>,
        model: &StableModel,
    ) -> JustifyResult<Vec<ProductionPoint>> {
        Ok(production::extract_production_points(
            self.oracle.as_ref(),
            analyzed,
            facts,
            model,
        )?)
    }

    /// The linear chain explaining one model.
    pub fn build_chain(
        &self,
        analyzed: &AnalyzedProgram,
        facts: &BTreeSet<Symbol>,
        fact_node: &Node,
        model: &StableModel,
    ) -> JustifyResult<ReasonGraph> {
        let points = self.production_points(analyzed, facts, model)?;
        let expander = RecursionExpander::new(
            self.solver.as_ref(),
            &analyzed.names,
            self.config.max_recursion_iterations,
            &self.ids,
        );
        chain::build_chain(analyzed, model, &points, fact_node, &expander, &self.ids)
    }

    /// The merged justification graph of all `models`.
    ///
    /// A facts-only program yields the fact node alone. Otherwise every model
    /// is chained, the chains are merged in model order, reasons are
    /// identified and pass-through steps appended. A model whose evaluation
    /// fails aborts the build or is skipped, see [`FailurePolicy`].
    pub fn build_graph(
        &self,
        analyzed: &AnalyzedProgram,
        models: &[StableModel],
    ) -> JustifyResult<ReasonGraph> {
        let facts = self.extract_facts(analyzed)?;
        let identified = facts
            .iter()
            .map(|f| self.ids.identify(f.clone()))
            .collect::<Result<BTreeSet<IdentifiedAtom>, _>>()?;
        let fact_node = Node::facts(self.ids.next_node_id()?, identified);

        if analyzed.transformations.is_empty() {
            tracing::info!(facts = %fact_node, "program only contains facts");
            let mut graph = ReasonGraph::new();
            graph.add_node(fact_node);
            return Ok(graph);
        }

        let chain_of = |model: &StableModel| self.build_chain(analyzed, &facts, &fact_node, model);
        let chains: Vec<JustifyResult<ReasonGraph>> = if self.config.parallel {
            models.par_iter().map(chain_of).collect()
        } else {
            models.iter().map(chain_of).collect()
        };

        let mut paths = Vec::with_capacity(chains.len());
        for (model, chain) in models.iter().zip(chains) {
            match (chain, self.config.on_model_failure) {
                (Ok(path), _) => paths.push(path),
                (Err(e), FailurePolicy::Abort) => return Err(e),
                (Err(e), FailurePolicy::Skip) => {
                    tracing::warn!(model = %model, error = %e, "skipping model that could not be explained");
                }
            }
        }

        let merged = merge::join_paths(&fact_node, &paths);
        let mut graph = self.reasons.identify(merged);
        merge::append_pass_through(&mut graph, analyzed, &self.ids)?;
        tracing::info!(
            models = paths.len(),
            nodes = graph.node_count(),
            edges = graph.edge_count(),
            "built justification graph"
        );
        Ok(graph)
    }
}

impl std::fmt::Debug for Justifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Justifier")
            .field("config", &self.config)
            .field("next_id", &self.ids.peek_next())
            .finish()
    }
}
