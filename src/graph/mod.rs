//! Justification graph: derivation snapshots connected by transformations.
//!
//! - **Snapshots** ([`Node`]): the cumulative atom set after one transformation,
//!   the atoms new at that step, and why each new atom holds
//! - **Graph** ([`ReasonGraph`]): a petgraph DAG that collapses snapshot-equal
//!   nodes, so chains of different stable models share their common prefix
//! - **Node-link form** ([`node_link`]): lossless JSON representation
//!
//! A node may embed a whole sub-graph ([`Recursion::Expanded`]) explaining a
//! recursive step iteration by iteration. The sub-graph is its own arena owned
//! by the node, so there are no ownership cycles.

pub mod index;
pub mod node_link;
pub mod query;
pub mod reasons;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::program::Transformation;
use crate::symbol::{AtomId, IdentifiedAtom, NodeId, Symbol};

pub use index::{GraphResult, NodeKey, ReasonGraph};

/// One antecedent of a derived atom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReasonRef {
    pub symbol: Symbol,
    /// The occurrence this antecedent refers to, once reasons were identified.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub occurrence: Option<AtomId>,
}

impl ReasonRef {
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            occurrence: None,
        }
    }
}

impl fmt::Display for ReasonRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// Internal explanation of a snapshot produced by a recursive transformation.
#[derive(Debug, Clone, Default)]
pub enum Recursion {
    /// Not recursive, or no explanation could be built.
    #[default]
    No,
    /// The fact snapshot of a model that adds nothing, where the first
    /// transformation is recursive.
    Marked,
    /// Iteration-by-iteration trace; edges carry no transformation.
    Expanded(Box<ReasonGraph>),
}

impl Recursion {
    pub fn is_recursive(&self) -> bool {
        !matches!(self, Recursion::No)
    }

    pub fn subgraph(&self) -> Option<&ReasonGraph> {
        match self {
            Recursion::Expanded(graph) => Some(graph),
            _ => None,
        }
    }
}

impl Serialize for Recursion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Recursion::No => serializer.serialize_bool(false),
            Recursion::Marked => serializer.serialize_bool(true),
            Recursion::Expanded(graph) => graph.serialize(serializer),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecursionRepr {
    Flag(bool),
    Graph(ReasonGraph),
}

impl<'de> Deserialize<'de> for Recursion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RecursionRepr::deserialize(deserializer)? {
            RecursionRepr::Flag(false) => Recursion::No,
            RecursionRepr::Flag(true) => Recursion::Marked,
            RecursionRepr::Graph(graph) => Recursion::Expanded(Box::new(graph)),
        })
    }
}

/// A derivation snapshot: the full state after applying transformation `rule_nr`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// Every atom true at this point.
    pub atoms: BTreeSet<IdentifiedAtom>,
    /// Atoms new at this step.
    pub diff: BTreeSet<IdentifiedAtom>,
    /// Transformation index, `-1` for the fact snapshot.
    pub rule_nr: i64,
    /// New atom (by its text) to the atoms justifying it.
    #[serde(default)]
    pub reason: BTreeMap<String, Vec<ReasonRef>>,
    #[serde(default)]
    pub recursive: Recursion,
}

impl Node {
    /// Rule number of the single fact snapshot.
    pub const FACTS: i64 = -1;

    pub fn new(
        id: NodeId,
        diff: BTreeSet<IdentifiedAtom>,
        rule_nr: i64,
        atoms: BTreeSet<IdentifiedAtom>,
    ) -> Self {
        Self {
            id,
            atoms,
            diff,
            rule_nr,
            reason: BTreeMap::new(),
            recursive: Recursion::No,
        }
    }

    /// The fact snapshot: atoms and diff are both the base facts.
    pub fn facts(id: NodeId, facts: BTreeSet<IdentifiedAtom>) -> Self {
        Self::new(id, facts.clone(), Self::FACTS, facts)
    }

    pub fn with_reason(mut self, reason: BTreeMap<String, Vec<ReasonRef>>) -> Self {
        self.reason = reason;
        self
    }

    pub fn is_facts(&self) -> bool {
        self.rule_nr == Self::FACTS
    }

    /// Identity for merging: the atom set and the rule number.
    pub fn key(&self) -> NodeKey {
        (
            self.atoms.iter().map(|a| a.symbol.clone()).collect(),
            self.rule_nr,
        )
    }

    /// Same atoms, same diff, same rule number and the same reason symbols.
    pub fn same_snapshot(&self, other: &Node) -> bool {
        let symbols = |refs: &Vec<ReasonRef>| -> Vec<Symbol> {
            refs.iter().map(|r| r.symbol.clone()).collect()
        };
        self.rule_nr == other.rule_nr
            && self.atoms == other.atoms
            && self.diff == other.diff
            && self.reason.len() == other.reason.len()
            && self
                .reason
                .iter()
                .zip(&other.reason)
                .all(|((ka, va), (kb, vb))| ka == kb && symbols(va) == symbols(vb))
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.atoms.contains(symbol)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let diff: Vec<String> = self.diff.iter().map(ToString::to_string).collect();
        write!(
            f,
            "{} [rule {}] +{{{}}} ({} atoms)",
            self.id,
            self.rule_nr,
            diff.join(", "),
            self.atoms.len()
        )
    }
}

/// Edge data stored on petgraph edges.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeData {
    /// Transformation that produced the target's diff; `None` inside recursion traces.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformation: Option<Arc<Transformation>>,
}

impl EdgeData {
    /// An edge labeled with the transformation that produced its target.
    pub fn new(transformation: Arc<Transformation>) -> Self {
        Self {
            transformation: Some(transformation),
        }
    }

    /// An edge of a recursion trace.
    pub fn unlabeled() -> Self {
        Self::default()
    }

    /// Id of the labeling transformation.
    pub fn transformation_id(&self) -> Option<usize> {
        self.transformation.as_ref().map(|t| t.id)
    }
}
