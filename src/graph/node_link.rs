//! Node-link serialization.
//!
//! The document lists every node with all its attributes and every link as
//! `(source id, target id, transformation)`. Recursion sub-graphs are nested
//! node-link documents inside their node. Converting back rebuilds the petgraph
//! arena and re-shares one `Arc<Transformation>` per transformation id.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::GraphError;
use crate::program::Transformation;
use crate::symbol::NodeId;

use super::index::GraphResult;
use super::{Node, ReasonGraph};

/// One link of a node-link document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformation: Option<Arc<Transformation>>,
}

/// Node-link form of a [`ReasonGraph`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeLinkGraph {
    pub directed: bool,
    pub multigraph: bool,
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl From<&ReasonGraph> for NodeLinkGraph {
    fn from(graph: &ReasonGraph) -> Self {
        let inner = graph.inner();
        let links = inner
            .edge_indices()
            .filter_map(|e| {
                let (source, target) = inner.edge_endpoints(e)?;
                Some(Link {
                    source: inner[source].id,
                    target: inner[target].id,
                    transformation: inner[e].transformation.clone(),
                })
            })
            .collect();
        Self {
            directed: true,
            multigraph: false,
            nodes: graph.nodes().cloned().collect(),
            links,
        }
    }
}

impl TryFrom<NodeLinkGraph> for ReasonGraph {
    type Error = GraphError;

    fn try_from(doc: NodeLinkGraph) -> GraphResult<Self> {
        let mut graph = ReasonGraph::new();
        let mut by_id = HashMap::new();
        for node in doc.nodes {
            let id = node.id;
            let idx = graph.add_node(node);
            if by_id.insert(id, idx).is_some() {
                return Err(GraphError::DuplicateNodeId {
                    node: id.to_string(),
                });
            }
        }

        let mut shared: HashMap<usize, Arc<Transformation>> = HashMap::new();
        for link in doc.links {
            let lookup = |id: NodeId| {
                by_id.get(&id).copied().ok_or_else(|| GraphError::DanglingLink {
                    node: id.to_string(),
                })
            };
            let source = lookup(link.source)?;
            let target = lookup(link.target)?;
            let transformation = link
                .transformation
                .map(|t| shared.entry(t.id).or_insert(t).clone());
            graph.add_edge(source, target, transformation);
        }
        Ok(graph)
    }
}

impl Serialize for ReasonGraph {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        NodeLinkGraph::from(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ReasonGraph {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let doc = NodeLinkGraph::deserialize(deserializer)?;
        ReasonGraph::try_from(doc).map_err(serde::de::Error::custom)
    }
}
