//! File persistence of a merged graph as node-link JSON.

use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::graph::ReasonGraph;

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// One graph document on disk.
#[derive(Debug, Clone)]
pub struct GraphStore {
    path: PathBuf,
}

impl GraphStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    /// Write `graph`, replacing any previous document.
    pub fn save(&self, graph: &ReasonGraph) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(graph).map_err(|e| StoreError::Serialization {
            message: format!("failed to serialize graph: {e}"),
        })?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        std::fs::write(&self.path, json).map_err(|e| self.io_error(e))?;
        tracing::debug!(
            path = %self.path.display(),
            nodes = graph.node_count(),
            "saved graph"
        );
        Ok(())
    }

    /// Read the stored graph. A missing document is an empty graph.
    pub fn load(&self) -> StoreResult<ReasonGraph> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ReasonGraph::new()),
            Err(e) => return Err(self.io_error(e)),
        };
        serde_json::from_str(&content).map_err(|e| StoreError::Serialization {
            message: format!("failed to parse {}: {e}", self.path.display()),
        })
    }

    /// Remove the stored document, if any.
    pub fn clear(&self) -> StoreResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error(e)),
        }
    }
}
