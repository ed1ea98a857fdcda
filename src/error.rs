//! Rich diagnostic error types for the justification engine.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]` derives,
//! providing error codes, help text, and source chains so users know exactly what
//! went wrong and how to fix it.

use miette::Diagnostic;
use thiserror::Error;

/// Top-level error type for graph construction and inspection.
///
/// Each variant wraps a subsystem-specific error, preserving the full diagnostic
/// chain (error codes, help text, source spans) through to the user.
#[derive(Debug, Error, Diagnostic)]
pub enum JustifyError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Oracle(#[from] OracleError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Symbol(#[from] SymbolError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),
}

// ---------------------------------------------------------------------------
// Oracle errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum OracleError {
    #[error("grounding failed: {message}")]
    #[diagnostic(
        code(justify::oracle::ground),
        help(
            "The evaluator could not ground the generated program. \
             Check the input program for syntax errors and make sure the \
             reserved predicate names do not clash with user predicates."
        )
    )]
    Ground { message: String },

    #[error("solving failed: {message}")]
    #[diagnostic(
        code(justify::oracle::solve),
        help("The evaluator aborted while solving the generated program.")
    )]
    Solve { message: String },

    #[error("malformed atom `{atom}`: expected {expected}")]
    #[diagnostic(
        code(justify::oracle::malformed_atom),
        help(
            "The evaluator returned an atom of the reserved justification predicate \
             that does not have the shape `h(Index, Atom, (Reason, ...))`."
        )
    )]
    MalformedAtom { atom: String, expected: String },
}

/// Errors raised by the iterative recursion solver.
///
/// The recursion expander treats every one of these as "no internal explanation".
#[derive(Debug, Error, Diagnostic)]
pub enum SolverError {
    #[error("recursion did not reach a fixpoint within {limit} iterations")]
    #[diagnostic(
        code(justify::solver::iteration_limit),
        help(
            "The recursive transformation kept producing atoms. Increase \
             `max_recursion_iterations` in the configuration if the recursion is finite."
        )
    )]
    IterationLimit { limit: usize },

    #[error("recursion solver evaluator failure: {message}")]
    #[diagnostic(code(justify::solver::oracle))]
    Oracle { message: String },
}

// ---------------------------------------------------------------------------
// Symbol errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum SymbolError {
    #[error("identity allocator exhausted: cannot allocate more than u64::MAX identities")]
    #[diagnostic(
        code(justify::symbol::exhausted),
        help(
            "The identity space is exhausted. This requires 2^64 allocations \
             and points at an allocation loop."
        )
    )]
    AllocatorExhausted,
}

// ---------------------------------------------------------------------------
// Graph errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum GraphError {
    #[error("no transformation with index {rule_nr}")]
    #[diagnostic(
        code(justify::graph::unknown_transformation),
        help(
            "A production point refers to a transformation index that the \
             analyzed program does not contain. The transformed program and \
             the transformation list are out of sync."
        )
    )]
    UnknownTransformation { rule_nr: i64 },

    #[error("link refers to unknown node {node}")]
    #[diagnostic(
        code(justify::graph::dangling_link),
        help("Every link of a node-link document must connect two listed nodes.")
    )]
    DanglingLink { node: String },

    #[error("node id {node} occurs more than once")]
    #[diagnostic(
        code(justify::graph::duplicate_node_id),
        help("Node ids of a node-link document must be unique.")
    )]
    DuplicateNodeId { node: String },

    #[error("graph has {count} nodes without incoming edges, expected exactly one fact node")]
    #[diagnostic(code(justify::graph::fact_node))]
    FactNode { count: usize },
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(justify::config::read),
        help("Ensure the config file exists and is valid TOML.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}")]
    #[diagnostic(
        code(justify::config::parse),
        help("Check the TOML syntax in the config file. {message}")
    )]
    Parse { path: String, message: String },

    #[error("failed to serialize config for {path}")]
    #[diagnostic(code(justify::config::serialize), help("{message}"))]
    Serialize { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(justify::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration: {message}")]
    #[diagnostic(code(justify::config::invalid))]
    Invalid { message: String },
}

// ---------------------------------------------------------------------------
// Store errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("I/O error on {path}")]
    #[diagnostic(
        code(justify::store::io),
        help(
            "A filesystem operation failed. Check that the directory exists, \
             has correct permissions, and that the disk is not full."
        )
    )]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {message}")]
    #[diagnostic(
        code(justify::store::serde),
        help(
            "The stored graph is not a valid node-link document. \
             Rebuild the graph and save it again."
        )
    )]
    Serialization { message: String },
}

/// Convenience alias for functions returning justification results.
pub type JustifyResult<T> = std::result::Result<T, JustifyError>;
