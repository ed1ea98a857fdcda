//! Ground atoms and identity tokens.
//!
//! A [`Symbol`] is an immutable ground term as produced by the evaluator, compared
//! structurally. An [`IdentifiedAtom`] pairs a symbol with an [`AtomId`] so the same
//! logical atom can be tracked as one occurrence across derivation snapshots.
//! The [`AtomicIdAllocator`] provides thread-safe token generation.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::num::NonZeroU64;
use std::sync::atomic::{self, AtomicU64};

use serde::{Deserialize, Serialize};

use crate::error::SymbolError;

/// A ground term: number, string, function (including tuples) or the two extrema.
///
/// Tuples are functions with an empty name. `positive == false` marks classical
/// negation (`-p(1)`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Symbol {
    Infimum,
    Number(i64),
    String(String),
    Function {
        name: String,
        args: Vec<Symbol>,
        positive: bool,
    },
    Supremum,
}

impl Symbol {
    /// A positive function symbol `name(args...)`.
    pub fn function(name: impl Into<String>, args: Vec<Symbol>) -> Self {
        Symbol::Function {
            name: name.into(),
            args,
            positive: true,
        }
    }

    /// A constant, i.e. a function without arguments.
    pub fn constant(name: impl Into<String>) -> Self {
        Symbol::function(name, Vec::new())
    }

    /// A tuple `(args...)`.
    pub fn tuple(args: Vec<Symbol>) -> Self {
        Symbol::function("", args)
    }

    pub fn number(n: i64) -> Self {
        Symbol::Number(n)
    }

    pub fn string(s: impl Into<String>) -> Self {
        Symbol::String(s.into())
    }

    /// Function name, `None` for non-function symbols.
    pub fn name(&self) -> Option<&str> {
        match self {
            Symbol::Function { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Function arguments; empty for non-function symbols.
    pub fn arguments(&self) -> &[Symbol] {
        match self {
            Symbol::Function { args, .. } => args,
            _ => &[],
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            Symbol::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Predicate signature of a (non-tuple) function symbol.
    pub fn signature(&self) -> Option<Signature> {
        match self {
            Symbol::Function { name, args, .. } if !name.is_empty() => {
                Some(Signature::new(name.clone(), args.len()))
            }
            _ => None,
        }
    }
}

fn write_args(f: &mut fmt::Formatter<'_>, args: &[impl fmt::Display]) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            f.write_str(",")?;
        }
        write!(f, "{arg}")?;
    }
    Ok(())
}

/// Writes `name(args)`, `name`, `(a,b)` or `(a,)` the way the evaluator prints them.
pub(crate) fn write_function(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    args: &[impl fmt::Display],
) -> fmt::Result {
    if name.is_empty() {
        f.write_str("(")?;
        write_args(f, args)?;
        if args.len() == 1 {
            f.write_str(",")?;
        }
        return f.write_str(")");
    }
    f.write_str(name)?;
    if !args.is_empty() {
        f.write_str("(")?;
        write_args(f, args)?;
        f.write_str(")")?;
    }
    Ok(())
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Infimum => f.write_str("#inf"),
            Symbol::Supremum => f.write_str("#sup"),
            Symbol::Number(n) => write!(f, "{n}"),
            Symbol::String(s) => {
                f.write_str("\"")?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        c => write!(f, "{c}")?,
                    }
                }
                f.write_str("\"")
            }
            Symbol::Function {
                name,
                args,
                positive,
            } => {
                if !positive {
                    f.write_str("-")?;
                }
                write_function(f, name, args)
            }
        }
    }
}

/// Predicate name and arity, displayed as `name/arity`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub arity: usize,
}

impl Signature {
    pub fn new(name: impl Into<String>, arity: usize) -> Self {
        Self {
            name: name.into(),
            arity,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.name, self.arity)
    }
}

/// Identity token of one atom occurrence.
///
/// Uses `NonZeroU64` so that `Option<AtomId>` is the same size as `AtomId`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct AtomId(NonZeroU64);

impl AtomId {
    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for AtomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "atom:{}", self.0)
    }
}

/// Identity token of one derivation snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct NodeId(NonZeroU64);

impl NodeId {
    /// Returns `None` if `raw` is zero.
    pub fn new(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(NodeId)
    }

    pub fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node:{}", self.0)
    }
}

impl std::str::FromStr for NodeId {
    type Err = std::num::ParseIntError;

    /// Accepts both `node:42` and `42`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("node:").unwrap_or(s);
        let n: NonZeroU64 = raw.parse()?;
        Ok(NodeId(n))
    }
}

/// A ground atom plus the identity of its occurrence.
///
/// Equality, ordering, hashing and `Borrow<Symbol>` only look at the symbol, so
/// a `BTreeSet<IdentifiedAtom>` answers "which identity does this atom already
/// have" through `set.get(&symbol)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentifiedAtom {
    pub symbol: Symbol,
    pub id: AtomId,
}

impl IdentifiedAtom {
    pub fn new(symbol: Symbol, id: AtomId) -> Self {
        Self { symbol, id }
    }
}

impl PartialEq for IdentifiedAtom {
    fn eq(&self, other: &Self) -> bool {
        self.symbol == other.symbol
    }
}

impl Eq for IdentifiedAtom {}

impl PartialOrd for IdentifiedAtom {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IdentifiedAtom {
    fn cmp(&self, other: &Self) -> Ordering {
        self.symbol.cmp(&other.symbol)
    }
}

impl Hash for IdentifiedAtom {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.symbol.hash(state);
    }
}

impl Borrow<Symbol> for IdentifiedAtom {
    fn borrow(&self) -> &Symbol {
        &self.symbol
    }
}

impl fmt::Display for IdentifiedAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol)
    }
}

/// Thread-safe identity allocator shared by atom and node tokens.
///
/// Produces monotonically increasing ids starting from 1.
/// Safe to share across threads via reference or `Arc`.
#[derive(Debug)]
pub struct AtomicIdAllocator {
    next: AtomicU64,
}

impl AtomicIdAllocator {
    /// Create a new allocator that starts from 1.
    pub fn new() -> Self {
        Self {
            next: AtomicU64::new(1),
        }
    }

    /// Create an allocator that resumes from a given id.
    ///
    /// Useful when extending a graph that was loaded from storage.
    pub fn starting_from(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start.max(1)),
        }
    }

    fn next_raw(&self) -> Result<NonZeroU64, SymbolError> {
        let raw = self.next.fetch_add(1, atomic::Ordering::Relaxed);
        NonZeroU64::new(raw).ok_or(SymbolError::AllocatorExhausted)
    }

    /// Allocate the next atom identity.
    pub fn next_atom_id(&self) -> Result<AtomId, SymbolError> {
        self.next_raw().map(AtomId)
    }

    /// Allocate the next node identity.
    pub fn next_node_id(&self) -> Result<NodeId, SymbolError> {
        self.next_raw().map(NodeId)
    }

    /// Wrap a symbol with a freshly minted identity.
    pub fn identify(&self, symbol: Symbol) -> Result<IdentifiedAtom, SymbolError> {
        Ok(IdentifiedAtom::new(symbol, self.next_atom_id()?))
    }

    /// Return the next id that *would* be allocated, without consuming it.
    pub fn peek_next(&self) -> u64 {
        self.next.load(atomic::Ordering::Relaxed)
    }
}

impl Default for AtomicIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;

    #[test]
    fn atom_id_niche_optimization() {
        assert_eq!(
            std::mem::size_of::<Option<AtomId>>(),
            std::mem::size_of::<AtomId>()
        );
    }

    #[test]
    fn display_uses_evaluator_syntax() {
        let atom = Symbol::function(
            "p",
            vec![Symbol::number(1), Symbol::string("a\"b"), Symbol::constant("c")],
        );
        assert_eq!(atom.to_string(), r#"p(1,"a\"b",c)"#);
        assert_eq!(Symbol::tuple(vec![Symbol::number(1)]).to_string(), "(1,)");
        assert_eq!(
            Symbol::tuple(vec![Symbol::number(1), Symbol::number(2)]).to_string(),
            "(1,2)"
        );
        assert_eq!(Symbol::tuple(vec![]).to_string(), "()");
        assert_eq!(Symbol::Infimum.to_string(), "#inf");

        let negated = Symbol::Function {
            name: "q".into(),
            args: vec![],
            positive: false,
        };
        assert_eq!(negated.to_string(), "-q");
    }

    #[test]
    fn signature_of_functions_only() {
        let atom = Symbol::function("edge", vec![Symbol::number(1), Symbol::number(2)]);
        assert_eq!(atom.signature(), Some(Signature::new("edge", 2)));
        assert_eq!(atom.signature().unwrap().to_string(), "edge/2");
        assert_eq!(Symbol::number(3).signature(), None);
        assert_eq!(Symbol::tuple(vec![]).signature(), None);
    }

    #[test]
    fn identified_atoms_compare_by_symbol() {
        let alloc = AtomicIdAllocator::new();
        let a = alloc.identify(Symbol::constant("a")).unwrap();
        let again = alloc.identify(Symbol::constant("a")).unwrap();
        assert_ne!(a.id, again.id);
        assert_eq!(a, again);

        let mut set = BTreeSet::new();
        set.insert(a.clone());
        // Inserting an equal atom keeps the existing identity.
        assert!(!set.insert(again));
        assert_eq!(set.get(&Symbol::constant("a")).unwrap().id, a.id);
    }

    #[test]
    fn allocator_produces_sequential_ids() {
        let alloc = AtomicIdAllocator::new();
        assert_eq!(alloc.next_atom_id().unwrap().get(), 1);
        assert_eq!(alloc.next_node_id().unwrap().get(), 2);
        assert_eq!(alloc.peek_next(), 3);
    }

    #[test]
    fn allocator_starting_from() {
        let alloc = AtomicIdAllocator::starting_from(100);
        assert_eq!(alloc.next_node_id().unwrap().get(), 100);
        assert_eq!(AtomicIdAllocator::starting_from(0).next_atom_id().unwrap().get(), 1);
    }

    #[test]
    fn node_id_parses_with_and_without_prefix() {
        let id: NodeId = "node:42".parse().unwrap();
        assert_eq!(id.get(), 42);
        let id: NodeId = "7".parse().unwrap();
        assert_eq!(id.to_string(), "node:7");
        assert!("node:0".parse::<NodeId>().is_err());
    }
}
