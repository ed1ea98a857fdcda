//! Rules, transformations and meta-program text.
//!
//! The ordering collaborator hands over an [`AnalyzedProgram`]: the rules of the
//! input program grouped into ordered [`Transformation`]s, the reified program
//! that records justifications, and the reserved predicate names. Everything the
//! engine sends to the evaluator is assembled as plain text with [`Program`].
//!
//! The rule AST is deliberately small. It covers what the recursion rewriting
//! has to look into (head atoms, their conditions, body literals, intervals);
//! anything else travels as [`Term::Raw`] or [`BodyAtom::Aggregate`] text.

pub mod rewrite;

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::symbol::{Symbol, write_function};

// ---------------------------------------------------------------------------
// Rule AST
// ---------------------------------------------------------------------------

/// A non-ground term.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Term {
    Symbol(Symbol),
    Variable(String),
    /// `lo..hi`
    Interval(Box<Term>, Box<Term>),
    /// `name(args)`; a tuple when `name` is empty.
    Function { name: String, args: Vec<Term> },
    /// Verbatim text, e.g. arithmetic the rewriting never inspects.
    Raw(String),
}

impl Term {
    pub fn variable(name: impl Into<String>) -> Self {
        Term::Variable(name.into())
    }

    pub fn number(n: i64) -> Self {
        Term::Symbol(Symbol::Number(n))
    }

    pub fn constant(name: impl Into<String>) -> Self {
        Term::Function {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn function(name: impl Into<String>, args: Vec<Term>) -> Self {
        Term::Function {
            name: name.into(),
            args,
        }
    }

    pub fn tuple(args: Vec<Term>) -> Self {
        Term::function("", args)
    }

    pub fn interval(lo: Term, hi: Term) -> Self {
        Term::Interval(Box::new(lo), Box::new(hi))
    }

    pub fn is_interval(&self) -> bool {
        matches!(self, Term::Interval(..))
    }

    fn collect_variables(&self, out: &mut BTreeSet<String>) {
        match self {
            Term::Variable(v) => {
                out.insert(v.clone());
            }
            Term::Interval(lo, hi) => {
                lo.collect_variables(out);
                hi.collect_variables(out);
            }
            Term::Function { args, .. } => args.iter().for_each(|a| a.collect_variables(out)),
            Term::Symbol(_) | Term::Raw(_) => {}
        }
    }
}

impl From<Symbol> for Term {
    fn from(symbol: Symbol) -> Self {
        Term::Symbol(symbol)
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Symbol(s) => write!(f, "{s}"),
            Term::Variable(v) => f.write_str(v),
            Term::Interval(lo, hi) => write!(f, "{lo}..{hi}"),
            Term::Function { name, args } => write_function(f, name, args),
            Term::Raw(text) => f.write_str(text),
        }
    }
}

/// `name(args)` in atom position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolicAtom {
    pub name: String,
    pub args: Vec<Term>,
}

impl SymbolicAtom {
    pub fn new(name: impl Into<String>, args: Vec<Term>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// The atom as a term, e.g. to nest it inside `model(...)`.
    pub fn to_term(&self) -> Term {
        Term::function(self.name.clone(), self.args.clone())
    }

    pub fn has_interval(&self) -> bool {
        self.args.iter().any(Term::is_interval)
    }

    fn collect_variables(&self, out: &mut BTreeSet<String>) {
        self.args.iter().for_each(|a| a.collect_variables(out));
    }
}

impl fmt::Display for SymbolicAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_function(f, &self.name, &self.args)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sign {
    NoSign,
    Negation,
    DoubleNegation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ComparisonOp::Equal => "=",
            ComparisonOp::NotEqual => "!=",
            ComparisonOp::Less => "<",
            ComparisonOp::LessEqual => "<=",
            ComparisonOp::Greater => ">",
            ComparisonOp::GreaterEqual => ">=",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyAtom {
    Symbolic(SymbolicAtom),
    Comparison {
        left: Term,
        op: ComparisonOp,
        right: Term,
    },
    /// Aggregate kept as source text.
    Aggregate(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Literal {
    pub sign: Sign,
    pub atom: BodyAtom,
}

impl Literal {
    pub fn positive(atom: SymbolicAtom) -> Self {
        Self {
            sign: Sign::NoSign,
            atom: BodyAtom::Symbolic(atom),
        }
    }

    pub fn negative(atom: SymbolicAtom) -> Self {
        Self {
            sign: Sign::Negation,
            atom: BodyAtom::Symbolic(atom),
        }
    }

    pub fn comparison(left: Term, op: ComparisonOp, right: Term) -> Self {
        Self {
            sign: Sign::NoSign,
            atom: BodyAtom::Comparison { left, op, right },
        }
    }

    pub fn aggregate(text: impl Into<String>) -> Self {
        Self {
            sign: Sign::NoSign,
            atom: BodyAtom::Aggregate(text.into()),
        }
    }

    /// The symbolic atom of a literal without negation.
    pub fn positive_atom(&self) -> Option<&SymbolicAtom> {
        match (&self.sign, &self.atom) {
            (Sign::NoSign, BodyAtom::Symbolic(atom)) => Some(atom),
            _ => None,
        }
    }

    fn collect_variables(&self, out: &mut BTreeSet<String>) {
        match &self.atom {
            BodyAtom::Symbolic(atom) => atom.collect_variables(out),
            BodyAtom::Comparison { left, right, .. } => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
            BodyAtom::Aggregate(_) => {}
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sign {
            Sign::NoSign => {}
            Sign::Negation => f.write_str("not ")?,
            Sign::DoubleNegation => f.write_str("not not ")?,
        }
        match &self.atom {
            BodyAtom::Symbolic(atom) => write!(f, "{atom}"),
            BodyAtom::Comparison { left, op, right } => write!(f, "{left}{op}{right}"),
            BodyAtom::Aggregate(text) => f.write_str(text),
        }
    }
}

/// One head element, optionally conditional: `atom : cond, ...`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadLiteral {
    pub atom: SymbolicAtom,
    #[serde(default)]
    pub conditions: Vec<Literal>,
}

impl HeadLiteral {
    pub fn new(atom: SymbolicAtom) -> Self {
        Self {
            atom,
            conditions: Vec::new(),
        }
    }

    pub fn with_conditions(mut self, conditions: Vec<Literal>) -> Self {
        self.conditions = conditions;
        self
    }
}

impl fmt::Display for HeadLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.atom)?;
        for (i, cond) in self.conditions.iter().enumerate() {
            f.write_str(if i == 0 { ": " } else { ", " })?;
            write!(f, "{cond}")?;
        }
        Ok(())
    }
}

/// A rule. An empty non-choice head is an integrity constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub head: Vec<HeadLiteral>,
    #[serde(default)]
    pub choice: bool,
    #[serde(default)]
    pub body: Vec<Literal>,
}

impl Rule {
    /// `head :- body.` with a single unconditional head atom.
    pub fn new(head: SymbolicAtom, body: Vec<Literal>) -> Self {
        Self {
            head: vec![HeadLiteral::new(head)],
            choice: false,
            body,
        }
    }

    pub fn choice(head: Vec<HeadLiteral>, body: Vec<Literal>) -> Self {
        Self {
            head,
            choice: true,
            body,
        }
    }

    pub fn constraint(body: Vec<Literal>) -> Self {
        Self {
            head: Vec::new(),
            choice: false,
            body,
        }
    }

    pub fn is_constraint(&self) -> bool {
        self.head.is_empty() && !self.choice
    }

    /// Every variable name occurring anywhere in the rule.
    pub fn variables(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for head in &self.head {
            head.atom.collect_variables(&mut out);
            head.conditions
                .iter()
                .for_each(|c| c.collect_variables(&mut out));
        }
        self.body.iter().for_each(|l| l.collect_variables(&mut out));
        out
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.choice {
            f.write_str("{ ")?;
        }
        for (i, head) in self.head.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{head}")?;
        }
        if self.choice {
            f.write_str(" }")?;
        }
        if !self.body.is_empty() {
            f.write_str(if self.head.is_empty() && !self.choice {
                ":- "
            } else {
                " :- "
            })?;
            for (i, lit) in self.body.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{lit}")?;
            }
        }
        f.write_str(".")
    }
}

// ---------------------------------------------------------------------------
// Transformations
// ---------------------------------------------------------------------------

/// One step of the ordered rule sequence; may bundle mutually dependent rules.
///
/// Transformations compare and hash by `id` only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transformation {
    pub id: usize,
    pub rules: Vec<Rule>,
}

impl Transformation {
    pub fn new(id: usize, rules: Vec<Rule>) -> Self {
        Self { id, rules }
    }

    /// Source text of every rule, in order.
    pub fn rule_texts(&self) -> Vec<String> {
        self.rules.iter().map(ToString::to_string).collect()
    }
}

impl PartialEq for Transformation {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Transformation {}

impl Hash for Transformation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}: {}", self.id, self.rule_texts().join(" "))
    }
}

// ---------------------------------------------------------------------------
// Program text
// ---------------------------------------------------------------------------

/// Program text assembled fragment by fragment before one ground+solve pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    fragments: Vec<String>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment (rules, directives, facts).
    pub fn add(&mut self, fragment: impl Into<String>) -> &mut Self {
        let fragment = fragment.into();
        if !fragment.is_empty() {
            self.fragments.push(fragment);
        }
        self
    }

    /// Append each symbol as a fact `atom.`.
    pub fn add_facts<'a>(&mut self, facts: impl IntoIterator<Item = &'a Symbol>) -> &mut Self {
        let text: String = facts.into_iter().map(|s| format!("{s}.")).collect();
        self.add(text)
    }

    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.fragments.iter().any(|f| f.contains(needle))
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, fragment) in self.fragments.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            f.write_str(fragment)?;
        }
        Ok(())
    }
}

/// One target final state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StableModel {
    pub atoms: BTreeSet<Symbol>,
}

impl StableModel {
    pub fn new(atoms: impl IntoIterator<Item = Symbol>) -> Self {
        Self {
            atoms: atoms.into_iter().collect(),
        }
    }

    /// The model as fact strings `atom.`, ready to be injected into a program.
    pub fn wrapped(&self) -> Vec<String> {
        self.atoms.iter().map(|a| format!("{a}.")).collect()
    }
}

impl fmt::Display for StableModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let atoms: Vec<String> = self.atoms.iter().map(ToString::to_string).collect();
        write!(f, "{{{}}}", atoms.join(", "))
    }
}

// ---------------------------------------------------------------------------
// Analyzer output
// ---------------------------------------------------------------------------

/// Conflict-free predicate names chosen by the analyzer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedNames {
    /// Justification predicate `h(Index, Atom, Reasons)`.
    pub justification: String,
    /// Model accumulator of the recursion trace.
    pub model: String,
    /// Iteration index of the recursion trace.
    pub iteration: String,
}

impl Default for ReservedNames {
    fn default() -> Self {
        Self {
            justification: "h".into(),
            model: "model".into(),
            iteration: "n".into(),
        }
    }
}

/// Everything the ordering/rewriting collaborator supplies for one program.
#[derive(Debug, Clone, Default)]
pub struct AnalyzedProgram {
    /// Original program text, used for fact extraction.
    pub source: String,
    /// Ordered transformations; ids are their positions starting at 0.
    pub transformations: Vec<Arc<Transformation>>,
    /// Rules rewritten to record `h(Index, Atom, Reasons)`.
    pub transformed: Vec<String>,
    /// Constant directives such as `#const n=3.`
    pub constants: Vec<String>,
    /// Ids of self-recursive transformations.
    pub recursive: HashSet<usize>,
    /// Rules no target state ever exercises.
    pub pass_through: Vec<Rule>,
    pub names: ReservedNames,
}

impl AnalyzedProgram {
    pub fn is_recursive(&self, id: usize) -> bool {
        self.recursive.contains(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(name: &str, vars: &[&str]) -> SymbolicAtom {
        SymbolicAtom::new(name, vars.iter().map(|v| Term::variable(*v)).collect())
    }

    #[test]
    fn rule_display() {
        let rule = Rule::new(atom("b", &["X"]), vec![Literal::positive(atom("c", &["X"]))]);
        assert_eq!(rule.to_string(), "b(X) :- c(X).");

        let fact = Rule::new(SymbolicAtom::new("c", vec![Term::number(1)]), vec![]);
        assert_eq!(fact.to_string(), "c(1).");
    }

    #[test]
    fn constraint_and_choice_display() {
        let constraint = Rule::constraint(vec![
            Literal::positive(atom("a", &["X"])),
            Literal::negative(atom("b", &["X"])),
        ]);
        assert!(constraint.is_constraint());
        assert_eq!(constraint.to_string(), ":- a(X), not b(X).");

        let choice = Rule::choice(
            vec![
                HeadLiteral::new(atom("a", &["X"]))
                    .with_conditions(vec![Literal::positive(atom("d", &["X"]))]),
            ],
            vec![],
        );
        assert_eq!(choice.to_string(), "{ a(X): d(X) }.");
    }

    #[test]
    fn comparison_and_interval_display() {
        let lit = Literal::comparison(Term::variable("X"), ComparisonOp::Less, Term::number(3));
        assert_eq!(lit.to_string(), "X<3");
        let head = SymbolicAtom::new("p", vec![Term::interval(Term::number(1), Term::number(3))]);
        assert!(head.has_interval());
        assert_eq!(head.to_string(), "p(1..3)");
    }

    #[test]
    fn rule_variables() {
        let rule = Rule::new(
            atom("path", &["X", "Z"]),
            vec![
                Literal::positive(atom("path", &["X", "Y"])),
                Literal::positive(atom("edge", &["Y", "Z"])),
            ],
        );
        let vars: Vec<String> = rule.variables().into_iter().collect();
        assert_eq!(vars, vec!["X", "Y", "Z"]);
    }

    #[test]
    fn transformations_compare_by_id() {
        let a = Transformation::new(1, vec![]);
        let b = Transformation::new(
            1,
            vec![Rule::new(atom("a", &["X"]), vec![Literal::positive(atom("b", &["X"]))])],
        );
        assert_eq!(a, b);
        assert_eq!(b.rule_texts(), vec!["a(X) :- b(X).".to_string()]);
    }

    #[test]
    fn program_fragments_and_facts() {
        let mut program = Program::new();
        program
            .add("#const k=2.")
            .add("")
            .add_facts(&[Symbol::function("c", vec![Symbol::number(1)])]);
        assert_eq!(program.fragments().len(), 2);
        assert_eq!(program.to_string(), "#const k=2.\nc(1).");
        assert!(program.contains("c(1)."));
    }

    #[test]
    fn stable_model_wrapping() {
        let model = StableModel::new([Symbol::constant("b"), Symbol::constant("a")]);
        assert_eq!(model.wrapped(), vec!["a.".to_string(), "b.".to_string()]);
        assert_eq!(model.to_string(), "{a, b}");
    }
}
