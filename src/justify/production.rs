//! Production points: the earliest transformation at which each atom of a
//! stable model is justified.
//!
//! The reified program records `h(Index, Atom, Reasons)` for every rule
//! application. Adding the stable model as facts and one selection rule keeps,
//! per atom, only the triple with the smallest index:
//!
//! ```text
//! _h(I, H, G) :- h(I, H, G), not h(II,H,_) : II<I, h(II,_,_).
//! ```

use std::collections::BTreeSet;

use crate::error::OracleError;
use crate::oracle::{Oracle, OracleResult, Query};
use crate::program::{AnalyzedProgram, Program, StableModel};
use crate::symbol::{Signature, Symbol};

/// One `(index, atom, reasons)` triple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProductionPoint {
    pub index: i64,
    pub atom: Symbol,
    pub reasons: Vec<Symbol>,
}

impl TryFrom<&Symbol> for ProductionPoint {
    type Error = OracleError;

    fn try_from(symbol: &Symbol) -> Result<Self, Self::Error> {
        let malformed = |expected: &str| OracleError::MalformedAtom {
            atom: symbol.to_string(),
            expected: expected.into(),
        };
        let [index, atom, reasons] = symbol.arguments() else {
            return Err(malformed("three arguments"));
        };
        let index = index
            .as_number()
            .ok_or_else(|| malformed("a number as first argument"))?;
        if !matches!(reasons, Symbol::Function { .. }) {
            return Err(malformed("a tuple of reasons as third argument"));
        }
        Ok(Self {
            index,
            atom: atom.clone(),
            reasons: reasons.arguments().to_vec(),
        })
    }
}

/// Name of the predicate holding the selected triples.
pub fn selected_name(justification: &str) -> String {
    format!("_{justification}")
}

/// The rule keeping only the minimal index per atom.
pub fn selection_rule(justification: &str) -> String {
    let h = justification;
    format!(
        "{new}(I, H, G) :- {h}(I, H, G), not {h}(II,H,_) : II<I, {h}(II,_,_).",
        new = selected_name(h)
    )
}

/// Constants, facts, reified rules, the model and the selection rule, in that order.
pub fn production_program(
    analyzed: &AnalyzedProgram,
    facts: &BTreeSet<Symbol>,
    model: &StableModel,
) -> Program {
    let mut program = Program::new();
    program
        .add(analyzed.constants.concat())
        .add_facts(facts)
        .add(analyzed.transformed.concat())
        .add(model.wrapped().concat())
        .add(selection_rule(&analyzed.names.justification));
    program
}

/// Selected triples for one stable model, base facts excluded, sorted by index.
pub fn extract_production_points<O: Oracle + ?Sized>(
    oracle: &O,
    analyzed: &AnalyzedProgram,
    facts: &BTreeSet<Symbol>,
    model: &StableModel,
) -> OracleResult<Vec<ProductionPoint>> {
    let program = production_program(analyzed, facts, model);
    let query = Query::Signature(Signature::new(
        selected_name(&analyzed.names.justification),
        3,
    ));
    let mut points = oracle
        .ground_and_solve(&program, &query)?
        .iter()
        .filter(|s| !s.arguments().get(1).is_some_and(|atom| facts.contains(atom)))
        .map(ProductionPoint::try_from)
        .collect::<OracleResult<Vec<_>>>()?;
    points.sort();
    points.dedup();
    tracing::debug!(model = %model, points = points.len(), "extracted production points");
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(name: &str, n: i64) -> Symbol {
        Symbol::function(name, vec![Symbol::number(n)])
    }

    fn h(index: i64, atom: Symbol, reasons: Vec<Symbol>) -> Symbol {
        Symbol::function("_h", vec![Symbol::number(index), atom, Symbol::tuple(reasons)])
    }

    /// Returns the scripted atoms in reverse order to check sorting.
    struct Scripted(Vec<Symbol>);

    impl Oracle for Scripted {
        fn ground_and_solve(&self, program: &Program, query: &Query) -> OracleResult<Vec<Symbol>> {
            assert_eq!(query, &Query::Signature(Signature::new("_h", 3)));
            assert!(program.contains("not h(II,H,_) : II<I"));
            Ok(self.0.iter().rev().cloned().collect())
        }
    }

    #[test]
    fn triples_parse() {
        let point = ProductionPoint::try_from(&h(2, p("a", 1), vec![p("b", 1)])).unwrap();
        assert_eq!(point.index, 2);
        assert_eq!(point.atom, p("a", 1));
        assert_eq!(point.reasons, vec![p("b", 1)]);
    }

    #[test]
    fn malformed_triples_are_rejected() {
        let short = Symbol::function("_h", vec![Symbol::number(1)]);
        assert!(matches!(
            ProductionPoint::try_from(&short),
            Err(OracleError::MalformedAtom { .. })
        ));
        let bad_index = Symbol::function(
            "_h",
            vec![Symbol::constant("x"), p("a", 1), Symbol::tuple(vec![])],
        );
        assert!(ProductionPoint::try_from(&bad_index).is_err());
        let bad_reasons =
            Symbol::function("_h", vec![Symbol::number(0), p("a", 1), Symbol::number(3)]);
        assert!(ProductionPoint::try_from(&bad_reasons).is_err());
    }

    #[test]
    fn program_layout() {
        let analyzed = AnalyzedProgram {
            constants: vec!["#const k=2.".into()],
            transformed: vec!["h(0,b(X),(c(X),)) :- c(X).".into()],
            ..Default::default()
        };
        let facts: BTreeSet<Symbol> = [p("c", 1)].into_iter().collect();
        let model = StableModel::new([p("c", 1), p("b", 1)]);
        let program = production_program(&analyzed, &facts, &model);
        assert_eq!(
            program.fragments(),
            &[
                "#const k=2.".to_string(),
                "c(1).".to_string(),
                "h(0,b(X),(c(X),)) :- c(X).".to_string(),
                "b(1).c(1).".to_string(),
                "_h(I, H, G) :- h(I, H, G), not h(II,H,_) : II<I, h(II,_,_).".to_string(),
            ]
        );
    }

    #[test]
    fn facts_are_filtered_and_output_sorted() {
        let analyzed = AnalyzedProgram::default();
        let facts: BTreeSet<Symbol> = [p("c", 1)].into_iter().collect();
        let oracle = Scripted(vec![
            h(0, p("b", 1), vec![p("c", 1)]),
            h(1, p("a", 1), vec![p("b", 1)]),
            h(0, p("c", 1), vec![]),
        ]);
        let model = StableModel::new([p("c", 1), p("b", 1), p("a", 1)]);
        let points = extract_production_points(&oracle, &analyzed, &facts, &model).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].atom, p("b", 1));
        assert_eq!(points[1].atom, p("a", 1));

        let again = extract_production_points(&oracle, &analyzed, &facts, &model).unwrap();
        assert_eq!(points, again);
    }
}
