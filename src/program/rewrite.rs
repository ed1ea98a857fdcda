//! Rewriting of a recursive transformation into its justification program.
//!
//! For every head atom `H` of a rule `H :- B1, ..., Bn` the rewriting emits
//!
//! ```text
//! h(n, H, (Bn, ..., B1)) :- model(B1), ..., model(Bn), not model(H).
//! ```
//!
//! where `h`, `model` and `n` are the reserved justification, model-accumulator
//! and iteration-index names. An atom is only justified in the first iteration
//! in which its body holds in the accumulated model and it does not hold itself.
//! Interval arguments of `H` become fresh variables first.

use std::collections::BTreeSet;

use super::{BodyAtom, HeadLiteral, Literal, ReservedNames, Rule, Sign, SymbolicAtom, Term, Transformation};

/// Generates variable names that do not occur in a rule.
#[derive(Debug)]
pub struct FreshVariables {
    used: BTreeSet<String>,
    counter: usize,
}

impl FreshVariables {
    pub fn for_rule(rule: &Rule) -> Self {
        Self {
            used: rule.variables(),
            counter: 0,
        }
    }

    pub fn next_name(&mut self) -> String {
        loop {
            let candidate = format!("V{}", self.counter);
            self.counter += 1;
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
        }
    }
}

/// Replace interval arguments with fresh variables: `p(1..3, X)` becomes `p(V0, X)`.
fn replace_intervals(atom: &SymbolicAtom, fresh: &mut FreshVariables) -> SymbolicAtom {
    let args = atom
        .args
        .iter()
        .map(|arg| match arg {
            Term::Interval(..) => Term::Variable(fresh.next_name()),
            other => other.clone(),
        })
        .collect();
    SymbolicAtom::new(atom.name.clone(), args)
}

/// Wrap a body literal into the model accumulator; aggregates are dropped.
fn wrap_in_model(literal: &Literal, model: &str) -> Option<Literal> {
    match &literal.atom {
        BodyAtom::Symbolic(atom) => Some(Literal {
            sign: literal.sign,
            atom: BodyAtom::Symbolic(SymbolicAtom::new(model, vec![atom.to_term()])),
        }),
        BodyAtom::Comparison { .. } => Some(literal.clone()),
        BodyAtom::Aggregate(_) => None,
    }
}

fn dedup_preserving_order<T: PartialEq>(items: Vec<T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// The justification rules for one rule of a recursive transformation.
///
/// Integrity constraints derive nothing and yield no rules.
pub fn justification_rules(rule: &Rule, names: &ReservedNames) -> Vec<Rule> {
    let mut fresh = FreshVariables::for_rule(rule);
    rule.head
        .iter()
        .map(|head| justification_rule(head, &rule.body, names, &mut fresh))
        .collect()
}

fn justification_rule(
    head: &HeadLiteral,
    body: &[Literal],
    names: &ReservedNames,
    fresh: &mut FreshVariables,
) -> Rule {
    let dependant = if head.atom.has_interval() {
        replace_intervals(&head.atom, fresh)
    } else {
        head.atom.clone()
    };

    let mut reasons: Vec<Term> = body
        .iter()
        .filter_map(Literal::positive_atom)
        .map(SymbolicAtom::to_term)
        .collect();
    reasons.extend(head.conditions.iter().filter_map(|c| match &c.atom {
        BodyAtom::Symbolic(atom) => Some(atom.to_term()),
        _ => None,
    }));
    reasons.reverse();
    let reasons = dedup_preserving_order(reasons);

    let new_head = SymbolicAtom::new(
        names.justification.clone(),
        vec![
            Term::constant(names.iteration.clone()),
            dependant.to_term(),
            Term::tuple(reasons),
        ],
    );

    let conditions: Vec<Literal> = body.iter().chain(&head.conditions).cloned().collect();
    let mut new_body: Vec<Literal> = dedup_preserving_order(conditions)
        .iter()
        .filter_map(|lit| wrap_in_model(lit, &names.model))
        .collect();
    new_body.push(Literal {
        sign: Sign::Negation,
        atom: BodyAtom::Symbolic(SymbolicAtom::new(
            names.model.clone(),
            vec![dependant.to_term()],
        )),
    });

    Rule::new(new_head, new_body)
}

/// The complete program handed to the recursion solver for `transformation`.
///
/// Ends with the sentinel `model(@new()).`, which makes the solver evaluate one
/// more round after the last derived atom.
pub fn recursion_program(transformation: &Transformation, names: &ReservedNames) -> String {
    let mut lines: Vec<String> = transformation
        .rules
        .iter()
        .flat_map(|rule| justification_rules(rule, names))
        .map(|rule| rule.to_string())
        .collect();
    lines.push(format!("{}(@new()).", names.model));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::ComparisonOp;

    fn atom(name: &str, vars: &[&str]) -> SymbolicAtom {
        SymbolicAtom::new(name, vars.iter().map(|v| Term::variable(*v)).collect())
    }

    fn path_rules() -> Vec<Rule> {
        vec![
            Rule::new(
                atom("path", &["X", "Y"]),
                vec![Literal::positive(atom("edge", &["X", "Y"]))],
            ),
            Rule::new(
                atom("path", &["X", "Z"]),
                vec![
                    Literal::positive(atom("path", &["X", "Y"])),
                    Literal::positive(atom("edge", &["Y", "Z"])),
                ],
            ),
        ]
    }

    #[test]
    fn transitive_closure_rule() {
        let rules = justification_rules(&path_rules()[1], &ReservedNames::default());
        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules[0].to_string(),
            "h(n,path(X,Z),(edge(Y,Z),path(X,Y))) :- \
             model(path(X,Y)), model(edge(Y,Z)), not model(path(X,Z))."
        );
    }

    #[test]
    fn single_reason_is_a_one_tuple() {
        let rules = justification_rules(&path_rules()[0], &ReservedNames::default());
        assert_eq!(
            rules[0].to_string(),
            "h(n,path(X,Y),(edge(X,Y),)) :- model(edge(X,Y)), not model(path(X,Y))."
        );
    }

    #[test]
    fn negation_comparison_and_aggregate() {
        let rule = Rule::new(
            atom("a", &["X"]),
            vec![
                Literal::positive(atom("a", &["Y"])),
                Literal::negative(atom("blocked", &["X"])),
                Literal::comparison(Term::variable("X"), ComparisonOp::Equal, Term::Raw("Y+1".into())),
                Literal::aggregate("#count { Z: q(Z) } > 1"),
            ],
        );
        let rules = justification_rules(&rule, &ReservedNames::default());
        assert_eq!(
            rules[0].to_string(),
            "h(n,a(X),(a(Y),)) :- model(a(Y)), not model(blocked(X)), X=Y+1, not model(a(X))."
        );
    }

    #[test]
    fn intervals_become_fresh_variables() {
        let rule = Rule::new(
            SymbolicAtom::new(
                "p",
                vec![Term::interval(Term::number(1), Term::number(3)), Term::variable("V0")],
            ),
            vec![Literal::positive(atom("q", &["V0"]))],
        );
        let rules = justification_rules(&rule, &ReservedNames::default());
        // V0 is taken by the rule itself.
        assert_eq!(
            rules[0].to_string(),
            "h(n,p(V1,V0),(q(V0),)) :- model(q(V0)), not model(p(V1,V0))."
        );
    }

    #[test]
    fn conditions_join_body_and_reasons() {
        let rule = Rule::choice(
            vec![
                HeadLiteral::new(atom("pick", &["X"]))
                    .with_conditions(vec![Literal::positive(atom("item", &["X"]))]),
            ],
            vec![Literal::positive(atom("go", &[]))],
        );
        let rules = justification_rules(&rule, &ReservedNames::default());
        assert_eq!(
            rules[0].to_string(),
            "h(n,pick(X),(item(X),go)) :- model(go), model(item(X)), not model(pick(X))."
        );
    }

    #[test]
    fn constraints_yield_nothing() {
        let rule = Rule::constraint(vec![Literal::positive(atom("a", &["X"]))]);
        assert!(justification_rules(&rule, &ReservedNames::default()).is_empty());
    }

    #[test]
    fn reserved_names_are_honored() {
        let names = ReservedNames {
            justification: "h_1".into(),
            model: "model_1".into(),
            iteration: "n_1".into(),
        };
        let program = recursion_program(&Transformation::new(2, path_rules()), &names);
        let lines: Vec<&str> = program.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("h_1(n_1,path(X,Y)"));
        assert!(lines[1].contains("not model_1(path(X,Z))"));
        assert_eq!(lines[2], "model_1(@new()).");
    }
}
