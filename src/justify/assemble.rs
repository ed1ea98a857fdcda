//! Grouping production points into derivation snapshots.

use std::collections::{BTreeMap, BTreeSet};

use crate::error::SymbolError;
use crate::graph::{Node, ReasonRef};
use crate::symbol::{AtomicIdAllocator, IdentifiedAtom, Symbol};

use super::production::ProductionPoint;

#[derive(Default)]
struct Group {
    atoms: BTreeSet<Symbol>,
    reason: BTreeMap<String, Vec<ReasonRef>>,
}

/// Build one node per index, sorted by `rule_nr`.
///
/// With `pad` there is one node per entry of `relevant`; otherwise one per
/// index from 1 to the highest index seen. Indices without points get an
/// empty diff. Atoms found in `preserved` keep that identity; all others get
/// a fresh one. `atoms` is left empty, see [`insert_atoms`].
pub fn assemble_nodes(
    points: &[ProductionPoint],
    relevant: &[i64],
    pad: bool,
    preserved: &BTreeSet<IdentifiedAtom>,
    ids: &AtomicIdAllocator,
) -> Result<Vec<Node>, SymbolError> {
    let mut groups: BTreeMap<i64, Group> = BTreeMap::new();
    for point in points {
        let group = groups.entry(point.index).or_default();
        group.atoms.insert(point.atom.clone());
        group.reason.insert(
            point.atom.to_string(),
            point.reasons.iter().cloned().map(ReasonRef::new).collect(),
        );
    }

    let indices: Vec<i64> = if pad {
        relevant.to_vec()
    } else {
        let max = groups.keys().next_back().copied().unwrap_or(-1);
        (1..=max).collect()
    };

    let mut nodes = Vec::with_capacity(indices.len());
    for index in indices {
        let id = ids.next_node_id()?;
        let node = match groups.remove(&index) {
            Some(group) => {
                let mut diff = BTreeSet::new();
                for symbol in group.atoms {
                    let atom = match preserved.get(&symbol) {
                        Some(existing) => existing.clone(),
                        None => ids.identify(symbol)?,
                    };
                    diff.insert(atom);
                }
                Node::new(id, diff, index, BTreeSet::new()).with_reason(group.reason)
            }
            None => Node::new(id, BTreeSet::new(), index, BTreeSet::new()),
        };
        nodes.push(node);
    }
    nodes.sort_by_key(|n| n.rule_nr);
    Ok(nodes)
}

/// Make `atoms` cumulative along the sequence.
///
/// Each node holds everything of its predecessor plus its own diff. An atom
/// that already held keeps its earlier identity.
pub fn insert_atoms(nodes: &mut [Node]) {
    let mut state: BTreeSet<IdentifiedAtom> = BTreeSet::new();
    for node in nodes {
        state.extend(node.atoms.iter().cloned());
        state.extend(node.diff.iter().cloned());
        node.atoms = state.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(name: &str, n: i64) -> Symbol {
        Symbol::function(name, vec![Symbol::number(n)])
    }

    fn point(index: i64, atom: Symbol, reasons: Vec<Symbol>) -> ProductionPoint {
        ProductionPoint {
            index,
            atom,
            reasons,
        }
    }

    #[test]
    fn padded_nodes_follow_relevant_indices() {
        let ids = AtomicIdAllocator::new();
        let points = vec![
            point(0, p("b", 1), vec![p("c", 1)]),
            point(0, p("b", 2), vec![p("c", 2)]),
            point(2, p("a", 1), vec![p("b", 1)]),
        ];
        let nodes = assemble_nodes(&points, &[0, 1, 2], true, &BTreeSet::new(), &ids).unwrap();
        let rule_nrs: Vec<i64> = nodes.iter().map(|n| n.rule_nr).collect();
        assert_eq!(rule_nrs, vec![0, 1, 2]);
        assert_eq!(nodes[0].diff.len(), 2);
        assert!(nodes[1].diff.is_empty());
        assert!(nodes[1].reason.is_empty());
        assert_eq!(nodes[2].reason["a(1)"][0].symbol, p("b", 1));
    }

    #[test]
    fn unpadded_nodes_run_from_one_to_max() {
        let ids = AtomicIdAllocator::new();
        let points = vec![point(1, p("p", 1), vec![]), point(3, p("p", 3), vec![])];
        let nodes = assemble_nodes(&points, &[], false, &BTreeSet::new(), &ids).unwrap();
        let rule_nrs: Vec<i64> = nodes.iter().map(|n| n.rule_nr).collect();
        assert_eq!(rule_nrs, vec![1, 2, 3]);

        let empty = assemble_nodes(&[], &[], false, &BTreeSet::new(), &ids).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn preserved_identities_are_reused() {
        let ids = AtomicIdAllocator::new();
        let kept = ids.identify(p("p", 1)).unwrap();
        let preserved: BTreeSet<_> = [kept.clone()].into_iter().collect();
        let points = vec![point(1, p("p", 1), vec![]), point(1, p("p", 2), vec![])];
        let nodes = assemble_nodes(&points, &[], false, &preserved, &ids).unwrap();
        assert_eq!(nodes[0].diff.get(&p("p", 1)).unwrap().id, kept.id);
        assert_ne!(nodes[0].diff.get(&p("p", 2)).unwrap().id, kept.id);
    }

    #[test]
    fn last_reason_wins_for_duplicate_atoms() {
        let ids = AtomicIdAllocator::new();
        let points = vec![
            point(0, p("a", 1), vec![p("b", 1)]),
            point(0, p("a", 1), vec![p("c", 1)]),
        ];
        let nodes = assemble_nodes(&points, &[0], true, &BTreeSet::new(), &ids).unwrap();
        assert_eq!(nodes[0].diff.len(), 1);
        assert_eq!(nodes[0].reason["a(1)"][0].symbol, p("c", 1));
    }

    #[test]
    fn atoms_accumulate_and_keep_first_identity() {
        let ids = AtomicIdAllocator::new();
        let f = ids.identify(p("f", 1)).unwrap();
        let mut nodes = vec![Node::facts(
            ids.next_node_id().unwrap(),
            [f.clone()].into_iter().collect(),
        )];
        nodes.extend(
            assemble_nodes(
                &[point(0, p("a", 1), vec![]), point(1, p("b", 1), vec![])],
                &[0, 1],
                true,
                &BTreeSet::new(),
                &ids,
            )
            .unwrap(),
        );
        // A later re-derivation of f must not replace the fact occurrence.
        nodes[2].diff.insert(ids.identify(p("f", 1)).unwrap());
        insert_atoms(&mut nodes);
        assert_eq!(nodes[0].atoms.len(), 1);
        assert_eq!(nodes[1].atoms.len(), 2);
        assert_eq!(nodes[2].atoms.len(), 3);
        assert_eq!(nodes[2].atoms.get(&p("f", 1)).unwrap().id, f.id);
    }
}
