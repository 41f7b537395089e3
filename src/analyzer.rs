// Copyright (c) 2018 Fabian Schuiki

//! Resolution and analysis of a parsed grammar.
//!
//! After parsing, `finish_syntax` resolves nonterminal references, computes
//! the nullability and repeatability fixpoints, and detects direct and
//! indirect left recursion. All findings flow into the error sink; analysis
//! never aborts a traversal.

use std::collections::BTreeSet;
use std::mem::swap;

use bit_set::BitSet;
use indexmap::IndexSet;

use errors::{Errors, IssueKind};
use first::FirstFollowSets;
use syntax::{DefId, NodeId, NodeKind, Quantity, Syntax};
use token::Sym;

/// Resolve and analyze a parsed grammar.
///
/// Returns true when the sink carries no errors afterwards. Once a grammar
/// is finished it is logically frozen; calling this again is a no-op.
pub fn finish_syntax(syn: &mut Syntax, errs: &mut Errors) -> bool {
    if !syn.is_finished() {
        resolve_all(syn, errs);
        propagate_flags(syn);
        calc_left_recursion(syn, errs);
        syn.set_finished();
    }
    errs.error_count() == 0
}

fn resolve_all(syn: &mut Syntax, errs: &mut Errors) {
    for d in 0..syn.def_count() {
        let root = syn[DefId::from_usize(d)].node;
        if let Some(root) = root {
            resolve_node(syn, errs, root);
        }
    }
}

fn resolve_node(syn: &mut Syntax, errs: &mut Errors, id: NodeId) {
    let (kind, subs) = {
        let node = &syn[id];
        (node.kind, node.subs.clone())
    };
    match kind {
        NodeKind::Nonterminal => {
            let tok = syn[id].tok.clone();
            match syn.get_def(tok.val.as_str()) {
                Some(def) => {
                    syn[id].def = Some(def);
                    syn[def].used_by.push(id);
                    syn.add_back_ref(tok.val.clone(), id);
                }
                None => {
                    errs.warning(
                        IssueKind::Semantics,
                        tok.line,
                        tok.col,
                        format!("unresolved nonterminal '{}', treated as terminal", tok.val),
                    );
                }
            }
        }
        NodeKind::Sequence | NodeKind::Alternative => {
            for sub in subs {
                resolve_node(syn, errs, sub);
            }
        }
        NodeKind::Terminal | NodeKind::Predicate => {}
    }
}

/// Run one round of the nullability and repeatability fixpoints to
/// saturation. Returns whether any definition flag changed; a second call
/// on a finished grammar reports no change.
pub fn propagate_flags(syn: &mut Syntax) -> bool {
    let num = syn.def_count();
    let mut any_change = false;
    let mut update = BitSet::with_capacity(num);
    let mut next_update = BitSet::with_capacity(num);
    for d in 0..num {
        update.insert(d);
    }
    while !update.is_empty() {
        for current in update.iter() {
            let id = DefId::from_usize(current);
            let (nullable, repeatable) = match syn[id].node {
                Some(root) => (syn.node_nullable(root), syn.node_repeatable(root)),
                None => (false, false),
            };
            if nullable != syn[id].nullable || repeatable != syn[id].repeatable {
                syn[id].nullable = nullable;
                syn[id].repeatable = repeatable;
                any_change = true;
                // Revisit every production that references this one.
                let users: Vec<usize> = syn[id]
                    .used_by
                    .iter()
                    .map(|&user| syn[user].owner.as_usize())
                    .collect();
                for user in users {
                    next_update.insert(user);
                }
            }
        }
        swap(&mut update, &mut next_update);
        next_update.clear();
    }
    any_change
}

/// The nonterminal nodes that can appear as the leftmost-visible symbol of a
/// subtree: every predecessor in the enclosing sequence is nullable.
fn starts_with_nt_set(syn: &Syntax, id: NodeId, into: &mut Vec<NodeId>) {
    let node = &syn[id];
    match node.kind {
        NodeKind::Terminal | NodeKind::Predicate => {}
        NodeKind::Nonterminal => into.push(id),
        NodeKind::Alternative => {
            for &sub in &node.subs {
                starts_with_nt_set(syn, sub, into);
            }
        }
        NodeKind::Sequence => {
            for &sub in &node.subs {
                starts_with_nt_set(syn, sub, into);
                if !syn.node_nullable(sub) {
                    break;
                }
            }
        }
    }
}

/// Search for a leftmost-visible path from `from` back to `target`,
/// recording the reference nodes along the way.
fn find_left_path(
    syn: &Syntax,
    starts: &[Vec<NodeId>],
    from: DefId,
    target: DefId,
    visited: &mut BitSet,
    path: &mut Vec<NodeId>,
) -> bool {
    for &n in &starts[from.as_usize()] {
        let def = match syn[n].def {
            Some(def) => def,
            None => continue,
        };
        if def == target {
            path.push(n);
            return true;
        }
        if !visited.contains(def.as_usize()) {
            visited.insert(def.as_usize());
            path.push(n);
            if find_left_path(syn, starts, def, target, visited, path) {
                return true;
            }
            path.pop();
        }
    }
    false
}

fn calc_left_recursion(syn: &mut Syntax, errs: &mut Errors) {
    let num = syn.def_count();
    let starts: Vec<Vec<NodeId>> = (0..num)
        .map(|d| {
            let mut set = Vec::new();
            if let Some(root) = syn[DefId::from_usize(d)].node {
                starts_with_nt_set(syn, root, &mut set);
            }
            set
        })
        .collect();

    for d in 0..num {
        let target = DefId::from_usize(d);

        let mut direct = Vec::new();
        for &n in &starts[d] {
            if syn[n].def == Some(target) {
                direct.push(n);
            }
        }
        if !direct.is_empty() {
            syn[target].direct_left_recursive = true;
            let tok = syn[direct[0]].tok.clone();
            errs.error(
                IssueKind::Analysis,
                tok.line,
                tok.col,
                format!("production '{}' is directly left recursive", syn[target].name()),
            );
            for n in direct {
                syn[n].left_recursive = true;
            }
        }

        for i in 0..starts[d].len() {
            let n = starts[d][i];
            let via = match syn[n].def {
                Some(def) if def != target => def,
                _ => continue,
            };
            let mut visited = BitSet::with_capacity(num);
            visited.insert(d);
            visited.insert(via.as_usize());
            let mut path = vec![n];
            if find_left_path(syn, &starts, via, target, &mut visited, &mut path) {
                syn[target].indirect_left_recursive = true;
                let names: Vec<String> = path
                    .iter()
                    .map(|&p| syn[p].tok.val.to_string())
                    .collect();
                let tok = syn[target].tok.clone();
                errs.error(
                    IssueKind::Analysis,
                    tok.line,
                    tok.col,
                    format!(
                        "production '{}' is indirectly left recursive via {}",
                        syn[target].name(),
                        names.join(" -> ")
                    ),
                );
                for p in path {
                    syn[p].left_recursive = true;
                }
                break;
            }
        }
    }
}

/// Check a finished grammar for predictive-parsing conflicts.
///
/// Reports overlapping alternative branches, optional or repeated content
/// that collides with its continuation, and malformed predicates.
pub fn check_ambiguity(syn: &Syntax, sets: &FirstFollowSets, errs: &mut Errors) {
    for id in reachable_nodes(syn) {
        let node = &syn[id];
        match node.kind {
            NodeKind::Alternative => {
                let subs = &node.subs;
                for i in 0..subs.len() {
                    for j in i + 1..subs.len() {
                        let a = sets.first_of_node(syn, subs[i]);
                        let b = sets.first_of_node(syn, subs[j]);
                        let common: BTreeSet<&Sym> = a.intersection(&b).collect();
                        if !common.is_empty() {
                            let pos = syn
                                .first_visible_element_of(subs[j])
                                .unwrap_or(subs[j]);
                            let tok = &syn[pos].tok;
                            errs.warning(
                                IssueKind::Analysis,
                                tok.line,
                                tok.col,
                                format!(
                                    "ambiguous alternatives: both may start with {}",
                                    name_list(&common)
                                ),
                            );
                        }
                    }
                }
            }
            NodeKind::Predicate => {
                if syn.node_llk(id) == 0 {
                    errs.error(
                        IssueKind::Analysis,
                        node.tok.line,
                        node.tok.col,
                        format!("invalid predicate '{}'", node.tok.val),
                    );
                }
            }
            _ => {}
        }
        match node.quant {
            Quantity::ZeroOrOne | Quantity::ZeroOrMore => {
                let content = sets.first_of_node(syn, id);
                let next = sets.follow_after(syn, id);
                let common: BTreeSet<&Sym> = content.intersection(&next).collect();
                if !common.is_empty() {
                    errs.warning(
                        IssueKind::Analysis,
                        node.tok.line,
                        node.tok.col,
                        format!(
                            "optional content overlaps with its continuation on {}",
                            name_list(&common)
                        ),
                    );
                }
            }
            Quantity::One => {}
        }
    }
}

fn name_list(set: &BTreeSet<&Sym>) -> String {
    let names: Vec<String> = set.iter().map(|s| format!("'{}'", s)).collect();
    names.join(", ")
}

/// All nodes reachable from definition roots, in source-traversal order.
/// Subtrees discarded during error recovery are not visited.
pub fn reachable_nodes(syn: &Syntax) -> Vec<NodeId> {
    let mut out = Vec::new();
    for (_, def) in syn.defs() {
        if let Some(root) = def.node {
            collect_nodes(syn, root, &mut out);
        }
    }
    out
}

fn collect_nodes(syn: &Syntax, id: NodeId, into: &mut Vec<NodeId>) {
    into.push(id);
    for &sub in &syn[id].subs {
        collect_nodes(syn, sub, into);
    }
}

/// All distinct terminal spellings of the grammar, in first-seen order.
pub fn collect_terminal_strings(syn: &Syntax) -> Vec<Sym> {
    let mut set = IndexSet::new();
    for id in reachable_nodes(syn) {
        if syn[id].kind == NodeKind::Terminal {
            set.insert(syn[id].tok.val.clone());
        }
    }
    set.into_iter().collect()
}

/// The names that act as tokens without a literal spelling: declared-but-
/// empty productions in source order, then pseudoterminal references in
/// first-reference order.
pub fn collect_terminal_productions(syn: &Syntax) -> Vec<Sym> {
    let mut set = IndexSet::new();
    for (_, def) in syn.defs() {
        if def.node.is_none() {
            set.insert(def.tok.val.clone());
        }
    }
    for id in reachable_nodes(syn) {
        let node = &syn[id];
        if node.kind == NodeKind::Nonterminal && node.def.is_none() {
            set.insert(node.tok.val.clone());
        }
    }
    set.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use errors::Errors;
    use parser::parse_str;

    fn analyze(code: &str) -> (Syntax, Errors) {
        let mut errs = Errors::new();
        let mut syn = parse_str(code, &mut errs);
        assert_eq!(errs.error_count(), 0, "parse failed: {:?}", errs.issues());
        finish_syntax(&mut syn, &mut errs);
        (syn, errs)
    }

    #[test]
    fn resolution_fills_back_refs() {
        let (syn, errs) = analyze("S ::= A A\nA ::= 'a'");
        assert_eq!(errs.error_count(), 0);
        let a = syn.get_def("A").unwrap();
        assert_eq!(syn[a].used_by.len(), 2);
        assert_eq!(syn.back_refs("A"), &syn[a].used_by[..]);
        for &user in &syn[a].used_by {
            assert_eq!(syn[user].def, Some(a));
        }
    }

    #[test]
    fn unresolved_references_are_warnings() {
        let (syn, errs) = analyze("S ::= ident");
        assert_eq!(errs.error_count(), 0);
        assert_eq!(errs.issues().len(), 1);
        assert!(errs.issues()[0].warning);
        let root = syn[syn.start().unwrap()].node.unwrap();
        assert_eq!(syn[root].def, None);
    }

    #[test]
    fn nullability_fixpoint() {
        let (syn, _) = analyze("S ::= { 'a' } 'b'\nN ::= [ 'x' ]\nM ::= N N");
        assert!(!syn[syn.start().unwrap()].nullable);
        assert!(syn[syn.get_def("N").unwrap()].nullable);
        assert!(syn[syn.get_def("M").unwrap()].nullable);
        let root = syn[syn.start().unwrap()].node.unwrap();
        let rep = syn[root].subs[0];
        assert!(syn.node_repeatable(rep));
    }

    #[test]
    fn flags_are_stable() {
        let (mut syn, _) = analyze("S ::= { 'a' } [ S ] 'b'");
        assert!(!propagate_flags(&mut syn));
    }

    #[test]
    fn direct_left_recursion() {
        let (syn, errs) = analyze("E ::= E '+' T | T\nT ::= 'n'");
        let e = syn.get_def("E").unwrap();
        assert!(syn[e].direct_left_recursive);
        assert!(!syn[e].indirect_left_recursive);
        assert_eq!(errs.error_count(), 1);
        // the recursive reference is tagged
        let root = syn[e].node.unwrap();
        let seq = syn[root].subs[0];
        assert!(syn[syn[seq].subs[0]].left_recursive);
    }

    #[test]
    fn indirect_left_recursion() {
        let (syn, errs) = analyze("A ::= B\nB ::= A");
        let a = syn.get_def("A").unwrap();
        let b = syn.get_def("B").unwrap();
        assert!(syn[a].indirect_left_recursive);
        assert!(syn[b].indirect_left_recursive);
        assert!(!syn[a].nullable);
        assert!(!syn[b].nullable);
        assert_eq!(errs.error_count(), 2);
    }

    #[test]
    fn nullable_heads_hide_recursion() {
        // the leading optional makes the recursive reference leftmost-visible
        let (syn, _) = analyze("S ::= [ 'a' ] S 'b'");
        assert!(syn[syn.start().unwrap()].direct_left_recursive);
    }

    #[test]
    fn ambiguity_checks() {
        let mut errs = Errors::new();
        let mut syn = parse_str("S ::= 'a' 'x' | 'a' 'y'", &mut errs);
        finish_syntax(&mut syn, &mut errs);
        let sets = FirstFollowSets::compute(&syn, 1);
        check_ambiguity(&syn, &sets, &mut errs);
        assert_eq!(errs.error_count(), 0);
        assert!(errs.issues().iter().any(|i| i.msg.contains("ambiguous")));
    }

    #[test]
    fn bad_predicates_are_reported() {
        let mut errs = Errors::new();
        let mut syn = parse_str("S ::= \\LALR\\ 'a' 'b' | 'c'", &mut errs);
        finish_syntax(&mut syn, &mut errs);
        let sets = FirstFollowSets::compute(&syn, 1);
        check_ambiguity(&syn, &sets, &mut errs);
        assert_eq!(errs.error_count(), 1);
        assert!(errs.issues().iter().any(|i| i.msg.contains("invalid predicate")));
    }

    #[test]
    fn terminal_collectors() {
        let (syn, _) = analyze("S ::= 'x' ident T\nT ::=\nident2 ::= 'y'");
        assert_eq!(
            collect_terminal_strings(&syn)
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>(),
            ["x", "y"]
        );
        assert_eq!(
            collect_terminal_productions(&syn)
                .iter()
                .map(|s| s.to_string())
                .collect::<Vec<_>>(),
            ["T", "ident"]
        );
    }
}
