// Copyright (c) 2018 Fabian Schuiki

//! First and follow set computation.
//!
//! This module implements the look-ahead engine of the workbench. For every
//! definition it computes FIRST_k — the set of terminal prefixes of length up
//! to `k` the definition can derive — and FOLLOW_1, the terminals that may
//! appear after it. Since definitions are mutually recursive, both are
//! classical monotone fixpoints iterated with a worklist.
//!
//! Prefixes are represented as tuples of interned symbols. A tuple shorter
//! than `k` is the ε-marked case: the derivation can end before `k` tokens.

use std::collections::BTreeSet;
use std::mem::swap;

use bit_set::BitSet;

use syntax::{DefId, NodeId, NodeKind, Quantity, Syntax};
use token::Sym;

/// A terminal prefix of bounded length.
pub type Tuple = Vec<Sym>;

/// A set of terminal prefixes.
pub type TupleSet = BTreeSet<Tuple>;

/// The first and follow sets of a grammar, for a fixed look-ahead depth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstFollowSets {
    k: usize,
    first: Vec<TupleSet>,
    follow: Vec<BTreeSet<Sym>>,
    follow_eof: Vec<bool>,
}

impl FirstFollowSets {
    /// Compute the sets of a grammar with look-ahead depth `k`.
    pub fn compute(syn: &Syntax, k: usize) -> FirstFollowSets {
        let k = if k == 0 { 1 } else { k };
        let num = syn.def_count();
        let mut sets = FirstFollowSets {
            k: k,
            first: vec![TupleSet::new(); num],
            follow: vec![BTreeSet::new(); num],
            follow_eof: vec![false; num],
        };
        compute_first(syn, &mut sets);
        compute_follow(syn, &mut sets);
        sets
    }

    /// The look-ahead depth the sets were computed for.
    pub fn k(&self) -> usize {
        self.k
    }

    /// The FIRST_k set of a definition.
    pub fn first(&self, def: DefId) -> &TupleSet {
        &self.first[def.as_usize()]
    }

    /// The FOLLOW_1 set of a definition.
    pub fn follow(&self, def: DefId) -> &BTreeSet<Sym> {
        &self.follow[def.as_usize()]
    }

    /// Whether end-of-input may follow a definition.
    pub fn follow_eof(&self, def: DefId) -> bool {
        self.follow_eof[def.as_usize()]
    }

    /// The FIRST_k prefixes of a single node.
    pub fn first_of_node_k(&self, syn: &Syntax, node: NodeId) -> TupleSet {
        node_first(syn, self.k, &self.first, node)
    }

    /// The FIRST_1 terminals of a single node; ε is dropped.
    pub fn first_of_node(&self, syn: &Syntax, node: NodeId) -> BTreeSet<Sym> {
        self.first_of_node_k(syn, node)
            .into_iter()
            .filter_map(|t| t.into_iter().next())
            .collect()
    }

    /// The terminals that may appear directly after a node, walking the
    /// enclosing sequences upwards and falling back to the owner's FOLLOW
    /// set at the end of the production.
    pub fn follow_after(&self, syn: &Syntax, node: NodeId) -> BTreeSet<Sym> {
        let (mut out, through) = self.suffix_first(syn, node);
        if through {
            let owner = syn[node].owner;
            out.extend(self.follow(owner).iter().cloned());
        }
        out
    }

    /// The terminals admissible at each look-ahead depth `1..=depth` for the
    /// suffix of a Sequence node. Predicate children consume no input and
    /// are skipped. When the suffix can end before `depth` tokens the
    /// remaining depths are approximated by the owner's FOLLOW set.
    pub fn first_of_lookahead(
        &self,
        syn: &Syntax,
        depth: usize,
        seq: NodeId,
    ) -> Vec<BTreeSet<Sym>> {
        let mut acc = TupleSet::new();
        acc.insert(Vec::new());
        match syn[seq].kind {
            NodeKind::Sequence => {
                for &sub in &syn[seq].subs {
                    if syn[sub].kind == NodeKind::Predicate {
                        continue;
                    }
                    let sub_first = node_first(syn, depth, &self.first, sub);
                    acc = concat(&acc, &sub_first, depth);
                }
            }
            _ => {
                acc = node_first(syn, depth, &self.first, seq);
            }
        }
        let follow = self.follow(syn[seq].owner).clone();
        let mut res = vec![BTreeSet::new(); depth];
        for t in &acc {
            for i in 0..depth {
                if i < t.len() {
                    res[i].insert(t[i].clone());
                } else {
                    res[i].extend(follow.iter().cloned());
                    break;
                }
            }
        }
        res
    }

    /// The terminals that can follow `node` within its own production, plus
    /// whether the production end is reachable from there. The node's own
    /// repetition does not count as its continuation.
    fn suffix_first(&self, syn: &Syntax, node: NodeId) -> (BTreeSet<Sym>, bool) {
        let mut out = BTreeSet::new();
        let mut cur = node;
        loop {
            let parent = match syn[cur].parent {
                Some(p) => p,
                None => return (out, true),
            };
            if syn[parent].kind == NodeKind::Sequence {
                let pos = syn[parent]
                    .subs
                    .iter()
                    .position(|&s| s == cur)
                    .unwrap_or(0);
                let mut tight = false;
                for &sib in &syn[parent].subs[pos + 1..] {
                    out.extend(self.first_of_node(syn, sib));
                    if !syn.node_nullable(sib) {
                        tight = true;
                        break;
                    }
                }
                if tight {
                    return (out, false);
                }
            }
            if syn[parent].quant == Quantity::ZeroOrMore {
                out.extend(self.first_of_node(syn, parent));
            }
            cur = parent;
        }
    }
}

/// Concatenate two prefix sets, truncating to length `k`. ε, the empty
/// tuple, is the identity.
fn concat(a: &TupleSet, b: &TupleSet, k: usize) -> TupleSet {
    let mut out = TupleSet::new();
    for ta in a {
        if ta.len() >= k {
            out.insert(ta.clone());
            continue;
        }
        for tb in b {
            let mut t = ta.clone();
            t.extend(tb.iter().take(k - ta.len()).cloned());
            out.insert(t);
        }
    }
    out
}

/// The FIRST_k prefixes of a node, given the current per-definition sets.
fn node_first(syn: &Syntax, k: usize, first: &[TupleSet], id: NodeId) -> TupleSet {
    let node = &syn[id];
    let core = match node.kind {
        NodeKind::Terminal => singleton(node.tok.val.clone()),
        NodeKind::Predicate => epsilon(),
        NodeKind::Nonterminal => match node.def {
            Some(def) => {
                if syn[def].node.is_some() {
                    truncated(&first[def.as_usize()], k)
                } else {
                    // A declared-but-empty production acts as a token.
                    singleton(syn[def].tok.val.clone())
                }
            }
            // Pseudoterminal: the reference name is the token.
            None => singleton(node.tok.val.clone()),
        },
        NodeKind::Sequence => {
            let mut acc = epsilon();
            for &sub in &node.subs {
                acc = concat(&acc, &node_first(syn, k, first, sub), k);
            }
            acc
        }
        NodeKind::Alternative => {
            let mut acc = TupleSet::new();
            for &sub in &node.subs {
                acc.extend(node_first(syn, k, first, sub));
            }
            acc
        }
    };
    match node.quant {
        Quantity::One => core,
        Quantity::ZeroOrOne => {
            let mut acc = core;
            acc.insert(Vec::new());
            acc
        }
        Quantity::ZeroOrMore => {
            // Bounded Kleene closure: iterate self-concatenation until the
            // prefix set is saturated at depth k.
            let mut acc = epsilon();
            loop {
                let mut next = acc.clone();
                next.extend(concat(&acc, &core, k));
                if next == acc {
                    return next;
                }
                acc = next;
            }
        }
    }
}

fn singleton(sym: Sym) -> TupleSet {
    let mut set = TupleSet::new();
    set.insert(vec![sym]);
    set
}

fn epsilon() -> TupleSet {
    let mut set = TupleSet::new();
    set.insert(Vec::new());
    set
}

/// Re-truncate a prefix set to a smaller depth.
fn truncated(set: &TupleSet, k: usize) -> TupleSet {
    set.iter()
        .map(|t| t.iter().take(k).cloned().collect())
        .collect()
}

/// The main FIRST_k update loop, processing definitions in worklist rounds.
fn compute_first(syn: &Syntax, sets: &mut FirstFollowSets) {
    let num = syn.def_count();
    let mut update = BitSet::with_capacity(num);
    let mut next_update = BitSet::with_capacity(num);
    for (id, def) in syn.defs() {
        match def.node {
            Some(_) => {
                update.insert(id.as_usize());
            }
            // Declared-but-empty productions act as tokens; their set is
            // final from the start.
            None => {
                sets.first[id.as_usize()] = singleton(def.tok.val.clone());
            }
        }
    }

    while !update.is_empty() {
        for current in update.iter() {
            let id = DefId::from_usize(current);
            let root = match syn[id].node {
                Some(root) => root,
                None => continue,
            };
            let new_first = node_first(syn, sets.k, &sets.first, root);
            if new_first != sets.first[current] {
                sets.first[current] = new_first;
                for &user in &syn[id].used_by {
                    next_update.insert(syn[user].owner.as_usize());
                }
            }
        }
        swap(&mut update, &mut next_update);
        next_update.clear();
    }
}

/// The FOLLOW_1 update loop. Every reference site contributes the first
/// symbols of its sequence suffix; where the suffix is nullable the
/// referencing production's own follow set flows through.
fn compute_follow(syn: &Syntax, sets: &mut FirstFollowSets) {
    if let Some(start) = syn.start() {
        sets.follow_eof[start.as_usize()] = true;
    }
    loop {
        let mut changed = false;
        for (id, def) in syn.defs() {
            for &user in &def.used_by {
                let (mut syms, through) = sets.suffix_first(syn, user);
                // A repeated reference may be followed by itself.
                if syn[user].quant == Quantity::ZeroOrMore {
                    syms.extend(sets.first_of_node(syn, user));
                }
                let target = id.as_usize();
                for sym in syms {
                    changed |= sets.follow[target].insert(sym);
                }
                if through {
                    let owner = syn[user].owner.as_usize();
                    let inherited: Vec<Sym> =
                        sets.follow[owner].iter().cloned().collect();
                    for sym in inherited {
                        changed |= sets.follow[target].insert(sym);
                    }
                    if sets.follow_eof[owner] && !sets.follow_eof[target] {
                        sets.follow_eof[target] = true;
                        changed = true;
                    }
                }
            }
        }
        if !changed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyzer;
    use errors::Errors;
    use parser::parse_str;

    fn build(code: &str) -> (Syntax, FirstFollowSets) {
        let mut errs = Errors::new();
        let mut syn = parse_str(code, &mut errs);
        analyzer::finish_syntax(&mut syn, &mut errs);
        let sets = FirstFollowSets::compute(&syn, 2);
        (syn, sets)
    }

    fn names(set: &BTreeSet<Sym>) -> Vec<String> {
        set.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn first_of_terminals() {
        let (syn, sets) = build("S ::= 'a' | 'b'");
        let s = syn.start().unwrap();
        let first: Vec<Vec<String>> = sets
            .first(s)
            .iter()
            .map(|t| t.iter().map(|s| s.to_string()).collect())
            .collect();
        assert_eq!(first, vec![vec!["a".to_string()], vec!["b".to_string()]]);
    }

    #[test]
    fn sequences_concatenate() {
        let (syn, sets) = build("S ::= A 'x'\nA ::= 'a' [ 'b' ]");
        let s = syn.start().unwrap();
        let first: Vec<Vec<String>> = sets
            .first(s)
            .iter()
            .map(|t| t.iter().map(|s| s.to_string()).collect())
            .collect();
        assert_eq!(
            first,
            vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["a".to_string(), "x".to_string()],
            ]
        );
    }

    #[test]
    fn repetition_reaches_epsilon() {
        let (syn, sets) = build("S ::= { 'a' } 'b'");
        let s = syn.start().unwrap();
        let first: Vec<Vec<String>> = sets
            .first(s)
            .iter()
            .map(|t| t.iter().map(|s| s.to_string()).collect())
            .collect();
        assert_eq!(
            first,
            vec![
                vec!["a".to_string(), "a".to_string()],
                vec!["a".to_string(), "b".to_string()],
                vec!["b".to_string()],
            ]
        );
    }

    #[test]
    fn pseudoterminals_act_as_tokens() {
        let (syn, sets) = build("S ::= ident\nident ::=");
        let s = syn.start().unwrap();
        let root = syn[s].node.unwrap();
        assert_eq!(names(&sets.first_of_node(&syn, root)), ["ident"]);
    }

    #[test]
    fn follow_through_references() {
        let (syn, sets) = build("S ::= A 'x'\nA ::= 'a' [ B ]\nB ::= 'b'");
        let a = syn.get_def("A").unwrap();
        let b = syn.get_def("B").unwrap();
        assert_eq!(names(sets.follow(a)), ["x"]);
        assert_eq!(names(sets.follow(b)), ["x"]);
        assert!(!sets.follow_eof(b));
        assert!(sets.follow_eof(syn.start().unwrap()));
    }

    #[test]
    fn lookahead_by_depth() {
        let (syn, sets) = build("S ::= \\LL:2\\ 'a' 'b' | 'a' 'c'");
        let root = syn[syn.start().unwrap()].node.unwrap();
        let seq = syn[root].subs[0];
        let depths = sets.first_of_lookahead(&syn, 2, seq);
        assert_eq!(names(&depths[0]), ["a"]);
        assert_eq!(names(&depths[1]), ["b"]);
    }

    #[test]
    fn first_is_monotone_under_new_alternatives() {
        let (syn1, sets1) = build("S ::= 'a' X\nX ::= 'x'");
        let (syn2, sets2) = build("S ::= 'a' X | 'b'\nX ::= 'x'");
        let f1 = sets1.first(syn1.start().unwrap());
        let f2 = sets2.first(syn2.start().unwrap());
        assert!(f1.is_subset(f2));
    }
}
