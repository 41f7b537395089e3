// Copyright (c) 2018 Fabian Schuiki

//! Data structures representing a parsed grammar.
//!
//! A grammar is a list of named definitions in source order. Each definition
//! owns a tree of nodes; nonterminal references, parent links, and the
//! back-reference index are non-owning IDs overlaid on that tree.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::slice;

use indexmap::IndexMap;

use token::{Handling, Sym, Token, TokenKind};
use Pretty;

/// A unique definition identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DefId(usize);

impl DefId {
    /// Create a definition id from a usize.
    pub fn from_usize(id: usize) -> DefId {
        DefId(id)
    }

    /// Obtain the id as a usize.
    pub fn as_usize(self) -> usize {
        self.0
    }
}

/// A unique node identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    /// Create a node id from a usize.
    pub fn from_usize(id: usize) -> NodeId {
        NodeId(id)
    }

    /// Obtain the id as a usize.
    pub fn as_usize(self) -> usize {
        self.0
    }
}

/// The kind of an expression tree node.
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Terminal,
    Nonterminal,
    Sequence,
    Alternative,
    Predicate,
}

/// The quantifier attached to a node.
#[allow(missing_docs)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Quantity {
    One,
    ZeroOrOne,
    ZeroOrMore,
}

/// A node of a definition's expression tree.
#[derive(Debug, Clone)]
pub struct Node {
    /// The kind of the node.
    pub kind: NodeKind,
    /// The quantifier applied to the node.
    pub quant: Quantity,
    /// The token this node was created from; carries position and value.
    pub tok: Token,
    /// The ordered children; owned.
    pub subs: Vec<NodeId>,
    /// The definition this node belongs to.
    pub owner: DefId,
    /// The enclosing container node, if any.
    pub parent: Option<NodeId>,
    /// The resolved definition of a Nonterminal node. Stays `None` for
    /// pseudoterminal references without a matching production.
    pub def: Option<DefId>,
    /// Whether this node lies on a left-recursive path.
    pub left_recursive: bool,
}

impl Node {
    /// Create a new node.
    pub fn new(kind: NodeKind, owner: DefId, tok: Token) -> Node {
        Node {
            kind: kind,
            quant: Quantity::One,
            tok: tok,
            subs: Vec::new(),
            owner: owner,
            parent: None,
            def: None,
            left_recursive: false,
        }
    }
}

/// A named production of the grammar.
#[derive(Debug, Clone)]
pub struct Definition {
    /// The name token; carries the operator annotation and position.
    pub tok: Token,
    /// The root of the expression tree, or `None` for a declared-but-empty
    /// production.
    pub node: Option<NodeId>,
    /// The nonterminal nodes referencing this definition, in source order.
    pub used_by: Vec<NodeId>,
    /// Whether the production can derive the empty string.
    pub nullable: bool,
    /// Whether the production lies under a repetition.
    pub repeatable: bool,
    /// Whether the production derives itself as its own first symbol.
    pub direct_left_recursive: bool,
    /// Whether the production reaches itself leftmost through other
    /// productions.
    pub indirect_left_recursive: bool,
}

impl Definition {
    /// Create a new definition from its name token.
    pub fn new(tok: Token) -> Definition {
        Definition {
            tok: tok,
            node: None,
            used_by: Vec::new(),
            nullable: false,
            repeatable: false,
            direct_left_recursive: false,
            indirect_left_recursive: false,
        }
    }

    /// The name of the production.
    pub fn name(&self) -> &Sym {
        &self.tok.val
    }
}

/// An iterator over the definitions of a grammar in source order.
pub struct Defs<'a> {
    inner: slice::Iter<'a, Definition>,
    next: usize,
}

impl<'a> Iterator for Defs<'a> {
    type Item = (DefId, &'a Definition);
    fn next(&mut self) -> Option<(DefId, &'a Definition)> {
        match self.inner.next() {
            Some(d) => {
                let id = DefId(self.next);
                self.next += 1;
                Some((id, d))
            }
            None => None,
        }
    }
}

/// A parsed grammar.
///
/// Created by the parser, mutated only by the analyzer, read by the
/// emitters. After `finish_syntax` the structure is logically frozen.
#[derive(Debug, Default)]
pub struct Syntax {
    defs: Vec<Definition>,
    names: HashMap<Sym, DefId>,
    nodes: Vec<Node>,
    back_refs: IndexMap<Sym, Vec<NodeId>>,
    finished: bool,
}

impl Syntax {
    /// Create an empty grammar.
    pub fn new() -> Syntax {
        Syntax {
            defs: Vec::new(),
            names: HashMap::new(),
            nodes: Vec::new(),
            back_refs: IndexMap::new(),
            finished: false,
        }
    }

    /// Add a definition. Fails on a duplicate name.
    pub fn add_def(&mut self, def: Definition) -> Option<DefId> {
        if self.names.contains_key(def.name().as_str()) {
            return None;
        }
        let id = DefId(self.defs.len());
        self.names.insert(def.name().clone(), id);
        self.defs.push(def);
        Some(id)
    }

    /// Add a node to the arena.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    /// Append `child` to the sub-node list of `parent`.
    pub fn add_sub(&mut self, parent: NodeId, child: NodeId) {
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].subs.push(child);
    }

    /// Look up a definition by name.
    pub fn get_def(&self, name: &str) -> Option<DefId> {
        self.names.get(name).cloned()
    }

    /// The definitions in source order.
    pub fn defs(&self) -> Defs {
        Defs {
            inner: self.defs.iter(),
            next: 0,
        }
    }

    /// The number of definitions.
    pub fn def_count(&self) -> usize {
        self.defs.len()
    }

    /// The number of nodes in the arena.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The start symbol: the first definition in source order.
    pub fn start(&self) -> Option<DefId> {
        if self.defs.is_empty() {
            None
        } else {
            Some(DefId(0))
        }
    }

    /// Record that `node` references the name `name`.
    pub fn add_back_ref(&mut self, name: Sym, node: NodeId) {
        self.back_refs.entry(name).or_insert_with(Vec::new).push(node);
    }

    /// All nodes referencing `name`, in source-traversal order.
    pub fn back_refs(&self, name: &str) -> &[NodeId] {
        match self.back_refs.get(name) {
            Some(v) => v,
            None => &[],
        }
    }

    /// Whether the analyzer has run.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub(crate) fn set_finished(&mut self) {
        self.finished = true;
    }

    /// Whether a definition contributes no output.
    pub fn def_ignored(&self, id: DefId) -> bool {
        self[id].tok.op == Handling::Skip
    }

    /// Whether a node contributes no output. Skip annotations are transitive
    /// through nonterminal references.
    pub fn node_ignored(&self, id: NodeId) -> bool {
        let node = &self[id];
        if node.tok.op == Handling::Skip {
            return true;
        }
        match node.def {
            Some(def) => self.def_ignored(def),
            None => false,
        }
    }

    /// Whether a node can derive the empty string, given the current
    /// definition flags.
    pub fn node_nullable(&self, id: NodeId) -> bool {
        let node = &self[id];
        match node.quant {
            Quantity::ZeroOrOne | Quantity::ZeroOrMore => return true,
            Quantity::One => {}
        }
        match node.kind {
            NodeKind::Terminal => false,
            NodeKind::Predicate => true,
            NodeKind::Nonterminal => match node.def {
                Some(def) => self[def].nullable,
                None => false,
            },
            NodeKind::Sequence => node.subs.iter().all(|&sub| self.node_nullable(sub)),
            NodeKind::Alternative => node.subs.iter().any(|&sub| self.node_nullable(sub)),
        }
    }

    /// Whether a node lies on a path under a repetition, given the current
    /// definition flags.
    pub fn node_repeatable(&self, id: NodeId) -> bool {
        let node = &self[id];
        if node.quant == Quantity::ZeroOrMore {
            return true;
        }
        match node.kind {
            NodeKind::Terminal | NodeKind::Predicate => false,
            NodeKind::Nonterminal => match node.def {
                Some(def) => self[def].repeatable,
                None => false,
            },
            NodeKind::Sequence | NodeKind::Alternative => {
                node.subs.iter().any(|&sub| self.node_repeatable(sub))
            }
        }
    }

    /// The first visible symbol of a subtree: the leftmost terminal or
    /// nonterminal leaf that is not suppressed.
    pub fn first_visible_element_of(&self, id: NodeId) -> Option<NodeId> {
        let node = &self[id];
        if self.node_ignored(id) {
            return None;
        }
        match node.kind {
            NodeKind::Terminal | NodeKind::Nonterminal => Some(id),
            NodeKind::Predicate => None,
            NodeKind::Sequence | NodeKind::Alternative => {
                for &sub in &node.subs {
                    if let Some(found) = self.first_visible_element_of(sub) {
                        return Some(found);
                    }
                }
                None
            }
        }
    }

    /// The predicate heading a sequence, if any.
    pub fn first_predicate_of(&self, id: NodeId) -> Option<NodeId> {
        let node = &self[id];
        if node.kind != NodeKind::Sequence {
            return None;
        }
        match node.subs.first() {
            Some(&sub) if self[sub].kind == NodeKind::Predicate => Some(sub),
            _ => None,
        }
    }

    /// The look-ahead depth of a Predicate node; 0 when the annotation is
    /// not understood.
    pub fn node_llk(&self, id: NodeId) -> u32 {
        predicate_llk(self[id].tok.val.as_str())
    }

    /// Get a pretty printer for a definition.
    pub fn pretty_def(&self, id: DefId) -> Pretty<&Syntax, DefId> {
        Pretty::new(self, id)
    }

    /// Get a pretty printer for a node.
    pub fn pretty_node(&self, id: NodeId) -> Pretty<&Syntax, NodeId> {
        Pretty::new(self, id)
    }

    /// Render the whole grammar back to EBNF source.
    pub fn to_ebnf(&self) -> String {
        let mut out = String::new();
        for (id, _) in self.defs() {
            out.push_str(&format!("{}\n", self.pretty_def(id)));
        }
        out
    }
}

impl Index<DefId> for Syntax {
    type Output = Definition;
    fn index(&self, idx: DefId) -> &Definition {
        &self.defs[idx.0]
    }
}

impl IndexMut<DefId> for Syntax {
    fn index_mut(&mut self, idx: DefId) -> &mut Definition {
        &mut self.defs[idx.0]
    }
}

impl Index<NodeId> for Syntax {
    type Output = Node;
    fn index(&self, idx: NodeId) -> &Node {
        &self.nodes[idx.0]
    }
}

impl IndexMut<NodeId> for Syntax {
    fn index_mut(&mut self, idx: NodeId) -> &mut Node {
        &mut self.nodes[idx.0]
    }
}

/// Extract the look-ahead depth from a predicate annotation.
///
/// Only the `LL:k` form is understood; anything else yields 0 and is
/// reported by the caller.
pub fn predicate_llk(text: &str) -> u32 {
    let text = text.trim();
    if !text.starts_with("LL:") {
        return 0;
    }
    text[3..].trim().parse().unwrap_or(0)
}

fn op_suffix(op: Handling) -> &'static str {
    match op {
        Handling::Normal => "",
        Handling::Transparent => "*",
        Handling::Keep => "!",
        Handling::Skip => "-",
    }
}

fn escape_literal(text: &str) -> String {
    let mut out = String::new();
    for c in text.chars() {
        match c {
            '\'' => out.push_str("\\'"),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out
}

fn write_node(f: &mut fmt::Formatter, syn: &Syntax, id: NodeId, top: bool) -> fmt::Result {
    let node = &syn[id];
    let grouped = match node.quant {
        Quantity::ZeroOrOne => {
            write!(f, "[ ")?;
            true
        }
        Quantity::ZeroOrMore => {
            write!(f, "{{ ")?;
            true
        }
        Quantity::One => {
            let need = !top
                && (node.kind == NodeKind::Alternative || node.kind == NodeKind::Sequence);
            if need {
                write!(f, "( ")?;
            }
            need
        }
    };
    match node.kind {
        NodeKind::Terminal => {
            if node.tok.kind == TokenKind::Keyword {
                write!(f, "{}{}", node.tok.val, op_suffix(node.tok.op))?;
            } else {
                write!(
                    f,
                    "'{}'{}",
                    escape_literal(node.tok.val.as_str()),
                    op_suffix(node.tok.op)
                )?;
            }
        }
        NodeKind::Nonterminal => {
            write!(f, "{}{}", node.tok.val, op_suffix(node.tok.op))?;
        }
        NodeKind::Predicate => {
            write!(f, "\\{}\\", node.tok.val)?;
        }
        NodeKind::Sequence => {
            for (i, &sub) in node.subs.iter().enumerate() {
                if i != 0 {
                    write!(f, " ")?;
                }
                write_node(f, syn, sub, false)?;
            }
        }
        NodeKind::Alternative => {
            for (i, &sub) in node.subs.iter().enumerate() {
                if i != 0 {
                    write!(f, " | ")?;
                }
                write_node(f, syn, sub, false)?;
            }
        }
    }
    if grouped {
        match node.quant {
            Quantity::ZeroOrOne => write!(f, " ]")?,
            Quantity::ZeroOrMore => write!(f, " }}")?,
            Quantity::One => write!(f, " )")?,
        }
    }
    Ok(())
}

impl<'a> fmt::Display for Pretty<&'a Syntax, NodeId> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write_node(f, self.ctx, self.item, true)
    }
}

impl<'a> fmt::Display for Pretty<&'a Syntax, DefId> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let def = &self.ctx[self.item];
        if def.tok.kind == TokenKind::Literal {
            write!(
                f,
                "'{}'{} ::=",
                escape_literal(def.tok.val.as_str()),
                op_suffix(def.tok.op)
            )?;
        } else {
            write!(f, "{}{} ::=", def.tok.val, op_suffix(def.tok.op))?;
        }
        match def.node {
            Some(node) => write!(f, " {}", self.ctx.pretty_node(node)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use token::{Symbols, TokenKind};

    fn tok(syms: &mut Symbols, kind: TokenKind, text: &str) -> Token {
        Token::new(kind, 1, 1, text.len() as u16, syms.intern(text))
    }

    #[test]
    fn quantifiers_drive_nullability() {
        let mut syms = Symbols::new();
        let mut syn = Syntax::new();
        let d = syn
            .add_def(Definition::new(tok(&mut syms, TokenKind::Production, "S")))
            .unwrap();
        let seq = syn.add_node(Node::new(NodeKind::Sequence, d, Token::default()));
        let a = syn.add_node(Node::new(
            NodeKind::Terminal,
            d,
            tok(&mut syms, TokenKind::Literal, "a"),
        ));
        let b = syn.add_node(Node::new(
            NodeKind::Terminal,
            d,
            tok(&mut syms, TokenKind::Literal, "b"),
        ));
        syn.add_sub(seq, a);
        syn.add_sub(seq, b);
        syn[d].node = Some(seq);

        assert!(!syn.node_nullable(seq));
        syn[a].quant = Quantity::ZeroOrMore;
        syn[b].quant = Quantity::ZeroOrOne;
        assert!(syn.node_nullable(seq));
        assert!(syn.node_repeatable(seq));
        assert!(!syn.node_repeatable(b));
    }

    #[test]
    fn duplicate_definitions_rejected() {
        let mut syms = Symbols::new();
        let mut syn = Syntax::new();
        assert!(
            syn.add_def(Definition::new(tok(&mut syms, TokenKind::Production, "S")))
                .is_some()
        );
        assert!(
            syn.add_def(Definition::new(tok(&mut syms, TokenKind::Production, "S")))
                .is_none()
        );
    }

    #[test]
    fn llk_annotations() {
        assert_eq!(predicate_llk("LL:2"), 2);
        assert_eq!(predicate_llk(" LL: 16 "), 16);
        assert_eq!(predicate_llk("LALR"), 0);
        assert_eq!(predicate_llk("LL:x"), 0);
    }

    #[test]
    fn pretty_prints_ebnf() {
        let mut syms = Symbols::new();
        let mut syn = Syntax::new();
        let d = syn
            .add_def(Definition::new(tok(&mut syms, TokenKind::Production, "S")))
            .unwrap();
        let alt = syn.add_node(Node::new(NodeKind::Alternative, d, Token::default()));
        let a = syn.add_node(Node::new(
            NodeKind::Terminal,
            d,
            tok(&mut syms, TokenKind::Literal, "a"),
        ));
        let x = syn.add_node(Node::new(
            NodeKind::Nonterminal,
            d,
            tok(&mut syms, TokenKind::Nonterm, "x"),
        ));
        syn.add_sub(alt, a);
        syn.add_sub(alt, x);
        syn[alt].quant = Quantity::ZeroOrMore;
        syn[d].node = Some(alt);
        assert_eq!(syn.to_ebnf(), "S ::= { 'a' | x }\n");
    }
}
