// Copyright (c) 2018 Fabian Schuiki

//! The Coco/R-style grammar emitter.
//!
//! Emits a `.atg` file. With AST building enabled, every non-transparent
//! production wraps its body in semantic actions that push a syntax-tree
//! node on entry and pop it on exit, and every terminal records itself via
//! `addTerminal`.

use std::io::{self, Write};

use analyzer::{collect_terminal_productions, collect_terminal_strings};
use antlr::HEADER;
use first::FirstFollowSets;
use genutils::{escape_dollars, ordered_token_list, token_name};
use syntax::{NodeId, NodeKind, Quantity, Syntax};
use token::Handling;

/// Emit the grammar in Coco/R syntax.
pub fn generate<W: Write>(
    out: &mut W,
    syn: &Syntax,
    tbl: &FirstFollowSets,
    build_ast: bool,
    namespace: &str,
) -> io::Result<()> {
    let root = match syn.start() {
        Some(root) => root,
        None => {
            warn!("refusing to emit an empty grammar");
            return Ok(());
        }
    };

    writeln!(out, "{}", HEADER)?;
    if build_ast {
        writeln!(out, "#include <QStack>")?;
        writeln!(out, "#include <{}SynTree.h>", namespace)?;
    }
    writeln!(out, "COMPILER {}", syn[root].name())?;
    if build_ast {
        writeln!(out)?;
        writeln!(out, "\t{}::SynTree d_root;", namespace)?;
        writeln!(out, "\tQStack<{}::SynTree*> d_stack;", namespace)?;
        writeln!(out, "\tvoid addTerminal() {{")?;
        writeln!(
            out,
            "\t\t{}::SynTree* n = new {}::SynTree( d_cur ); d_stack.top()->d_children.append(n);",
            namespace, namespace
        )?;
        writeln!(out, "\t}}")?;
    }
    writeln!(out)?;

    writeln!(out, "TOKENS")?;
    for t in ordered_token_list(collect_terminal_strings(syn)) {
        writeln!(out, "  {}", token_name(t.as_str()))?;
    }
    // Synthetic tokens have no spelling the scanner could match.
    for t in collect_terminal_productions(syn) {
        writeln!(out, "  {}_", token_name(t.as_str()))?;
    }
    writeln!(out)?;

    writeln!(out, "PRODUCTIONS")?;
    writeln!(out)?;

    for (id, def) in syn.defs() {
        if id != root && (syn.def_ignored(id) || def.used_by.is_empty()) {
            continue;
        }
        let node = match def.node {
            Some(node) => node,
            None => continue,
        };
        write!(out, "{} = \n    ", escape_dollars(def.name().as_str()))?;
        let transparent = def.tok.op == Handling::Transparent;
        if build_ast {
            if id == root {
                write!(out, "(. d_stack.push(&d_root); .) (")?;
            } else if !transparent {
                write!(
                    out,
                    "(. {}::SynTree* n = new {}::SynTree( {}::SynTree::R_{}, d_next ); \
                     d_stack.top()->d_children.append(n); d_stack.push(n); .) ( ",
                    namespace,
                    namespace,
                    namespace,
                    escape_dollars(def.name().as_str())
                )?;
            }
        }
        write_node(out, syn, tbl, node, true, build_ast)?;
        if build_ast && (id == root || !transparent) {
            write!(out, ") (. d_stack.pop(); .) ")?;
        }
        writeln!(out, "\n    .")?;
        writeln!(out)?;
    }

    writeln!(out, "END {} .", syn[root].name())?;
    Ok(())
}

fn write_node<W: Write>(
    out: &mut W,
    syn: &Syntax,
    tbl: &FirstFollowSets,
    id: NodeId,
    top: bool,
    build_ast: bool,
) -> io::Result<()> {
    if syn.node_ignored(id) {
        return Ok(());
    }
    let node = &syn[id];

    match node.quant {
        Quantity::One => {
            if !top && node.kind == NodeKind::Alternative {
                write!(out, "( ")?;
            }
        }
        Quantity::ZeroOrOne => write!(out, "[ ")?,
        Quantity::ZeroOrMore => write!(out, "{{ ")?,
    }

    match node.kind {
        NodeKind::Terminal => {
            write!(out, "{} ", token_name(node.tok.val.as_str()))?;
            if build_ast {
                write!(out, "(. addTerminal(); .) ")?;
            }
        }
        NodeKind::Nonterminal => {
            let pseudo = match node.def {
                Some(def) => syn[def].node.is_none(),
                None => true,
            };
            if pseudo {
                write!(out, "{} ", token_name(node.tok.val.as_str()))?;
                if build_ast {
                    write!(out, "(. addTerminal(); .) ")?;
                }
            } else {
                write!(out, "{} ", escape_dollars(node.tok.val.as_str()))?;
            }
        }
        NodeKind::Alternative => {
            for (i, &sub) in node.subs.iter().enumerate() {
                if i != 0 {
                    if top {
                        write!(out, "\n    | ")?;
                    } else {
                        write!(out, "| ")?;
                    }
                }
                write_node(out, syn, tbl, sub, false, build_ast)?;
            }
        }
        NodeKind::Sequence => {
            for &sub in &node.subs {
                if syn[sub].kind == NodeKind::Predicate {
                    handle_predicate(out, syn, tbl, sub, id)?;
                } else {
                    write_node(out, syn, tbl, sub, false, build_ast)?;
                }
            }
        }
        // The parser only creates predicates as heads of sequences.
        NodeKind::Predicate => {
            warn!(
                "predicate node outside a sequence in '{}'",
                syn[node.owner].name()
            );
        }
    }

    match node.quant {
        Quantity::One => {
            if !top && node.kind == NodeKind::Alternative {
                write!(out, ") ")?;
            }
        }
        Quantity::ZeroOrOne => write!(out, "] ")?,
        Quantity::ZeroOrMore => write!(out, "}} ")?,
    }
    Ok(())
}

/// Render a look-ahead predicate as a Coco `IF` condition over peeked
/// tokens, one conjunct per depth.
fn handle_predicate<W: Write>(
    out: &mut W,
    syn: &Syntax,
    tbl: &FirstFollowSets,
    pred: NodeId,
    seq: NodeId,
) -> io::Result<()> {
    let ll = syn.node_llk(pred) as usize;
    if ll == 0 {
        warn!(
            "unknown predicate '{}' in '{}'",
            syn[pred].tok.val,
            syn[syn[pred].owner].name()
        );
        return Ok(());
    }
    let depths = tbl.first_of_lookahead(syn, ll, seq);
    write!(out, "IF( ")?;
    let mut first = true;
    for (i, set) in depths.iter().enumerate() {
        if set.is_empty() {
            continue;
        }
        if !first {
            write!(out, "&& ")?;
        }
        first = false;
        if set.len() > 1 {
            write!(out, "( ")?;
        }
        for (j, sym) in set.iter().enumerate() {
            if j != 0 {
                write!(out, "|| ")?;
            }
            write!(out, "peek({}) == _{} ", i + 1, token_name(sym.as_str()))?;
        }
        if set.len() > 1 {
            write!(out, ") ")?;
        }
    }
    write!(out, ") ")?;
    Ok(())
}
