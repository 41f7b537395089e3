// Copyright (c) 2018 Fabian Schuiki

//! The LLgen-style grammar emitter.
//!
//! Shares the structural rules of the other grammar emitters but uses
//! LLgen's surface forms: `[ … ]` for grouping, `[ … ]?` and `[ … ]*` for
//! option and repetition, and `%if` conditions for look-ahead predicates.

use std::io::{self, Write};

use analyzer::{collect_terminal_productions, collect_terminal_strings};
use antlr::HEADER;
use first::FirstFollowSets;
use genutils::{ordered_token_list, rule_name, token_name};
use syntax::{NodeId, NodeKind, Quantity, Syntax};

/// Emit the grammar in LLgen syntax.
pub fn generate<W: Write>(out: &mut W, syn: &Syntax, tbl: &FirstFollowSets) -> io::Result<()> {
    let root = match syn.start() {
        Some(root) => root,
        None => {
            warn!("refusing to emit an empty grammar");
            return Ok(());
        }
    };

    writeln!(out, "{}", HEADER)?;
    writeln!(out)?;
    writeln!(out, "%start parser, {};", rule_name(syn[root].name().as_str()))?;
    writeln!(out)?;

    let mut tokens = ordered_token_list(collect_terminal_strings(syn));
    tokens.extend(collect_terminal_productions(syn));
    for t in tokens {
        writeln!(out, "%token T_{};", token_name(t.as_str()))?;
    }
    writeln!(out)?;

    for (id, def) in syn.defs() {
        if syn.def_ignored(id) || (id != root && def.used_by.is_empty()) {
            continue;
        }
        let node = match def.node {
            Some(node) => node,
            None => continue,
        };
        write!(out, "{} :\n    ", rule_name(def.name().as_str()))?;
        write_node(out, syn, tbl, node, true)?;
        writeln!(out, "\n;")?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_node<W: Write>(
    out: &mut W,
    syn: &Syntax,
    tbl: &FirstFollowSets,
    id: NodeId,
    top: bool,
) -> io::Result<()> {
    if syn.node_ignored(id) {
        return Ok(());
    }
    let node = &syn[id];

    match node.quant {
        Quantity::One => {
            if !top && node.kind == NodeKind::Alternative {
                write!(out, "[ ")?;
            }
        }
        Quantity::ZeroOrOne | Quantity::ZeroOrMore => write!(out, "[ ")?,
    }

    match node.kind {
        NodeKind::Terminal => write!(out, "T_{} ", token_name(node.tok.val.as_str()))?,
        NodeKind::Nonterminal => {
            let pseudo = match node.def {
                Some(def) => syn[def].node.is_none(),
                None => true,
            };
            if pseudo {
                write!(out, "T_{} ", token_name(node.tok.val.as_str()))?;
            } else {
                write!(out, "{} ", rule_name(node.tok.val.as_str()))?;
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
                write_node(out, syn, tbl, sub, false)?;
            }
        }
        NodeKind::Sequence => {
            for &sub in &node.subs {
                if syn[sub].kind == NodeKind::Predicate {
                    handle_predicate(out, syn, tbl, sub, id)?;
                } else {
                    write_node(out, syn, tbl, sub, false)?;
                }
            }
        }
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
                write!(out, "] ")?;
            }
        }
        Quantity::ZeroOrOne => write!(out, "]? ")?,
        Quantity::ZeroOrMore => write!(out, "]* ")?,
    }
    Ok(())
}

/// Render a look-ahead predicate as an LLgen `%if` condition.
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
    write!(out, "%if( ")?;
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
            write!(out, "peek({}) == T_{} ", i + 1, token_name(sym.as_str()))?;
        }
        if set.len() > 1 {
            write!(out, ") ")?;
        }
    }
    write!(out, ") ")?;
    Ok(())
}
