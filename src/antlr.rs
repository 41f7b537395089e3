// Copyright (c) 2018 Fabian Schuiki

//! The ANTLR-style grammar emitter.

use std::io::{self, Write};

use analyzer::{collect_terminal_productions, collect_terminal_strings};
use genutils::{ordered_token_list, rule_name, token_name};
use syntax::{NodeId, NodeKind, Quantity, Syntax};

/// The header stamped onto every emitted artefact.
pub const HEADER: &'static str =
    "// This file was automatically generated by EbnfStudio; don't modify it!";

/// Emit the grammar in ANTLR syntax.
///
/// All terminal spellings and terminal productions are declared in the
/// `tokens` block with stable indices. Predicates are omitted; ANTLR derives
/// its own decisions.
pub fn generate<W: Write>(out: &mut W, syn: &Syntax) -> io::Result<()> {
    let root = match syn.start() {
        Some(root) => root,
        None => {
            warn!("refusing to emit an empty grammar");
            return Ok(());
        }
    };

    writeln!(out, "{}", HEADER)?;
    writeln!(out)?;
    writeln!(out, "grammar {};", syn[root].name())?;
    writeln!(out)?;
    writeln!(out, "options {{")?;
    writeln!(out, "    language = Cpp;")?;
    writeln!(out, "}}")?;
    writeln!(out)?;

    writeln!(out, "tokens {{")?;
    let mut tokens = ordered_token_list(collect_terminal_strings(syn));
    tokens.extend(collect_terminal_productions(syn));
    for (i, t) in tokens.iter().enumerate() {
        writeln!(out, "\t{}='{}';", token_name(t.as_str()), i)?;
    }
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(out)?;

    for (id, def) in syn.defs() {
        // The start rule is always emitted; others must be used and visible.
        if syn.def_ignored(id) || (id != root && def.used_by.is_empty()) {
            continue;
        }
        let node = match def.node {
            Some(node) => node,
            None => continue,
        };
        write!(out, "{} : \n    ", rule_name(def.name().as_str()))?;
        write_node(out, syn, node, true)?;
        writeln!(out, "\n    ;")?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_node<W: Write>(out: &mut W, syn: &Syntax, id: NodeId, top: bool) -> io::Result<()> {
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
        Quantity::ZeroOrOne | Quantity::ZeroOrMore => write!(out, "( ")?,
    }

    match node.kind {
        NodeKind::Terminal => write!(out, "{} ", token_name(node.tok.val.as_str()))?,
        NodeKind::Nonterminal => {
            let pseudo = match node.def {
                Some(def) => syn[def].node.is_none(),
                None => true,
            };
            if pseudo {
                write!(out, "{} ", token_name(node.tok.val.as_str()))?;
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
                write_node(out, syn, sub, false)?;
            }
        }
        NodeKind::Sequence => {
            for &sub in &node.subs {
                write_node(out, syn, sub, false)?;
            }
        }
        NodeKind::Predicate => {}
    }

    match node.quant {
        Quantity::One => {
            if !top && node.kind == NodeKind::Alternative {
                write!(out, ") ")?;
            }
        }
        Quantity::ZeroOrOne => write!(out, ")? ")?,
        Quantity::ZeroOrMore => write!(out, ")* ")?,
    }
    Ok(())
}
