// Copyright (c) 2018 Fabian Schuiki

//! A grammar workbench: parses EBNF specifications, analyzes them for
//! predictive-parsing properties, and emits equivalent grammars for several
//! parser generators.

#![deny(missing_docs)]

extern crate bit_set;
extern crate indexmap;
#[macro_use]
extern crate log;

pub mod analyzer;
pub mod antlr;
pub mod coco;
pub mod errors;
pub mod first;
pub mod genutils;
pub mod lexer;
pub mod llgen;
pub mod parser;
pub mod syntax;
pub mod syntree;
pub mod token;

/// A pretty printer.
pub struct Pretty<C, T> {
    ctx: C,
    item: T,
}

impl<C, T> Pretty<C, T> {
    pub(crate) fn new(ctx: C, item: T) -> Pretty<C, T> {
        Pretty { ctx, item }
    }
}
