// Copyright (c) 2018 Fabian Schuiki
#[macro_use]
extern crate clap;
extern crate ebnf_studio;

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::Path;
use std::process;

use clap::{App, Arg};

use ebnf_studio::analyzer;
use ebnf_studio::antlr;
use ebnf_studio::coco;
use ebnf_studio::errors::Errors;
use ebnf_studio::first::FirstFollowSets;
use ebnf_studio::lexer::Lexer;
use ebnf_studio::llgen;
use ebnf_studio::parser::Parser;
use ebnf_studio::syntax::{NodeKind, Syntax};
use ebnf_studio::syntree;

fn main() {
    let matches = App::new(crate_name!())
        .version(crate_version!())
        .author(crate_authors!())
        .about("Analyzes EBNF specifications and emits parser generator inputs.")
        .arg(
            Arg::with_name("INPUT")
                .help("The EBNF specification to process")
                .required(true),
        )
        .arg(
            Arg::with_name("keywords")
                .long("keywords")
                .takes_value(true)
                .value_name("FILE")
                .help("Reclassify identifiers listed in FILE as keywords"),
        )
        .arg(
            Arg::with_name("antlr")
                .long("antlr")
                .takes_value(true)
                .value_name("FILE")
                .help("Emit an ANTLR grammar"),
        )
        .arg(
            Arg::with_name("coco")
                .long("coco")
                .takes_value(true)
                .value_name("FILE")
                .help("Emit a Coco/R grammar"),
        )
        .arg(
            Arg::with_name("ast")
                .long("ast")
                .help("Build syntax trees in the Coco/R grammar"),
        )
        .arg(
            Arg::with_name("llgen")
                .long("llgen")
                .takes_value(true)
                .value_name("FILE")
                .help("Emit an LLgen grammar"),
        )
        .arg(
            Arg::with_name("syntree")
                .long("syntree")
                .takes_value(true)
                .value_name("DIR")
                .help("Emit token type and syntax tree scaffolds into DIR"),
        )
        .arg(
            Arg::with_name("namespace")
                .long("namespace")
                .takes_value(true)
                .value_name("NS")
                .default_value("")
                .help("Namespace of the scaffold artefacts"),
        )
        .arg(
            Arg::with_name("dump")
                .long("dump")
                .help("Print the analyzed grammar as EBNF"),
        )
        .get_matches();

    let input = matches.value_of("INPUT").unwrap();
    let namespace = matches.value_of("namespace").unwrap();

    let file = match File::open(input) {
        Ok(file) => file,
        Err(err) => {
            eprintln!("error: cannot open {}: {}", input, err);
            process::exit(1);
        }
    };
    let mut lex = Lexer::new(BufReader::new(file));
    if let Some(path) = matches.value_of("keywords") {
        match fs::read_to_string(path) {
            Ok(text) => lex.set_keywords(&text),
            Err(err) => {
                eprintln!("error: cannot read keywords from {}: {}", path, err);
                process::exit(1);
            }
        }
    }

    let mut errs = Errors::new();
    let mut syn = Parser::new(&mut lex, &mut errs).parse();
    analyzer::finish_syntax(&mut syn, &mut errs);

    let tbl = FirstFollowSets::compute(&syn, lookahead_depth(&syn));
    analyzer::check_ambiguity(&syn, &tbl, &mut errs);

    for issue in errs.issues() {
        eprintln!("{}:{}", input, issue);
    }

    if matches.is_present("dump") {
        print!("{}", syn.to_ebnf());
    }

    let emitted = emit(&matches, &syn, &tbl, namespace);
    if let Err(err) = emitted {
        eprintln!("error: {}", err);
        process::exit(1);
    }

    if errs.error_count() > 0 {
        process::exit(1);
    }
}

/// The deepest look-ahead any predicate asks for, at least 1.
fn lookahead_depth(syn: &Syntax) -> usize {
    let mut depth = 1;
    for id in analyzer::reachable_nodes(syn) {
        if syn[id].kind == NodeKind::Predicate {
            depth = depth.max(syn.node_llk(id) as usize);
        }
    }
    depth
}

fn emit(
    matches: &clap::ArgMatches,
    syn: &Syntax,
    tbl: &FirstFollowSets,
    namespace: &str,
) -> io::Result<()> {
    if let Some(path) = matches.value_of("antlr") {
        antlr::generate(&mut File::create(path)?, syn)?;
    }
    if let Some(path) = matches.value_of("coco") {
        coco::generate(
            &mut File::create(path)?,
            syn,
            tbl,
            matches.is_present("ast"),
            namespace,
        )?;
    }
    if let Some(path) = matches.value_of("llgen") {
        llgen::generate(&mut File::create(path)?, syn, tbl)?;
    }
    if let Some(dir) = matches.value_of("syntree") {
        let dir = Path::new(dir);
        syntree::generate_token_type(
            &mut File::create(dir.join(format!("{}TokenType.h", namespace)))?,
            &mut File::create(dir.join(format!("{}TokenType.cpp", namespace)))?,
            syn,
            namespace,
        )?;
        syntree::generate_syn_tree(
            &mut File::create(dir.join(format!("{}SynTree.h", namespace)))?,
            &mut File::create(dir.join(format!("{}SynTree.cpp", namespace)))?,
            syn,
            namespace,
        )?;
    }
    Ok(())
}
