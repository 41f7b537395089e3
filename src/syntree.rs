// Copyright (c) 2018 Fabian Schuiki

//! Emitters for the companion artefacts consumed by generated parsers: a
//! token-type enumeration and a syntax-tree shell.
//!
//! The enumeration is partitioned by sentinel markers so that section
//! membership can be tested with plain comparisons: literals, then
//! keywords, then specials, with nonterminal rule ids past `TT_Max`.

use std::collections::BTreeMap;
use std::io::{self, Write};

use analyzer::{collect_terminal_productions, collect_terminal_strings};
use antlr::HEADER;
use genutils::{contains_alnum, escape_dollars, ordered_token_list, sym_to_string, write_latin1};
use syntax::Syntax;
use token::{Handling, Sym};

/// The ordered token list underlying both scaffold artefacts.
///
/// Each entry pairs an emitted name with the token's spelling; sentinel
/// entries carry no spelling. Literals precede keywords, the boundary drawn
/// at the first spelling containing an alphanumeric character; specials
/// (terminal productions) and the end-of-input token follow.
pub fn token_list(syn: &Syntax) -> Vec<(String, Option<String>)> {
    let mut res: Vec<(String, Option<String>)> = Vec::new();
    res.push(("Literals".to_string(), None));
    let mut keyword_section = false;
    for t in ordered_token_list(collect_terminal_strings(syn)) {
        if !keyword_section && contains_alnum(t.as_str()) {
            res.push(("Keywords".to_string(), None));
            keyword_section = true;
        }
        res.push((sym_to_string(t.as_str()), Some(t.to_string())));
    }
    if !keyword_section {
        res.push(("Keywords".to_string(), None));
    }
    res.push(("Specials".to_string(), None));
    for t in collect_terminal_productions(syn) {
        res.push((escape_dollars(t.as_str()), Some(t.to_string())));
    }
    res.push(("Eof".to_string(), Some("<eof>".to_string())));
    res
}

/// The definitions that receive a rule id, keyed by their emitted name.
fn rule_ids(syn: &Syntax) -> BTreeMap<String, Sym> {
    let mut sort = BTreeMap::new();
    for (_, def) in syn.defs() {
        let op = def.tok.op;
        if op != Handling::Transparent && op != Handling::Skip && !def.used_by.is_empty()
            && def.node.is_some()
        {
            sort.insert(escape_dollars(def.name().as_str()), def.name().clone());
        }
    }
    sort
}

fn escape_cstr(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Emit the `<NS>TokenType.h` / `<NS>TokenType.cpp` pair.
pub fn generate_token_type<W: Write>(
    hout: &mut W,
    bout: &mut W,
    syn: &Syntax,
    namespace: &str,
) -> io::Result<()> {
    let tokens = token_list(syn);
    let sep = if namespace.is_empty() { "" } else { "_" };
    let stop = format!("__{}{}TOKENTYPE__", namespace.to_uppercase(), sep);

    writeln!(hout, "#ifndef {}", stop)?;
    writeln!(hout, "#define {}", stop)?;
    writeln!(hout, "{}", HEADER)?;
    writeln!(hout)?;
    if !namespace.is_empty() {
        writeln!(hout, "namespace {} {{", namespace)?;
    }
    writeln!(hout, "\tenum TokenType {{")?;
    writeln!(hout, "\t\tTok_Invalid = 0,")?;
    for &(ref name, ref val) in &tokens {
        match *val {
            None => writeln!(hout, "\n\t\tTT_{},", name)?,
            Some(_) => writeln!(hout, "\t\tTok_{},", name)?,
        }
    }
    writeln!(hout)?;
    writeln!(hout, "\t\tTT_Max")?;
    writeln!(hout, "\t}};")?;
    writeln!(hout)?;
    writeln!(hout, "\tconst char* tokenTypeString( int ); // Pretty with punctuation chars")?;
    writeln!(hout, "\tconst char* tokenTypeName( int ); // Just the names without punctuation chars")?;
    writeln!(hout, "\tbool tokenTypeIsLiteral( int );")?;
    writeln!(hout, "\tbool tokenTypeIsKeyword( int );")?;
    writeln!(hout, "\tbool tokenTypeIsSpecial( int );")?;
    if !namespace.is_empty() {
        writeln!(hout, "}}")?;
    }
    writeln!(hout, "#endif // {}", stop)?;

    writeln!(bout, "{}", HEADER)?;
    writeln!(bout, "#include \"{}TokenType.h\"", namespace)?;
    writeln!(bout)?;
    if !namespace.is_empty() {
        writeln!(bout, "namespace {} {{", namespace)?;
    }

    writeln!(bout, "\tconst char* tokenTypeString( int r ) {{")?;
    writeln!(bout, "\t\tswitch(r) {{")?;
    writeln!(bout, "\t\t\tcase Tok_Invalid: return \"<invalid>\";")?;
    for &(ref name, ref val) in &tokens {
        if let Some(ref val) = *val {
            write!(bout, "\t\t\tcase Tok_{}: return \"", name)?;
            write_latin1(bout, &escape_cstr(val))?;
            writeln!(bout, "\";")?;
        }
    }
    writeln!(bout, "\t\t\tdefault: return \"\";")?;
    writeln!(bout, "\t\t}}")?;
    writeln!(bout, "\t}}")?;

    writeln!(bout, "\tconst char* tokenTypeName( int r ) {{")?;
    writeln!(bout, "\t\tswitch(r) {{")?;
    writeln!(bout, "\t\t\tcase Tok_Invalid: return \"Tok_Invalid\";")?;
    for &(ref name, ref val) in &tokens {
        if val.is_some() {
            writeln!(bout, "\t\t\tcase Tok_{}: return \"Tok_{}\";", name, name)?;
        }
    }
    writeln!(bout, "\t\t\tdefault: return \"\";")?;
    writeln!(bout, "\t\t}}")?;
    writeln!(bout, "\t}}")?;

    writeln!(bout, "\tbool tokenTypeIsLiteral( int r ) {{")?;
    writeln!(bout, "\t\treturn r > TT_Literals && r < TT_Keywords;")?;
    writeln!(bout, "\t}}")?;
    writeln!(bout, "\tbool tokenTypeIsKeyword( int r ) {{")?;
    writeln!(bout, "\t\treturn r > TT_Keywords && r < TT_Specials;")?;
    writeln!(bout, "\t}}")?;
    writeln!(bout, "\tbool tokenTypeIsSpecial( int r ) {{")?;
    writeln!(bout, "\t\treturn r > TT_Specials && r < TT_Max;")?;
    writeln!(bout, "\t}}")?;

    if !namespace.is_empty() {
        writeln!(bout, "}}")?;
    }
    Ok(())
}

/// Emit the `<NS>SynTree.h` / `<NS>SynTree.cpp` pair.
///
/// The record holds a token and an owned child list; rule ids start at
/// `TT_Max + 1` and `rToStr` falls back to `tokenTypeName` below that.
pub fn generate_syn_tree<W: Write>(
    hout: &mut W,
    bout: &mut W,
    syn: &Syntax,
    namespace: &str,
) -> io::Result<()> {
    let rules = rule_ids(syn);
    let sep = if namespace.is_empty() { "" } else { "_" };
    let stop = format!("__{}{}SYNTREE__", namespace.to_uppercase(), sep);

    writeln!(hout, "#ifndef {}", stop)?;
    writeln!(hout, "#define {}", stop)?;
    writeln!(hout, "{}", HEADER)?;
    writeln!(hout)?;
    writeln!(hout, "#include <{}TokenType.h>", namespace)?;
    writeln!(hout, "#include <{}Token.h>", namespace)?;
    writeln!(hout, "#include <QList>")?;
    writeln!(hout)?;
    if !namespace.is_empty() {
        writeln!(hout, "namespace {} {{", namespace)?;
    }
    writeln!(hout)?;
    writeln!(hout, "\tstruct SynTree {{")?;
    writeln!(hout, "\t\tenum ParserRule {{")?;
    writeln!(hout, "\t\t\tR_First = TT_Max + 1,")?;
    for name in rules.keys() {
        writeln!(hout, "\t\t\tR_{},", name)?;
    }
    writeln!(hout, "\t\t\tR_Last")?;
    writeln!(hout, "\t\t}};")?;
    writeln!(hout, "\t\tSynTree(quint16 r = Tok_Invalid, const Token& = Token() );")?;
    writeln!(hout, "\t\tSynTree(const Token& t ):d_tok(t){{}}")?;
    writeln!(hout, "\t\t~SynTree() {{ foreach(SynTree* n, d_children) delete n; }}")?;
    writeln!(hout)?;
    writeln!(hout, "\t\tstatic const char* rToStr( quint16 r );")?;
    writeln!(hout)?;
    writeln!(hout, "\t\tToken d_tok;")?;
    writeln!(hout, "\t\tQList<SynTree*> d_children;")?;
    writeln!(hout, "\t}};")?;
    writeln!(hout)?;
    if !namespace.is_empty() {
        writeln!(hout, "}}")?;
    }
    writeln!(hout, "#endif // {}", stop)?;

    writeln!(bout, "{}", HEADER)?;
    writeln!(bout, "#include \"{}SynTree.h\"", namespace)?;
    if !namespace.is_empty() {
        writeln!(bout, "using namespace {};", namespace)?;
    }
    writeln!(bout)?;
    writeln!(bout, "SynTree::SynTree(quint16 r, const Token& t ):d_tok(r){{")?;
    writeln!(bout, "\td_tok.d_lineNr = t.d_lineNr;")?;
    writeln!(bout, "\td_tok.d_colNr = t.d_colNr;")?;
    writeln!(bout, "\td_tok.d_sourcePath = t.d_sourcePath;")?;
    writeln!(bout, "}}")?;
    writeln!(bout)?;
    writeln!(bout, "const char* SynTree::rToStr( quint16 r ) {{")?;
    writeln!(bout, "\tswitch(r) {{")?;
    for (name, raw) in &rules {
        write!(bout, "\t\tcase R_{}: return \"", name)?;
        write_latin1(bout, &escape_cstr(raw.as_str()))?;
        writeln!(bout, "\";")?;
    }
    writeln!(bout, "\tdefault: if(r<R_First) return tokenTypeName(r); else return \"\";")?;
    writeln!(bout, "\t}}")?;
    writeln!(bout, "}}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyzer;
    use errors::Errors;
    use parser::parse_str;

    fn analyze(code: &str) -> Syntax {
        let mut errs = Errors::new();
        let mut syn = parse_str(code, &mut errs);
        analyzer::finish_syntax(&mut syn, &mut errs);
        syn
    }

    #[test]
    fn sections_are_ordered() {
        let syn = analyze("S ::= ';' kw T '+'\nkw ::= 'keyword'\nT ::=");
        let list = token_list(&syn);
        let names: Vec<&str> = list.iter().map(|&(ref n, _)| n.as_str()).collect();
        assert_eq!(
            names,
            ["Literals", "Plus", "Semi", "Keywords", "keyword", "Specials", "T", "Eof"]
        );
        assert_eq!(list[4].1, Some("keyword".to_string()));
        assert_eq!(list.last().unwrap().1, Some("<eof>".to_string()));
    }

    #[test]
    fn token_type_ranges() {
        let syn = analyze("S ::= ';' kw\nkw ::= 'keyword'");
        let mut hout = Vec::new();
        let mut bout = Vec::new();
        generate_token_type(&mut hout, &mut bout, &syn, "Vl").unwrap();
        let header = String::from_utf8(hout).unwrap();
        assert!(header.contains("#ifndef __VL_TOKENTYPE__"));
        assert!(header.contains("Tok_Invalid = 0,"));
        assert!(header.contains("TT_Literals"));
        assert!(header.contains("\t\tTok_Semi,"));
        assert!(header.contains("\t\tTok_keyword,"));
        assert!(header.contains("TT_Max"));
        let body = String::from_utf8(bout).unwrap();
        assert!(body.contains("case Tok_Semi: return \";\";"));
        assert!(body.contains("return r > TT_Keywords && r < TT_Specials;"));
    }

    #[test]
    fn syn_tree_rule_ids() {
        let syn = analyze("S ::= decl\ndecl ::= hidden 'x'\nhidden* ::= 'h'");
        let mut hout = Vec::new();
        let mut bout = Vec::new();
        generate_syn_tree(&mut hout, &mut bout, &syn, "Vl").unwrap();
        let header = String::from_utf8(hout).unwrap();
        assert!(header.contains("R_First = TT_Max + 1,"));
        assert!(header.contains("\t\t\tR_decl,"));
        assert!(!header.contains("R_hidden"), "transparent rules get no id");
        assert!(!header.contains("R_S"), "the unused start rule gets no id");
        let body = String::from_utf8(bout).unwrap();
        assert!(body.contains("case R_decl: return \"decl\";"));
    }
}
