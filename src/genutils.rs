// Copyright (c) 2018 Fabian Schuiki

//! Shared helpers of the emitters: symbol naming, token ordering, and
//! Latin-1 output.

use std::io::{self, Write};

use token::Sym;

/// Map a token spelling to an identifier-safe name.
///
/// Alphanumeric characters and underscores pass through; punctuation maps to
/// camel-case names, so `::=` becomes `ColonColonEq` and `;` becomes `Semi`.
pub fn sym_to_string(text: &str) -> String {
    let mut out = String::new();
    for c in text.chars() {
        match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '_' => out.push(c),
            '!' => out.push_str("Bang"),
            '"' => out.push_str("Quote"),
            '#' => out.push_str("Hash"),
            '$' => out.push_str("Dlr"),
            '%' => out.push_str("Percent"),
            '&' => out.push_str("Amp"),
            '\'' => out.push_str("Tick"),
            '(' => out.push_str("Lpar"),
            ')' => out.push_str("Rpar"),
            '*' => out.push_str("Star"),
            '+' => out.push_str("Plus"),
            ',' => out.push_str("Comma"),
            '-' => out.push_str("Minus"),
            '.' => out.push_str("Dot"),
            '/' => out.push_str("Slash"),
            ':' => out.push_str("Colon"),
            ';' => out.push_str("Semi"),
            '<' => out.push_str("Lt"),
            '=' => out.push_str("Eq"),
            '>' => out.push_str("Gt"),
            '?' => out.push_str("Qmark"),
            '@' => out.push_str("At"),
            '[' => out.push_str("Lbrack"),
            '\\' => out.push_str("Bslash"),
            ']' => out.push_str("Rbrack"),
            '^' => out.push_str("Hat"),
            '`' => out.push_str("Grave"),
            '{' => out.push_str("Lbrace"),
            '|' => out.push_str("Bar"),
            '}' => out.push_str("Rbrace"),
            '~' => out.push_str("Tilde"),
            _ => out.push('_'),
        }
    }
    out
}

/// Whether a spelling contains an alphanumeric character. Draws the border
/// between the punctuation and keyword sections of the token list.
pub fn contains_alnum(text: &str) -> bool {
    text.chars().any(|c| c.is_alphanumeric())
}

/// Replace `$` in a rule name so it survives as a host-language identifier.
pub fn escape_dollars(text: &str) -> String {
    text.replace('$', "dlr")
}

/// The grammar-level token name: the mapped spelling, uppercased, with a
/// leading `T` when the result would start with a digit.
pub fn token_name(text: &str) -> String {
    let name = sym_to_string(text).to_uppercase();
    match name.chars().next() {
        Some(c) if c.is_ascii_digit() => format!("T{}", name),
        _ => name,
    }
}

/// The rule name used in emitted grammars.
pub fn rule_name(text: &str) -> String {
    escape_dollars(text).to_lowercase()
}

/// Order a token list deterministically: spellings without alphanumeric
/// characters first, each group sorted by content.
pub fn ordered_token_list(tokens: Vec<Sym>) -> Vec<Sym> {
    let mut punct = Vec::new();
    let mut alnum = Vec::new();
    for t in tokens {
        if contains_alnum(t.as_str()) {
            alnum.push(t);
        } else {
            punct.push(t);
        }
    }
    punct.sort();
    alnum.sort();
    punct.extend(alnum);
    punct
}

/// Write a string as Latin-1 bytes; characters outside the range become `?`.
pub fn write_latin1<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    let bytes: Vec<u8> = text
        .chars()
        .map(|c| if (c as u32) < 0x100 { c as u8 } else { b'?' })
        .collect();
    out.write_all(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use token::Symbols;

    #[test]
    fn punctuation_names() {
        assert_eq!(sym_to_string("::="), "ColonColonEq");
        assert_eq!(sym_to_string(";"), "Semi");
        assert_eq!(sym_to_string("$end"), "Dlrend");
        assert_eq!(sym_to_string("if"), "if");
    }

    #[test]
    fn token_names() {
        assert_eq!(token_name("a"), "A");
        assert_eq!(token_name("+"), "PLUS");
        assert_eq!(token_name("0x"), "T0X");
        assert_eq!(rule_name("Mod$Item"), "moddlritem");
    }

    #[test]
    fn ordering_splits_sections() {
        let mut syms = Symbols::new();
        let list = vec![
            syms.intern("if"),
            syms.intern(";"),
            syms.intern("begin"),
            syms.intern("+"),
        ];
        let ordered: Vec<String> = ordered_token_list(list)
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(ordered, ["+", ";", "begin", "if"]);
        let boundary = ordered.iter().position(|t| contains_alnum(t)).unwrap();
        assert_eq!(boundary, 2);
    }

    #[test]
    fn latin1_transcoding() {
        let mut out = Vec::new();
        write_latin1(&mut out, "größer→").unwrap();
        assert_eq!(out, b"gr\xf6\xdfer?");
    }
}
