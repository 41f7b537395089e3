// Copyright (c) 2018 Fabian Schuiki

//! A recursive-descent parser for EBNF specifications.
//!
//! The parser consumes the token source and builds the grammar IR. Errors
//! are routed to the sink; a failed production is discarded and parsing
//! resynchronizes at the next production header.

use std::io::BufRead;

use errors::{Errors, IssueKind};
use lexer::Lexer;
use syntax::{DefId, Definition, Node, NodeId, NodeKind, Quantity, Syntax};
use token::{Token, TokenKind};

/// A parser for EBNF specifications.
pub struct Parser<'a, R: BufRead + 'a> {
    lex: &'a mut Lexer<R>,
    errs: &'a mut Errors,
    syn: Syntax,
    cur: Token,
    def: DefId,
}

impl<'a, R: BufRead + 'a> Parser<'a, R> {
    /// Create a new parser over a token source.
    pub fn new(lex: &'a mut Lexer<R>, errs: &'a mut Errors) -> Parser<'a, R> {
        Parser {
            lex: lex,
            errs: errs,
            syn: Syntax::new(),
            cur: Token::default(),
            def: DefId::from_usize(0),
        }
    }

    /// Parse the whole input into a grammar.
    ///
    /// The returned grammar may be partial; callers must consult the error
    /// sink to decide whether the run failed.
    pub fn parse(mut self) -> Syntax {
        self.next_token();
        loop {
            match self.cur.kind {
                TokenKind::Eof => break,
                TokenKind::Production => self.parse_production(),
                _ => {
                    self.report(None);
                    self.resync();
                }
            }
        }
        self.syn
    }

    /// Fetch the next token, skipping comments.
    fn next_token(&mut self) -> Token {
        let mut t = self.lex.next_token();
        while t.kind == TokenKind::Comment {
            t = self.lex.next_token();
        }
        self.cur = t.clone();
        t
    }

    /// Skip tokens until the next production header.
    fn resync(&mut self) {
        while self.cur.kind != TokenKind::Production && self.cur.kind != TokenKind::Eof {
            self.next_token();
            if self.cur.kind == TokenKind::Invalid {
                self.report(None);
            }
        }
    }

    /// Report the current token to the sink. Invalid tokens carry their own
    /// message; otherwise `msg` or a generic complaint is used.
    fn report(&mut self, msg: Option<&str>) {
        let t = self.cur.clone();
        if t.kind == TokenKind::Invalid {
            self.errs
                .error(IssueKind::Syntax, t.line, t.col, t.val.as_str());
        } else {
            match msg {
                Some(m) => self.errs.error(IssueKind::Syntax, t.line, t.col, m),
                None => self.errs.error(
                    IssueKind::Syntax,
                    t.line,
                    t.col,
                    format!("unexpected symbol '{}'", t),
                ),
            }
        }
    }

    fn parse_production(&mut self) {
        let name = self.cur.clone();
        if self.next_token().kind != TokenKind::Assign {
            self.errs.error(
                IssueKind::Syntax,
                name.line,
                name.col,
                "expecting ::= for production",
            );
            self.resync();
            return;
        }
        let def = match self.syn.add_def(Definition::new(name.clone())) {
            Some(id) => id,
            None => {
                self.errs.error(
                    IssueKind::Semantics,
                    name.line,
                    name.col,
                    format!("duplicate production '{}'", name.val),
                );
                self.next_token();
                self.resync();
                return;
            }
        };
        self.next_token();
        match self.cur.kind {
            // An immediately following header or the end of input leaves the
            // production declared but empty.
            TokenKind::Production | TokenKind::Eof => {}
            TokenKind::Invalid => {
                self.report(None);
                self.resync();
            }
            _ => {
                self.def = def;
                match self.parse_expression() {
                    Some(node) => self.syn[def].node = Some(node),
                    None => self.resync(),
                }
            }
        }
    }

    /// expression ::= term { '|' term }
    fn parse_expression(&mut self) -> Option<NodeId> {
        let first = self.cur.clone();
        let mut node = match self.cur.kind {
            TokenKind::Keyword
            | TokenKind::Literal
            | TokenKind::Nonterm
            | TokenKind::LBrack
            | TokenKind::LPar
            | TokenKind::LBrace
            | TokenKind::Predicate => self.parse_term()?,
            _ => {
                self.report(Some("expecting term"));
                return None;
            }
        };
        let mut alternative = None;
        while self.cur.kind == TokenKind::Bar {
            self.next_token();
            let alt = match alternative {
                Some(alt) => alt,
                None => {
                    let mut alt_node = Node::new(NodeKind::Alternative, self.def, Token::default());
                    alt_node.tok.line = first.line;
                    alt_node.tok.col = first.col;
                    let alt = self.syn.add_node(alt_node);
                    self.syn.add_sub(alt, node);
                    alternative = Some(alt);
                    node = alt;
                    alt
                }
            };
            let n = self.parse_term()?;
            self.syn.add_sub(alt, n);
        }
        Some(node)
    }

    /// term ::= [ Predicate ] factor { factor }
    fn parse_term(&mut self) -> Option<NodeId> {
        let mut pred = None;
        if self.cur.kind == TokenKind::Predicate {
            pred = Some(self.cur.clone());
            self.next_token();
        }

        let first = self.cur.clone();
        let mut node = match self.cur.kind {
            TokenKind::Keyword
            | TokenKind::Literal
            | TokenKind::Nonterm
            | TokenKind::LBrack
            | TokenKind::LBrace
            | TokenKind::LPar => self.parse_factor()?,
            _ => {
                self.report(Some("expecting factor"));
                return None;
            }
        };

        let mut sequence = None;
        if let Some(pred) = pred {
            let mut seq_node = Node::new(NodeKind::Sequence, self.def, Token::default());
            seq_node.tok.line = first.line;
            seq_node.tok.col = first.col;
            let seq = self.syn.add_node(seq_node);
            let p = self.syn.add_node(Node::new(NodeKind::Predicate, self.def, pred));
            self.syn.add_sub(seq, p);
            self.syn.add_sub(seq, node);
            sequence = Some(seq);
            node = seq;
        }

        while self.starts_factor() {
            let seq = match sequence {
                Some(seq) => seq,
                None => {
                    let (line, col) = {
                        let t = &self.syn[node].tok;
                        (t.line, t.col)
                    };
                    let mut seq_node = Node::new(NodeKind::Sequence, self.def, Token::default());
                    seq_node.tok.line = line;
                    seq_node.tok.col = col;
                    let seq = self.syn.add_node(seq_node);
                    self.syn.add_sub(seq, node);
                    sequence = Some(seq);
                    node = seq;
                    seq
                }
            };
            let n = self.parse_factor()?;
            self.syn.add_sub(seq, n);
        }
        Some(node)
    }

    fn starts_factor(&self) -> bool {
        match self.cur.kind {
            TokenKind::Keyword
            | TokenKind::Literal
            | TokenKind::Nonterm
            | TokenKind::LBrack
            | TokenKind::LPar
            | TokenKind::LBrace => true,
            _ => false,
        }
    }

    /// factor ::= Keyword | Literal | Nonterm
    ///          | '[' expression ']' | '{' expression '}' | '(' expression ')'
    fn parse_factor(&mut self) -> Option<NodeId> {
        match self.cur.kind {
            TokenKind::Keyword | TokenKind::Literal => {
                let node = self
                    .syn
                    .add_node(Node::new(NodeKind::Terminal, self.def, self.cur.clone()));
                self.next_token();
                Some(node)
            }
            TokenKind::Nonterm => {
                let node = self
                    .syn
                    .add_node(Node::new(NodeKind::Nonterminal, self.def, self.cur.clone()));
                self.next_token();
                Some(node)
            }
            TokenKind::LBrack => self.parse_group(TokenKind::RBrack, Quantity::ZeroOrOne, "expecting ']'"),
            TokenKind::LBrace => self.parse_group(TokenKind::RBrace, Quantity::ZeroOrMore, "expecting '}'"),
            TokenKind::LPar => self.parse_group(TokenKind::RPar, Quantity::One, "expecting ')'"),
            _ => {
                self.report(Some("expecting keyword, literal, nonterminal, '(', '{' or '['"));
                None
            }
        }
    }

    fn parse_group(&mut self, close: TokenKind, quant: Quantity, expect: &str) -> Option<NodeId> {
        self.next_token();
        let node = self.parse_expression()?;
        if self.cur.kind != close {
            self.report(Some(expect));
            return None;
        }
        if !self.check_cardinality(node) {
            return None;
        }
        self.syn[node].quant = quant;
        self.next_token();
        Some(node)
    }

    /// Enforce the nesting invariants on a bracketed construct.
    fn check_cardinality(&mut self, node: NodeId) -> bool {
        if self.syn[node].quant != Quantity::One {
            self.report(Some("contradicting nested quantifiers"));
            return false;
        }
        let (kind, count, first_sub) = {
            let n = &self.syn[node];
            (n.kind, n.subs.len(), n.subs.first().cloned())
        };
        if kind != NodeKind::Sequence && kind != NodeKind::Alternative {
            return true;
        }
        if count == 0 {
            self.report(Some("container with zero items"));
            return false;
        }
        if count == 1 {
            if let Some(sub) = first_sub {
                let sub_kind = self.syn[sub].kind;
                if sub_kind == NodeKind::Sequence || sub_kind == NodeKind::Alternative {
                    self.report(Some(
                        "container containing only one other sequence or alternative",
                    ));
                    return false;
                }
            }
        }
        true
    }
}

/// Parse an in-memory specification, for tests and tools.
pub fn parse_str(code: &str, errs: &mut Errors) -> Syntax {
    let mut lex = Lexer::new(code.as_bytes());
    Parser::new(&mut lex, errs).parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(code: &str) -> Syntax {
        let mut errs = Errors::new();
        let syn = parse_str(code, &mut errs);
        assert_eq!(errs.error_count(), 0, "unexpected errors: {:?}", errs.issues());
        syn
    }

    #[test]
    fn single_factor_stays_flat() {
        let syn = parse_ok("S ::= x");
        let root = syn[syn.start().unwrap()].node.unwrap();
        assert_eq!(syn[root].kind, NodeKind::Nonterminal);
        assert!(syn[root].subs.is_empty());
    }

    #[test]
    fn alternation_and_sequences() {
        let syn = parse_ok("S ::= x y | 'lit'");
        let root = syn[syn.start().unwrap()].node.unwrap();
        assert_eq!(syn[root].kind, NodeKind::Alternative);
        assert_eq!(syn[root].subs.len(), 2);
        let seq = syn[root].subs[0];
        assert_eq!(syn[seq].kind, NodeKind::Sequence);
        assert_eq!(syn[seq].subs.len(), 2);
        assert_eq!(syn[syn[root].subs[1]].kind, NodeKind::Terminal);
        assert_eq!(syn[seq].parent, Some(root));
    }

    #[test]
    fn quantifiers() {
        let syn = parse_ok("S ::= { 'a' } [ b ] ( c d )");
        let root = syn[syn.start().unwrap()].node.unwrap();
        let subs = syn[root].subs.clone();
        assert_eq!(syn[subs[0]].quant, Quantity::ZeroOrMore);
        assert_eq!(syn[subs[1]].quant, Quantity::ZeroOrOne);
        assert_eq!(syn[subs[2]].quant, Quantity::One);
        assert_eq!(syn[subs[2]].kind, NodeKind::Sequence);
    }

    #[test]
    fn predicate_heads_a_sequence() {
        let syn = parse_ok("S ::= \\LL:2\\ 'a' 'b' | 'a' 'c'");
        let root = syn[syn.start().unwrap()].node.unwrap();
        assert_eq!(syn[root].kind, NodeKind::Alternative);
        let seq = syn[root].subs[0];
        assert_eq!(syn[seq].kind, NodeKind::Sequence);
        assert_eq!(syn[seq].subs.len(), 3);
        let pred = syn.first_predicate_of(seq).unwrap();
        assert_eq!(syn[pred].kind, NodeKind::Predicate);
        assert_eq!(syn.node_llk(pred), 2);
    }

    #[test]
    fn empty_production() {
        let syn = parse_ok("ident ::=\nS ::= ident");
        assert_eq!(syn.def_count(), 2);
        assert!(syn[syn.start().unwrap()].node.is_none());
    }

    #[test]
    fn nested_quantifiers_rejected() {
        let mut errs = Errors::new();
        let syn = parse_str("S ::= [ [ x ] ]\nT ::= y", &mut errs);
        assert_eq!(errs.error_count(), 1);
        assert!(syn[syn.start().unwrap()].node.is_none());
        // parsing resumed at the next production
        assert!(syn.get_def("T").is_some());
    }

    #[test]
    fn missing_delimiter_resyncs() {
        let mut errs = Errors::new();
        let syn = parse_str("S ::= [ x\nT ::= y", &mut errs);
        assert_eq!(errs.error_count(), 1);
        assert_eq!(syn.def_count(), 2);
        assert!(syn.get_def("T").is_some());
    }

    #[test]
    fn duplicate_production_reported() {
        let mut errs = Errors::new();
        let syn = parse_str("S ::= 'a'\nS ::= 'b'", &mut errs);
        assert_eq!(errs.error_count(), 1);
        assert_eq!(syn.def_count(), 1);
        let root = syn[syn.start().unwrap()].node.unwrap();
        assert_eq!(syn[root].tok.val, "a");
    }
}
