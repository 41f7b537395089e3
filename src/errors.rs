// Copyright (c) 2018 Fabian Schuiki

//! The diagnostic sink that collects findings from all pipeline stages.

use std::fmt;

/// The category a finding belongs to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum IssueKind {
    /// Lexical and syntactic errors from the token source and parser.
    Syntax,
    /// Reference errors such as unresolved or duplicate productions.
    Semantics,
    /// Findings of the analysis passes: left recursion, ambiguity, bad
    /// predicates.
    Analysis,
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            IssueKind::Syntax => write!(f, "syntax"),
            IssueKind::Semantics => write!(f, "semantics"),
            IssueKind::Analysis => write!(f, "analysis"),
        }
    }
}

/// A single diagnostic.
#[derive(Clone, Debug)]
pub struct Issue {
    /// The category of the finding.
    pub kind: IssueKind,
    /// 1-based source line.
    pub line: u32,
    /// 1-based source column.
    pub col: u32,
    /// The message shown to the user.
    pub msg: String,
    /// Whether the finding is a warning rather than an error.
    pub warning: bool,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let severity = if self.warning { "warning" } else { "error" };
        write!(
            f,
            "{}:{}: {} [{}] {}",
            self.line, self.col, severity, self.kind, self.msg
        )
    }
}

/// Collects diagnostics and keeps the fatal counter.
///
/// Errors never abort a traversal; callers inspect `error_count` at the end
/// of a stage to decide whether the run failed.
#[derive(Debug, Default)]
pub struct Errors {
    issues: Vec<Issue>,
    errors: usize,
}

impl Errors {
    /// Create an empty sink.
    pub fn new() -> Errors {
        Errors {
            issues: Vec::new(),
            errors: 0,
        }
    }

    /// Record an error.
    pub fn error<S: Into<String>>(&mut self, kind: IssueKind, line: u32, col: u32, msg: S) {
        self.errors += 1;
        self.issues.push(Issue {
            kind: kind,
            line: line,
            col: col,
            msg: msg.into(),
            warning: false,
        });
    }

    /// Record a warning. Warnings do not count towards the fatal counter.
    pub fn warning<S: Into<String>>(&mut self, kind: IssueKind, line: u32, col: u32, msg: S) {
        self.issues.push(Issue {
            kind: kind,
            line: line,
            col: col,
            msg: msg.into(),
            warning: true,
        });
    }

    /// The number of errors recorded so far.
    pub fn error_count(&self) -> usize {
        self.errors
    }

    /// All findings in the order they were recorded.
    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Forget all findings and reset the fatal counter.
    pub fn reset(&mut self) {
        self.issues.clear();
        self.errors = 0;
    }
}
