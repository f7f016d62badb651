//! The notation table: a mutable registry of mixfix rewrite rules.
//!
//! A rule is a pattern of literal symbols and `$placeholders` plus a core-term
//! template. `notation "$x + $y" precedence 10 associativity left := add(x, y)`
//! makes `a + b + c` parse as `add(add(a, b), c)`; nothing about `+` is wired
//! into the parser itself. Rules declared mid-file apply to everything after
//! their declaration.
//!
//! Precedence bands are fixed: user rules live in 1..=99, built-in statement
//! forms sit conceptually at 0 (below every rule), and call syntax `f(x)`
//! binds at 100 (above every rule).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::diagnostics::Diagnostic;
use crate::term::Term;

use super::lexer::Lexer;
use super::token_type::TokenType;

pub const MIN_USER_PRECEDENCE: i32 = 1;
pub const MAX_USER_PRECEDENCE: i32 = 99;
pub const CALL_PRECEDENCE: i32 = 100;
/// Default when a declaration omits its `precedence` clause.
pub const DEFAULT_PRECEDENCE: i32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
    Nonassoc,
}

impl Assoc {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "left" => Some(Assoc::Left),
            "right" => Some(Assoc::Right),
            "none" => Some(Assoc::Nonassoc),
            _ => None,
        }
    }
}

impl fmt::Display for Assoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Assoc::Left => "left",
            Assoc::Right => "right",
            Assoc::Nonassoc => "none",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// A concrete token the source must contain (`+`, `then`, `<|>`).
    Literal(String),
    /// A sub-expression slot, carrying the placeholder's name.
    Placeholder(String),
}

/// A notation declaration before validation. The parser fills this from the
/// surface syntax; tests and embedders can build it directly.
#[derive(Debug, Clone)]
pub struct NotationDecl {
    pub pattern: String,
    /// Declared placeholder list; inferred from the pattern when absent.
    pub placeholders: Option<Vec<String>>,
    pub precedence: Option<i32>,
    pub assoc: Option<Assoc>,
    pub template: Term,
}

#[derive(Debug, Clone)]
pub struct NotationRule {
    pub fragments: Vec<Fragment>,
    pub precedence: i32,
    pub assoc: Assoc,
    pub template: Arc<Term>,
    /// Placeholder names in pattern order; `expand` takes arguments in this
    /// order.
    pub placeholders: Vec<String>,
}

impl NotationRule {
    /// The literal the rule is keyed under when it opens an expression.
    pub fn leading_literal(&self) -> Option<&str> {
        match self.fragments.first() {
            Some(Fragment::Literal(s)) => Some(s),
            _ => None,
        }
    }

    /// The literal the rule is keyed under when it continues an expression
    /// (first fragment is a placeholder, second the trigger token).
    pub fn continuation_literal(&self) -> Option<&str> {
        match (self.fragments.first(), self.fragments.get(1)) {
            (Some(Fragment::Placeholder(_)), Some(Fragment::Literal(s))) => Some(s),
            _ => None,
        }
    }

    /// Canonical skeleton used for conflict detection: literal texts with
    /// placeholder slots collapsed to `$`.
    pub fn shape(&self) -> String {
        self.fragments
            .iter()
            .map(|frag| match frag {
                Fragment::Literal(s) => s.as_str(),
                Fragment::Placeholder(_) => "$",
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Minimum precedence for the trailing sub-expression of this rule.
    /// Left and non-associative rules stop at their own precedence so an
    /// equal-precedence continuation returns to the caller; right-associative
    /// rules admit it one level early.
    pub fn rhs_precedence(&self) -> i32 {
        match self.assoc {
            Assoc::Left | Assoc::Nonassoc => self.precedence,
            Assoc::Right => self.precedence - 1,
        }
    }

    /// Instantiate the template with arguments in pattern-placeholder order.
    pub fn expand(&self, args: &[Term]) -> Term {
        debug_assert_eq!(args.len(), self.placeholders.len());
        let bindings: HashMap<&str, &Term> = self
            .placeholders
            .iter()
            .map(String::as_str)
            .zip(args.iter())
            .collect();
        substitute(&self.template, &bindings)
    }
}

impl fmt::Display for NotationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pattern = self
            .fragments
            .iter()
            .map(|frag| match frag {
                Fragment::Literal(s) => s.clone(),
                Fragment::Placeholder(p) => format!("${}", p),
            })
            .collect::<Vec<_>>()
            .join(" ");
        write!(
            f,
            "\"{}\" precedence {} associativity {} := {}",
            pattern, self.precedence, self.assoc, self.template
        )
    }
}

/// The active rule set. Lookup is keyed by trigger token and returns the
/// highest-precedence rule; the parser commits to it without backtracking.
#[derive(Debug, Clone, Default)]
pub struct NotationTable {
    rules: Vec<Arc<NotationRule>>,
    by_leading: HashMap<String, Vec<usize>>,
    by_continuation: HashMap<String, Vec<usize>>,
}

impl NotationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// All rules in registration order.
    pub fn rules(&self) -> impl Iterator<Item = &Arc<NotationRule>> {
        self.rules.iter()
    }

    /// Validate and activate a declaration. Re-declaring an existing shape at
    /// the same precedence and associativity replaces its template; the same
    /// shape at the same precedence with a different associativity is a
    /// conflict.
    pub fn register(&mut self, decl: NotationDecl) -> Result<(), Diagnostic> {
        let fragments = parse_pattern(&decl.pattern)?;

        let pattern_placeholders: Vec<String> = fragments
            .iter()
            .filter_map(|frag| match frag {
                Fragment::Placeholder(name) => Some(name.clone()),
                Fragment::Literal(_) => None,
            })
            .collect();

        if let Some(declared) = &decl.placeholders {
            for name in declared {
                if !pattern_placeholders.iter().any(|p| p == name) {
                    return Err(Diagnostic::error("Notation placeholder mismatch")
                        .with_code("E103")
                        .with_message(format!(
                            "Placeholder `{}` is declared but does not appear in the pattern",
                            name
                        )));
                }
            }
            for name in &pattern_placeholders {
                if !declared.iter().any(|d| d == name) {
                    return Err(Diagnostic::error("Notation placeholder mismatch")
                        .with_code("E103")
                        .with_message(format!(
                            "Pattern placeholder `${}` is missing from the `with` list",
                            name
                        )));
                }
            }
        }

        let precedence = decl.precedence.unwrap_or(DEFAULT_PRECEDENCE);
        if !(MIN_USER_PRECEDENCE..=MAX_USER_PRECEDENCE).contains(&precedence) {
            return Err(Diagnostic::error("Notation precedence out of range")
                .with_code("E104")
                .with_message(format!(
                    "Precedence {} is outside {}..={} reserved for user rules",
                    precedence, MIN_USER_PRECEDENCE, MAX_USER_PRECEDENCE
                )));
        }

        let rule = NotationRule {
            fragments,
            precedence,
            assoc: decl.assoc.unwrap_or(Assoc::Nonassoc),
            template: Arc::new(decl.template),
            placeholders: pattern_placeholders,
        };

        let shape = rule.shape();
        for (index, existing) in self.rules.iter().enumerate() {
            if existing.shape() == shape && existing.precedence == rule.precedence {
                if existing.assoc != rule.assoc {
                    return Err(Diagnostic::error("Conflicting notation")
                        .with_code("E102")
                        .with_message(format!(
                            "`{}` is already registered at precedence {} with associativity {}",
                            shape, existing.precedence, existing.assoc
                        )));
                }
                // Same shape, precedence and associativity: replace the
                // template in place. Indices stay valid.
                self.rules[index] = Arc::new(rule);
                return Ok(());
            }
        }

        let index = self.rules.len();
        let leading = rule.leading_literal().map(str::to_string);
        let continuation = rule.continuation_literal().map(str::to_string);
        self.rules.push(Arc::new(rule));

        let rules = &self.rules;
        if let Some(literal) = leading {
            let bucket = self.by_leading.entry(literal).or_default();
            bucket.push(index);
            bucket.sort_by_key(|&i| std::cmp::Reverse(rules[i].precedence));
        } else if let Some(literal) = continuation {
            let bucket = self.by_continuation.entry(literal).or_default();
            bucket.push(index);
            bucket.sort_by_key(|&i| std::cmp::Reverse(rules[i].precedence));
        }
        Ok(())
    }

    /// Highest-precedence rule opened by `literal` in expression-leading
    /// position.
    pub fn leading_rule(&self, literal: &str) -> Option<Arc<NotationRule>> {
        let index = *self.by_leading.get(literal)?.first()?;
        Some(Arc::clone(&self.rules[index]))
    }

    /// Highest-precedence rule continuing a finished sub-expression with
    /// `literal`.
    pub fn continuation_rule(&self, literal: &str) -> Option<Arc<NotationRule>> {
        let index = *self.by_continuation.get(literal)?.first()?;
        Some(Arc::clone(&self.rules[index]))
    }

    /// True if `literal` triggers any rule in either position.
    pub fn knows(&self, literal: &str) -> bool {
        self.by_leading.contains_key(literal) || self.by_continuation.contains_key(literal)
    }
}

/// Split a pattern string into fragments. Fragments are whitespace-separated;
/// `$name` is a placeholder, anything else must lex as exactly one
/// identifier or operator token.
fn parse_pattern(pattern: &str) -> Result<Vec<Fragment>, Diagnostic> {
    let invalid = |message: String| {
        Err(Diagnostic::error("Invalid notation pattern")
            .with_code("E101")
            .with_message(message))
    };

    let mut fragments = Vec::new();
    let mut seen_placeholders: Vec<&str> = Vec::new();

    for piece in pattern.split_whitespace() {
        if let Some(name) = piece.strip_prefix('$') {
            if !is_valid_placeholder(name) {
                return invalid(format!("`${}` is not a valid placeholder name", name));
            }
            if seen_placeholders.contains(&name) {
                return invalid(format!("Placeholder `${}` appears twice", name));
            }
            if matches!(fragments.last(), Some(Fragment::Placeholder(_))) {
                return invalid(format!(
                    "Placeholder `${}` directly follows another placeholder; \
                     fragments must alternate through a literal",
                    name
                ));
            }
            seen_placeholders.push(name);
            fragments.push(Fragment::Placeholder(name.to_string()));
        } else {
            validate_literal_fragment(piece)?;
            fragments.push(Fragment::Literal(piece.to_string()));
        }
    }

    if fragments.is_empty() {
        return invalid("Pattern is empty".to_string());
    }
    if !fragments
        .iter()
        .any(|frag| matches!(frag, Fragment::Literal(_)))
    {
        return invalid("Pattern needs at least one literal symbol".to_string());
    }

    Ok(fragments)
}

fn validate_literal_fragment(piece: &str) -> Result<(), Diagnostic> {
    let invalid = |message: String| {
        Err(Diagnostic::error("Invalid notation pattern")
            .with_code("E101")
            .with_message(message))
    };

    let tokens = Lexer::new(piece).tokenize();
    // tokenize always appends Eof.
    if tokens.len() != 2 {
        return invalid(format!("`{}` is not a single token", piece));
    }
    match tokens[0].token_type {
        TokenType::Operator | TokenType::Ident => {
            if tokens[0].literal != piece {
                return invalid(format!("`{}` is not a single token", piece));
            }
            Ok(())
        }
        TokenType::Assign | TokenType::TemplateAssign => {
            invalid(format!("`{}` is reserved by the language", piece))
        }
        TokenType::LParen
        | TokenType::RParen
        | TokenType::LBrace
        | TokenType::RBrace
        | TokenType::Comma
        | TokenType::Semicolon
        | TokenType::Dot => invalid(format!("`{}` is reserved punctuation", piece)),
        TokenType::Fun
        | TokenType::Return
        | TokenType::Use
        | TokenType::As
        | TokenType::Notation
        | TokenType::With
        | TokenType::Precedence
        | TokenType::Associativity
        | TokenType::True
        | TokenType::False => invalid(format!("`{}` is a reserved word", piece)),
        _ => invalid(format!("`{}` cannot be used as a pattern literal", piece)),
    }
}

fn is_valid_placeholder(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Capture-avoiding placeholder substitution: binders shadow placeholder
/// names in their scope, including a `Let`'s own bound term.
fn substitute(term: &Term, bindings: &HashMap<&str, &Term>) -> Term {
    match term {
        Term::Var(name) | Term::Hole(name) => match bindings.get(name.as_str()) {
            Some(replacement) => (*replacement).clone(),
            None => term.clone(),
        },
        Term::Literal(_) => term.clone(),
        Term::Lambda { params, body } => {
            let body = substitute_under(body, bindings, params);
            Term::Lambda {
                params: params.clone(),
                body: Arc::new(body),
            }
        }
        Term::Apply { callee, args } => Term::Apply {
            callee: Arc::new(substitute(callee, bindings)),
            args: args
                .iter()
                .map(|arg| Arc::new(substitute(arg, bindings)))
                .collect(),
        },
        Term::Let { name, bound, body } => {
            let shadowed = std::slice::from_ref(name);
            Term::Let {
                name: name.clone(),
                bound: Arc::new(substitute_under(bound, bindings, shadowed)),
                body: Arc::new(substitute_under(body, bindings, shadowed)),
            }
        }
        Term::ForeignCall {
            module,
            symbol,
            args,
        } => Term::ForeignCall {
            module: module.clone(),
            symbol: symbol.clone(),
            args: args
                .iter()
                .map(|arg| Arc::new(substitute(arg, bindings)))
                .collect(),
        },
    }
}

fn substitute_under(term: &Term, bindings: &HashMap<&str, &Term>, shadowed: &[String]) -> Term {
    if !shadowed
        .iter()
        .any(|name| bindings.contains_key(name.as_str()))
    {
        return substitute(term, bindings);
    }
    let narrowed: HashMap<&str, &Term> = bindings
        .iter()
        .filter(|(name, _)| !shadowed.iter().any(|s| s == **name))
        .map(|(name, term)| (*name, *term))
        .collect();
    substitute(term, &narrowed)
}
