//! The core term language.
//!
//! Everything the parser accepts desugars into these seven variants before
//! evaluation; no surface notation survives past parsing. Terms are immutable
//! and share children through `Arc`, so a closure body or a notation template
//! can be instantiated into the evaluation graph any number of times without
//! deep copies. Recursion is carried by environment lookups at run time;
//! terms themselves always form a DAG.

use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Literal(Literal),
    /// Reference to a name that was already declared where it appears.
    Var(String),
    /// Reference to a name not yet declared where it appears. Resolves
    /// exactly like `Var`; the distinction feeds diagnostics when a program
    /// deadlocks with the name still missing.
    Hole(String),
    Lambda {
        params: Vec<String>,
        body: Arc<Term>,
    },
    Apply {
        callee: Arc<Term>,
        args: Vec<Arc<Term>>,
    },
    /// Scoped single binding. Produced by block lowering and by cutting a
    /// trivial alias assignment; the bound term is evaluated in the child
    /// scope so a lambda may refer to the name it is bound under.
    Let {
        name: String,
        bound: Arc<Term>,
        body: Arc<Term>,
    },
    ForeignCall {
        module: String,
        symbol: String,
        args: Vec<Arc<Term>>,
    },
}

impl Term {
    pub fn var(name: impl Into<String>) -> Self {
        Term::Var(name.into())
    }

    pub fn hole(name: impl Into<String>) -> Self {
        Term::Hole(name.into())
    }

    pub fn int(value: i64) -> Self {
        Term::Literal(Literal::Int(value))
    }

    pub fn apply(callee: Term, args: Vec<Term>) -> Self {
        Term::Apply {
            callee: Arc::new(callee),
            args: args.into_iter().map(Arc::new).collect(),
        }
    }

    /// The name this term references, if it is a bare reference.
    pub fn reference(&self) -> Option<&str> {
        match self {
            Term::Var(name) | Term::Hole(name) => Some(name),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(v) => write!(f, "{}", v),
            Literal::Float(v) => write!(f, "{}", v),
            Literal::Bool(v) => write!(f, "{}", v),
            Literal::Str(v) => write!(f, "{:?}", v),
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Literal(lit) => write!(f, "{}", lit),
            Term::Var(name) | Term::Hole(name) => write!(f, "{}", name),
            Term::Lambda { params, body } => {
                write!(f, "fun({}) {{ {} }}", params.join(", "), body)
            }
            Term::Apply { callee, args } => {
                // Lambda callees get parens so the rendering reads back.
                match callee.as_ref() {
                    Term::Lambda { .. } => write!(f, "({})", callee)?,
                    _ => write!(f, "{}", callee)?,
                }
                write!(f, "({})", join_terms(args))
            }
            Term::Let { name, bound, body } => {
                write!(f, "let {} = {} in {}", name, bound, body)
            }
            Term::ForeignCall {
                module,
                symbol,
                args,
            } => {
                write!(f, "{}.{}({})", module, symbol, join_terms(args))
            }
        }
    }
}

fn join_terms(terms: &[Arc<Term>]) -> String {
    terms
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_nested_apply() {
        let term = Term::apply(
            Term::var("add"),
            vec![
                Term::apply(Term::var("add"), vec![Term::var("a"), Term::var("b")]),
                Term::var("c"),
            ],
        );
        assert_eq!(term.to_string(), "add(add(a, b), c)");
    }

    #[test]
    fn test_display_lambda_callee_parenthesized() {
        let lambda = Term::Lambda {
            params: vec!["x".to_string()],
            body: Arc::new(Term::var("x")),
        };
        let term = Term::apply(lambda, vec![Term::int(1)]);
        assert_eq!(term.to_string(), "(fun(x) { x })(1)");
    }

    #[test]
    fn test_display_foreign_call() {
        let term = Term::ForeignCall {
            module: "trace".to_string(),
            symbol: "print".to_string(),
            args: vec![Arc::new(Term::Literal(Literal::Str("hi".to_string())))],
        };
        assert_eq!(term.to_string(), "trace.print(\"hi\")");
    }
}
