use std::fmt;

use crate::diagnostics::Position;
use crate::term::Term;

/// A top-level declaration, already lowered to core terms.
#[derive(Debug, Clone, PartialEq)]
pub enum Decl {
    /// `fun name(params) { body }`. The term is always a `Term::Lambda`.
    Fun {
        name: String,
        term: Term,
        position: Position,
    },
    /// `name = expr` for a non-trivial right-hand side.
    Assign {
        name: String,
        term: Term,
        position: Position,
    },
    /// The cut form of `name = other_name`: no slot of its own, just an
    /// alias edge resolved by the environment.
    Alias {
        name: String,
        target: String,
        position: Position,
    },
    ///`use module.symbol as alias`
    Use {
        module: String,
        symbol: String,
        alias: String,
        position: Position,
    },
    /// A bare expression statement.
    Expr { term: Term, position: Position },
}

impl Decl {
    /// The top-level name this declaration binds, if any.
    pub fn binding(&self) -> Option<&str> {
        match self {
            Decl::Fun { name, .. } | Decl::Assign { name, .. } | Decl::Alias { name, .. } => {
                Some(name)
            }
            Decl::Use { alias, .. } => Some(alias),
            Decl::Expr { .. } => None,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            Decl::Fun { position, .. }
            | Decl::Assign { position, .. }
            | Decl::Alias { position, .. }
            | Decl::Use { position, .. }
            | Decl::Expr { position, .. } => *position,
        }
    }
}

impl fmt::Display for Decl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decl::Fun { name, term, .. } => match term {
                Term::Lambda { params, body } => {
                    write!(f, "fun {}({}) {{ {} }}", name, params.join(", "), body)
                }
                other => write!(f, "fun {} = {}", name, other),
            },
            Decl::Assign { name, term, .. } => write!(f, "{} = {}", name, term),
            Decl::Alias { name, target, .. } => write!(f, "{} = {}", name, target),
            Decl::Use {
                module,
                symbol,
                alias,
                ..
            } => {
                if alias == symbol {
                    write!(f, "use {}.{}", module, symbol)
                } else {
                    write!(f, "use {}.{} as {}", module, symbol, alias)
                }
            }
            Decl::Expr { term, .. } => write!(f, "{}", term),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    pub decls: Vec<Decl>,
}

impl Program {
    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.decls.len()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, decl) in self.decls.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", decl)?;
        }
        Ok(())
    }
}
