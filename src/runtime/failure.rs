use std::fmt;

/// A failed reduction, carried as data.
///
/// A failure settles its node the same way a value does; it then poisons the
/// node's dependents without ever scheduling them. Branches of the program
/// that never read the failed node keep reducing, so one bad division does
/// not take down an unrelated computation.
#[derive(Debug, Clone, PartialEq)]
pub enum Failure {
    /// A call supplied the wrong number of arguments. There is no partial
    /// application; arity must match exactly.
    Arity {
        callee: String,
        expected: usize,
        got: usize,
    },
    /// The callee settled to something that cannot be applied.
    NotCallable { type_name: &'static str },
    /// A foreign dispatch came back with an error, timed out, or was
    /// cancelled before completing.
    Foreign {
        module: String,
        symbol: String,
        kind: ForeignErrorKind,
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForeignErrorKind {
    /// The call did not complete within its deadline.
    Timeout,
    /// The run was cancelled while the call was in flight.
    Cancelled,
    /// The module itself reported an error.
    Raised,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Failure::Arity {
                callee,
                expected,
                got,
            } => write!(
                f,
                "{} takes {} argument{}, got {}",
                callee,
                expected,
                if *expected == 1 { "" } else { "s" },
                got
            ),
            Failure::NotCallable { type_name } => {
                write!(f, "value of type {} cannot be called", type_name)
            }
            Failure::Foreign {
                module,
                symbol,
                kind,
                message,
            } => match kind {
                ForeignErrorKind::Timeout => {
                    write!(f, "foreign call {}.{} timed out", module, symbol)
                }
                ForeignErrorKind::Cancelled => {
                    write!(f, "foreign call {}.{} was cancelled", module, symbol)
                }
                ForeignErrorKind::Raised => {
                    write!(f, "foreign call {}.{} failed: {}", module, symbol, message)
                }
            },
        }
    }
}
