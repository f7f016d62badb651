//! Built-in arithmetic module, the reference `ForeignModule` implementation.
//!
//! Linked by the runner under `--link-calc`; programs reach it with
//! `use calc.add` and friends. Integer arithmetic is checked, mixed
//! integer/float arguments promote to float.

use crate::runtime::value::Value;

use super::{ForeignError, ForeignModule, SymbolSpec};

pub struct CalcModule;

impl CalcModule {
    pub fn new() -> Self {
        CalcModule
    }
}

impl Default for CalcModule {
    fn default() -> Self {
        Self::new()
    }
}

impl ForeignModule for CalcModule {
    fn name(&self) -> &str {
        "calc"
    }

    fn manifest(&self) -> Vec<SymbolSpec> {
        vec![
            SymbolSpec::new("add", 2),
            SymbolSpec::new("sub", 2),
            SymbolSpec::new("mul", 2),
            SymbolSpec::new("div", 2),
            SymbolSpec::new("eq", 2),
            SymbolSpec::new("lt", 2),
        ]
    }

    fn dispatch(&self, symbol: &str, args: &[Value]) -> Result<Value, ForeignError> {
        match symbol {
            "add" => arith(symbol, args, i64::checked_add, |a, b| a + b),
            "sub" => arith(symbol, args, i64::checked_sub, |a, b| a - b),
            "mul" => arith(symbol, args, i64::checked_mul, |a, b| a * b),
            "div" => div(args),
            "eq" => {
                let (a, b) = two(symbol, args)?;
                let equal = match floats(a, b) {
                    Some((x, y)) => x == y,
                    None => a == b,
                };
                Ok(Value::Bool(equal))
            }
            "lt" => {
                let (a, b) = two(symbol, args)?;
                match floats(a, b) {
                    Some((x, y)) => Ok(Value::Bool(x < y)),
                    None => Err(ForeignError::raised(format!(
                        "calc.lt expects numbers, got {} and {}",
                        a.type_name(),
                        b.type_name()
                    ))),
                }
            }
            _ => Err(ForeignError::raised(format!(
                "calc has no symbol `{}`",
                symbol
            ))),
        }
    }
}

fn two<'a>(symbol: &str, args: &'a [Value]) -> Result<(&'a Value, &'a Value), ForeignError> {
    match args {
        [a, b] => Ok((a, b)),
        _ => Err(ForeignError::raised(format!(
            "calc.{} takes 2 arguments, got {}",
            symbol,
            args.len()
        ))),
    }
}

/// Both arguments as floats, when both are numeric.
fn floats(a: &Value, b: &Value) -> Option<(f64, f64)> {
    let widen = |value: &Value| match value {
        Value::Int(v) => Some(*v as f64),
        Value::Float(v) => Some(*v),
        _ => None,
    };
    Some((widen(a)?, widen(b)?))
}

fn arith(
    symbol: &str,
    args: &[Value],
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value, ForeignError> {
    let (a, b) = two(symbol, args)?;
    match (a, b) {
        (Value::Int(x), Value::Int(y)) => int_op(*x, *y).map(Value::Int).ok_or_else(|| {
            ForeignError::raised(format!("integer overflow in calc.{}", symbol))
        }),
        _ => match floats(a, b) {
            Some((x, y)) => Ok(Value::Float(float_op(x, y))),
            None => Err(ForeignError::raised(format!(
                "calc.{} expects numbers, got {} and {}",
                symbol,
                a.type_name(),
                b.type_name()
            ))),
        },
    }
}

fn div(args: &[Value]) -> Result<Value, ForeignError> {
    let (a, b) = two("div", args)?;
    match (a, b) {
        (Value::Int(_), Value::Int(0)) => Err(ForeignError::raised("division by zero")),
        (Value::Int(x), Value::Int(y)) => x.checked_div(*y).map(Value::Int).ok_or_else(|| {
            ForeignError::raised("integer overflow in calc.div")
        }),
        _ => match floats(a, b) {
            Some((x, y)) => Ok(Value::Float(x / y)),
            None => Err(ForeignError::raised(format!(
                "calc.div expects numbers, got {} and {}",
                a.type_name(),
                b.type_name()
            ))),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(symbol: &str, args: &[Value]) -> Result<Value, ForeignError> {
        CalcModule::new().dispatch(symbol, args)
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(call("add", &[Value::Int(2), Value::Int(3)]), Ok(Value::Int(5)));
        assert_eq!(call("sub", &[Value::Int(2), Value::Int(3)]), Ok(Value::Int(-1)));
        assert_eq!(call("mul", &[Value::Int(4), Value::Int(3)]), Ok(Value::Int(12)));
        assert_eq!(call("div", &[Value::Int(7), Value::Int(2)]), Ok(Value::Int(3)));
    }

    #[test]
    fn test_mixed_arguments_promote() {
        assert_eq!(
            call("add", &[Value::Int(1), Value::Float(0.5)]),
            Ok(Value::Float(1.5))
        );
        assert_eq!(
            call("eq", &[Value::Int(1), Value::Float(1.0)]),
            Ok(Value::Bool(true))
        );
    }

    #[test]
    fn test_division_by_zero_raises() {
        let err = call("div", &[Value::Int(1), Value::Int(0)]).unwrap_err();
        assert_eq!(err.message, "division by zero");
    }

    #[test]
    fn test_overflow_raises() {
        let err = call("add", &[Value::Int(i64::MAX), Value::Int(1)]).unwrap_err();
        assert!(err.message.contains("overflow"));
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(
            call("lt", &[Value::Int(1), Value::Int(2)]),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            call("eq", &[Value::str("a"), Value::str("a")]),
            Ok(Value::Bool(true))
        );
        assert_eq!(
            call("eq", &[Value::str("a"), Value::Int(1)]),
            Ok(Value::Bool(false))
        );
    }

    #[test]
    fn test_unknown_symbol_raises() {
        let err = call("pow", &[Value::Int(2), Value::Int(3)]).unwrap_err();
        assert!(err.message.contains("no symbol"));
    }

    #[test]
    fn test_wrong_arity_raises() {
        let err = call("add", &[Value::Int(2)]).unwrap_err();
        assert!(err.message.contains("takes 2 arguments"));
    }
}
