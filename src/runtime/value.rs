use std::fmt;
use std::sync::Arc;

use crate::runtime::env::EnvId;
use crate::term::Term;

/// Runtime value held in graph nodes, environment slots and foreign-call
/// arguments.
///
/// ## Sharing model
///
/// Heap-backed variants use `Arc` so that a settled value can be copied into
/// any number of dependent nodes in O(1). Values cross threads: the planning
/// pass reads them from worker threads, and the foreign bridge hands argument
/// vectors to its own dispatch threads, so the whole type must be
/// `Send + Sync`.
///
/// Values are immutable after creation and always form DAGs; nothing in the
/// language can create a back-edge from a captured value to its closure.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// 64-bit signed integer.
    Int(i64),
    /// 64-bit floating point number.
    Float(f64),
    /// Boolean value.
    Bool(bool),
    /// UTF-8 string value.
    Str(Arc<str>),
    /// A function together with its defining environment.
    Closure(Arc<Closure>),
    /// A foreign symbol usable as a first-class callee.
    ForeignFn(Arc<ForeignFn>),
    /// Result of an unlinked foreign call. Carries no data beyond its
    /// identity; the owning module is the only party that can interpret it.
    Opaque { module: Arc<str>, token: u64 },
}

/// A `fun` value: parameter list, body term, and the environment the
/// function was built in. The body is shared with the term graph, never
/// copied per call.
#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub params: Vec<String>,
    pub body: Arc<Term>,
    pub env: EnvId,
}

/// A bound foreign symbol, produced by a `use` declaration. `arity` comes
/// from the module manifest when the module is linked; unlinked symbols
/// accept any argument count.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignFn {
    pub module: String,
    pub symbol: String,
    pub arity: Option<usize>,
}

impl Value {
    /// Canonical type label used in failures. User-visible; keep stable.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Bool(_) => "Bool",
            Value::Str(_) => "Str",
            Value::Closure(_) => "Closure",
            Value::ForeignFn(_) => "ForeignFn",
            Value::Opaque { .. } => "Opaque",
        }
    }

    pub fn str(text: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(text.as_ref()))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "\"{}\"", v),
            Value::Closure(_) => write!(f, "<closure>"),
            Value::ForeignFn(v) => write!(f, "<foreign {}.{}>", v.module, v.symbol),
            Value::Opaque { module, token } => write!(f, "<{}#{}>", module, token),
        }
    }
}
