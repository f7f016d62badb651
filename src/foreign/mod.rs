//! The foreign-call boundary.
//!
//! Programs name foreign symbols with `use module.symbol`; the runtime never
//! looks inside a module. A module that is linked into the process gets real
//! dispatches on worker threads and answers on a completion channel. A module
//! that is not linked still works: every call settles immediately to an
//! opaque reference and is appended to the trace, so a program's foreign
//! traffic can be inspected without running any of it.

pub mod bridge;
pub mod calc;
pub mod trace;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::runtime::failure::ForeignErrorKind;
use crate::runtime::value::Value;

pub use bridge::ForeignBridge;
pub use calc::CalcModule;
pub use trace::{TraceLog, TraceRecord};

/// One entry of a module manifest: a callable symbol and its arity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolSpec {
    pub symbol: String,
    pub arity: usize,
}

impl SymbolSpec {
    pub fn new(symbol: impl Into<String>, arity: usize) -> Self {
        SymbolSpec {
            symbol: symbol.into(),
            arity,
        }
    }
}

/// An error reported by a module, or synthesized by the bridge for calls
/// that never completed.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignError {
    pub kind: ForeignErrorKind,
    pub message: String,
}

impl ForeignError {
    pub fn raised(message: impl Into<String>) -> Self {
        ForeignError {
            kind: ForeignErrorKind::Raised,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        ForeignError {
            kind: ForeignErrorKind::Cancelled,
            message: String::new(),
        }
    }
}

/// A linked foreign module. Dispatch runs on a bridge worker thread, so
/// implementations must be thread-safe and should treat every call as
/// independent.
pub trait ForeignModule: Send + Sync {
    fn name(&self) -> &str;

    /// The symbols this module answers, with arities. Used to check call
    /// shapes before anything is dispatched.
    fn manifest(&self) -> Vec<SymbolSpec>;

    fn dispatch(&self, symbol: &str, args: &[Value]) -> Result<Value, ForeignError>;
}

/// Identity of one dispatch. Completions carry it back; anything arriving
/// under an id the scheduler no longer tracks is dropped, which is what
/// makes a timed-out call stay timed out even if the worker finishes later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallId(u64);

impl CallId {
    pub(crate) fn new(raw: u64) -> Self {
        CallId(raw)
    }
}

/// A finished dispatch, delivered over the completion channel.
#[derive(Debug)]
pub struct CallOutcome {
    pub call: CallId,
    pub result: Result<Value, ForeignError>,
}

/// Cooperative cancellation flag shared between the scheduler and bridge
/// workers. Workers that have not started yet give up; workers already
/// inside a module call run to completion and have their results dropped.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_token_is_shared() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
