//! Dispatch plumbing between the scheduler and foreign modules.
//!
//! The bridge owns one completion channel. Linked calls run the module on a
//! spawned worker and the worker answers on the channel; unlinked calls are
//! answered on the same channel before `dispatch` even returns, carrying a
//! fresh opaque reference. The scheduler drains one channel either way and
//! never needs to know which kind of module it is talking to.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread;
use std::time::Duration;

use crate::runtime::value::Value;

use super::trace::{TraceLog, TraceRecord};
use super::{CallId, CallOutcome, CancelToken, ForeignError, ForeignModule};

pub struct ForeignBridge {
    modules: HashMap<String, Arc<dyn ForeignModule>>,
    sender: Sender<CallOutcome>,
    receiver: Receiver<CallOutcome>,
    trace: TraceLog,
    cancel: CancelToken,
    next_call: u64,
    next_token: u64,
}

impl ForeignBridge {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        ForeignBridge {
            modules: HashMap::new(),
            sender,
            receiver,
            trace: TraceLog::new(),
            cancel: CancelToken::new(),
            next_call: 0,
            next_token: 0,
        }
    }

    /// Make `module` answer real dispatches. Anything not linked stays in
    /// no-link mode.
    pub fn link(&mut self, module: Arc<dyn ForeignModule>) {
        self.modules.insert(module.name().to_string(), module);
    }

    pub fn is_linked(&self, module: &str) -> bool {
        self.modules.contains_key(module)
    }

    /// Arity from the module manifest; `None` when the module is unlinked
    /// or does not list the symbol.
    pub fn arity_of(&self, module: &str, symbol: &str) -> Option<usize> {
        self.modules
            .get(module)?
            .manifest()
            .iter()
            .find(|spec| spec.symbol == symbol)
            .map(|spec| spec.arity)
    }

    pub fn trace(&self) -> &TraceLog {
        &self.trace
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Send one call on its way and return its id. The matching
    /// [`CallOutcome`] arrives on the completion channel; for an unlinked
    /// module it is already there when this returns.
    pub fn dispatch(&mut self, module: &str, symbol: &str, args: Vec<Value>) -> CallId {
        let call = CallId::new(self.next_call);
        self.next_call += 1;

        match self.modules.get(module) {
            Some(linked) => {
                self.trace.record(TraceRecord::new(module, symbol, &args, None));
                let linked = Arc::clone(linked);
                let sender = self.sender.clone();
                let cancel = self.cancel.clone();
                let symbol = symbol.to_string();
                thread::spawn(move || {
                    let result = if cancel.is_cancelled() {
                        Err(ForeignError::cancelled())
                    } else {
                        linked.dispatch(&symbol, &args)
                    };
                    // The scheduler may have stopped listening; that is fine.
                    let _ = sender.send(CallOutcome { call, result });
                });
            }
            None => {
                let token = self.next_token;
                self.next_token += 1;
                self.trace
                    .record(TraceRecord::new(module, symbol, &args, Some(token)));
                let value = Value::Opaque {
                    module: Arc::from(module),
                    token,
                };
                let _ = self.sender.send(CallOutcome {
                    call,
                    result: Ok(value),
                });
            }
        }

        call
    }

    pub fn try_recv(&self) -> Option<CallOutcome> {
        match self.receiver.try_recv() {
            Ok(outcome) => Some(outcome),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<CallOutcome> {
        match self.receiver.recv_timeout(timeout) {
            Ok(outcome) => Some(outcome),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Default for ForeignBridge {
    fn default() -> Self {
        Self::new()
    }
}
