//! Runtime core: values, environments, the term graph and its scheduler.
//!
//! # No-Cycle Invariant
//! Runtime values are immutable and expected to remain acyclic. Heap-backed
//! `Value` variants use `Arc` for cheap sharing across the planning threads,
//! so introducing cycles would leak memory under reference counting.
//!
//! Cycles in the *program* are a different matter and are welcome: bindings
//! may refer to each other freely, because recursion lives in environment
//! slots and graph edges, never inside a value.

pub mod env;
pub mod failure;
pub mod graph;
pub mod scheduler;
pub mod value;

pub use env::{EnvArena, EnvId};
pub use failure::{Failure, ForeignErrorKind};
pub use scheduler::{Evaluation, FrontierOrder, Outcome, Scheduler, SchedulerOptions};
pub use value::Value;
