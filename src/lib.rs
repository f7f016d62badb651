pub mod diagnostics;
pub mod foreign;
pub mod runtime;
pub mod syntax;
pub mod term;
