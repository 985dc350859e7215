//! Workload generation: scripts, weighted selection and per-client evaluation

pub mod client;
pub mod command;
pub mod expr;
pub mod factory;
pub mod script;
pub mod selector;

// Re-export main types
pub use client::ClientWorkload;
pub use command::{Command, SleepUnit};
pub use expr::{Expr, Expression};
pub use factory::Workload;
pub use script::{EvalFailure, Script, ScriptContext, Statement, UnitOfWork};
pub use selector::Scripts;
