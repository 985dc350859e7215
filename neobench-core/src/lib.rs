//! Neobench Core Library
//!
//! This crate provides the workload generation engine of the neobench load
//! tester: the script and command model, weighted script selection, and the
//! per-client execution model that turns a shared workload definition into a
//! stream of randomized units of work.

pub mod config;
pub mod error;
pub mod runtime;
pub mod seed;
pub mod value;
pub mod workload;

pub use error::{Error, Result};
pub use value::{Value, Variables};
