//! Neobench CLI library
//!
//! This library exposes configuration and output types for testing and reuse.

pub mod config;
pub mod output;
