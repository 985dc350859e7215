//! Scripts, their evaluation scope and the units of work they produce

use super::command::Command;
use crate::error::Error;
use crate::value::Variables;
use rand::RngCore;
use serde::Serialize;
use std::fmt;
use std::io::Write;

/// Per-evaluation scope handed to every command of one script run
///
/// The variables are owned and start as a copy of the client's baseline, so
/// nothing a script binds survives past the evaluation. The randomness stream
/// and diagnostic sink are borrowed from the client for the duration of the
/// run.
pub struct ScriptContext<'a> {
    pub vars: Variables,
    pub rng: &'a mut dyn RngCore,
    pub stderr: &'a mut dyn Write,
}

impl<'a> ScriptContext<'a> {
    pub fn new(vars: Variables, rng: &'a mut dyn RngCore, stderr: &'a mut dyn Write) -> Self {
        Self { vars, rng, stderr }
    }
}

/// One parameterized operation for the execution driver
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    pub query: String,
    /// Variables in scope when the statement was recorded
    pub params: Variables,
}

/// Output of evaluating one script once
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UnitOfWork {
    /// Copied from the script; drivers may route read-only work to replicas
    pub readonly: bool,
    pub statements: Vec<Statement>,
}

/// A script evaluation that stopped at a failing command
///
/// `work` holds every statement recorded before the failure.
#[derive(Debug)]
pub struct EvalFailure {
    pub script: String,
    pub work: UnitOfWork,
    pub error: Error,
}

impl fmt::Display for EvalFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "script '{}' failed after {} statement(s): {}",
            self.script,
            self.work.statements.len(),
            self.error
        )
    }
}

impl std::error::Error for EvalFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// A weighted, immutable sequence of commands
///
/// Scripts are shared read-only by every client of a workload.
#[derive(Debug, Clone)]
pub struct Script {
    pub name: String,
    /// Advisory: statements only read from the target system
    pub readonly: bool,
    /// Relative selection probability mass
    pub weight: u32,
    pub commands: Vec<Command>,
}

impl Script {
    pub fn new(name: impl Into<String>, weight: u32, commands: Vec<Command>) -> Self {
        Self { name: name.into(), readonly: false, weight, commands }
    }

    /// Mark the script read-only
    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    /// Run every command in order against `ctx`
    ///
    /// Stops at the first failing command; the statements accumulated up to
    /// that point are returned inside the [`EvalFailure`].
    pub fn eval(&self, mut ctx: ScriptContext<'_>) -> Result<UnitOfWork, EvalFailure> {
        let mut work = UnitOfWork { readonly: self.readonly, statements: Vec::new() };

        for command in &self.commands {
            if let Err(error) = command.execute(&mut ctx, &mut work) {
                return Err(EvalFailure { script: self.name.clone(), work, error });
            }
        }

        Ok(work)
    }
}
