//! Script commands
//!
//! The command set is closed per release: adding a step kind means adding a
//! variant here and an arm in [`Command::execute`].

use super::expr::Expression;
use super::script::{ScriptContext, Statement, UnitOfWork};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Time unit of a `\sleep` command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SleepUnit {
    #[serde(rename = "us")]
    Microseconds,
    #[serde(rename = "ms")]
    Milliseconds,
    #[default]
    #[serde(rename = "s")]
    Seconds,
}

impl SleepUnit {
    /// `count` units as a duration; negative counts collapse to zero
    pub fn duration(self, count: i64) -> Duration {
        let count = u64::try_from(count).unwrap_or(0);
        match self {
            SleepUnit::Microseconds => Duration::from_micros(count),
            SleepUnit::Milliseconds => Duration::from_millis(count),
            SleepUnit::Seconds => Duration::from_secs(count),
        }
    }
}

/// One step of a script
#[derive(Debug, Clone)]
pub enum Command {
    /// Record a statement parameterized by the current variables
    Query { query: String },
    /// Bind a variable to the value of an expression
    Set { var: String, expr: Arc<dyn Expression> },
    /// Block the calling client for `duration` units
    Sleep { duration: Arc<dyn Expression>, unit: SleepUnit },
}

impl Command {
    pub fn query(query: impl Into<String>) -> Self {
        Command::Query { query: query.into() }
    }

    pub fn set(var: impl Into<String>, expr: impl Expression + 'static) -> Self {
        Command::Set { var: var.into(), expr: Arc::new(expr) }
    }

    pub fn sleep(duration: impl Expression + 'static, unit: SleepUnit) -> Self {
        Command::Sleep { duration: Arc::new(duration), unit }
    }

    /// Execute this command, appending to `work` and/or mutating `ctx.vars`
    pub fn execute(&self, ctx: &mut ScriptContext<'_>, work: &mut UnitOfWork) -> Result<()> {
        match self {
            Command::Query { query } => {
                work.statements.push(Statement { query: query.clone(), params: ctx.vars.clone() });
                Ok(())
            }
            Command::Set { var, expr } => {
                let value = expr.eval(ctx)?;
                ctx.vars.insert(var.clone(), value);
                Ok(())
            }
            Command::Sleep { duration, unit } => {
                let value = duration.eval(ctx)?;
                let count = value.as_int().ok_or_else(|| Error::TypeMismatch {
                    expected: "integer sleep duration",
                    got: format!("{value} ({})", value.kind()),
                })?;

                let pause = unit.duration(count);
                tracing::trace!("sleeping for {:?}", pause);
                std::thread::sleep(pause);
                Ok(())
            }
        }
    }
}
