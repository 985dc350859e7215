//! Structured workload configuration
//!
//! Profiles describe scripts as data rather than script files:
//!
//! ```toml
//! [variables]
//! scale = 10
//!
//! [[scripts]]
//! name = "select-only"
//! weight = 3
//! readonly = true
//! commands = [
//!     { type = "set", var = "aid", expr = { random = { min = { literal = 1 }, max = { literal = 100000 } } } },
//!     { type = "query", query = "SELECT abalance FROM pgbench_accounts WHERE aid = $aid" },
//! ]
//! ```

use crate::error::{Error, Result};
use crate::value::Variables;
use crate::workload::{Command, Expr, Script, Scripts, SleepUnit, Workload};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Scripts plus baseline variables
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkloadConfig {
    /// Baseline variables visible to every script evaluation
    #[serde(default)]
    pub variables: Variables,
    pub scripts: Vec<ScriptConfig>,
}

/// One weighted script
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptConfig {
    pub name: String,
    #[serde(default = "default_weight")]
    pub weight: u32,
    #[serde(default)]
    pub readonly: bool,
    pub commands: Vec<CommandConfig>,
}

fn default_weight() -> u32 {
    1
}

/// One script step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CommandConfig {
    Query {
        query: String,
    },
    Set {
        var: String,
        expr: Expr,
    },
    Sleep {
        duration: Expr,
        #[serde(default)]
        unit: SleepUnit,
    },
}

impl CommandConfig {
    fn validate(&self) -> Result<()> {
        match self {
            CommandConfig::Query { query } => {
                if query.trim().is_empty() {
                    return Err(Error::Config("query text cannot be empty".to_string()));
                }
                Ok(())
            }
            CommandConfig::Set { var, expr } => {
                if var.is_empty() {
                    return Err(Error::Config("set variable name cannot be empty".to_string()));
                }
                expr.validate()
            }
            CommandConfig::Sleep { duration, .. } => duration.validate(),
        }
    }

    fn build(&self) -> Command {
        match self {
            CommandConfig::Query { query } => Command::query(query.clone()),
            CommandConfig::Set { var, expr } => Command::set(var.clone(), expr.clone()),
            CommandConfig::Sleep { duration, unit } => Command::sleep(duration.clone(), *unit),
        }
    }
}

impl WorkloadConfig {
    /// Reject configurations that could not run
    pub fn validate(&self) -> Result<()> {
        if self.scripts.is_empty() {
            return Err(Error::Config("at least one script must be defined".to_string()));
        }

        let mut names = HashSet::new();
        for (i, script) in self.scripts.iter().enumerate() {
            if script.name.is_empty() {
                return Err(Error::Config(format!("script {i} has an empty name")));
            }
            if !names.insert(script.name.as_str()) {
                return Err(Error::Config(format!("duplicate script name '{}'", script.name)));
            }
            for (j, command) in script.commands.iter().enumerate() {
                command.validate().map_err(|e| {
                    Error::Config(format!("script '{}' command {j}: {e}", script.name))
                })?;
            }
        }

        if self.scripts.iter().all(|s| s.weight == 0) {
            return Err(Error::Config("total script weight is zero".to_string()));
        }

        for name in self.variables.keys() {
            if name.is_empty() {
                return Err(Error::Config("variable names cannot be empty".to_string()));
            }
        }

        Ok(())
    }

    /// Validated script set
    pub fn scripts(&self) -> Result<Scripts> {
        self.validate()?;
        let scripts = self
            .scripts
            .iter()
            .map(|s| {
                Script::new(s.name.clone(), s.weight, s.commands.iter().map(|c| c.build()).collect())
                    .readonly(s.readonly)
            })
            .collect();
        Scripts::new(scripts)
    }

    /// Validate and build the shared workload
    pub fn build(&self, seed: Option<u64>) -> Result<Workload> {
        let scripts = self.scripts()?;
        tracing::info!(
            "built workload: {} script(s), total weight {}, {} variable(s)",
            scripts.len(),
            scripts.total_weight(),
            self.variables.len()
        );
        Ok(Workload::new(self.variables.clone(), scripts, seed))
    }
}
