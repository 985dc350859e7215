//! Profile configuration for neobench
//!
//! A profile is a TOML file holding run metadata plus the workload
//! definition. Any value can be overridden from the command line with
//! dotted paths (`--set experiment.clients=8`), and baseline variables can be
//! defined with `-D name=value`.

use anyhow::{bail, Context, Result};
use neobench_core::config::WorkloadConfig;
use neobench_core::Value;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level profile configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProfileConfig {
    pub experiment: ExperimentConfig,
    pub workload: WorkloadConfig,
}

/// Run metadata
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExperimentConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Master seed for reproducibility (None = use entropy)
    #[serde(default)]
    pub seed: Option<u64>,
    /// How long each client keeps generating work
    #[serde(with = "humantime_serde")]
    pub duration: Duration,
    /// Number of concurrent clients
    #[serde(default = "default_clients")]
    pub clients: usize,
    /// Optional cap on units of work per client
    #[serde(default)]
    pub iterations: Option<u64>,
}

fn default_clients() -> usize {
    1
}

impl ProfileConfig {
    /// Load profile from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse profile: {}", path.display()))
    }

    /// Load profile from TOML file with `--set` style overrides, then validate
    pub fn from_file_with_overrides<P: AsRef<Path>>(path: P, overrides: &[String]) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile: {}", path.display()))?;

        let mut value: toml::Value = toml::from_str(&content)
            .with_context(|| format!("Failed to parse profile: {}", path.display()))?;

        for override_str in overrides {
            let (key, val) = split_assignment(override_str)
                .with_context(|| format!("Invalid override format: {}", override_str))?;
            set_toml_path(&mut value, key, val)
                .with_context(|| format!("Failed to apply override: {}", override_str))?;
        }

        let config: ProfileConfig =
            value.try_into().context("Failed to deserialize modified profile")?;
        config.validate()?;
        Ok(config)
    }

    /// Bind baseline variables from `name=value` definitions
    ///
    /// Values are typed the same way as `--set` values: `10` is an integer,
    /// `0.5` a float, `true` a boolean, anything else a string.
    pub fn define_variables(&mut self, defines: &[String]) -> Result<()> {
        for define in defines {
            let (name, raw) = split_assignment(define)
                .with_context(|| format!("Invalid variable definition: {}", define))?;
            if name.is_empty() {
                bail!("Variable name cannot be empty in '{}'", define);
            }
            let value: Value = parse_value(raw)?
                .try_into()
                .with_context(|| format!("Variable '{}' must be a scalar", name))?;
            self.workload.variables.insert(name.to_string(), value);
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.experiment.name.is_empty() {
            bail!("Experiment name cannot be empty");
        }
        if self.experiment.duration.is_zero() {
            bail!("Experiment duration must be > 0");
        }
        if self.experiment.clients == 0 {
            bail!("Experiment clients must be > 0");
        }
        if self.experiment.iterations == Some(0) {
            bail!("Experiment iterations must be > 0 when set");
        }

        self.workload.validate()?;
        Ok(())
    }
}

/// Split "key=value" at the first '='
fn split_assignment(assignment: &str) -> Result<(&str, &str)> {
    match assignment.split_once('=') {
        Some((key, value)) => Ok((key.trim(), value)),
        None => bail!("Invalid format '{}'. Expected 'key=value'", assignment),
    }
}

/// Path segment types
enum PathSegment<'a> {
    Key(&'a str),
    Index(usize),
    Append,
}

fn parse_path(path: &str) -> Vec<PathSegment<'_>> {
    path.split('.')
        .filter(|part| !part.is_empty())
        .map(|part| {
            if part == "+" {
                PathSegment::Append
            } else if let Ok(idx) = part.parse::<usize>() {
                PathSegment::Index(idx)
            } else {
                PathSegment::Key(part)
            }
        })
        .collect()
}

/// Set a value in TOML using dot-notation path
fn set_toml_path(root: &mut toml::Value, path: &str, value_str: &str) -> Result<()> {
    let segments = parse_path(path);
    let Some((last, parents)) = segments.split_last() else {
        bail!("Empty path");
    };

    let mut current = root;
    for segment in parents {
        current = match segment {
            PathSegment::Key(key) => {
                let toml::Value::Table(table) = current else {
                    bail!("Cannot navigate through non-table value at key '{}'", key);
                };
                table
                    .entry(key.to_string())
                    .or_insert_with(|| toml::Value::Table(Default::default()))
            }
            PathSegment::Index(idx) => {
                let toml::Value::Array(arr) = current else {
                    bail!("Cannot index non-array value");
                };
                let len = arr.len();
                match arr.get_mut(*idx) {
                    Some(item) => item,
                    None => bail!("Array index {} out of bounds (length: {})", idx, len),
                }
            }
            PathSegment::Append => bail!("Append operation '+' can only be at the end of path"),
        };
    }

    let parsed = parse_value(value_str)?;
    match (last, current) {
        (PathSegment::Key(key), toml::Value::Table(table)) => {
            table.insert(key.to_string(), parsed);
        }
        (PathSegment::Index(idx), toml::Value::Array(arr)) => {
            let len = arr.len();
            match arr.get_mut(*idx) {
                Some(item) => *item = parsed,
                None => bail!("Array index {} out of bounds (length: {})", idx, len),
            }
        }
        (PathSegment::Append, toml::Value::Array(arr)) => arr.push(parsed),
        (PathSegment::Key(key), _) => bail!("Cannot set key '{}' on non-table value", key),
        _ => bail!("Cannot index or append to non-array value"),
    }

    Ok(())
}

/// Parse a string value with type inference
fn parse_value(value_str: &str) -> Result<toml::Value> {
    let trimmed = value_str.trim();

    match trimmed {
        "true" => return Ok(toml::Value::Boolean(true)),
        "false" => return Ok(toml::Value::Boolean(false)),
        _ => {}
    }

    if let Ok(int_val) = trimmed.parse::<i64>() {
        return Ok(toml::Value::Integer(int_val));
    }
    if let Ok(float_val) = trimmed.parse::<f64>() {
        return Ok(toml::Value::Float(float_val));
    }

    // Arrays and inline tables go through the TOML parser
    if (trimmed.starts_with('[') && trimmed.ends_with(']'))
        || (trimmed.starts_with('{') && trimmed.ends_with('}'))
    {
        let doc = format!("value = {}", trimmed);
        let mut table: toml::Table =
            toml::from_str(&doc).with_context(|| format!("Failed to parse value: {}", trimmed))?;
        if let Some(value) = table.remove("value") {
            return Ok(value);
        }
        bail!("Failed to parse value: {}", trimmed);
    }

    // Strip optional surrounding quotes
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed);
    Ok(toml::Value::String(unquoted.to_string()))
}
