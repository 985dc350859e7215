//! Expression contract and the built-in expression tree
//!
//! Commands only see [`Expression`]. [`Expr`] is the tree the configuration
//! layer builds; it covers literals, variable lookup, pgbench-style random
//! draws and integer/float arithmetic.

use super::script::ScriptContext;
use crate::error::{Error, Result};
use crate::value::Value;
use rand::distr::OpenClosed01;
use rand::Rng;
use rand_distr::{Distribution, StandardNormal};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Smallest accepted `param` for `random_gaussian`
pub const MIN_GAUSSIAN_PARAM: f64 = 2.0;

/// Something a `\set` or `\sleep` can evaluate
pub trait Expression: Debug + Send + Sync {
    fn eval(&self, ctx: &mut ScriptContext<'_>) -> Result<Value>;
}

/// Built-in expression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expr {
    Literal(Value),
    /// Value of a variable in the current scope
    Var(String),
    /// Uniform integer in `[min, max]`
    Random { min: Box<Expr>, max: Box<Expr> },
    /// Integer in `[min, max]` from a normal distribution truncated at `param` stddevs
    RandomGaussian { min: Box<Expr>, max: Box<Expr>, param: f64 },
    /// Integer in `[min, max]`, exponentially skewed towards `min`
    RandomExponential { min: Box<Expr>, max: Box<Expr>, param: f64 },
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Mod(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn random(min: impl Into<Expr>, max: impl Into<Expr>) -> Self {
        Expr::Random { min: Box::new(min.into()), max: Box::new(max.into()) }
    }

    pub fn random_gaussian(min: impl Into<Expr>, max: impl Into<Expr>, param: f64) -> Self {
        Expr::RandomGaussian { min: Box::new(min.into()), max: Box::new(max.into()), param }
    }

    pub fn random_exponential(min: impl Into<Expr>, max: impl Into<Expr>, param: f64) -> Self {
        Expr::RandomExponential { min: Box::new(min.into()), max: Box::new(max.into()), param }
    }

    pub fn add(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Expr::Add(Box::new(lhs.into()), Box::new(rhs.into()))
    }

    pub fn sub(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Expr::Sub(Box::new(lhs.into()), Box::new(rhs.into()))
    }

    pub fn mul(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Expr::Mul(Box::new(lhs.into()), Box::new(rhs.into()))
    }

    pub fn div(lhs: impl Into<Expr>, rhs: impl Into<Expr>) -> Self {
        Expr::Div(Box::new(lhs.into()), Box::new(rhs.into()))
    }

    /// Check parameters that do not depend on runtime values
    pub fn validate(&self) -> Result<()> {
        match self {
            Expr::Literal(_) | Expr::Var(_) => Ok(()),
            Expr::Random { min, max } => {
                min.validate()?;
                max.validate()
            }
            Expr::RandomGaussian { min, max, param } => {
                if !param.is_finite() || *param < MIN_GAUSSIAN_PARAM {
                    return Err(Error::Config(format!(
                        "random_gaussian param must be finite and >= {MIN_GAUSSIAN_PARAM}, got {param}"
                    )));
                }
                min.validate()?;
                max.validate()
            }
            Expr::RandomExponential { min, max, param } => {
                if !param.is_finite() || *param <= 0.0 {
                    return Err(Error::Config(format!(
                        "random_exponential param must be finite and > 0, got {param}"
                    )));
                }
                min.validate()?;
                max.validate()
            }
            Expr::Add(lhs, rhs)
            | Expr::Sub(lhs, rhs)
            | Expr::Mul(lhs, rhs)
            | Expr::Div(lhs, rhs)
            | Expr::Mod(lhs, rhs) => {
                lhs.validate()?;
                rhs.validate()
            }
        }
    }
}

impl From<i32> for Expr {
    fn from(v: i32) -> Self {
        Expr::Literal(Value::Int(v.into()))
    }
}

impl From<i64> for Expr {
    fn from(v: i64) -> Self {
        Expr::Literal(Value::Int(v))
    }
}

impl From<f64> for Expr {
    fn from(v: f64) -> Self {
        Expr::Literal(Value::Float(v))
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Literal(v)
    }
}

impl Expression for Expr {
    fn eval(&self, ctx: &mut ScriptContext<'_>) -> Result<Value> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Var(name) => ctx
                .vars
                .get(name)
                .cloned()
                .ok_or_else(|| Error::Eval(format!("undefined variable '{name}'"))),
            Expr::Random { min, max } => {
                let (lo, hi) = eval_bounds(ctx, min, max)?;
                Ok(Value::Int(ctx.rng.random_range(lo..=hi)))
            }
            Expr::RandomGaussian { min, max, param } => {
                let (lo, hi) = eval_bounds(ctx, min, max)?;
                if !param.is_finite() || *param < MIN_GAUSSIAN_PARAM {
                    return Err(Error::Eval(format!(
                        "random_gaussian param must be finite and >= {MIN_GAUSSIAN_PARAM}, got {param}"
                    )));
                }

                // Rejection-sample a standard normal inside (-param, param)
                let stdev = loop {
                    let x: f64 = StandardNormal.sample(&mut *ctx.rng);
                    if x.abs() < *param {
                        break x;
                    }
                };
                let fraction = (stdev + param) / (param * 2.0);
                Ok(Value::Int(scale_into(lo, hi, fraction)))
            }
            Expr::RandomExponential { min, max, param } => {
                let (lo, hi) = eval_bounds(ctx, min, max)?;
                if !param.is_finite() || *param <= 0.0 {
                    return Err(Error::Eval(format!(
                        "random_exponential param must be finite and > 0, got {param}"
                    )));
                }

                let cut = (-param).exp();
                let uniform: f64 = OpenClosed01.sample(&mut *ctx.rng);
                let fraction = -(cut + (1.0 - cut) * uniform).ln() / param;
                Ok(Value::Int(scale_into(lo, hi, fraction)))
            }
            Expr::Add(lhs, rhs) => arith(ctx, lhs, rhs, "+", i64::checked_add, |a, b| a + b),
            Expr::Sub(lhs, rhs) => arith(ctx, lhs, rhs, "-", i64::checked_sub, |a, b| a - b),
            Expr::Mul(lhs, rhs) => arith(ctx, lhs, rhs, "*", i64::checked_mul, |a, b| a * b),
            Expr::Div(lhs, rhs) => arith(ctx, lhs, rhs, "/", i64::checked_div, |a, b| a / b),
            Expr::Mod(lhs, rhs) => arith(ctx, lhs, rhs, "%", i64::checked_rem, |a, b| a % b),
        }
    }
}

fn eval_int(ctx: &mut ScriptContext<'_>, expr: &Expr) -> Result<i64> {
    let value = expr.eval(ctx)?;
    value.as_int().ok_or_else(|| Error::TypeMismatch {
        expected: "integer",
        got: format!("{value} ({})", value.kind()),
    })
}

fn eval_bounds(ctx: &mut ScriptContext<'_>, min: &Expr, max: &Expr) -> Result<(i64, i64)> {
    let lo = eval_int(ctx, min)?;
    let hi = eval_int(ctx, max)?;
    if lo > hi {
        return Err(Error::Eval(format!("empty random range [{lo}, {hi}]")));
    }
    Ok((lo, hi))
}

/// Map `fraction` in `[0, 1)` onto the integers `[lo, hi]`
fn scale_into(lo: i64, hi: i64, fraction: f64) -> i64 {
    let width = (hi as i128 - lo as i128 + 1) as f64;
    let offset = (width * fraction) as i128;
    (lo as i128 + offset).clamp(lo as i128, hi as i128) as i64
}

fn arith(
    ctx: &mut ScriptContext<'_>,
    lhs: &Expr,
    rhs: &Expr,
    op: &str,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> Result<Value> {
    let a = lhs.eval(ctx)?;
    let b = rhs.eval(ctx)?;

    if let (Value::Int(x), Value::Int(y)) = (&a, &b) {
        return int_op(*x, *y).map(Value::Int).ok_or_else(|| {
            if *y == 0 && (op == "/" || op == "%") {
                Error::Eval(format!("division by zero in {x} {op} {y}"))
            } else {
                Error::Eval(format!("integer overflow in {x} {op} {y}"))
            }
        });
    }

    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => Ok(Value::Float(float_op(x, y))),
        (None, _) => Err(not_a_number(&a)),
        (_, None) => Err(not_a_number(&b)),
    }
}

fn not_a_number(value: &Value) -> Error {
    Error::TypeMismatch { expected: "number", got: format!("{value} ({})", value.kind()) }
}
