// switchyard/src/expression/mod.rs

//! Expressions compute dynamic values from an exchange; predicates adapt them to booleans.

pub mod simple;
pub mod template;

use crate::core::exchange::Exchange;
use crate::core::value::Value;
use crate::error::{SwitchyardError, SwitchyardResult};
use std::fmt;
use std::sync::Arc;

pub use simple::SimpleExpression;
pub use template::Template;

/// A compiled, reusable computation over an exchange.
pub trait Expression: Send + Sync + fmt::Debug {
  fn eval(&self, exchange: &Exchange) -> SwitchyardResult<Value>;
}

/// A fixed value; never looks at the exchange.
#[derive(Debug, Clone)]
pub struct ConstantExpression(pub Value);

impl Expression for ConstantExpression {
  fn eval(&self, _exchange: &Exchange) -> SwitchyardResult<Value> {
    Ok(self.0.clone())
  }
}

type ExpressionFn = dyn Fn(&Exchange) -> anyhow::Result<Value> + Send + Sync;

/// Wraps a user callback.
#[derive(Clone)]
pub struct FuncExpression(Arc<ExpressionFn>);

impl FuncExpression {
  pub fn new<F>(f: F) -> Self
  where
    F: Fn(&Exchange) -> anyhow::Result<Value> + Send + Sync + 'static,
  {
    FuncExpression(Arc::new(f))
  }
}

impl fmt::Debug for FuncExpression {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("FuncExpression(..)")
  }
}

impl Expression for FuncExpression {
  fn eval(&self, exchange: &Exchange) -> SwitchyardResult<Value> {
    (self.0)(exchange).map_err(SwitchyardError::from)
  }
}

/// The declarative form of an expression, as carried by route steps.
#[derive(Clone)]
pub enum ExpressionDef {
  Constant(Value),
  Func(FuncExpression),
  Simple(String),
}

impl ExpressionDef {
  /// Compiles the definition. Only `Simple` can fail, with an `ExpressionCompile` error.
  pub fn compile(&self) -> SwitchyardResult<Arc<dyn Expression>> {
    Ok(match self {
      ExpressionDef::Constant(value) => Arc::new(ConstantExpression(value.clone())),
      ExpressionDef::Func(func) => Arc::new(func.clone()),
      ExpressionDef::Simple(source) => Arc::new(SimpleExpression::compile(source)?),
    })
  }
}

impl fmt::Debug for ExpressionDef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ExpressionDef::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
      ExpressionDef::Func(_) => f.write_str("Func(..)"),
      ExpressionDef::Simple(source) => f.debug_tuple("Simple").field(source).finish(),
    }
  }
}

pub fn constant(value: impl Into<Value>) -> ExpressionDef {
  ExpressionDef::Constant(value.into())
}

pub fn simple(source: impl Into<String>) -> ExpressionDef {
  ExpressionDef::Simple(source.into())
}

pub fn func<F>(f: F) -> ExpressionDef
where
  F: Fn(&Exchange) -> anyhow::Result<Value> + Send + Sync + 'static,
{
  ExpressionDef::Func(FuncExpression::new(f))
}

/// Total conversion of a value to a boolean.
///
/// `Null` is false, numbers test non-zero, strings parse as booleans (`"1"`/`"0"`, `t`/`f`,
/// `true`/`false` in lower, upper or title case); anything else is a conversion error.
pub fn to_bool(value: &Value) -> SwitchyardResult<bool> {
  match value {
    Value::Null => Ok(false),
    Value::Bool(b) => Ok(*b),
    Value::Int(i) => Ok(*i != 0),
    Value::Float(f) => Ok(*f != 0.0),
    Value::String(s) => match s.as_str() {
      "1" | "t" | "T" | "true" | "TRUE" | "True" => Ok(true),
      "0" | "f" | "F" | "false" | "FALSE" | "False" => Ok(false),
      other => Err(SwitchyardError::Conversion {
        from: "string".to_string(),
        to: "bool".to_string(),
        message: format!("'{}' is not a boolean", other),
      }),
    },
    other => Err(SwitchyardError::Conversion {
      from: other.kind().to_string(),
      to: "bool".to_string(),
      message: "value has no boolean interpretation".to_string(),
    }),
  }
}

/// An expression adapted to a boolean via [`to_bool`].
#[derive(Clone, Debug)]
pub struct Predicate {
  expression: Arc<dyn Expression>,
}

impl Predicate {
  pub fn new(expression: Arc<dyn Expression>) -> Self {
    Self { expression }
  }

  pub fn matches(&self, exchange: &Exchange) -> SwitchyardResult<bool> {
    to_bool(&self.expression.eval(exchange)?)
  }
}
