// switchyard/src/expression/simple/mod.rs

//! The Simple expression language.
//!
//! Expressions are compiled once, when a route is registered, and evaluated against the
//! flat environment of an exchange (`id`, `exchangeId`, `body`, `header`, `error`,
//! `property`). Compile errors carry the 1-based column of the offending token.

mod eval;
pub mod lexer;
pub mod parser;

use super::Expression;
use crate::core::exchange::Exchange;
use crate::core::value::Value;
use crate::error::{SwitchyardError, SwitchyardResult};
use parser::{Expr, Parser};

pub(crate) fn compile_error(source: &str, column: usize, message: impl Into<String>) -> SwitchyardError {
  SwitchyardError::ExpressionCompile {
    expression: source.to_string(),
    column,
    message: message.into(),
  }
}

#[derive(Debug, Clone)]
pub struct SimpleExpression {
  source: String,
  ast: Expr,
}

impl SimpleExpression {
  pub fn compile(source: &str) -> SwitchyardResult<Self> {
    let ast = Parser::parse(source)?;
    Ok(Self {
      source: source.to_string(),
      ast,
    })
  }

  pub fn source(&self) -> &str {
    &self.source
  }
}

impl Expression for SimpleExpression {
  fn eval(&self, exchange: &Exchange) -> SwitchyardResult<Value> {
    eval::evaluate(&self.ast, exchange).map_err(|err| match err {
      SwitchyardError::Expression(message) => {
        SwitchyardError::Expression(format!("{} (in '{}')", message, self.source))
      }
      other => other,
    })
  }
}
