// switchyard/src/route/definition.rs

//! The declarative route tree. Steps carry data only; behaviour comes from the compiler.

use crate::converter::ConverterParams;
use crate::eip::{AggregatorRef, ErrorMatcher, LogLevel, LoopPredicateErrors};
use crate::expression::ExpressionDef;
use std::fmt;

#[derive(Debug, Clone)]
pub struct RouteDefinition {
  pub name: String,
  pub from: String,
  pub steps: Vec<RouteStep>,
}

impl RouteDefinition {
  pub fn new(name: impl Into<String>, from: impl Into<String>, steps: Vec<RouteStep>) -> Self {
    Self {
      name: name.into(),
      from: from.into(),
      steps,
    }
  }
}

#[derive(Debug, Clone)]
pub struct WhenDef {
  pub predicate: ExpressionDef,
  pub steps: Vec<RouteStep>,
}

#[derive(Debug, Clone)]
pub struct CatchDef {
  pub matcher: ErrorMatcher,
  pub steps: Vec<RouteStep>,
}

#[derive(Debug, Clone)]
pub enum LoopDef {
  Count(ExpressionDef),
  While(ExpressionDef),
}

/// A multicast aggregation strategy.
#[derive(Clone)]
pub struct AggregatorDef(pub AggregatorRef);

impl fmt::Debug for AggregatorDef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str("AggregatorDef(..)")
  }
}

#[derive(Debug, Clone)]
pub enum RouteStep {
  SetBody(ExpressionDef),
  SetHeader {
    name: String,
    value: ExpressionDef,
  },
  SetProperty {
    name: String,
    value: ExpressionDef,
  },
  RemoveHeader(String),
  RemoveProperty(String),
  To(String),
  Pipeline {
    steps: Vec<RouteStep>,
    stop_on_error: bool,
  },
  Choice {
    when: Vec<WhenDef>,
    otherwise: Option<Vec<RouteStep>>,
  },
  Try {
    steps: Vec<RouteStep>,
    catches: Vec<CatchDef>,
    finally: Option<Vec<RouteStep>>,
  },
  /// Calls a function registered with the runtime.
  Fn(String),
  SetError(ExpressionDef),
  Delay(ExpressionDef),
  /// Every output step receives its own copy of the exchange.
  Multicast {
    outputs: Vec<RouteStep>,
    parallel: bool,
    stop_on_error: bool,
    aggregator: Option<AggregatorDef>,
  },
  Log {
    message: String,
    level: LogLevel,
  },
  Marshal {
    format: String,
  },
  Unmarshal {
    format: String,
    target: Option<String>,
  },
  ConvertBody {
    to: String,
    params: ConverterParams,
  },
  ConvertHeader {
    name: String,
    to: String,
    params: ConverterParams,
  },
  ConvertProperty {
    name: String,
    to: String,
    params: ConverterParams,
  },
  Loop {
    mode: LoopDef,
    steps: Vec<RouteStep>,
    on_predicate_error: LoopPredicateErrors,
  },
}

impl RouteStep {
  /// Step name used in message history and hook callbacks.
  pub fn name(&self) -> String {
    match self {
      RouteStep::SetBody(_) => "setBody".to_string(),
      RouteStep::SetHeader { name, .. } => format!("setHeader[{}]", name),
      RouteStep::SetProperty { name, .. } => format!("setProperty[{}]", name),
      RouteStep::RemoveHeader(name) => format!("removeHeader[{}]", name),
      RouteStep::RemoveProperty(name) => format!("removeProperty[{}]", name),
      RouteStep::To(uri) => format!("to[{}]", uri),
      RouteStep::Pipeline { .. } => "pipeline".to_string(),
      RouteStep::Choice { .. } => "choice".to_string(),
      RouteStep::Try { .. } => "doTry".to_string(),
      RouteStep::Fn(name) => format!("process[{}]", name),
      RouteStep::SetError(_) => "setError".to_string(),
      RouteStep::Delay(_) => "delay".to_string(),
      RouteStep::Multicast { .. } => "multicast".to_string(),
      RouteStep::Log { .. } => "log".to_string(),
      RouteStep::Marshal { format } => format!("marshal[{}]", format),
      RouteStep::Unmarshal { format, .. } => format!("unmarshal[{}]", format),
      RouteStep::ConvertBody { to, .. } => format!("convertBodyTo[{}]", to),
      RouteStep::ConvertHeader { name, to, .. } => format!("convertHeaderTo[{}:{}]", name, to),
      RouteStep::ConvertProperty { name, to, .. } => format!("convertPropertyTo[{}:{}]", name, to),
      RouteStep::Loop { .. } => "loop".to_string(),
    }
  }
}
