// switchyard/src/route/compiler.rs

//! Turns a `RouteDefinition` into a processor tree.
//!
//! Every compiled step, leaf or composite, is wrapped in the decorator bound to the
//! route name and the runtime hooks. A step list longer than one at any nesting level
//! becomes a non-stopping pipeline. All lookups (functions, data formats, type names,
//! endpoint URIs) and expression compilation happen here, so a broken route fails at
//! registration rather than at dispatch.

use super::definition::{LoopDef, RouteDefinition, RouteStep};
use super::Route;
use crate::component::Uri;
use crate::converter::ConverterRegistry;
use crate::core::value::ValueKind;
use crate::dataformat::DataFormat;
use crate::eip::steps::{
  Convert, Delay, Log, Marshal, RemoveHeader, RemoveProperty, SetBody, SetError, SetHeader, SetProperty, To, Unmarshal,
};
use crate::eip::{
  CatchClause, Choice, ConvertTarget, Loop, LoopMode, Multicast, Pipeline, TryCatch, WhenClause,
};
use crate::error::{SwitchyardError, SwitchyardResult};
use crate::expression::{Expression, ExpressionDef, Predicate, Template};
use crate::processor::{Decorated, Hooks, ProcessorRef, StepInfo};
use crate::runtime::endpoints::EndpointRegistry;
use crate::runtime::registry::NamedRegistry;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{event, instrument, Level};

/// Everything a route may reference, borrowed from the owning runtime.
pub struct CompileContext<'a> {
  pub functions: &'a NamedRegistry<ProcessorRef>,
  pub data_formats: &'a NamedRegistry<Arc<dyn DataFormat>>,
  pub converters: &'a Arc<ConverterRegistry>,
  pub endpoints: &'a Arc<EndpointRegistry>,
  pub hooks: Hooks,
  pub track_history: bool,
}

struct RouteCompiler<'a, 'c> {
  route: &'a str,
  context: &'a CompileContext<'c>,
}

#[instrument(
  name = "RouteCompiler::compile",
  skip_all,
  fields(route = %definition.name, from = %definition.from, steps = definition.steps.len()),
  err(Display)
)]
pub fn compile(definition: &RouteDefinition, context: &CompileContext<'_>) -> SwitchyardResult<Route> {
  if definition.name.trim().is_empty() {
    return Err(SwitchyardError::RouteBuild("route name must not be empty".to_string()));
  }
  Uri::parse(&definition.from)?;

  let compiler = RouteCompiler {
    route: &definition.name,
    context,
  };
  let processor = compiler.steps(&definition.steps)?;
  event!(Level::DEBUG, "Route compiled.");
  Ok(Route::new(definition.name.clone(), definition.from.clone(), processor))
}

impl<'a, 'c> RouteCompiler<'a, 'c> {
  fn decorate(&self, step: String, inner: ProcessorRef) -> ProcessorRef {
    Arc::new(Decorated::new(
      StepInfo {
        route: self.route.to_string(),
        step,
      },
      inner,
      self.context.hooks.clone(),
      self.context.track_history,
    ))
  }

  /// One processor for a whole step list.
  fn steps(&self, steps: &[RouteStep]) -> SwitchyardResult<ProcessorRef> {
    match steps {
      [single] => self.step(single),
      _ => {
        let compiled = self.each(steps)?;
        Ok(self.decorate("pipeline".to_string(), Arc::new(Pipeline::new(compiled, false))))
      }
    }
  }

  fn each(&self, steps: &[RouteStep]) -> SwitchyardResult<Vec<ProcessorRef>> {
    steps.iter().map(|step| self.step(step)).collect()
  }

  fn expression(&self, def: &ExpressionDef) -> SwitchyardResult<Arc<dyn Expression>> {
    def.compile()
  }

  fn predicate(&self, def: &ExpressionDef) -> SwitchyardResult<Predicate> {
    Ok(Predicate::new(def.compile()?))
  }

  fn kind(&self, name: &str) -> SwitchyardResult<ValueKind> {
    ValueKind::from_str(name).map_err(|_| SwitchyardError::UnknownType {
      route: self.route.to_string(),
      name: name.to_string(),
    })
  }

  fn data_format(&self, name: &str) -> SwitchyardResult<Arc<dyn DataFormat>> {
    self
      .context
      .data_formats
      .get(name)
      .ok_or_else(|| SwitchyardError::UnknownDataFormat {
        route: self.route.to_string(),
        name: name.to_string(),
      })
  }

  fn step(&self, step: &RouteStep) -> SwitchyardResult<ProcessorRef> {
    let inner: ProcessorRef = match step {
      RouteStep::SetBody(value) => Arc::new(SetBody::new(self.expression(value)?)),
      RouteStep::SetHeader { name, value } => Arc::new(SetHeader::new(name.clone(), self.expression(value)?)),
      RouteStep::SetProperty { name, value } => Arc::new(SetProperty::new(name.clone(), self.expression(value)?)),
      RouteStep::RemoveHeader(name) => Arc::new(RemoveHeader(name.clone())),
      RouteStep::RemoveProperty(name) => Arc::new(RemoveProperty(name.clone())),
      RouteStep::To(uri) => {
        self.context.endpoints.validate(uri)?;
        Arc::new(To::new(uri.clone(), self.context.endpoints.clone()))
      }
      RouteStep::Pipeline { steps, stop_on_error } => Arc::new(Pipeline::new(self.each(steps)?, *stop_on_error)),
      RouteStep::Choice { when, otherwise } => {
        let clauses = when
          .iter()
          .map(|clause| {
            Ok(WhenClause {
              predicate: self.predicate(&clause.predicate)?,
              processor: self.steps(&clause.steps)?,
            })
          })
          .collect::<SwitchyardResult<Vec<_>>>()?;
        let otherwise = otherwise.as_ref().map(|steps| self.steps(steps)).transpose()?;
        Arc::new(Choice::new(clauses, otherwise))
      }
      RouteStep::Try {
        steps,
        catches,
        finally,
      } => {
        let catches = catches
          .iter()
          .map(|clause| {
            Ok(CatchClause {
              matcher: clause.matcher.clone(),
              processor: self.steps(&clause.steps)?,
            })
          })
          .collect::<SwitchyardResult<Vec<_>>>()?;
        let finally = match finally {
          Some(steps) => self.each(steps)?,
          None => Vec::new(),
        };
        Arc::new(TryCatch::new(self.each(steps)?, catches, finally))
      }
      RouteStep::Fn(name) => self
        .context
        .functions
        .get(name)
        .ok_or_else(|| SwitchyardError::UnknownFunction {
          route: self.route.to_string(),
          name: name.clone(),
        })?,
      RouteStep::SetError(error) => Arc::new(SetError::new(self.expression(error)?)),
      RouteStep::Delay(duration) => Arc::new(Delay::new(self.expression(duration)?)),
      RouteStep::Multicast {
        outputs,
        parallel,
        stop_on_error,
        aggregator,
      } => Arc::new(Multicast::new(
        self.each(outputs)?,
        *parallel,
        *stop_on_error,
        aggregator.as_ref().map(|def| def.0.clone()),
      )),
      RouteStep::Log { message, level } => Arc::new(Log::new(self.route, Template::compile(message)?, *level)),
      RouteStep::Marshal { format } => Arc::new(Marshal::new(self.data_format(format)?)),
      RouteStep::Unmarshal { format, target } => {
        let target = target.as_deref().map(|name| self.kind(name)).transpose()?;
        Arc::new(Unmarshal::new(self.data_format(format)?, target))
      }
      RouteStep::ConvertBody { to, params } => Arc::new(Convert::new(
        ConvertTarget::Body,
        self.kind(to)?,
        params.clone(),
        self.context.converters.clone(),
      )),
      RouteStep::ConvertHeader { name, to, params } => Arc::new(Convert::new(
        ConvertTarget::Header(name.clone()),
        self.kind(to)?,
        params.clone(),
        self.context.converters.clone(),
      )),
      RouteStep::ConvertProperty { name, to, params } => Arc::new(Convert::new(
        ConvertTarget::Property(name.clone()),
        self.kind(to)?,
        params.clone(),
        self.context.converters.clone(),
      )),
      RouteStep::Loop {
        mode,
        steps,
        on_predicate_error,
      } => {
        let mode = match mode {
          LoopDef::Count(count) => LoopMode::Count(self.expression(count)?),
          LoopDef::While(predicate) => LoopMode::While(self.predicate(predicate)?, *on_predicate_error),
        };
        Arc::new(Loop::new(mode, self.steps(steps)?))
      }
    };
    Ok(self.decorate(step.name(), inner))
  }
}
