// switchyard/src/route/builder.rs

//! Fluent construction of nested route definitions.
//!
//! The builder keeps a stack of open blocks. `pipeline()`, `choice()`, `do_try()`,
//! `loop_count()`/`loop_while()` and `multicast()` each push a block that exactly one
//! `end()` pops. The first misuse is recorded and reported by `build()`, which also fails
//! unless every block has been closed.

use super::definition::{AggregatorDef, CatchDef, LoopDef, RouteDefinition, RouteStep, WhenDef};
use crate::converter::ConverterParams;
use crate::core::exchange::Exchange;
use crate::eip::{Aggregator, ErrorMatcher, LogLevel, LoopPredicateErrors};
use crate::error::{SwitchyardError, SwitchyardResult};
use crate::expression::ExpressionDef;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChoiceSection {
  Start,
  When,
  Otherwise,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TrySection {
  Try,
  Catch,
  Finally,
}

enum Frame {
  Root(Vec<RouteStep>),
  Pipeline {
    steps: Vec<RouteStep>,
    stop_on_error: bool,
  },
  Choice {
    when: Vec<WhenDef>,
    otherwise: Option<Vec<RouteStep>>,
    section: ChoiceSection,
  },
  Try {
    steps: Vec<RouteStep>,
    catches: Vec<CatchDef>,
    finally: Option<Vec<RouteStep>>,
    section: TrySection,
  },
  Loop {
    mode: LoopDef,
    steps: Vec<RouteStep>,
    on_predicate_error: LoopPredicateErrors,
  },
  Multicast {
    outputs: Vec<RouteStep>,
    parallel: bool,
    stop_on_error: bool,
    aggregator: Option<AggregatorDef>,
  },
}

impl Frame {
  fn label(&self) -> &'static str {
    match self {
      Frame::Root(_) => "route",
      Frame::Pipeline { .. } => "pipeline",
      Frame::Choice { .. } => "choice",
      Frame::Try { .. } => "doTry",
      Frame::Loop { .. } => "loop",
      Frame::Multicast { .. } => "multicast",
    }
  }

  /// The list the next step goes into.
  fn target(&mut self) -> Result<&mut Vec<RouteStep>, String> {
    match self {
      Frame::Root(steps) | Frame::Pipeline { steps, .. } | Frame::Loop { steps, .. } => Ok(steps),
      Frame::Multicast { outputs, .. } => Ok(outputs),
      Frame::Choice {
        when,
        otherwise,
        section,
      } => match section {
        ChoiceSection::Start => Err("steps inside choice() must follow when() or otherwise()".to_string()),
        ChoiceSection::When => when
          .last_mut()
          .map(|clause| &mut clause.steps)
          .ok_or_else(|| "when() clause missing".to_string()),
        ChoiceSection::Otherwise => otherwise
          .as_mut()
          .ok_or_else(|| "otherwise() clause missing".to_string()),
      },
      Frame::Try {
        steps,
        catches,
        finally,
        section,
      } => match section {
        TrySection::Try => Ok(steps),
        TrySection::Catch => catches
          .last_mut()
          .map(|clause| &mut clause.steps)
          .ok_or_else(|| "doCatch() clause missing".to_string()),
        TrySection::Finally => finally
          .as_mut()
          .ok_or_else(|| "doFinally() clause missing".to_string()),
      },
    }
  }

  fn into_step(self) -> Option<RouteStep> {
    Some(match self {
      Frame::Root(_) => return None,
      Frame::Pipeline { steps, stop_on_error } => RouteStep::Pipeline { steps, stop_on_error },
      Frame::Choice { when, otherwise, .. } => RouteStep::Choice { when, otherwise },
      Frame::Try {
        steps,
        catches,
        finally,
        ..
      } => RouteStep::Try {
        steps,
        catches,
        finally,
      },
      Frame::Loop {
        mode,
        steps,
        on_predicate_error,
      } => RouteStep::Loop {
        mode,
        steps,
        on_predicate_error,
      },
      Frame::Multicast {
        outputs,
        parallel,
        stop_on_error,
        aggregator,
      } => RouteStep::Multicast {
        outputs,
        parallel,
        stop_on_error,
        aggregator,
      },
    })
  }
}

pub struct RouteBuilder {
  name: String,
  from: String,
  stack: Vec<Frame>,
  error: Option<String>,
}

impl RouteBuilder {
  pub fn new(name: impl Into<String>, from: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      from: from.into(),
      stack: vec![Frame::Root(Vec::new())],
      error: None,
    }
  }

  /// Current nesting depth; 1 when no block is open.
  pub fn depth(&self) -> usize {
    self.stack.len()
  }

  fn fail(mut self, message: impl Into<String>) -> Self {
    if self.error.is_none() {
      self.error = Some(message.into());
    }
    self
  }

  fn top(&mut self) -> &mut Frame {
    // The root frame is never popped.
    let last = self.stack.len() - 1;
    &mut self.stack[last]
  }

  /// Adds a raw step to the current block.
  pub fn step(mut self, step: RouteStep) -> Self {
    if self.error.is_some() {
      return self;
    }
    match self.top().target() {
      Ok(steps) => {
        steps.push(step);
        self
      }
      Err(message) => self.fail(message),
    }
  }

  fn open(mut self, frame: Frame) -> Self {
    if self.error.is_some() {
      return self;
    }
    if let Err(message) = self.top().target() {
      return self.fail(message);
    }
    self.stack.push(frame);
    self
  }

  /// Closes the innermost open block.
  pub fn end(mut self) -> Self {
    if self.error.is_some() {
      return self;
    }
    if self.stack.len() <= 1 {
      return self.fail("end() called without an open block");
    }
    let frame = match self.stack.pop() {
      Some(frame) => frame,
      None => return self.fail("builder stack is empty"),
    };
    match frame.into_step() {
      Some(step) => self.step(step),
      None => self.fail("cannot close the route itself"),
    }
  }

  // --- leaf steps ---

  pub fn set_body(self, value: ExpressionDef) -> Self {
    self.step(RouteStep::SetBody(value))
  }

  pub fn set_header(self, name: impl Into<String>, value: ExpressionDef) -> Self {
    self.step(RouteStep::SetHeader {
      name: name.into(),
      value,
    })
  }

  pub fn set_property(self, name: impl Into<String>, value: ExpressionDef) -> Self {
    self.step(RouteStep::SetProperty {
      name: name.into(),
      value,
    })
  }

  pub fn remove_header(self, name: impl Into<String>) -> Self {
    self.step(RouteStep::RemoveHeader(name.into()))
  }

  pub fn remove_property(self, name: impl Into<String>) -> Self {
    self.step(RouteStep::RemoveProperty(name.into()))
  }

  pub fn to(self, uri: impl Into<String>) -> Self {
    self.step(RouteStep::To(uri.into()))
  }

  /// Calls the function registered under `name`.
  pub fn process(self, name: impl Into<String>) -> Self {
    self.step(RouteStep::Fn(name.into()))
  }

  pub fn set_error(self, error: ExpressionDef) -> Self {
    self.step(RouteStep::SetError(error))
  }

  pub fn delay(self, duration: ExpressionDef) -> Self {
    self.step(RouteStep::Delay(duration))
  }

  pub fn log(self, level: LogLevel, message: impl Into<String>) -> Self {
    self.step(RouteStep::Log {
      message: message.into(),
      level,
    })
  }

  pub fn marshal(self, format: impl Into<String>) -> Self {
    self.step(RouteStep::Marshal { format: format.into() })
  }

  pub fn unmarshal(self, format: impl Into<String>) -> Self {
    self.step(RouteStep::Unmarshal {
      format: format.into(),
      target: None,
    })
  }

  pub fn unmarshal_to(self, format: impl Into<String>, target: impl Into<String>) -> Self {
    self.step(RouteStep::Unmarshal {
      format: format.into(),
      target: Some(target.into()),
    })
  }

  pub fn convert_body_to(self, to: impl Into<String>) -> Self {
    self.convert_body_with(to, ConverterParams::new())
  }

  pub fn convert_body_with(self, to: impl Into<String>, params: ConverterParams) -> Self {
    self.step(RouteStep::ConvertBody { to: to.into(), params })
  }

  pub fn convert_header_to(self, name: impl Into<String>, to: impl Into<String>) -> Self {
    self.step(RouteStep::ConvertHeader {
      name: name.into(),
      to: to.into(),
      params: ConverterParams::new(),
    })
  }

  pub fn convert_property_to(self, name: impl Into<String>, to: impl Into<String>) -> Self {
    self.step(RouteStep::ConvertProperty {
      name: name.into(),
      to: to.into(),
      params: ConverterParams::new(),
    })
  }

  // --- blocks ---

  pub fn pipeline(self) -> Self {
    self.open(Frame::Pipeline {
      steps: Vec::new(),
      stop_on_error: false,
    })
  }

  pub fn choice(self) -> Self {
    self.open(Frame::Choice {
      when: Vec::new(),
      otherwise: None,
      section: ChoiceSection::Start,
    })
  }

  pub fn when(mut self, predicate: ExpressionDef) -> Self {
    if self.error.is_some() {
      return self;
    }
    match self.top() {
      Frame::Choice { section, .. } if *section == ChoiceSection::Otherwise => {
        self.fail("when() cannot follow otherwise()")
      }
      Frame::Choice { when, section, .. } => {
        when.push(WhenDef {
          predicate,
          steps: Vec::new(),
        });
        *section = ChoiceSection::When;
        self
      }
      other => {
        let label = other.label();
        self.fail(format!("when() used inside {} instead of choice()", label))
      }
    }
  }

  pub fn otherwise(mut self) -> Self {
    if self.error.is_some() {
      return self;
    }
    match self.top() {
      Frame::Choice {
        otherwise: Some(_), ..
      } => self.fail("otherwise() declared twice"),
      Frame::Choice { otherwise, section, .. } => {
        *otherwise = Some(Vec::new());
        *section = ChoiceSection::Otherwise;
        self
      }
      other => {
        let label = other.label();
        self.fail(format!("otherwise() used inside {} instead of choice()", label))
      }
    }
  }

  pub fn do_try(self) -> Self {
    self.open(Frame::Try {
      steps: Vec::new(),
      catches: Vec::new(),
      finally: None,
      section: TrySection::Try,
    })
  }

  pub fn do_catch(mut self, matcher: ErrorMatcher) -> Self {
    if self.error.is_some() {
      return self;
    }
    match self.top() {
      Frame::Try { section, .. } if *section == TrySection::Finally => {
        self.fail("doCatch() cannot follow doFinally()")
      }
      Frame::Try { catches, section, .. } => {
        catches.push(CatchDef {
          matcher,
          steps: Vec::new(),
        });
        *section = TrySection::Catch;
        self
      }
      other => {
        let label = other.label();
        self.fail(format!("doCatch() used inside {} instead of doTry()", label))
      }
    }
  }

  pub fn do_finally(mut self) -> Self {
    if self.error.is_some() {
      return self;
    }
    match self.top() {
      Frame::Try { finally: Some(_), .. } => self.fail("doFinally() declared twice"),
      Frame::Try { finally, section, .. } => {
        *finally = Some(Vec::new());
        *section = TrySection::Finally;
        self
      }
      other => {
        let label = other.label();
        self.fail(format!("doFinally() used inside {} instead of doTry()", label))
      }
    }
  }

  /// Repeats the block `count` times; the count is evaluated once per exchange.
  pub fn loop_count(self, count: ExpressionDef) -> Self {
    self.open(Frame::Loop {
      mode: LoopDef::Count(count),
      steps: Vec::new(),
      on_predicate_error: LoopPredicateErrors::default(),
    })
  }

  /// Repeats the block while `predicate` holds, testing it before every iteration.
  pub fn loop_while(self, predicate: ExpressionDef) -> Self {
    self.open(Frame::Loop {
      mode: LoopDef::While(predicate),
      steps: Vec::new(),
      on_predicate_error: LoopPredicateErrors::default(),
    })
  }

  pub fn multicast(self) -> Self {
    self.open(Frame::Multicast {
      outputs: Vec::new(),
      parallel: false,
      stop_on_error: false,
      aggregator: None,
    })
  }

  // --- block options ---

  /// Applies to the innermost `pipeline()` or `multicast()`.
  pub fn stop_on_error(mut self, enabled: bool) -> Self {
    if self.error.is_some() {
      return self;
    }
    match self.top() {
      Frame::Pipeline { stop_on_error, .. } | Frame::Multicast { stop_on_error, .. } => {
        *stop_on_error = enabled;
        self
      }
      other => {
        let label = other.label();
        self.fail(format!("stop_on_error() is not available inside {}", label))
      }
    }
  }

  pub fn parallel(mut self) -> Self {
    if self.error.is_some() {
      return self;
    }
    match self.top() {
      Frame::Multicast { parallel, .. } => {
        *parallel = true;
        self
      }
      other => {
        let label = other.label();
        self.fail(format!("parallel() is not available inside {}", label))
      }
    }
  }

  pub fn aggregate<A>(self, aggregator: A) -> Self
  where
    A: Aggregator + 'static,
  {
    self.aggregate_with(Arc::new(aggregator))
  }

  pub fn aggregate_with(mut self, aggregator: Arc<dyn Aggregator>) -> Self {
    if self.error.is_some() {
      return self;
    }
    match self.top() {
      Frame::Multicast { aggregator: slot, .. } => {
        *slot = Some(AggregatorDef(aggregator));
        self
      }
      other => {
        let label = other.label();
        self.fail(format!("aggregate() is not available inside {}", label))
      }
    }
  }

  pub fn on_predicate_error(mut self, policy: LoopPredicateErrors) -> Self {
    if self.error.is_some() {
      return self;
    }
    match self.top() {
      Frame::Loop {
        mode: LoopDef::While(_),
        on_predicate_error,
        ..
      } => {
        *on_predicate_error = policy;
        self
      }
      other => {
        let label = other.label();
        self.fail(format!("on_predicate_error() needs loop_while(), found {}", label))
      }
    }
  }

  pub fn build(mut self) -> SwitchyardResult<RouteDefinition> {
    if let Some(message) = self.error {
      return Err(SwitchyardError::RouteBuild(format!("route '{}': {}", self.name, message)));
    }
    if self.stack.len() != 1 {
      let open: Vec<&str> = self.stack[1..].iter().map(Frame::label).collect();
      return Err(SwitchyardError::RouteBuild(format!(
        "route '{}': {} unclosed block(s): {}",
        self.name,
        open.len(),
        open.join(" > ")
      )));
    }
    let steps = match self.stack.pop() {
      Some(Frame::Root(steps)) => steps,
      _ => return Err(SwitchyardError::Internal("route builder lost its root frame".to_string())),
    };
    Ok(RouteDefinition {
      name: self.name,
      from: self.from,
      steps,
    })
  }
}

/// Builds an aggregator from a closure.
pub fn aggregator<F>(f: F) -> Arc<dyn Aggregator>
where
  F: Fn(Option<Exchange>, Exchange) -> Exchange + Send + Sync + 'static,
{
  Arc::new(f)
}
