// switchyard/src/eip/choice.rs

use crate::core::exchange::Exchange;
use crate::expression::Predicate;
use crate::processor::{Processor, ProcessorRef};
use tracing::{event, Level};

/// One `when` clause of a choice.
pub struct WhenClause {
  pub predicate: Predicate,
  pub processor: ProcessorRef,
}

/// Content-based router.
///
/// Predicates are evaluated in declaration order and the first one that holds runs its
/// processor exclusively. An evaluation error aborts the choice with that error, without
/// trying the remaining clauses or `otherwise`.
pub struct Choice {
  clauses: Vec<WhenClause>,
  otherwise: Option<ProcessorRef>,
}

impl Choice {
  pub fn new(clauses: Vec<WhenClause>, otherwise: Option<ProcessorRef>) -> Self {
    Self { clauses, otherwise }
  }
}

impl Processor for Choice {
  fn process(&self, exchange: &mut Exchange) {
    for (clause_idx, clause) in self.clauses.iter().enumerate() {
      match clause.predicate.matches(exchange) {
        Ok(true) => {
          event!(Level::TRACE, clause_index = clause_idx, "Choice clause matched.");
          clause.processor.process(exchange);
          return;
        }
        Ok(false) => {}
        Err(err) => {
          event!(
            Level::DEBUG,
            clause_index = clause_idx,
            error = %err,
            "Choice predicate failed."
          );
          exchange.set_error(err);
          return;
        }
      }
    }

    match &self.otherwise {
      Some(otherwise) => otherwise.process(exchange),
      None => event!(Level::TRACE, "No choice clause matched and no otherwise branch."),
    }
  }
}
