// tests/route_builder_tests.rs
mod common;

use common::*;
use switchyard::route::{LoopDef, RouteStep};
use switchyard::{
  aggregator, constant, simple, ErrorMatcher, Exchange, LoopPredicateErrors, RouteBuilder, SwitchyardError,
};

fn build_error(builder: RouteBuilder) -> String {
  match builder.build() {
    Err(SwitchyardError::RouteBuild(message)) => message,
    other => panic!("expected a RouteBuild error, got {:?}", other.map(|d| d.name)),
  }
}

#[test]
fn test_builder_produces_nested_definition() {
  setup_tracing();
  let definition = RouteBuilder::new("orders", "direct:orders")
    .set_header("received", constant(true))
    .choice()
    .when(simple("header.priority == 'high'"))
    .to("direct:express")
    .otherwise()
    .pipeline()
    .stop_on_error(true)
    .to("direct:standard")
    .log(switchyard::LogLevel::Info, "queued ${id}")
    .end()
    .end()
    .build()
    .unwrap();

  assert_eq!(definition.name, "orders");
  assert_eq!(definition.from, "direct:orders");
  assert_eq!(definition.steps.len(), 2);
  match &definition.steps[1] {
    RouteStep::Choice { when, otherwise } => {
      assert_eq!(when.len(), 1);
      assert_eq!(when[0].steps.len(), 1);
      match otherwise.as_deref() {
        Some([RouteStep::Pipeline { steps, stop_on_error }]) => {
          assert!(*stop_on_error);
          assert_eq!(steps.len(), 2);
        }
        other => panic!("unexpected otherwise branch: {:?}", other),
      }
    }
    other => panic!("expected a choice, got {:?}", other),
  }
}

#[test]
fn test_depth_tracks_open_blocks() {
  let builder = RouteBuilder::new("depth", "direct:depth");
  assert_eq!(builder.depth(), 1);
  let builder = builder.do_try().loop_count(constant(2)).multicast();
  assert_eq!(builder.depth(), 4);
  let builder = builder.end().end().do_finally().end();
  assert_eq!(builder.depth(), 1);
  assert!(builder.build().is_ok());
}

#[test]
fn test_unclosed_blocks_fail_build() {
  setup_tracing();
  for builder in [
    RouteBuilder::new("r", "direct:r").pipeline(),
    RouteBuilder::new("r", "direct:r").choice().when(constant(true)),
    RouteBuilder::new("r", "direct:r").do_try().do_catch(ErrorMatcher::Any),
    RouteBuilder::new("r", "direct:r").loop_count(constant(1)),
    RouteBuilder::new("r", "direct:r").pipeline().pipeline().end(),
  ] {
    let message = build_error(builder);
    assert!(message.contains("unclosed"), "{}", message);
  }
}

#[test]
fn test_closing_more_blocks_than_opened_fails_build() {
  setup_tracing();
  let message = build_error(RouteBuilder::new("r", "direct:r").pipeline().end().end());
  assert!(message.contains("without an open block"), "{}", message);
}

#[test]
fn test_misplaced_clauses_are_reported() {
  setup_tracing();
  let cases = [
    (RouteBuilder::new("r", "direct:r").when(constant(true)).end(), "when()"),
    (RouteBuilder::new("r", "direct:r").choice().set_body(constant(1)).end(), "must follow when()"),
    (
      RouteBuilder::new("r", "direct:r").choice().otherwise().when(constant(true)).end(),
      "cannot follow otherwise()",
    ),
    (
      RouteBuilder::new("r", "direct:r").choice().otherwise().otherwise().end(),
      "declared twice",
    ),
    (
      RouteBuilder::new("r", "direct:r")
        .do_try()
        .do_finally()
        .do_catch(ErrorMatcher::Any)
        .end(),
      "cannot follow doFinally()",
    ),
    (RouteBuilder::new("r", "direct:r").pipeline().parallel().end(), "parallel()"),
    (RouteBuilder::new("r", "direct:r").stop_on_error(true), "stop_on_error()"),
    (
      RouteBuilder::new("r", "direct:r")
        .loop_count(constant(3))
        .on_predicate_error(LoopPredicateErrors::Propagate)
        .end(),
      "on_predicate_error()",
    ),
    (
      RouteBuilder::new("r", "direct:r")
        .choice()
        .aggregate(aggregator(|_acc: Option<Exchange>, next: Exchange| next))
        .end(),
      "aggregate()",
    ),
  ];

  for (builder, expected) in cases {
    let message = build_error(builder);
    assert!(message.contains(expected), "expected '{}' in '{}'", expected, message);
  }
}

#[test]
fn test_first_misuse_is_sticky() {
  let message = build_error(
    RouteBuilder::new("sticky", "direct:sticky")
      .end()
      .when(constant(true))
      .set_body(constant("ignored")),
  );
  assert!(message.starts_with("route 'sticky': end()"), "{}", message);
}

#[test]
fn test_loop_and_multicast_options_are_recorded() {
  let definition = RouteBuilder::new("opts", "direct:opts")
    .loop_while(simple("property.CAMEL_LOOP_INDEX < 3"))
    .on_predicate_error(LoopPredicateErrors::Propagate)
    .set_body(constant(1))
    .end()
    .multicast()
    .parallel()
    .aggregate(aggregator(|_acc: Option<Exchange>, next: Exchange| next))
    .to("direct:a")
    .to("direct:b")
    .end()
    .build()
    .unwrap();

  match &definition.steps[0] {
    RouteStep::Loop {
      mode: LoopDef::While(_),
      steps,
      on_predicate_error,
    } => {
      assert_eq!(*on_predicate_error, LoopPredicateErrors::Propagate);
      assert_eq!(steps.len(), 1);
    }
    other => panic!("expected a while loop, got {:?}", other),
  }
  match &definition.steps[1] {
    RouteStep::Multicast {
      outputs,
      parallel,
      stop_on_error,
      aggregator,
    } => {
      assert_eq!(outputs.len(), 2);
      assert!(*parallel);
      assert!(!*stop_on_error);
      assert!(aggregator.is_some());
    }
    other => panic!("expected a multicast, got {:?}", other),
  }
}

#[test]
fn test_step_names() {
  assert_eq!(RouteStep::To("direct:x".to_string()).name(), "to[direct:x]");
  assert_eq!(RouteStep::Fn("enrich".to_string()).name(), "process[enrich]");
  assert_eq!(RouteStep::RemoveHeader("h".to_string()).name(), "removeHeader[h]");
  assert_eq!(RouteStep::SetBody(constant(1)).name(), "setBody");
}

// --- Compilation at registration time ---

fn registration_error(builder: RouteBuilder) -> SwitchyardError {
  let runtime = runtime();
  let definition = builder.build().expect("route should build");
  let err = runtime.register_route(definition).expect_err("registration should fail");
  assert!(runtime.route_names().is_empty());
  err
}

#[test]
fn test_unknown_function_fails_registration() {
  setup_tracing();
  let err = registration_error(RouteBuilder::new("r", "direct:r").process("missing"));
  assert!(
    matches!(&err, SwitchyardError::UnknownFunction { route, name } if route == "r" && name == "missing"),
    "{:?}",
    err
  );
}

#[test]
fn test_unknown_data_format_and_type_fail_registration() {
  setup_tracing();
  let err = registration_error(RouteBuilder::new("r", "direct:r").marshal("xml"));
  assert!(matches!(err, SwitchyardError::UnknownDataFormat { .. }), "{:?}", err);

  let err = registration_error(RouteBuilder::new("r", "direct:r").convert_body_to("decimal"));
  assert!(matches!(err, SwitchyardError::UnknownType { .. }), "{:?}", err);

  let err = registration_error(RouteBuilder::new("r", "direct:r").unmarshal_to("json", "widget"));
  assert!(matches!(err, SwitchyardError::UnknownType { .. }), "{:?}", err);
}

#[test]
fn test_broken_expression_fails_registration() {
  setup_tracing();
  let err = registration_error(
    RouteBuilder::new("r", "direct:r")
      .choice()
      .when(simple("header.kind =="))
      .set_body(constant(1))
      .end(),
  );
  assert!(matches!(err, SwitchyardError::ExpressionCompile { .. }), "{:?}", err);

  let err = registration_error(RouteBuilder::new("r", "direct:r").log(switchyard::LogLevel::Info, "${nope}"));
  assert!(matches!(err, SwitchyardError::ExpressionCompile { .. }), "{:?}", err);
}

#[test]
fn test_bad_uris_fail_registration() {
  setup_tracing();
  let err = registration_error(RouteBuilder::new("r", "direct:r").to("jms:queue:orders"));
  assert!(matches!(err, SwitchyardError::UnknownComponent { .. }), "{:?}", err);

  let err = registration_error(RouteBuilder::new("r", "not a uri").set_body(constant(1)));
  assert!(matches!(err, SwitchyardError::InvalidUri { .. }), "{:?}", err);

  let err = registration_error(RouteBuilder::new("  ", "direct:r").set_body(constant(1)));
  assert!(matches!(err, SwitchyardError::RouteBuild(_)), "{:?}", err);
}
