// switchyard/src/lib.rs

//! Switchyard: an embeddable, synchronous message-routing engine for Rust.
//!
//! Routes are declared with a nested builder (or as plain `RouteDefinition` data) and
//! compiled into a tree of Enterprise Integration Pattern processors:
//!  - Content-based routing (`choice`/`when`/`otherwise`) driven by the simple expression language.
//!  - Try/catch/finally with message, type, identity and regex error matching.
//!  - Sequential or parallel multicast with pluggable aggregation.
//!  - Count and while loops, delays, logging, type conversion and JSON (un)marshalling.
//!  - `direct:` and `timer:` endpoints, plus user-registered components.
//!
//! Every exchange carries a cancellation scope, an optional deadline and, when enabled,
//! a per-step message history.

pub mod component;
pub mod config;
pub mod converter;
pub mod core;
pub mod dataformat;
pub mod eip;
pub mod error;
pub mod expression;
pub mod processor;
pub mod route;
pub mod runtime;

// --- Re-exports for the Public API ---

// Exchange model
pub use crate::core::{CancelScope, Exchange, Message, MessageHistory, Value, ValueKind, ValueMap};

// Errors
pub use crate::error::{ExchangeError, SwitchyardError, SwitchyardResult};

// Processors and step hooks
pub use crate::processor::{from_fn, Hooks, Processor, ProcessorRef, StepInfo};

// Expressions
pub use crate::expression::{constant, func, simple, Expression, ExpressionDef, Predicate};

// EIP options surfaced through the builder
pub use crate::eip::{Aggregator, ErrorMatcher, LogLevel, LoopPredicateErrors};

// Routes
pub use crate::route::{aggregator, Route, RouteBuilder, RouteDefinition, RouteStep};

// Components, data formats, converters
pub use crate::component::{Component, Consumer, ConsumerContext, Endpoint, Uri};
pub use crate::converter::{ConverterParams, ConverterRegistry};
pub use crate::dataformat::DataFormat;

// The runtime and its configuration
pub use crate::config::RuntimeConfig;
pub use crate::runtime::{LifecycleState, Runtime};
