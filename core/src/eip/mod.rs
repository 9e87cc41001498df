// switchyard/src/eip/mod.rs

//! Enterprise Integration Pattern processors, composed by the route compiler.

pub mod choice;
pub mod loops;
pub mod multicast;
pub mod pipeline;
pub mod steps;
pub mod try_catch;

pub use choice::{Choice, WhenClause};
pub use loops::{Loop, LoopMode, LoopPredicateErrors, LOOP_INDEX_PROPERTY};
pub use multicast::{Aggregator, AggregatorRef, Multicast};
pub use pipeline::Pipeline;
pub use steps::{ConvertTarget, LogLevel};
pub use try_catch::{CatchClause, ErrorMatcher, TryCatch, EXCEPTION_CAUGHT_PROPERTY};
