// switchyard/src/converter/mod.rs

//! Type conversion between value kinds, consumed by the `Convert*` steps.

pub mod registry;

pub use registry::{ConverterFn, ConverterParams, ConverterRegistry};
