//! Local tool runtimes.

pub mod arithmetic;

pub use arithmetic::{evaluate, ArithmeticToolRuntime};
