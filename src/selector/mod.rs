//! Selector layer: the (environment, experiment, group, job) tuple.
//!
//! Raw CLI strings are turned into a validated `Selector` here, before any
//! file I/O happens. Everything downstream takes the validated form.

pub mod environment;
pub mod validate;

pub use environment::{EnvScope, Environment};
pub use validate::{ExpScope, RawSelector, Selector, validate};
