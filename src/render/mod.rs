//! Build-time rendering: the per-job pipeline and the YAML writer it uses.

pub mod pipeline;
pub mod yaml;

pub use pipeline::{BuildReport, build};
