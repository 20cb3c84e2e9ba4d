//! Template layer: job template discovery, analysis and rendering.
//!
//! Templates are Jinja files rendered with `minijinja` in strict mode. A
//! field gets a default through the `default` filter; every other field the
//! template reads must be supplied by the merged mapping.

pub mod analysis;
pub mod engine;
pub mod kind;
pub mod store;

pub use analysis::TemplateAnalysis;
pub use kind::ConfigKind;
pub use store::{JobTemplates, TemplateSource};
