//! Override tree: worklist discovery and per-job override loading.
//!
//! Layout: `<override_root>/<env>/[<exp>/]<group>/<job>/config.yml`.
//! Experiment directories exist only under test and experiment.

pub mod discover;
pub mod load;

pub use discover::{DirLister, FsLister, WorkItem, discover};
pub use load::{Overrides, load};

/// File name of a job's override mapping.
pub const OVERRIDE_FILE: &str = "config.yml";
