//! Runtime step: resolve execution-time values into published configs.

pub mod jar;
pub mod resolve;
pub mod store;

pub use resolve::{RuntimeReport, RuntimeRequest, resolve};
pub use store::{LocalObjectStore, ObjectStore};
