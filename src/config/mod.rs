//! Configuration module
//!
//! This module contains components for loading and validating configuration.

mod deserializer;
mod loader;
mod model;

pub use deserializer::deserialize_submission_paths;
pub use loader::{load_config, locate_config, read_or_default};
pub use model::{Config, DataLoaderKind};
