//! # durq Config
//!
//! Configuration management for the durq job queue: the TOML schema, a loader
//! with environment variable substitution, and a validator that separates hard
//! errors from warnings.

mod error;
mod loader;
mod schema;
mod validator;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
pub use validator::{ConfigValidator, ValidationError, ValidationResult, ValidationWarning};
