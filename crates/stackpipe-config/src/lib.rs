//! KDL declaration parsing for stackpipe.
//!
//! This crate handles:
//! - Stack declarations (stackpipe.kdl)
//! - Variable and secret interpolation into attribute values

pub mod error;
pub mod stack;
pub mod variables;

pub use error::{ConfigError, ConfigResult};
pub use stack::{parse_stack, parse_stack_file};
pub use variables::{VariableContext, VariableContextBuilder, required_secrets};
