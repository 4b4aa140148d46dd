//! Core domain types and traits for stackpipe.
//!
//! This crate contains:
//! - Resource identifiers, references and attribute values
//! - Pipeline stage and action definitions
//! - The stack declaration scope
//! - Synthesis output types (resolved resources, execution plan, artifact map)
//! - Collaborator traits (secret sources, provisioners)

pub mod artifact;
pub mod error;
pub mod id;
pub mod pipeline;
pub mod plan;
pub mod provisioner;
pub mod resource;
pub mod secret;
pub mod stack;
pub mod synthesis;

pub use error::{Error, Result, SynthError};
pub use id::{ActionRef, Reference, ResourceId, ResourceKind};
pub use resource::{AttrValue, ResolvedValue, Resource, Sensitive};
pub use stack::Stack;
pub use synthesis::Synthesis;
