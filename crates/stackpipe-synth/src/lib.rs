//! Synthesis of stack declarations into provisioning plans.
//!
//! A synthesis pass runs three checks in a fixed order and stops at the first
//! failure:
//! 1. [`resolver`]: orders resources by reference and resolves values
//! 2. [`artifacts`]: validates artifact production and consumption
//! 3. [`ordering`]: groups actions into sequential waves
//!
//! [`synthesize`] merges the three results into a [`Synthesis`].

pub mod artifacts;
pub mod ordering;
pub mod resolver;
pub mod synthesizer;

pub use artifacts::validate_artifacts;
pub use ordering::plan_execution;
pub use resolver::resolve;
pub use stackpipe_core::Synthesis;
pub use synthesizer::synthesize;
