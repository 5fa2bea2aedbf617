//! Policy Compiler
//!
//! Canonicalizes policies into a stable byte form and binds them to
//! commitment hashes that audit records can reference.

pub mod compiler;
pub mod types;

pub use compiler::PolicyCompiler;
pub use types::{CanonicalPolicy, Policy, PolicyEffect, PolicyStatement};
