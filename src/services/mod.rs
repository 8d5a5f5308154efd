//! Services layer - the decommission steps
//!
//! Each step module drives infrastructure adapters for one part of the
//! runbook; `workflow` runs them in order behind the confirmation gate.

pub mod cluster;
pub mod manifest;
pub mod secrets;
pub mod workflow;

#[cfg(test)]
pub mod testing;

// Re-export commonly used types
pub use workflow::{Collaborators, Workflow};
