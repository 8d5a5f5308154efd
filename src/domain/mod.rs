//! Domain layer - pure logic
//!
//! No external I/O here: naming conventions and the step plan can be unit
//! tested without fakes.

pub mod naming;
pub mod step;
