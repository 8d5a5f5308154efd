//! Infrastructure layer - external I/O adapters
//!
//! This module contains all code that interacts with external systems:
//! - GitLab (GitOps repository)
//! - Kubernetes API
//! - The Argo application deletion script
//! - Vault
//! - Local backup files

pub mod backup;
pub mod gitlab;
pub mod kubernetes;
pub mod launcher;
pub mod vault;
