//! Naming conventions that tie external resources to a service
//!
//! Secret-store roles and policies carry no owner metadata, so ownership is
//! decided by name. The predicate is behind `NameMatcher` so the convention
//! can be tightened without touching the steps that use it.

/// Manifest extensions, probed in this order
pub const MANIFEST_EXTENSIONS: [&str; 2] = [".yaml", ".yml"];

/// Decides whether a resource name belongs to a target
pub trait NameMatcher: Send + Sync {
    fn matches(&self, candidate: &str, target: &str) -> bool;
}

/// Plain suffix match with no separator enforced
///
/// `other-svc` matches `svc`, and so does `mysvc`. Policies and access roles
/// use this looser form.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuffixMatcher;

impl NameMatcher for SuffixMatcher {
    fn matches(&self, candidate: &str, target: &str) -> bool {
        candidate.ends_with(target)
    }
}

/// Names from `candidates` accepted by `matcher`, in their original order
pub fn select_matching(
    candidates: &[String],
    target: &str,
    matcher: &dyn NameMatcher,
) -> Vec<String> {
    candidates
        .iter()
        .filter(|name| matcher.matches(name, target))
        .cloned()
        .collect()
}

/// Candidate manifest paths for a service, in probe order
pub fn manifest_candidates(domain: &str, service: &str) -> Vec<String> {
    MANIFEST_EXTENSIONS
        .iter()
        .map(|ext| format!("{}/{}{}", domain, service, ext))
        .collect()
}

/// Name of the database connection (and role suffix) for a service
pub fn db_object_name(service: &str, db_type: &str) -> String {
    format!("{}-{}", service, db_type)
}
