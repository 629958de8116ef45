//! Stage resolution.
//!
//! [`resolve`] produces the effective chain for a target: the target's own
//! stages followed by its namespace's global stages, with later stages
//! sharing a label with an earlier one dropped. Unlabeled stages are always
//! kept.
//!
//! Resolution is a pure function of the target and is recomputed per call.

use crate::middleware::MiddlewareStage;
use crate::target::RemoteTarget;
use std::collections::HashSet;
use std::sync::Arc;

/// Resolves the ordered, deduplicated stage list for a target.
#[must_use]
pub fn resolve(target: &RemoteTarget) -> Vec<Arc<MiddlewareStage>> {
    dedup(target.stages().iter().chain(target.global_stages()))
}

fn dedup<'a, I>(stages: I) -> Vec<Arc<MiddlewareStage>>
where
    I: IntoIterator<Item = &'a Arc<MiddlewareStage>>,
{
    let mut seen = HashSet::new();
    let mut chain = Vec::new();
    for stage in stages {
        if let Some(key) = stage.label().dedup_key() {
            if !seen.insert(key) {
                continue;
            }
        }
        chain.push(Arc::clone(stage));
    }
    chain
}
