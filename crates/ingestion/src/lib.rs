//! DocHub Ingestion
//!
//! Repository sync and the chunk/embed pipeline:
//! - GitHub tree listing and content download
//! - Change detection via content fingerprints
//! - Hybrid structural chunking with heading-anchor extraction
//! - Per-document embedding with failure isolation
//! - Process-wide sync status registry

pub mod anchors;
pub mod chunker;
pub mod collector;
pub mod github;
pub mod pipeline;
pub mod registry;

pub use collector::{FileFailure, SyncCollector, SyncResult};
pub use github::GithubClient;
pub use pipeline::DocumentPipeline;
pub use registry::{SyncPhase, SyncRegistry, SyncStatus};

use sha2::{Digest, Sha256};

/// Content fingerprint used for change detection: SHA-256 hex digest
pub fn fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_stable() {
        assert_eq!(fingerprint("hello"), fingerprint("hello"));
        assert_ne!(fingerprint("hello"), fingerprint("hello "));
        assert_eq!(fingerprint("hello").len(), 64);
    }
}
