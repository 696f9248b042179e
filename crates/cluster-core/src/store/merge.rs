//! Version-compare merge
//!
//! The single merge implementation shared by every backend adapter. The rule:
//! a stored snapshot is only changed when the incoming version is strictly
//! greater; ties and older versions are silently ignored. The merge is
//! field-by-field into the existing record so concurrently-updated unrelated
//! fields survive, never a blind overwrite.

use tracing::debug;

use crate::snapshot::DialogSnapshot;

/// Result of merging an incoming snapshot into a stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// The incoming snapshot was strictly newer and its fields were applied.
    Applied,
    /// The incoming snapshot was the same age or older; nothing changed.
    IgnoredStale,
}

/// Merge `incoming` into `stored`. The comparison is always incoming-version
/// against stored-version; comparing an incoming snapshot against itself
/// would make the staleness check a tautology.
pub fn merge_dialog(stored: &mut DialogSnapshot, incoming: &DialogSnapshot) -> MergeOutcome {
    if incoming.version <= stored.version {
        debug!(
            incoming = incoming.version,
            stored = stored.version,
            "ignoring stale dialog write"
        );
        return MergeOutcome::IgnoredStale;
    }

    for (key, value) in &incoming.metadata {
        stored.metadata.insert(key.clone(), value.clone());
    }
    if incoming.application_data.is_some() {
        stored.application_data = incoming.application_data.clone();
    }
    stored.version = incoming.version;
    MergeOutcome::Applied
}
