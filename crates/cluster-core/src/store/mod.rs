//! Storage contract and backends
//!
//! The narrow interface every pluggable distributed store must satisfy, the
//! version-compare merge algorithm implemented once and shared by every
//! backend, and the in-process memory backend used for local mode and tests.
//! Concrete clustered key-value technologies plug in beneath
//! [`ReplicationStore`] by implementing the raw [`KvBackend`] trait.

pub mod contract;
pub mod memory;
pub mod merge;

pub use contract::{KvBackend, ReplicatedStore, ReplicationStore};
pub use memory::MemoryBackend;
pub use merge::{merge_dialog, MergeOutcome};
