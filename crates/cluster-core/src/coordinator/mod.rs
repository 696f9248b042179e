//! Clustered stack coordinator
//!
//! The central state machine. It intercepts the protocol engine's
//! dialog/transaction lifecycle calls, applies the three-tier lookup (local
//! table, distributed store, not found), reconciles versions, and drives
//! recovery and recreation. Organized into focused submodules: construction
//! and shared state in `core`, dialog CRUD in `dialog_operations`,
//! transaction CRUD in `transaction_operations`, and the remote-removal
//! entry points in `remote`.

pub mod core;
pub mod dialog_operations;
pub mod remote;
pub mod transaction_operations;

pub use self::core::{ClusterCoordinator, Collaborators};
