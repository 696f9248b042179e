//! # sipha-cluster-core
//!
//! High-availability replication core for a SIP protocol engine. A cluster
//! of nodes shares in-progress call state (dialogs and transactions) through
//! a pluggable distributed store, so any surviving node can continue a call
//! after another node fails.
//!
//! The crate decorates an injected engine rather than replacing it: every
//! dialog/transaction lifecycle call flows through the
//! [`ClusterCoordinator`], which decides between local memory and the
//! distributed store, reconciles concurrent writes with a strictly-greater
//! version rule, and reconstructs live objects from stored snapshots after a
//! node restart. Storage faults never reach the engine; a store outage
//! degrades the node to single-node behavior.
//!
//! ## Architecture
//!
//! - [`coordinator`]: the central state machine intercepting lifecycle calls
//! - [`store`]: the storage contract, the shared merge algorithm, backends
//! - [`snapshot`]: codec between live objects and stored snapshots
//! - [`policy`]: the closed set of replication strategies
//! - [`events`]: remote-mutation propagation from the store backends
//! - [`engine`]: the narrow traits the protocol engine is consumed through
//! - [`balancer`]: load-balancer awareness surface

pub mod balancer;
pub mod config;
pub mod coordinator;
pub mod dialog;
pub mod engine;
pub mod errors;
pub mod events;
pub mod policy;
pub mod protocol;
pub mod snapshot;
pub mod store;
pub mod transaction;

pub use balancer::{BalancerListener, BalancerRegistry};
pub use config::ClusterConfig;
pub use coordinator::{ClusterCoordinator, Collaborators};
pub use dialog::{Dialog, DialogContext, DialogKey, DialogState, SharedDialog};
pub use engine::{
    DefaultTransactionRecreator, LocalEndpoints, MessageChannel, SessionEventSink, TimerService,
    Transport, TransactionRecreator,
};
pub use errors::{ConfigError, ReconstructionError, StorageError};
pub use events::{MutationKind, RemoteMutation, RemoteMutationHandler, RemoteMutationListener};
pub use policy::ReplicationStrategy;
pub use snapshot::{DialogSnapshot, TransactionSnapshot};
pub use store::{KvBackend, MemoryBackend, MergeOutcome, ReplicatedStore, ReplicationStore};
pub use transaction::{SharedTransaction, Transaction, TransactionDirection, TransactionKey};
