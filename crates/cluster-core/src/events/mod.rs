//! Remote mutation propagation
//!
//! The inbound path from the storage backend: when an entry this node did
//! not write is deleted elsewhere, the backend delivers a notification on a
//! thread it owns. Local-origin notifications are filtered out here, before
//! the coordinator sees anything; what remains is applied as direct local
//! table cleanup, never as protocol-level termination.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::coordinator::ClusterCoordinator;

/// What kind of entry a mutation refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationKind {
    Dialog,
    ServerTransaction,
    ClientTransaction,
}

/// A removal observed in the distributed store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteMutation {
    pub kind: MutationKind,
    /// Dialog key or lower-cased transaction id.
    pub key: String,
    /// False when this node's own write caused the notification.
    pub remote_origin: bool,
}

/// Implemented by whoever wants store removal notifications; backends call
/// this from their own callback threads.
pub trait RemoteMutationListener: Send + Sync {
    fn entry_removed(&self, mutation: RemoteMutation);
}

/// Bridges backend notifications to the coordinator's removal entry points.
pub struct RemoteMutationHandler {
    coordinator: Arc<ClusterCoordinator>,
}

impl RemoteMutationHandler {
    pub fn new(coordinator: Arc<ClusterCoordinator>) -> Arc<Self> {
        Arc::new(Self { coordinator })
    }
}

impl RemoteMutationListener for RemoteMutationHandler {
    fn entry_removed(&self, mutation: RemoteMutation) {
        if !mutation.remote_origin {
            trace!(key = %mutation.key, "ignoring local-origin store notification");
            return;
        }
        debug!(kind = ?mutation.kind, key = %mutation.key, "applying remote removal");
        match mutation.kind {
            MutationKind::Dialog => self.coordinator.remote_dialog_removal(&mutation.key),
            MutationKind::ServerTransaction => self
                .coordinator
                .remote_server_transaction_removal(&mutation.key),
            MutationKind::ClientTransaction => self
                .coordinator
                .remote_client_transaction_removal(&mutation.key),
        }
    }
}
