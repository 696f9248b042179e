//! Remote-removal entry points
//!
//! Called from the remote-mutation propagation path when another node
//! deletes shared state. These remove entries directly from the local
//! tables, bypassing the engine's terminated-event path: the deleting node
//! already ran its own termination side-effects, and replaying them here
//! would double-fire application callbacks cluster-wide. They also must not
//! re-enter the engine's event dispatch, since they run on a backend-owned
//! callback thread.

use tracing::debug;

use super::core::ClusterCoordinator;

impl ClusterCoordinator {
    /// Another node removed this dialog; drop it locally, silently.
    pub fn remote_dialog_removal(&self, raw_key: &str) {
        let removed = self.dialogs.remove(raw_key).is_some()
            | self.early_dialogs.remove(raw_key).is_some();
        if removed {
            debug!(key = %raw_key, "dialog removed by remote node; local entry dropped without events");
        }
    }

    /// Another node removed this server transaction; drop it and the
    /// merge-table / pending-ACK bookkeeping tied to it, silently.
    pub fn remote_server_transaction_removal(&self, id: &str) {
        let normalized = id.to_ascii_lowercase();
        let removed = self.server_transactions.remove(&normalized).is_some();
        self.pending_acks.remove(&normalized);
        self.merge_table.retain(|_, txn| *txn != normalized);
        if removed {
            debug!(id = %normalized, "server transaction removed by remote node; local entry dropped without events");
        }
    }

    /// Another node removed this client transaction; drop it, silently.
    pub fn remote_client_transaction_removal(&self, id: &str) {
        let normalized = id.to_ascii_lowercase();
        if self.client_transactions.remove(&normalized).is_some() {
            debug!(id = %normalized, "client transaction removed by remote node; local entry dropped without events");
        }
    }
}
