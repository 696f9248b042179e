//! Transaction lifecycle operations
//!
//! Transactions only participate in replication under the EarlyDialog
//! strategy, and only INVITE transactions are ever written to or removed
//! from the distributed store. Ids are case-normalized on every path.

use dashmap::mapref::entry::Entry;
use tracing::{debug, warn};

use crate::snapshot::transaction_codec;
use crate::transaction::{SharedTransaction, TransactionDirection, TransactionKey};

use super::core::ClusterCoordinator;

impl ClusterCoordinator {
    /// Register a live transaction in the local table, insert-if-absent.
    pub fn put_transaction(&self, transaction: SharedTransaction) -> SharedTransaction {
        let (branch, direction) = {
            let guard = transaction.read();
            (guard.branch_id.clone(), guard.direction)
        };
        let table = match direction {
            TransactionDirection::Server => &self.server_transactions,
            TransactionDirection::Client => &self.client_transactions,
        };
        match table.entry(branch) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                entry.insert(transaction.clone());
                transaction
            }
        }
    }

    /// Look up a transaction, consulting the distributed store only under
    /// the one policy that replicates transactions.
    ///
    /// On a distributed hit the transaction is reconstructed and inserted
    /// with insert-if-absent semantics; for client transactions the
    /// retransmission timer is armed only on the thread that won the
    /// insert, so it can never be double-armed.
    pub async fn find_transaction(&self, id: &str, is_server: bool) -> Option<SharedTransaction> {
        let normalized = id.to_ascii_lowercase();
        let table = if is_server {
            &self.server_transactions
        } else {
            &self.client_transactions
        };
        if let Some(existing) = table.get(&normalized) {
            return Some(existing.value().clone());
        }

        if !self.remote_enabled() || !self.config.strategy.replicates_transactions() {
            return None;
        }

        let lookup = if is_server {
            self.store.get_server_transaction(&normalized).await
        } else {
            self.store.get_client_transaction(&normalized).await
        };
        let snapshot = match lookup {
            Ok(Some(snapshot)) => snapshot,
            Ok(None) => return None,
            Err(e) => {
                warn!(id = %normalized, error = %e, "distributed transaction lookup failed; treating as absent");
                return None;
            }
        };

        let rebuilt = match self.recreator.recreate(&snapshot) {
            Ok(transaction) => transaction.into_shared(),
            Err(e) => {
                warn!(id = %normalized, error = %e, "transaction reconstruction failed; treating as absent");
                return None;
            }
        };

        let mut won_insert = false;
        let winner = match table.entry(normalized.clone()) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                won_insert = true;
                entry.insert(rebuilt.clone());
                rebuilt
            }
        };

        if won_insert && !is_server {
            self.timers
                .arm_retransmission(&TransactionKey::client(&normalized));
        }
        Some(winner)
    }

    /// Replicate a transaction under the EarlyDialog strategy. INVITE only:
    /// no other method's transactions are recoverable.
    pub async fn put_transaction_into_distributed_cache(&self, transaction: &SharedTransaction) {
        if !self.remote_enabled() || !self.config.strategy.replicates_transactions() {
            return;
        }
        let (snapshot, direction, branch) = {
            let guard = transaction.read();
            if !guard.is_invite() {
                debug!(branch = %guard.branch_id, method = %guard.method, "only INVITE transactions replicate");
                return;
            }
            (
                transaction_codec::to_snapshot(&guard),
                guard.direction,
                guard.branch_id.clone(),
            )
        };
        let result = match direction {
            TransactionDirection::Server => {
                self.store.put_server_transaction(&branch, snapshot).await
            }
            TransactionDirection::Client => {
                self.store.put_client_transaction(&branch, snapshot).await
            }
        };
        if let Err(e) = result {
            warn!(id = %branch, error = %e, "distributed transaction write failed; skipped");
        }
    }

    /// Remove a transaction: always locally; from the distributed store
    /// only under EarlyDialog and only for INVITE, split by direction.
    pub async fn remove_transaction(&self, transaction: &SharedTransaction) {
        let (branch, direction, is_invite) = {
            let guard = transaction.read();
            (guard.branch_id.clone(), guard.direction, guard.is_invite())
        };

        match direction {
            TransactionDirection::Server => {
                self.server_transactions.remove(&branch);
                self.pending_acks.remove(&branch);
                self.merge_table.retain(|_, txn| *txn != branch);
            }
            TransactionDirection::Client => {
                self.client_transactions.remove(&branch);
            }
        }
        self.session_events
            .on_transaction_terminated(&TransactionKey::new(&branch, direction));

        if !self.remote_enabled() || !self.config.strategy.replicates_transactions() || !is_invite {
            return;
        }
        let result = match direction {
            TransactionDirection::Server => self.store.remove_server_transaction(&branch).await,
            TransactionDirection::Client => self.store.remove_client_transaction(&branch).await,
        };
        if let Err(e) = result {
            warn!(id = %branch, error = %e, "distributed transaction removal failed; skipped");
        }
    }
}
