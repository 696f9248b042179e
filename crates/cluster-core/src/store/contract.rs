//! Storage contract
//!
//! [`ReplicatedStore`] is the whole interface the coordinator sees; every
//! clustered key-value technology hides behind it. [`ReplicationStore`]
//! implements the contract once over a raw [`KvBackend`], so the
//! version-compare merge exists in exactly one place instead of being
//! copy-pasted into each backend.

use async_trait::async_trait;

use crate::errors::StorageResult;
use crate::snapshot::{DialogSnapshot, TransactionSnapshot};
use crate::transaction::TransactionKey;

use super::merge::{merge_dialog, MergeOutcome};

/// The narrow contract every pluggable distributed store satisfies.
#[async_trait]
pub trait ReplicatedStore: Send + Sync {
    async fn get_dialog(&self, key: &str) -> StorageResult<Option<DialogSnapshot>>;

    /// Write with the merge rule: insert when absent, otherwise apply only
    /// when strictly newer than the stored version.
    async fn put_dialog(&self, key: &str, snapshot: DialogSnapshot) -> StorageResult<MergeOutcome>;

    /// Read-side reconciliation: return the stored snapshot only when its
    /// version is strictly greater than `local_version`, so a caller never
    /// regresses a dialog to a version it already knows is stale.
    async fn update_dialog(
        &self,
        key: &str,
        local_version: u64,
    ) -> StorageResult<Option<DialogSnapshot>>;

    async fn remove_dialog(&self, key: &str) -> StorageResult<()>;

    /// Passive-expiry eviction; same effect as removal, no notification.
    async fn evict_dialog(&self, key: &str) -> StorageResult<()>;

    async fn get_server_transaction(&self, id: &str)
        -> StorageResult<Option<TransactionSnapshot>>;
    async fn put_server_transaction(
        &self,
        id: &str,
        snapshot: TransactionSnapshot,
    ) -> StorageResult<()>;
    async fn remove_server_transaction(&self, id: &str) -> StorageResult<()>;

    async fn get_client_transaction(&self, id: &str)
        -> StorageResult<Option<TransactionSnapshot>>;
    async fn put_client_transaction(
        &self,
        id: &str,
        snapshot: TransactionSnapshot,
    ) -> StorageResult<()>;
    async fn remove_client_transaction(&self, id: &str) -> StorageResult<()>;

    /// True when the backend holds data in-process only; the coordinator
    /// skips all remote work in that mode.
    fn in_local_mode(&self) -> bool;
}

/// Raw per-backend operations: plain typed get/put/remove, no merge logic.
/// Adapters for concrete store technologies implement exactly this.
#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn load_dialog(&self, key: &str) -> StorageResult<Option<DialogSnapshot>>;
    async fn store_dialog(&self, key: &str, snapshot: DialogSnapshot) -> StorageResult<()>;
    async fn delete_dialog(&self, key: &str) -> StorageResult<()>;

    async fn load_transaction(
        &self,
        key: &TransactionKey,
    ) -> StorageResult<Option<TransactionSnapshot>>;
    async fn store_transaction(
        &self,
        key: &TransactionKey,
        snapshot: TransactionSnapshot,
    ) -> StorageResult<()>;
    async fn delete_transaction(&self, key: &TransactionKey) -> StorageResult<()>;

    fn local_mode(&self) -> bool;
}

/// The shared contract implementation over any raw backend.
pub struct ReplicationStore<B> {
    backend: B,
}

impl<B: KvBackend> ReplicationStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }
}

#[async_trait]
impl<B: KvBackend> ReplicatedStore for ReplicationStore<B> {
    async fn get_dialog(&self, key: &str) -> StorageResult<Option<DialogSnapshot>> {
        self.backend.load_dialog(key).await
    }

    async fn put_dialog(&self, key: &str, snapshot: DialogSnapshot) -> StorageResult<MergeOutcome> {
        match self.backend.load_dialog(key).await? {
            None => {
                self.backend.store_dialog(key, snapshot).await?;
                Ok(MergeOutcome::Applied)
            }
            Some(mut stored) => {
                let outcome = merge_dialog(&mut stored, &snapshot);
                if outcome == MergeOutcome::Applied {
                    self.backend.store_dialog(key, stored).await?;
                }
                Ok(outcome)
            }
        }
    }

    async fn update_dialog(
        &self,
        key: &str,
        local_version: u64,
    ) -> StorageResult<Option<DialogSnapshot>> {
        Ok(self
            .backend
            .load_dialog(key)
            .await?
            .filter(|stored| stored.version > local_version))
    }

    async fn remove_dialog(&self, key: &str) -> StorageResult<()> {
        self.backend.delete_dialog(key).await
    }

    async fn evict_dialog(&self, key: &str) -> StorageResult<()> {
        self.backend.delete_dialog(key).await
    }

    async fn get_server_transaction(
        &self,
        id: &str,
    ) -> StorageResult<Option<TransactionSnapshot>> {
        self.backend
            .load_transaction(&TransactionKey::server(id))
            .await
    }

    async fn put_server_transaction(
        &self,
        id: &str,
        snapshot: TransactionSnapshot,
    ) -> StorageResult<()> {
        self.backend
            .store_transaction(&TransactionKey::server(id), snapshot)
            .await
    }

    async fn remove_server_transaction(&self, id: &str) -> StorageResult<()> {
        self.backend
            .delete_transaction(&TransactionKey::server(id))
            .await
    }

    async fn get_client_transaction(
        &self,
        id: &str,
    ) -> StorageResult<Option<TransactionSnapshot>> {
        self.backend
            .load_transaction(&TransactionKey::client(id))
            .await
    }

    async fn put_client_transaction(
        &self,
        id: &str,
        snapshot: TransactionSnapshot,
    ) -> StorageResult<()> {
        self.backend
            .store_transaction(&TransactionKey::client(id), snapshot)
            .await
    }

    async fn remove_client_transaction(&self, id: &str) -> StorageResult<()> {
        self.backend
            .delete_transaction(&TransactionKey::client(id))
            .await
    }

    fn in_local_mode(&self) -> bool {
        self.backend.local_mode()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crate::snapshot::keys;
    use crate::store::MemoryBackend;

    use super::*;

    fn snapshot(version: u64, remote_tag: &str) -> DialogSnapshot {
        let mut metadata = BTreeMap::new();
        metadata.insert(keys::REMOTE_TAG.to_string(), remote_tag.to_string());
        metadata.insert(keys::VERSION.to_string(), version.to_string());
        DialogSnapshot {
            metadata,
            application_data: None,
            version,
        }
    }

    #[tokio::test]
    async fn test_version_monotonicity_out_of_order() {
        let store = ReplicationStore::new(MemoryBackend::clustered());
        // writes v2, v1, v3 in that order
        store.put_dialog("k", snapshot(2, "v2")).await.unwrap();
        store.put_dialog("k", snapshot(1, "v1")).await.unwrap();
        store.put_dialog("k", snapshot(3, "v3")).await.unwrap();

        let stored = store.get_dialog("k").await.unwrap().unwrap();
        assert_eq!(stored.version, 3);
        assert_eq!(stored.metadata_value(keys::REMOTE_TAG), Some("v3"));
    }

    #[tokio::test]
    async fn test_update_dialog_only_when_strictly_newer() {
        let store = ReplicationStore::new(MemoryBackend::clustered());
        store.put_dialog("k", snapshot(5, "X")).await.unwrap();

        assert!(store.update_dialog("k", 3).await.unwrap().is_some());
        assert!(store.update_dialog("k", 5).await.unwrap().is_none());
        assert!(store.update_dialog("k", 7).await.unwrap().is_none());
        assert!(store.update_dialog("missing", 0).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_evict_dialog_removes_entry() {
        let store = ReplicationStore::new(MemoryBackend::clustered());
        store.put_dialog("k", snapshot(1, "t")).await.unwrap();

        store.evict_dialog("k").await.unwrap();
        assert!(store.get_dialog("k").await.unwrap().is_none());
        // evicting an absent key is a no-op, not an error
        store.evict_dialog("k").await.unwrap();
    }

    #[tokio::test]
    async fn test_transaction_direction_partitioning() {
        let store = ReplicationStore::new(MemoryBackend::clustered());
        let snap = TransactionSnapshot {
            transport: crate::engine::Transport::Udp,
            peer_address: "10.0.0.1".parse().unwrap(),
            peer_port: 5060,
            local_port: 5060,
            branch_id: "b1".to_string(),
            direction: crate::transaction::TransactionDirection::Server,
            method: crate::protocol::Method::Invite,
            application_data: None,
        };
        store.put_server_transaction("B1", snap).await.unwrap();

        // case-normalized on lookup, partitioned by direction
        assert!(store.get_server_transaction("b1").await.unwrap().is_some());
        assert!(store.get_client_transaction("b1").await.unwrap().is_none());

        store.remove_server_transaction("b1").await.unwrap();
        assert!(store.get_server_transaction("b1").await.unwrap().is_none());
    }
}
