//! In-process memory backend
//!
//! Backs local (non-replicated) mode and tests. The same DashMap tables a
//! clustered technology would keep remotely, kept in-process.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::errors::StorageResult;
use crate::snapshot::{DialogSnapshot, TransactionSnapshot};
use crate::transaction::TransactionKey;

use super::contract::KvBackend;

/// DashMap-backed raw backend.
#[derive(Default)]
pub struct MemoryBackend {
    dialogs: DashMap<String, DialogSnapshot>,
    transactions: DashMap<TransactionKey, TransactionSnapshot>,
    local_mode: bool,
}

impl MemoryBackend {
    /// A backend that behaves like a remote clustered store.
    pub fn clustered() -> Self {
        Self {
            dialogs: DashMap::new(),
            transactions: DashMap::new(),
            local_mode: false,
        }
    }

    /// A backend flagged local-only; the coordinator will skip remote work.
    pub fn local() -> Self {
        Self {
            dialogs: DashMap::new(),
            transactions: DashMap::new(),
            local_mode: true,
        }
    }

    pub fn dialog_count(&self) -> usize {
        self.dialogs.len()
    }

    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn load_dialog(&self, key: &str) -> StorageResult<Option<DialogSnapshot>> {
        Ok(self.dialogs.get(key).map(|e| e.value().clone()))
    }

    async fn store_dialog(&self, key: &str, snapshot: DialogSnapshot) -> StorageResult<()> {
        self.dialogs.insert(key.to_string(), snapshot);
        Ok(())
    }

    async fn delete_dialog(&self, key: &str) -> StorageResult<()> {
        self.dialogs.remove(key);
        Ok(())
    }

    async fn load_transaction(
        &self,
        key: &TransactionKey,
    ) -> StorageResult<Option<TransactionSnapshot>> {
        Ok(self.transactions.get(key).map(|e| e.value().clone()))
    }

    async fn store_transaction(
        &self,
        key: &TransactionKey,
        snapshot: TransactionSnapshot,
    ) -> StorageResult<()> {
        self.transactions.insert(key.clone(), snapshot);
        Ok(())
    }

    async fn delete_transaction(&self, key: &TransactionKey) -> StorageResult<()> {
        self.transactions.remove(key);
        Ok(())
    }

    fn local_mode(&self) -> bool {
        self.local_mode
    }
}
