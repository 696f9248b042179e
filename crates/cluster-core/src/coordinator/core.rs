//! Coordinator construction and shared state

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use crate::balancer::BalancerRegistry;
use crate::config::ClusterConfig;
use crate::dialog::SharedDialog;
use crate::engine::{
    DefaultTransactionRecreator, LocalEndpoints, SessionEventSink, TimerService,
    TransactionRecreator,
};
use crate::errors::ConfigResult;
use crate::store::ReplicatedStore;
use crate::transaction::SharedTransaction;

/// Injected engine and cluster collaborators.
///
/// The coordinator composes these rather than subclassing the engine; every
/// seam is a narrow trait so tests can substitute doubles.
pub struct Collaborators {
    pub store: Arc<dyn ReplicatedStore>,
    pub endpoints: Arc<dyn LocalEndpoints>,
    pub session_events: Arc<dyn SessionEventSink>,
    pub timers: Arc<dyn TimerService>,
    /// Optional; the default recreator over the local endpoints is installed
    /// when absent. EarlyDialog replication is meaningless without one.
    pub transaction_recreator: Option<Arc<dyn TransactionRecreator>>,
}

/// The clustered stack coordinator.
pub struct ClusterCoordinator {
    pub(super) config: ClusterConfig,
    pub(super) store: Arc<dyn ReplicatedStore>,
    pub(super) session_events: Arc<dyn SessionEventSink>,
    pub(super) timers: Arc<dyn TimerService>,
    pub(super) endpoints: Arc<dyn LocalEndpoints>,
    pub(super) recreator: Arc<dyn TransactionRecreator>,
    balancer: BalancerRegistry,

    /// Confirmed dialogs by established key
    pub(super) dialogs: DashMap<String, SharedDialog>,

    /// Local-only table bridging the window before a final response
    pub(super) early_dialogs: DashMap<String, SharedDialog>,

    /// Server transactions by lower-cased branch id
    pub(super) server_transactions: DashMap<String, SharedTransaction>,

    /// Client transactions by lower-cased branch id
    pub(super) client_transactions: DashMap<String, SharedTransaction>,

    /// Pending ACK bookkeeping: server transaction id -> dialog key
    pub(super) pending_acks: DashMap<String, String>,

    /// Merge-table bookkeeping: merge id -> server transaction id
    pub(super) merge_table: DashMap<String, String>,
}

impl ClusterCoordinator {
    /// Build a coordinator. Configuration problems are fatal here and only
    /// here; nothing fails at request-handling time for config reasons.
    pub fn new(config: ClusterConfig, collaborators: Collaborators) -> ConfigResult<Arc<Self>> {
        config.validate()?;

        let recreator: Arc<dyn TransactionRecreator> = match collaborators.transaction_recreator {
            Some(recreator) => recreator,
            None => {
                if config.strategy.replicates_transactions() {
                    info!(
                        strategy = %config.strategy,
                        "no transaction recreator configured; installing default over local endpoints"
                    );
                }
                Arc::new(DefaultTransactionRecreator::new(
                    collaborators.endpoints.clone(),
                ))
            }
        };

        info!(
            node_id = %config.node_id,
            strategy = %config.strategy,
            clustered = config.clustered,
            "cluster coordinator initialized"
        );

        Ok(Arc::new(Self {
            config,
            store: collaborators.store,
            session_events: collaborators.session_events,
            timers: collaborators.timers,
            endpoints: collaborators.endpoints,
            recreator,
            balancer: BalancerRegistry::new(),
            dialogs: DashMap::new(),
            early_dialogs: DashMap::new(),
            server_transactions: DashMap::new(),
            client_transactions: DashMap::new(),
            pending_acks: DashMap::new(),
            merge_table: DashMap::new(),
        }))
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Load-balancer awareness surface; election is external.
    pub fn balancer(&self) -> &BalancerRegistry {
        &self.balancer
    }

    /// True when distributed-store work applies at all.
    pub(super) fn remote_enabled(&self) -> bool {
        self.config.clustered && !self.store.in_local_mode()
    }

    /// Record that a server transaction still owes an ACK on a dialog.
    pub fn register_pending_ack(&self, server_transaction_id: &str, dialog_key: &str) {
        self.pending_acks.insert(
            server_transaction_id.to_ascii_lowercase(),
            dialog_key.to_string(),
        );
    }

    /// Record a merge-table entry tied to a server transaction.
    pub fn register_merge_entry(&self, merge_id: &str, server_transaction_id: &str) {
        self.merge_table.insert(
            merge_id.to_string(),
            server_transaction_id.to_ascii_lowercase(),
        );
    }

    pub fn local_dialog_count(&self) -> usize {
        self.dialogs.len()
    }

    pub fn early_dialog_count(&self) -> usize {
        self.early_dialogs.len()
    }

    pub fn has_pending_ack(&self, server_transaction_id: &str) -> bool {
        self.pending_acks
            .contains_key(&server_transaction_id.to_ascii_lowercase())
    }

    /// Drop all local state. Used on shutdown; fires no events.
    pub fn clear_local_tables(&self) {
        debug!("clearing local replication tables");
        self.dialogs.clear();
        self.early_dialogs.clear();
        self.server_transactions.clear();
        self.client_transactions.clear();
        self.pending_acks.clear();
        self.merge_table.clear();
    }
}
