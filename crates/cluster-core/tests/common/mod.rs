//! Test doubles for the engine collaborator traits.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use sipha_cluster_core::errors::{StorageError, StorageResult};
use sipha_cluster_core::protocol::Method;
use sipha_cluster_core::snapshot::{dialog_codec, transaction_codec, DialogSnapshot, TransactionSnapshot};
use sipha_cluster_core::{
    ClusterConfig, ClusterCoordinator, Collaborators, Dialog, DialogContext, KvBackend,
    LocalEndpoints, MemoryBackend, MessageChannel, ReplicatedStore, ReplicationStore,
    ReplicationStrategy, SessionEventSink, TimerService, Transaction, TransactionDirection,
    TransactionKey, Transport,
};

/// Records the engine termination side-effects the coordinator fires.
#[derive(Default)]
pub struct RecordingEvents {
    pub dialog_terminations: Mutex<Vec<String>>,
    pub transaction_terminations: Mutex<Vec<TransactionKey>>,
}

impl SessionEventSink for RecordingEvents {
    fn on_dialog_terminated(&self, dialog_key: &str) {
        self.dialog_terminations.lock().push(dialog_key.to_string());
    }

    fn on_transaction_terminated(&self, key: &TransactionKey) {
        self.transaction_terminations.lock().push(key.clone());
    }
}

/// Counts retransmission-timer armings.
#[derive(Default)]
pub struct CountingTimers(pub AtomicUsize);

impl TimerService for CountingTimers {
    fn arm_retransmission(&self, _key: &TransactionKey) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn arm_count(timers: &CountingTimers) -> usize {
    timers.0.load(Ordering::SeqCst)
}

/// Listening points on every transport.
pub struct AllTransports;

impl LocalEndpoints for AllTransports {
    fn channel_for(&self, transport: Transport) -> Option<MessageChannel> {
        Some(MessageChannel {
            transport,
            local_addr: "192.0.2.20:5060".parse::<SocketAddr>().unwrap(),
        })
    }
}

/// A backend whose every call fails, simulating a store outage.
pub struct FailingBackend;

#[async_trait]
impl KvBackend for FailingBackend {
    async fn load_dialog(&self, _key: &str) -> StorageResult<Option<DialogSnapshot>> {
        Err(StorageError::Unavailable("store down".into()))
    }
    async fn store_dialog(&self, _key: &str, _snapshot: DialogSnapshot) -> StorageResult<()> {
        Err(StorageError::Unavailable("store down".into()))
    }
    async fn delete_dialog(&self, _key: &str) -> StorageResult<()> {
        Err(StorageError::Unavailable("store down".into()))
    }
    async fn load_transaction(
        &self,
        _key: &TransactionKey,
    ) -> StorageResult<Option<TransactionSnapshot>> {
        Err(StorageError::Unavailable("store down".into()))
    }
    async fn store_transaction(
        &self,
        _key: &TransactionKey,
        _snapshot: TransactionSnapshot,
    ) -> StorageResult<()> {
        Err(StorageError::Unavailable("store down".into()))
    }
    async fn delete_transaction(&self, _key: &TransactionKey) -> StorageResult<()> {
        Err(StorageError::Unavailable("store down".into()))
    }
    fn local_mode(&self) -> bool {
        false
    }
}

pub struct Harness {
    pub coordinator: Arc<ClusterCoordinator>,
    pub events: Arc<RecordingEvents>,
    pub timers: Arc<CountingTimers>,
    pub store: Arc<dyn ReplicatedStore>,
}

/// Coordinator over an in-memory clustered store.
pub fn harness(strategy: ReplicationStrategy) -> Harness {
    harness_with_store(
        strategy,
        Arc::new(ReplicationStore::new(MemoryBackend::clustered())),
    )
}

pub fn harness_with_store(
    strategy: ReplicationStrategy,
    store: Arc<dyn ReplicatedStore>,
) -> Harness {
    let events = Arc::new(RecordingEvents::default());
    let timers = Arc::new(CountingTimers::default());
    let config = ClusterConfig::builder()
        .clustered(true)
        .node_id("node-1")
        .strategy(strategy)
        .build()
        .unwrap();
    let coordinator = ClusterCoordinator::new(
        config,
        Collaborators {
            store: store.clone(),
            endpoints: Arc::new(AllTransports),
            session_events: events.clone(),
            timers: timers.clone(),
            transaction_recreator: None,
        },
    )
    .unwrap();
    Harness {
        coordinator,
        events,
        timers,
        store,
    }
}

pub fn dialog_context(call_id: &str, local_tag: &str) -> DialogContext {
    DialogContext {
        call_id: call_id.to_string(),
        local_uri: "sip:alice@example.com".parse().unwrap(),
        remote_uri: "sip:bob@example.com".parse().unwrap(),
        local_tag: Some(local_tag.to_string()),
        remote_tag: None,
        remote_target: Some("sip:bob@10.0.0.2:5060".parse().unwrap()),
        route_set: vec!["sip:p1.example.com;lr".parse().unwrap()],
        transport: Some(Transport::Udp),
        is_initiator: true,
        application_data: Some(Bytes::from_static(b"session-state")),
    }
}

/// A confirmed dialog snapshot as another node would have stored it.
pub fn stored_dialog_snapshot(
    call_id: &str,
    local_tag: &str,
    remote_tag: &str,
    version: u64,
) -> DialogSnapshot {
    let mut dialog = Dialog::from_context(&dialog_context(call_id, local_tag), true);
    dialog.confirm(Some(remote_tag.to_string()), None, None);
    dialog.set_last_response(
        "SIP/2.0 200 OK\r\nCall-ID: cid\r\nContact: <sip:bob@10.0.0.2:5060>\r\n\r\n".to_string(),
    );
    dialog.version = version;
    dialog_codec::to_snapshot(&dialog)
}

pub fn live_transaction(branch: &str, direction: TransactionDirection, method: Method) -> Transaction {
    Transaction::new(
        branch,
        direction,
        method,
        Transport::Udp,
        "10.0.0.7".parse().unwrap(),
        5060,
        5060,
        None,
    )
}

pub fn stored_transaction_snapshot(
    branch: &str,
    direction: TransactionDirection,
    method: Method,
) -> TransactionSnapshot {
    transaction_codec::to_snapshot(&live_transaction(branch, direction, method))
}
