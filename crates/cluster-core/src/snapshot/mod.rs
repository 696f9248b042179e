//! Snapshot codec
//!
//! Converts live dialogs and transactions to and from the flat, versioned
//! key-value form that travels through the distributed store. The encode
//! direction is a straightforward field pull; the decode direction must
//! produce objects able to send further protocol messages on a node that
//! never saw the original handshake.

pub mod dialog_codec;
pub mod transaction_codec;

use std::collections::BTreeMap;
use std::net::IpAddr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::engine::Transport;
use crate::protocol::Method;
use crate::transaction::TransactionDirection;

/// Metadata keys of a dialog snapshot.
pub mod keys {
    pub const LOCAL_TAG: &str = "local-tag";
    pub const REMOTE_TAG: &str = "remote-tag";
    pub const LOCAL_URI: &str = "local-uri";
    pub const REMOTE_URI: &str = "remote-uri";
    pub const REMOTE_TARGET: &str = "remote-target";
    pub const ROUTE_SET: &str = "route-set";
    pub const LAST_RESPONSE: &str = "last-response";
    pub const STATE: &str = "state";
    pub const VERSION: &str = "version";
    pub const TRANSPORT: &str = "transport";
    pub const IS_INITIATOR: &str = "is-initiator";
}

/// Flattened, versioned dialog state.
///
/// The version counter appears both top-level (the merge rule keys off it)
/// and inside the metadata (so a record is self-describing on the wire).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogSnapshot {
    pub metadata: BTreeMap<String, String>,
    pub application_data: Option<Bytes>,
    pub version: u64,
}

impl DialogSnapshot {
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// Flattened transaction state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionSnapshot {
    pub transport: Transport,
    pub peer_address: IpAddr,
    pub peer_port: u16,
    pub local_port: u16,
    pub branch_id: String,
    pub direction: TransactionDirection,
    pub method: Method,
    pub application_data: Option<Bytes>,
}
