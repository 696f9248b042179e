//! Transaction model for the replication core
//!
//! Client and server transactions never collide on branch id but are stored
//! separately; ids are case-normalized (lower-cased) on every lookup path so
//! that replicas written by different nodes always agree on the key.

use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::engine::{MessageChannel, Transport};
use crate::protocol::Method;
use crate::snapshot::TransactionSnapshot;

/// Shared handle so concurrent recreation winners are reference-comparable.
pub type SharedTransaction = Arc<RwLock<Transaction>>;

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionDirection {
    Client,
    Server,
}

impl fmt::Display for TransactionDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionDirection::Client => write!(f, "client"),
            TransactionDirection::Server => write!(f, "server"),
        }
    }
}

/// Case-normalized transaction key: lower-cased branch id plus direction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionKey {
    pub branch: String,
    pub direction: TransactionDirection,
}

impl TransactionKey {
    pub fn new(id: &str, direction: TransactionDirection) -> Self {
        Self {
            branch: id.to_ascii_lowercase(),
            direction,
        }
    }

    pub fn client(id: &str) -> Self {
        Self::new(id, TransactionDirection::Client)
    }

    pub fn server(id: &str) -> Self {
        Self::new(id, TransactionDirection::Server)
    }
}

impl fmt::Display for TransactionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.branch, self.direction)
    }
}

/// A replicated SIP transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    /// Lower-cased branch id
    pub branch_id: String,

    /// Client or server side
    pub direction: TransactionDirection,

    /// Request method that created the transaction
    pub method: Method,

    /// Transport in use
    pub transport: Transport,

    /// Peer address
    pub peer_address: IpAddr,

    /// Peer port
    pub peer_port: u16,

    /// Local port the transaction was bound to on the original node
    pub local_port: u16,

    /// Opaque application data
    pub application_data: Option<Bytes>,

    /// Local message channel; never replicated, rebound on reconstruction
    #[serde(skip)]
    pub channel: Option<MessageChannel>,
}

impl Transaction {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        branch_id: &str,
        direction: TransactionDirection,
        method: Method,
        transport: Transport,
        peer_address: IpAddr,
        peer_port: u16,
        local_port: u16,
        application_data: Option<Bytes>,
    ) -> Self {
        Self {
            branch_id: branch_id.to_ascii_lowercase(),
            direction,
            method,
            transport,
            peer_address,
            peer_port,
            local_port,
            application_data,
            channel: None,
        }
    }

    /// Rebuild from a stored snapshot, bound to a channel of the local node.
    pub fn from_snapshot(snapshot: &TransactionSnapshot, channel: MessageChannel) -> Self {
        Self {
            branch_id: snapshot.branch_id.to_ascii_lowercase(),
            direction: snapshot.direction,
            method: snapshot.method.clone(),
            transport: snapshot.transport,
            peer_address: snapshot.peer_address,
            peer_port: snapshot.peer_port,
            local_port: channel.local_addr.port(),
            application_data: snapshot.application_data.clone(),
            channel: Some(channel),
        }
    }

    pub fn into_shared(self) -> SharedTransaction {
        Arc::new(RwLock::new(self))
    }

    pub fn key(&self) -> TransactionKey {
        TransactionKey::new(&self.branch_id, self.direction)
    }

    pub fn is_invite(&self) -> bool {
        self.method == Method::Invite
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_case_normalized() {
        let key = TransactionKey::server("Z9hG4bK-ABC");
        assert_eq!(key.branch, "z9hg4bk-abc");
        assert_eq!(key, TransactionKey::server("z9hg4bk-abc"));
    }

    #[test]
    fn test_directions_do_not_collide() {
        assert_ne!(
            TransactionKey::client("z9hg4bk-abc"),
            TransactionKey::server("z9hg4bk-abc")
        );
    }
}
