//! Protocol-engine collaborator traits
//!
//! The replication core decorates an existing SIP protocol engine; it never
//! reimplements one. These traits are the narrow seams through which the
//! coordinator reaches back into the engine: termination side-effects,
//! retransmission timers, the local node's listening points, and transaction
//! recreation after failover. Production wiring injects the real engine;
//! tests inject doubles.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::transaction::{Transaction, TransactionKey};
use crate::errors::ReconstructionResult;
use crate::snapshot::TransactionSnapshot;

/// Transport a dialog or transaction is bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Transport {
    Udp,
    Tcp,
    Tls,
    Ws,
}

impl FromStr for Transport {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "udp" => Ok(Transport::Udp),
            "tcp" => Ok(Transport::Tcp),
            "tls" => Ok(Transport::Tls),
            "ws" | "wss" => Ok(Transport::Ws),
            other => Err(format!("unknown transport '{}'", other)),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Udp => write!(f, "udp"),
            Transport::Tcp => write!(f, "tcp"),
            Transport::Tls => write!(f, "tls"),
            Transport::Ws => write!(f, "ws"),
        }
    }
}

/// A handle onto one of the local node's listening points.
///
/// After failover the original node's sockets are gone; reconstruction
/// always binds resurrected objects to a channel of the surviving node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageChannel {
    pub transport: Transport,
    pub local_addr: SocketAddr,
}

/// Access to the local node's listening points / message processors.
pub trait LocalEndpoints: Send + Sync {
    /// Channel for the given transport, if the node listens on it.
    fn channel_for(&self, transport: Transport) -> Option<MessageChannel>;
}

/// Sink for the engine's normal termination side-effects.
///
/// Only *local* removals flow through this sink. Remote removals bypass it:
/// the deleting node already ran its own side-effects, and replaying them
/// here would double-fire application callbacks cluster-wide.
pub trait SessionEventSink: Send + Sync {
    fn on_dialog_terminated(&self, dialog_key: &str);
    fn on_transaction_terminated(&self, key: &TransactionKey);
}

/// Retransmission timer control for recreated client transactions.
pub trait TimerService: Send + Sync {
    fn arm_retransmission(&self, key: &TransactionKey);
}

/// Rebuilds a live transaction from its stored snapshot.
///
/// Required by the EarlyDialog strategy; the coordinator installs
/// [`DefaultTransactionRecreator`] when no explicit one is configured.
pub trait TransactionRecreator: Send + Sync {
    fn recreate(&self, snapshot: &TransactionSnapshot) -> ReconstructionResult<Transaction>;
}

/// Default recreator: re-opens a message channel from the local node's
/// listening points matching the stored transport.
pub struct DefaultTransactionRecreator {
    endpoints: Arc<dyn LocalEndpoints>,
}

impl DefaultTransactionRecreator {
    pub fn new(endpoints: Arc<dyn LocalEndpoints>) -> Self {
        Self { endpoints }
    }
}

impl TransactionRecreator for DefaultTransactionRecreator {
    fn recreate(&self, snapshot: &TransactionSnapshot) -> ReconstructionResult<Transaction> {
        debug!(branch = %snapshot.branch_id, "recreating transaction via local listening points");
        crate::snapshot::transaction_codec::from_snapshot(snapshot, self.endpoints.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_parse_round_trip() {
        for t in [Transport::Udp, Transport::Tcp, Transport::Tls, Transport::Ws] {
            assert_eq!(t.to_string().parse::<Transport>().unwrap(), t);
        }
        assert!("carrier-pigeon".parse::<Transport>().is_err());
    }
}
