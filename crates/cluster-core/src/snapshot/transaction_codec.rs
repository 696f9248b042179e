//! Transaction snapshot codec
//!
//! The decode direction must re-open a message channel using the locally
//! available message processor matching the stored transport; the socket the
//! transaction originally lived on belongs to a node that may no longer
//! exist.

use tracing::debug;

use crate::engine::LocalEndpoints;
use crate::errors::{ReconstructionError, ReconstructionResult};
use crate::transaction::Transaction;

use super::TransactionSnapshot;

/// Pull the replicable fields off a live transaction.
pub fn to_snapshot(transaction: &Transaction) -> TransactionSnapshot {
    TransactionSnapshot {
        transport: transaction.transport,
        peer_address: transaction.peer_address,
        peer_port: transaction.peer_port,
        local_port: transaction.local_port,
        branch_id: transaction.branch_id.clone(),
        direction: transaction.direction,
        method: transaction.method.clone(),
        application_data: transaction.application_data.clone(),
    }
}

/// Reconstruct a live transaction on a channel of the local node.
pub fn from_snapshot(
    snapshot: &TransactionSnapshot,
    endpoints: &dyn LocalEndpoints,
) -> ReconstructionResult<Transaction> {
    let channel = endpoints
        .channel_for(snapshot.transport)
        .ok_or(ReconstructionError::NoLocalEndpoint(snapshot.transport))?;
    debug!(
        branch = %snapshot.branch_id,
        transport = %snapshot.transport,
        local_addr = %channel.local_addr,
        "reconstructed transaction from snapshot"
    );
    Ok(Transaction::from_snapshot(snapshot, channel))
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use crate::engine::{MessageChannel, Transport};
    use crate::protocol::Method;
    use crate::transaction::TransactionDirection;

    use super::*;

    struct UdpOnly;

    impl LocalEndpoints for UdpOnly {
        fn channel_for(&self, transport: Transport) -> Option<MessageChannel> {
            (transport == Transport::Udp).then(|| MessageChannel {
                transport,
                local_addr: "192.0.2.10:5080".parse::<SocketAddr>().unwrap(),
            })
        }
    }

    fn sample(transport: Transport) -> TransactionSnapshot {
        TransactionSnapshot {
            transport,
            peer_address: "10.0.0.7".parse().unwrap(),
            peer_port: 5060,
            local_port: 5060,
            branch_id: "z9hG4bK-XYZ".to_string(),
            direction: TransactionDirection::Client,
            method: Method::Invite,
            application_data: None,
        }
    }

    #[test]
    fn test_round_trip_rebinds_channel() {
        let rebuilt = from_snapshot(&sample(Transport::Udp), &UdpOnly).unwrap();
        assert_eq!(rebuilt.branch_id, "z9hg4bk-xyz");
        assert_eq!(rebuilt.method, Method::Invite);
        // local port follows the surviving node's listening point
        assert_eq!(rebuilt.local_port, 5080);
        assert!(rebuilt.channel.is_some());

        let again = to_snapshot(&rebuilt);
        assert_eq!(again.branch_id, "z9hg4bk-xyz");
        assert_eq!(again.peer_port, 5060);
    }

    #[test]
    fn test_unavailable_transport_fails() {
        let err = from_snapshot(&sample(Transport::Tls), &UdpOnly).unwrap_err();
        assert!(matches!(err, ReconstructionError::NoLocalEndpoint(Transport::Tls)));
    }
}
