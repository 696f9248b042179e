//! Load balancer awareness
//!
//! The heartbeat / election subsystem is an external collaborator; the core
//! only exposes the currently preferred outbound balancer address and lets
//! interested parties register for membership changes.

use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

/// Notified whenever the preferred balancer changes.
pub trait BalancerListener: Send + Sync {
    fn balancer_changed(&self, address: Option<SocketAddr>);
}

/// Holds the preferred outbound balancer address and its listeners.
#[derive(Default)]
pub struct BalancerRegistry {
    current: RwLock<Option<SocketAddr>>,
    listeners: RwLock<Vec<Arc<dyn BalancerListener>>>,
}

impl BalancerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current preferred outbound balancer address, if any is elected.
    pub fn preferred_balancer(&self) -> Option<SocketAddr> {
        *self.current.read()
    }

    /// Record a new preferred balancer and notify listeners on change.
    pub fn set_preferred_balancer(&self, address: Option<SocketAddr>) {
        let changed = {
            let mut current = self.current.write();
            if *current == address {
                false
            } else {
                *current = address;
                true
            }
        };
        if !changed {
            return;
        }
        match address {
            Some(addr) => info!(balancer = %addr, "preferred balancer changed"),
            None => info!("preferred balancer cleared"),
        }
        let listeners = self.listeners.read().clone();
        for listener in listeners {
            listener.balancer_changed(address);
        }
    }

    pub fn register_listener(&self, listener: Arc<dyn BalancerListener>) {
        debug!("registering balancer listener");
        self.listeners.write().push(listener);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Counting(AtomicUsize);

    impl BalancerListener for Counting {
        fn balancer_changed(&self, _address: Option<SocketAddr>) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_listeners_fire_only_on_change() {
        let registry = BalancerRegistry::new();
        let listener = Arc::new(Counting(AtomicUsize::new(0)));
        registry.register_listener(listener.clone());

        let addr: SocketAddr = "10.1.1.1:5060".parse().unwrap();
        registry.set_preferred_balancer(Some(addr));
        registry.set_preferred_balancer(Some(addr)); // no change
        assert_eq!(listener.0.load(Ordering::SeqCst), 1);
        assert_eq!(registry.preferred_balancer(), Some(addr));

        registry.set_preferred_balancer(None);
        assert_eq!(listener.0.load(Ordering::SeqCst), 2);
        assert!(registry.preferred_balancer().is_none());
    }
}
