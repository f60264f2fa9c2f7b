//! Data-plane transport boundary.
//!
//! Actual RDMA data movement between clients and memory servers is out
//! of scope for the control plane: this crate never issues a transfer.
//! What the metadata service *does* need is the fabric key and base
//! address a memory server hands back for a registered region, which is
//! what [`RdmaTransportTrait`] exposes here, a deliberately narrow slice
//! of a fuller transport trait, kept in the same mock-stands-in-for-
//! hardware shape as `MockTransport`.

use std::sync::Arc;

use crate::error::Result;

/// One NIC/domain's routable address on a memory server.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomainAddress(pub Vec<u8>);

/// Remote key plus base address for a registered memory region, handed
/// out by `check_permission_get_*_info` and cached in a [`crate::descriptor::Descriptor`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FabricKey {
    pub rkey: u64,
    pub base_address: u64,
}

/// Per-memory-server registration surface. A real implementation
/// registers the heap's backing memory with the fabric provider; the
/// mock hands out deterministic, collision-free keys so the metadata
/// service's descriptor-caching logic can be exercised without hardware.
pub trait RdmaTransportTrait: Send + Sync {
    fn domain_addresses(&self) -> Vec<DomainAddress>;
    fn register(&self, offset: u64, size: u64) -> Result<FabricKey>;
    fn deregister(&self, offset: u64);
}

pub struct MockTransport {
    node_id: u64,
    domain_addresses: Vec<DomainAddress>,
    next_rkey: std::sync::atomic::AtomicU64,
}

impl MockTransport {
    pub fn new(node_id: u64, num_domains: usize) -> Arc<Self> {
        let domain_addresses = (0..num_domains)
            .map(|i| DomainAddress(format!("mock://node{node_id}/domain{i}").into_bytes()))
            .collect();
        Arc::new(Self {
            node_id,
            domain_addresses,
            next_rkey: std::sync::atomic::AtomicU64::new(1),
        })
    }
}

impl RdmaTransportTrait for MockTransport {
    fn domain_addresses(&self) -> Vec<DomainAddress> {
        self.domain_addresses.clone()
    }

    fn register(&self, offset: u64, _size: u64) -> Result<FabricKey> {
        let rkey = self
            .next_rkey
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        tracing::debug!(node_id = self.node_id, offset, rkey, "mock region registered");
        Ok(FabricKey {
            rkey,
            base_address: offset,
        })
    }

    fn deregister(&self, offset: u64) {
        tracing::debug!(node_id = self.node_id, offset, "mock region deregistered");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_registrations_hand_out_distinct_keys() {
        let transport = MockTransport::new(1, 2);
        assert_eq!(transport.domain_addresses().len(), 2);
        let a = transport.register(0, 64).unwrap();
        let b = transport.register(64, 64).unwrap();
        assert_ne!(a.rkey, b.rkey);
    }
}
