//! Allocator client: the metadata service's view of the per-memory-server
//! heaps it allocates dataitems from.
//!
//! The real system issues this as an RPC to a remote memory server's
//! allocator; this crate keeps the same routing shape (one client handle
//! per memory-server id, looked up from a descriptor's high bits) while
//! modeling each remote allocator in-process via [`HeapManager`], keyed by
//! a `u64` node id in a `DashMap`.

use std::sync::Arc;

use dashmap::DashMap;

use crate::descriptor::GlobalDescriptor;
use crate::error::{OpenFamError, Result};
use crate::heap::{BumpHeap, HeapManager};

/// Size of the default per-server heap handed out when a memory server is
/// registered without specifying one. Arbitrary but generous for tests.
const DEFAULT_HEAP_CAPACITY: u64 = 1 << 30;

pub struct AllocatorClient {
    heaps: DashMap<u64, Arc<dyn HeapManager>>,
}

impl AllocatorClient {
    pub fn new() -> Self {
        Self {
            heaps: DashMap::new(),
        }
    }

    /// Registers a memory server with a given heap implementation. Used by
    /// `update_memoryserver` to bring new servers into the allocatable pool.
    pub fn register_server(&self, server_id: u64, heap: Arc<dyn HeapManager>) {
        self.heaps.insert(server_id, heap);
    }

    /// Registers a memory server with a fresh mock heap of default
    /// capacity, for tests and the reference in-process deployment.
    /// Aligns allocations to `MIN_OBJ_SIZE` so `derive_item_id` can
    /// recover a dataitem's id from its primary offset alone.
    pub fn register_default(&self, server_id: u64) {
        self.register_server(
            server_id,
            Arc::new(BumpHeap::new(
                DEFAULT_HEAP_CAPACITY,
                crate::descriptor::MIN_OBJ_SIZE,
            )),
        );
    }

    pub fn deregister_server(&self, server_id: u64) {
        self.heaps.remove(&server_id);
    }

    fn stub_for(&self, server_id: u64) -> Result<Arc<dyn HeapManager>> {
        self.heaps
            .get(&server_id)
            .map(|entry| entry.clone())
            .ok_or(OpenFamError::RpcClientNotFound(server_id))
    }

    /// Routes to the owning memory server of `descriptor` (its high bits)
    /// and allocates `size` bytes on that server's heap.
    pub fn allocate_on(&self, server_id: u64, size: u64) -> Result<u64> {
        self.stub_for(server_id)?.allocate(size)
    }

    pub fn deallocate_on(&self, server_id: u64, offset: u64, size: u64) {
        if let Ok(stub) = self.stub_for(server_id) {
            stub.deallocate(offset, size);
        }
    }

    /// Convenience wrapper deriving the server id from a region-self
    /// descriptor, matching how region allocation addresses its owner.
    pub fn allocate_for_region(&self, region: GlobalDescriptor, size: u64) -> Result<u64> {
        self.allocate_on(region.memserver_id(), size)
    }

    pub fn is_registered(&self, server_id: u64) -> bool {
        self.heaps.contains_key(&server_id)
    }
}

impl Default for AllocatorClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_server_reports_rpc_client_not_found() {
        let client = AllocatorClient::new();
        let err = client.allocate_on(5, 64).unwrap_err();
        assert!(matches!(err, OpenFamError::RpcClientNotFound(5)));
    }

    #[test]
    fn registered_server_allocates_and_deallocates() {
        let client = AllocatorClient::new();
        client.register_default(5);
        let offset = client.allocate_on(5, 64).unwrap();
        client.deallocate_on(5, offset, 64);
        let reused = client.allocate_on(5, 64).unwrap();
        assert_eq!(offset, reused);
    }

    #[test]
    fn routes_region_allocation_by_descriptor_high_bits() {
        let client = AllocatorClient::new();
        let encoded = GlobalDescriptor::encode(7, 1);
        client.register_default(7);
        assert!(client
            .allocate_for_region(GlobalDescriptor::region(encoded), 128)
            .is_ok());
    }

    #[test]
    fn deregistering_makes_server_unreachable() {
        let client = AllocatorClient::new();
        client.register_default(1);
        client.deregister_server(1);
        assert!(!client.is_registered(1));
        assert!(client.allocate_on(1, 1).is_err());
    }
}
