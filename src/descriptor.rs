//! Global descriptors and the client-side descriptor/fabric-key cache.
//!
//! A [`GlobalDescriptor`] is the only globally meaningful identity in
//! OpenFAM: a `(regionId, offset)` pair, position-independent and freely
//! serializable. [`Descriptor`] wraps one with the per-PE cache that turns
//! it into an RDMA-ready handle without a metadata round-trip on every use.

use serde::{Deserialize, Serialize};

/// Bits of `regionId` reserved for the local region index. The remaining
/// high bits name the memory server that first owns the region.
pub const B_R: u32 = 14;
pub const B_S: u32 = 64 - B_R - 1;

/// Region ids below this are never handed out by the bitmap; a handful
/// are reserved for internal uses such as the shared metadata heap.
pub const RESERVED_REGION_ID_START: u64 = 21;

/// Minimum allocation granularity of the backing heap; `itemId` is
/// derived from it so that it is stable and collision-free per region.
pub const MIN_OBJ_SIZE: u64 = 128;

/// Hard ceiling on `interleaveSize` carried from the reference
/// implementation's `MAX_INTERLEAVE_SIZE`.
pub const MAX_INTERLEAVE_SIZE: u64 = 1 << 30;

/// `offset == SELF_OFFSET` means "the descriptor refers to the region
/// itself, not an item in it."
pub const SELF_OFFSET: u64 = u64::MAX;

/// Position-independent handle identifying a region or a dataitem inside
/// one. Opaque to applications, freely serializable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GlobalDescriptor {
    pub region_id: u64,
    pub offset: u64,
}

impl GlobalDescriptor {
    pub fn region(region_id: u64) -> Self {
        Self {
            region_id,
            offset: SELF_OFFSET,
        }
    }

    pub fn dataitem(region_id: u64, offset: u64) -> Self {
        Self { region_id, offset }
    }

    pub fn is_region_self(&self) -> bool {
        self.offset == SELF_OFFSET
    }

    /// The memory server that first owns this region, derived from the
    /// high `B_S` bits of `regionId`.
    pub fn memserver_id(&self) -> u64 {
        self.region_id >> B_R
    }

    /// The region's id local to its owning memory server (low `B_R` bits).
    pub fn local_region_id(&self) -> u64 {
        self.region_id & ((1u64 << B_R) - 1)
    }

    pub fn encode(memserver_id: u64, local_region_id: u64) -> u64 {
        (memserver_id << B_R) | (local_region_id & ((1u64 << B_R) - 1))
    }
}

/// `itemId = floor(min(offsets) / MIN_OBJ_SIZE)`.
pub fn derive_item_id(offsets: &[u64]) -> u64 {
    offsets.iter().copied().min().unwrap_or(0) / MIN_OBJ_SIZE
}

/// Monotone lifecycle of a client-side descriptor cache entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DescriptorStatus {
    Uninitialized,
    Initialized,
    InitializedNoKey,
    Invalid,
}

/// Mirrors enough server-side state to avoid a metadata round-trip on
/// every data-plane operation. One per PE, per descriptor; not made
/// `Send`/`Sync` across threads by this crate: single-owner, per-PE,
/// per-thread is the typical usage.
#[derive(Clone, Debug)]
pub struct Descriptor {
    pub global: GlobalDescriptor,
    pub status: DescriptorStatus,
    pub keys: Vec<u64>,
    pub base_addresses: Vec<u64>,
    pub size: u64,
    pub perm: u32,
    pub name: Option<String>,
    pub memserver_ids: Vec<u64>,
    pub used_memserver_count: u32,
    pub interleave_size: u64,
    pub permission_level: crate::name_directory::PermissionLevel,
}

impl Descriptor {
    pub fn uninitialized(global: GlobalDescriptor) -> Self {
        Self {
            global,
            status: DescriptorStatus::Uninitialized,
            keys: Vec::new(),
            base_addresses: Vec::new(),
            size: 0,
            perm: 0,
            name: None,
            memserver_ids: Vec::new(),
            used_memserver_count: 0,
            interleave_size: 0,
            permission_level: crate::name_directory::PermissionLevel::Region,
        }
    }

    /// Populate the cache from a fresh `check_permission_get_*_info` reply.
    pub fn initialize(&mut self, info: DescriptorInfo) {
        self.keys = info.keys;
        self.base_addresses = info.base_addresses;
        self.size = info.size;
        self.perm = info.perm;
        self.name = info.name;
        self.memserver_ids = info.memserver_ids;
        self.used_memserver_count = info.used_memserver_count;
        self.interleave_size = info.interleave_size;
        self.permission_level = info.permission_level;
        self.status = if self.keys.is_empty() {
            DescriptorStatus::InitializedNoKey
        } else {
            DescriptorStatus::Initialized
        };
    }

    /// Permission change or deallocation on the owning server invalidates
    /// the cache; the next data-plane op must retrigger the metadata
    /// round-trip.
    pub fn invalidate(&mut self) {
        self.status = DescriptorStatus::Invalid;
        self.keys.clear();
        self.base_addresses.clear();
    }

    pub fn is_usable(&self) -> bool {
        matches!(
            self.status,
            DescriptorStatus::Initialized | DescriptorStatus::InitializedNoKey
        )
    }
}

/// Payload of a `check_permission_get_region_info` /
/// `check_permission_get_item_info` response, used to (re)populate a
/// [`Descriptor`]'s cache.
#[derive(Clone, Debug, Default)]
pub struct DescriptorInfo {
    pub keys: Vec<u64>,
    pub base_addresses: Vec<u64>,
    pub size: u64,
    pub perm: u32,
    pub name: Option<String>,
    pub memserver_ids: Vec<u64>,
    pub used_memserver_count: u32,
    pub interleave_size: u64,
    pub permission_level: crate::name_directory::PermissionLevel,
}
