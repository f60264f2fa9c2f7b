//! Metadata service: the glue that wires the bitmap, name directory,
//! dataitem cache, permission engine, placement engine, and
//! allocator/transport clients into the region and dataitem lifecycle
//! operations exposed over the RPC surface.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;

use crate::allocator_client::AllocatorClient;
use crate::bitmap::RegionIdBitmap;
use crate::dataitem_cache::DataitemKvsCache;
use crate::descriptor::{derive_item_id, GlobalDescriptor};
use crate::error::{OpenFamError, Result};
use crate::kvs::{InMemoryKvs, InMemoryKvsStore, PersistentKvs};
use crate::name_directory::{
    decode, encode, DataItemMeta, Key, MemoryType, NameDirectory, PermissionLevel, RegionMeta,
};
use crate::permission::{self, Op};
use crate::placement::PlacementEngine;
use crate::transport::{MockTransport, RdmaTransportTrait};

pub struct MetadataServiceConfig {
    pub max_key_len: usize,
    pub region_id_capacity: u64,
    pub enable_region_spanning: bool,
    pub region_span_size_per_memoryserver: u64,
}

impl Default for MetadataServiceConfig {
    fn default() -> Self {
        Self {
            max_key_len: 255,
            region_id_capacity: 1 << 14,
            enable_region_spanning: true,
            region_span_size_per_memoryserver: 1 << 30,
        }
    }
}

pub struct CreateRegionParams {
    pub name: String,
    pub size: u64,
    pub perm: u32,
    pub uid: u32,
    pub gid: u32,
    pub interleave_enable: bool,
    pub interleave_size: u64,
    pub memory_type: MemoryType,
}

pub struct AllocateDataitemParams {
    pub region_id: u64,
    pub name: Option<String>,
    pub size: u64,
    pub perm: u32,
    pub uid: u32,
    pub gid: u32,
    pub dup: bool,
}

pub struct CopyParams {
    pub src_region_id: u64,
    pub dest_region_id: u64,
    pub size: u64,
    pub uid: u32,
    pub gid: u32,
}

/// Everything handed back by an allocation or permission-check call that
/// a client needs to populate its local [`crate::descriptor::Descriptor`]
/// cache.
#[derive(Debug)]
pub struct ItemHandle {
    pub descriptor: GlobalDescriptor,
    pub size: u64,
    pub keys: Vec<u64>,
    pub bases: Vec<u64>,
}

pub struct MetadataService {
    kvs_store: Arc<InMemoryKvsStore>,
    bitmap: RegionIdBitmap,
    regions: NameDirectory<InMemoryKvs>,
    dataitem_cache: DataitemKvsCache,
    allocator: AllocatorClient,
    transports: DashMap<u64, Arc<dyn RdmaTransportTrait>>,
    placement: RwLock<PlacementEngine>,
    cas_locks: DashMap<(u64, u64), ()>,
    copy_tags: DashMap<u64, ()>,
    next_copy_tag: AtomicU64,
    max_key_len: usize,
}

impl MetadataService {
    pub fn new(
        config: MetadataServiceConfig,
        persistent_servers: Vec<u64>,
        volatile_servers: Vec<u64>,
    ) -> Self {
        let kvs_store = InMemoryKvsStore::new(config.max_key_len);
        let region_name_kvs = kvs_store.open(kvs_store.create()).unwrap();
        let region_id_kvs = kvs_store.open(kvs_store.create()).unwrap();

        let allocator = AllocatorClient::new();
        let transports = DashMap::new();
        for &id in persistent_servers.iter().chain(volatile_servers.iter()) {
            allocator.register_default(id);
            transports.insert(id, MockTransport::new(id, 1) as Arc<dyn RdmaTransportTrait>);
        }

        Self {
            dataitem_cache: DataitemKvsCache::new(kvs_store.clone()),
            kvs_store,
            bitmap: RegionIdBitmap::new(config.region_id_capacity),
            regions: NameDirectory::new(region_name_kvs, region_id_kvs),
            allocator,
            transports,
            placement: RwLock::new(PlacementEngine::new(
                persistent_servers,
                volatile_servers,
                config.enable_region_spanning,
                config.region_span_size_per_memoryserver,
            )),
            cas_locks: DashMap::new(),
            copy_tags: DashMap::new(),
            next_copy_tag: AtomicU64::new(1),
            max_key_len: config.max_key_len,
        }
    }

    pub fn max_key_len(&self) -> u64 {
        self.max_key_len as u64
    }

    fn register_keys(&self, server_id: u64, offset: u64, size: u64) -> (u64, u64) {
        match self.transports.get(&server_id).and_then(|t| t.register(offset, size).ok()) {
            Some(key) => (key.rkey, key.base_address),
            None => (0, offset),
        }
    }

    // ---- Region operations ----------------------------------------

    pub fn create_region(&self, req: CreateRegionParams) -> Result<GlobalDescriptor> {
        if req.name.len() > self.max_key_len {
            return Err(OpenFamError::RegionNameTooLong);
        }
        PlacementEngine::validate_interleave_size(req.interleave_size)?;

        let servers = self
            .placement
            .read()
            .place_region(&req.name, req.size, req.memory_type)?;
        let owning_server = servers[0];

        let local_id = self.bitmap.reserve()?;
        let region_id = GlobalDescriptor::encode(owning_server, local_id);
        let (dataitem_id_root, dataitem_name_root) = self.dataitem_cache.create_roots();

        let meta = RegionMeta {
            region_id,
            name: req.name,
            size: req.size,
            uid: req.uid,
            gid: req.gid,
            perm: req.perm,
            redundancy_level: 0,
            memory_type: req.memory_type,
            interleave_enable: req.interleave_enable,
            interleave_size: req.interleave_size,
            permission_level: PermissionLevel::Region,
            used_memserver_count: servers.len() as u32,
            mem_server_ids: servers,
            dataitem_id_root,
            dataitem_name_root,
            is_heap_created: true,
        };

        if let Err(e) = self.regions.insert(&meta) {
            self.bitmap.release(local_id);
            self.kvs_store.destroy(dataitem_id_root);
            self.kvs_store.destroy(dataitem_name_root);
            return Err(e);
        }

        Ok(GlobalDescriptor::region(region_id))
    }

    pub fn destroy_region(&self, region_id: u64, uid: u32, gid: u32) -> Result<()> {
        let region = self.find_region(region_id)?;
        if !permission::check(&region, Op::WRITE | Op::OWNER_ALLOW, uid, gid) {
            return Err(OpenFamError::NoPermission);
        }
        self.regions.delete(region_id, &region.name)?;
        self.dataitem_cache.destroy_region(&region);
        self.bitmap
            .release(GlobalDescriptor::region(region_id).local_region_id());
        Ok(())
    }

    pub fn resize_region(&self, region_id: u64, size: u64, uid: u32, gid: u32) -> Result<()> {
        let mut region = self.find_region(region_id)?;
        if !permission::check(&region, Op::WRITE, uid, gid) {
            return Err(OpenFamError::NoPermission);
        }
        region.size = size;
        self.regions.modify(region_id, &region)
    }

    pub fn change_region_permission(
        &self,
        region_id: u64,
        perm: u32,
        uid: u32,
        gid: u32,
    ) -> Result<()> {
        let mut region = self.find_region(region_id)?;
        if !permission::check(&region, Op::OWNER_ALLOW, uid, gid) {
            return Err(OpenFamError::NoPermission);
        }
        region.perm = perm;
        self.regions.modify(region_id, &region)
    }

    pub fn lookup_region(&self, name: &str, uid: u32, gid: u32) -> Result<(GlobalDescriptor, u64)> {
        let region = self
            .regions
            .find(Key::Name(name))?
            .ok_or(OpenFamError::RegionNotFound)?;
        if !permission::check(&region, Op::READ, uid, gid) {
            return Err(OpenFamError::NoPermission);
        }
        Ok((GlobalDescriptor::region(region.region_id), region.size))
    }

    pub fn check_permission_get_region_info(
        &self,
        region_id: u64,
        uid: u32,
        gid: u32,
    ) -> Result<ItemHandle> {
        let region = self.find_region(region_id)?;
        if !permission::check(&region, Op::READ, uid, gid) {
            return Err(OpenFamError::NoPermission);
        }
        Ok(ItemHandle {
            descriptor: GlobalDescriptor::region(region_id),
            size: region.size,
            keys: Vec::new(),
            bases: Vec::new(),
        })
    }

    fn find_region(&self, region_id: u64) -> Result<RegionMeta> {
        self.regions
            .find(Key::Id(region_id))?
            .ok_or(OpenFamError::RegionNotFound)
    }

    // ---- Dataitem operations ----------------------------------------

    pub fn allocate_dataitem(&self, req: AllocateDataitemParams) -> Result<ItemHandle> {
        let region = self.find_region(req.region_id)?;
        if !permission::check(&region, Op::WRITE, req.uid, req.gid) {
            return Err(OpenFamError::NoPermission);
        }
        if let Some(name) = &req.name {
            if name.len() > self.max_key_len {
                return Err(OpenFamError::DataitemNameTooLong);
            }
        }

        let handles = self.dataitem_cache.get(&region)?;

        if let Some(name) = &req.name {
            if !req.dup && handles.item_name_kvs.get(name.as_bytes())?.is_some() {
                return Err(OpenFamError::DataitemExist);
            }
        }

        let servers = self.placement.read().place_dataitem(
            &region.mem_server_ids,
            region.interleave_enable,
            region.interleave_size,
            req.name.as_deref(),
        );

        let mut offsets = Vec::with_capacity(servers.len());
        for &server in &servers {
            match self.allocator.allocate_on(server, req.size) {
                Ok(offset) => offsets.push(offset),
                Err(e) => {
                    for (&s, &o) in servers.iter().zip(offsets.iter()) {
                        self.allocator.deallocate_on(s, o, req.size);
                    }
                    return Err(e);
                }
            }
        }

        let item_id = derive_item_id(&offsets);
        let meta = DataItemMeta {
            region_id: req.region_id,
            item_id,
            offsets: offsets.clone(),
            name: req.name.clone(),
            size: req.size,
            uid: req.uid,
            gid: req.gid,
            perm: req.perm,
            interleave_size: region.interleave_size,
            permission_level: region.permission_level,
            used_memserver_count: servers.len() as u32,
            memory_server_ids: servers.clone(),
        };

        let id_key = item_id.to_string();
        handles.item_id_kvs.put(id_key.as_bytes(), encode(&meta)?)?;
        if let Some(name) = &req.name {
            if let Err(e) = handles
                .item_name_kvs
                .put(name.as_bytes(), id_key.clone().into_bytes())
            {
                let _ = handles.item_id_kvs.del(id_key.as_bytes());
                return Err(e);
            }
        }

        let mut keys = Vec::new();
        let mut bases = Vec::new();
        for (&server, &offset) in servers.iter().zip(offsets.iter()) {
            let (rkey, base) = self.register_keys(server, offset, req.size);
            keys.push(rkey);
            bases.push(base);
        }

        Ok(ItemHandle {
            descriptor: GlobalDescriptor::dataitem(req.region_id, offsets[0]),
            size: req.size,
            keys,
            bases,
        })
    }

    fn find_dataitem(
        &self,
        region: &RegionMeta,
        offset: u64,
    ) -> Result<(DataItemMeta, crate::dataitem_cache::DataitemKvsHandles)> {
        let handles = self.dataitem_cache.get(region)?;
        let item_id = derive_item_id(&[offset]);
        let id_key = item_id.to_string();
        let bytes = handles
            .item_id_kvs
            .get(id_key.as_bytes())?
            .ok_or(OpenFamError::DataitemNotFound)?;
        Ok((decode(&bytes)?, handles))
    }

    fn dataitem_write_authorized(region: &RegionMeta, item: &DataItemMeta, uid: u32, gid: u32) -> bool {
        match region.permission_level {
            PermissionLevel::Region => permission::check(region, Op::WRITE | Op::OWNER_ALLOW, uid, gid),
            PermissionLevel::DataItem => permission::check(item, Op::WRITE | Op::OWNER_ALLOW, uid, gid),
        }
    }

    fn dataitem_read_authorized(region: &RegionMeta, item: &DataItemMeta, uid: u32, gid: u32) -> bool {
        match region.permission_level {
            PermissionLevel::Region => permission::check(region, Op::READ, uid, gid),
            PermissionLevel::DataItem => permission::check(item, Op::READ, uid, gid),
        }
    }

    pub fn deallocate_dataitem(&self, region_id: u64, offset: u64, uid: u32, gid: u32) -> Result<()> {
        let region = self.find_region(region_id)?;
        let (item, handles) = self.find_dataitem(&region, offset)?;
        if !Self::dataitem_write_authorized(&region, &item, uid, gid) {
            return Err(OpenFamError::NoPermission);
        }

        let id_key = item.item_id.to_string();
        handles.item_id_kvs.del(id_key.as_bytes())?;
        if let Some(name) = &item.name {
            handles.item_name_kvs.del(name.as_bytes())?;
        }
        for (&server, &off) in item.memory_server_ids.iter().zip(item.offsets.iter()) {
            self.allocator.deallocate_on(server, off, item.size);
        }
        Ok(())
    }

    pub fn change_dataitem_permission(
        &self,
        region_id: u64,
        offset: u64,
        perm: u32,
        uid: u32,
        gid: u32,
    ) -> Result<()> {
        let region = self.find_region(region_id)?;
        let (mut item, handles) = self.find_dataitem(&region, offset)?;
        if !permission::check(&item, Op::OWNER_ALLOW, uid, gid) {
            return Err(OpenFamError::NoPermission);
        }
        item.perm = perm;
        let id_key = item.item_id.to_string();
        handles.item_id_kvs.put(id_key.as_bytes(), encode(&item)?)
    }

    pub fn lookup_dataitem(
        &self,
        item_name: &str,
        region_name: &str,
        uid: u32,
        gid: u32,
    ) -> Result<ItemHandle> {
        let region = self
            .regions
            .find(Key::Name(region_name))?
            .ok_or(OpenFamError::RegionNotFound)?;
        let handles = self.dataitem_cache.get(&region)?;
        let id_bytes = handles
            .item_name_kvs
            .get(item_name.as_bytes())?
            .ok_or(OpenFamError::DataitemNotFound)?;
        let bytes = handles
            .item_id_kvs
            .get(&id_bytes)?
            .ok_or(OpenFamError::DataitemNotFound)?;
        let item: DataItemMeta = decode(&bytes)?;
        if !Self::dataitem_read_authorized(&region, &item, uid, gid) {
            return Err(OpenFamError::NoPermission);
        }
        Ok(ItemHandle {
            descriptor: GlobalDescriptor::dataitem(region.region_id, item.offsets[0]),
            size: item.size,
            keys: Vec::new(),
            bases: Vec::new(),
        })
    }

    pub fn check_permission_get_item_info(
        &self,
        region_id: u64,
        offset: u64,
        uid: u32,
        gid: u32,
    ) -> Result<ItemHandle> {
        let region = self.find_region(region_id)?;
        let (item, _handles) = self.find_dataitem(&region, offset)?;
        if !Self::dataitem_read_authorized(&region, &item, uid, gid) {
            return Err(OpenFamError::NoPermission);
        }
        let mut keys = Vec::new();
        let mut bases = Vec::new();
        for (&server, &off) in item.memory_server_ids.iter().zip(item.offsets.iter()) {
            let (rkey, base) = self.register_keys(server, off, item.size);
            keys.push(rkey);
            bases.push(base);
        }
        Ok(ItemHandle {
            descriptor: GlobalDescriptor::dataitem(region_id, item.offsets[0]),
            size: item.size,
            keys,
            bases,
        })
    }

    // ---- Shared operations --------------------------------------------

    /// Advisory CAS lock, keyed by `(region_id, offset)`. Held entirely in
    /// process memory; see the design notes on why this does not survive
    /// a metadata-server restart.
    pub fn acquire_cas_lock(&self, region_id: u64, offset: u64) -> Result<()> {
        match self.cas_locks.entry((region_id, offset)) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(OpenFamError::MetadataError("cas lock already held".into()))
            }
            dashmap::mapref::entry::Entry::Vacant(e) => {
                e.insert(());
                Ok(())
            }
        }
    }

    pub fn release_cas_lock(&self, region_id: u64, offset: u64) -> Result<()> {
        self.cas_locks
            .remove(&(region_id, offset))
            .map(|_| ())
            .ok_or_else(|| OpenFamError::MetadataError("cas lock not held".into()))
    }

    /// Data movement itself is out of scope for the control plane; `copy`
    /// validates permissions and mints a tag, `wait_for_copy` confirms it.
    /// A real memory server performs the transfer between the two calls.
    pub fn copy(&self, req: CopyParams) -> Result<(u64, u64)> {
        let src = self.find_region(req.src_region_id)?;
        if !permission::check(&src, Op::READ, req.uid, req.gid) {
            return Err(OpenFamError::NoPermission);
        }
        let dest = self.find_region(req.dest_region_id)?;
        if !permission::check(&dest, Op::WRITE, req.uid, req.gid) {
            return Err(OpenFamError::NoPermission);
        }

        let tag = self.next_copy_tag.fetch_add(1, Ordering::Relaxed);
        self.copy_tags.insert(tag, ());
        Ok((tag, GlobalDescriptor::region(dest.region_id).memserver_id()))
    }

    pub fn wait_for_copy(&self, tag: u64) -> Result<()> {
        self.copy_tags
            .remove(&tag)
            .map(|_| ())
            .ok_or_else(|| OpenFamError::MetadataError(format!("unknown copy tag {tag}")))
    }

    pub fn update_memoryserver(&self, persistent_list: Vec<u64>, volatile_list: Vec<u64>) {
        for &id in persistent_list.iter().chain(volatile_list.iter()) {
            if !self.allocator.is_registered(id) {
                self.allocator.register_default(id);
            }
            self.transports
                .entry(id)
                .or_insert_with(|| MockTransport::new(id, 1) as Arc<dyn RdmaTransportTrait>);
        }
        let mut placement = self.placement.write();
        let (spanning, span_size) = (
            placement.enable_region_spanning,
            placement.region_span_size_per_memoryserver,
        );
        *placement = PlacementEngine::new(persistent_list, volatile_list, spanning, span_size);
    }

    pub fn reset_bitmap(&self, region_id: u64) {
        self.bitmap
            .release(GlobalDescriptor::region(region_id).local_region_id());
    }

    pub fn signal_start(&self) -> Vec<Vec<u8>> {
        self.transports
            .iter()
            .flat_map(|entry| entry.value().domain_addresses())
            .map(|addr| addr.0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> MetadataService {
        MetadataService::new(MetadataServiceConfig::default(), vec![1, 2, 3], vec![4, 5])
    }

    fn create(svc: &MetadataService, name: &str) -> GlobalDescriptor {
        svc.create_region(CreateRegionParams {
            name: name.into(),
            size: 4096,
            perm: 0o755,
            uid: 100,
            gid: 100,
            interleave_enable: false,
            interleave_size: 0,
            memory_type: MemoryType::Volatile,
        })
        .unwrap()
    }

    #[test]
    fn create_then_lookup_region_round_trips() {
        let svc = service();
        let descriptor = create(&svc, "r1");
        let (found, size) = svc.lookup_region("r1", 100, 100).unwrap();
        assert_eq!(found, descriptor);
        assert_eq!(size, 4096);
    }

    #[test]
    fn lookup_region_denies_non_owner_without_other_bits() {
        let svc = service();
        create(&svc, "r1");
        // perm 0o755 grants other-read, so a stranger can still look it up...
        assert!(svc.lookup_region("r1", 1, 1).is_ok());

        let svc = service();
        svc.create_region(CreateRegionParams {
            name: "private".into(),
            size: 4096,
            perm: 0o700,
            uid: 100,
            gid: 100,
            interleave_enable: false,
            interleave_size: 0,
            memory_type: MemoryType::Volatile,
        })
        .unwrap();
        assert!(matches!(
            svc.lookup_region("private", 1, 1).unwrap_err(),
            OpenFamError::NoPermission
        ));
    }

    #[test]
    fn destroy_region_releases_bitmap_slot_and_cache() {
        let svc = service();
        let descriptor = create(&svc, "r1");
        svc.destroy_region(descriptor.region_id, 100, 100).unwrap();
        assert!(matches!(
            svc.lookup_region("r1", 100, 100).unwrap_err(),
            OpenFamError::RegionNotFound
        ));
        assert!(!svc
            .bitmap
            .is_reserved(descriptor.local_region_id()));
    }

    #[test]
    fn resize_region_requires_write_permission() {
        let svc = service();
        let descriptor = create(&svc, "r1");
        svc.resize_region(descriptor.region_id, 8192, 100, 100).unwrap();
        let (_, size) = svc.lookup_region("r1", 100, 100).unwrap();
        assert_eq!(size, 8192);

        assert!(matches!(
            svc.resize_region(descriptor.region_id, 1, 1, 1).unwrap_err(),
            OpenFamError::NoPermission
        ));
    }

    #[test]
    fn change_region_permission_requires_owner_allow() {
        let svc = service();
        let descriptor = create(&svc, "r1");
        assert!(matches!(
            svc.change_region_permission(descriptor.region_id, 0o777, 1, 1).unwrap_err(),
            OpenFamError::NoPermission
        ));
        svc.change_region_permission(descriptor.region_id, 0o777, 100, 100)
            .unwrap();
    }

    #[test]
    fn allocate_then_lookup_dataitem_round_trips() {
        let svc = service();
        let region = create(&svc, "r1");
        let handle = svc
            .allocate_dataitem(AllocateDataitemParams {
                region_id: region.region_id,
                name: Some("item1".into()),
                size: 64,
                perm: 0o600,
                uid: 100,
                gid: 100,
                dup: false,
            })
            .unwrap();

        let found = svc.lookup_dataitem("item1", "r1", 100, 100).unwrap();
        assert_eq!(found.descriptor, handle.descriptor);
        assert_eq!(found.size, 64);
    }

    #[test]
    fn duplicate_dataitem_name_rejected_without_dup_flag() {
        let svc = service();
        let region = create(&svc, "r1");
        let params = |dup: bool| AllocateDataitemParams {
            region_id: region.region_id,
            name: Some("item1".into()),
            size: 64,
            perm: 0o600,
            uid: 100,
            gid: 100,
            dup,
        };
        svc.allocate_dataitem(params(false)).unwrap();
        assert!(matches!(
            svc.allocate_dataitem(params(false)).unwrap_err(),
            OpenFamError::DataitemExist
        ));
        // dup=true bypasses the uniqueness check but the name key is
        // shared, so the second allocation's record simply overwrites it.
        assert!(svc.allocate_dataitem(params(true)).is_ok());
    }

    #[test]
    fn deallocate_dataitem_frees_heap_space_for_reuse() {
        let svc = service();
        let region = create(&svc, "r1");
        let handle = svc
            .allocate_dataitem(AllocateDataitemParams {
                region_id: region.region_id,
                name: None,
                size: 128,
                perm: 0o600,
                uid: 100,
                gid: 100,
                dup: false,
            })
            .unwrap();

        svc.deallocate_dataitem(region.region_id, handle.descriptor.offset, 100, 100)
            .unwrap();
        assert!(matches!(
            svc.deallocate_dataitem(region.region_id, handle.descriptor.offset, 100, 100)
                .unwrap_err(),
            OpenFamError::DataitemNotFound
        ));
    }

    #[test]
    fn cas_lock_is_exclusive_and_releasable() {
        let svc = service();
        svc.acquire_cas_lock(21, 0).unwrap();
        assert!(svc.acquire_cas_lock(21, 0).is_err());
        svc.release_cas_lock(21, 0).unwrap();
        assert!(svc.acquire_cas_lock(21, 0).is_ok());
    }

    #[test]
    fn copy_and_wait_for_copy_round_trip() {
        let svc = service();
        let src = create(&svc, "src");
        let dest = create(&svc, "dest");
        let (tag, _owner) = svc
            .copy(CopyParams {
                src_region_id: src.region_id,
                dest_region_id: dest.region_id,
                size: 64,
                uid: 100,
                gid: 100,
            })
            .unwrap();
        svc.wait_for_copy(tag).unwrap();
        assert!(svc.wait_for_copy(tag).is_err());
    }

    #[test]
    fn update_memoryserver_changes_future_placement() {
        let svc = service();
        svc.update_memoryserver(vec![9], vec![10]);
        let descriptor = create(&svc, "r1");
        assert_eq!(descriptor.memserver_id(), 9);
    }

    #[test]
    fn reset_bitmap_reclaims_a_leaked_region_id() {
        let svc = service();
        let descriptor = create(&svc, "r1");
        // Simulate a crash between bitmap reservation and directory
        // insert by resetting administratively without going through
        // destroy_region.
        svc.reset_bitmap(descriptor.region_id);
        assert!(!svc.bitmap.is_reserved(descriptor.local_region_id()));
    }
}
