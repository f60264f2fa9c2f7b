//! Dataitem KVS cache: a per-region pair of KVSs opened on demand and
//! cached behind a striped rwlock map, keyed by `regionId`.

use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;

use crate::error::Result;
use crate::kvs::{InMemoryKvs, InMemoryKvsStore, KvsHandle};
use crate::name_directory::RegionMeta;

struct CacheEntry {
    item_id_kvs: InMemoryKvs,
    item_name_kvs: InMemoryKvs,
}

/// A checked-out pair of per-region KVS handles. `InMemoryKvs` is a cheap
/// `Arc`-backed clone, so these remain valid even if the cache entry is
/// later evicted by `destroy_region` — by the time that happens the
/// directory no longer resolves the region, so no *new* checkout can
/// observe the destroyed entry.
pub struct DataitemKvsHandles {
    pub item_id_kvs: InMemoryKvs,
    pub item_name_kvs: InMemoryKvs,
}

pub struct DataitemKvsCache {
    store: Arc<InMemoryKvsStore>,
    entries: DashMap<u64, Arc<RwLock<CacheEntry>>>,
}

impl DataitemKvsCache {
    pub fn new(store: Arc<InMemoryKvsStore>) -> Self {
        Self {
            store,
            entries: DashMap::new(),
        }
    }

    /// Creates a brand-new pair of per-region KVS roots for a region that
    /// is about to be inserted. Used by `insert_region`, which owns heap
    /// creation and embeds the roots in the new `RegionMeta`.
    pub fn create_roots(&self) -> (KvsHandle, KvsHandle) {
        (self.store.create(), self.store.create())
    }

    /// Two-phase lookup:
    /// 1. Shared map lookup; if found, take a shared entry lock, clone
    ///    out the cheap KVS handles, and return.
    /// 2. Otherwise release the map lock, open both KVSs from the
    ///    region's stored roots, and race to insert under the map's
    ///    find-or-insert path; the loser drops its freshly-opened
    ///    handles and reuses the winner's entry.
    pub fn get(&self, region: &RegionMeta) -> Result<DataitemKvsHandles> {
        if let Some(entry) = self.entries.get(&region.region_id) {
            let guard = entry.read();
            return Ok(DataitemKvsHandles {
                item_id_kvs: guard.item_id_kvs.clone(),
                item_name_kvs: guard.item_name_kvs.clone(),
            });
        }

        let item_id_kvs = self.store.open(region.dataitem_id_root)?;
        let item_name_kvs = self.store.open(region.dataitem_name_root)?;
        let candidate = Arc::new(RwLock::new(CacheEntry {
            item_id_kvs: item_id_kvs.clone(),
            item_name_kvs: item_name_kvs.clone(),
        }));

        let entry = self
            .entries
            .entry(region.region_id)
            .or_insert(candidate)
            .clone();
        let guard = entry.read();
        Ok(DataitemKvsHandles {
            item_id_kvs: guard.item_id_kvs.clone(),
            item_name_kvs: guard.item_name_kvs.clone(),
        })
    }

    /// Removes the cache entry under the map's exclusive slot, closes the
    /// KVS handles under the entry's exclusive lock, then destroys the
    /// heap if the service created it. No new `get()` can observe a
    /// destroyed entry because the directory keys are already gone by
    /// the time this runs.
    pub fn destroy_region(&self, region: &RegionMeta) {
        if let Some((_, entry)) = self.entries.remove(&region.region_id) {
            let _write_guard = entry.write();
        }
        if region.is_heap_created {
            self.store.destroy(region.dataitem_id_root);
            self.store.destroy(region.dataitem_name_root);
        }
    }

    pub fn is_cached(&self, region_id: u64) -> bool {
        self.entries.contains_key(&region_id)
    }
}
