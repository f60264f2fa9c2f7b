//! Persistent KVS external contract.
//!
//! A real deployment backs this with a crash-consistent ordered map on a
//! persistent heap (NVMM). That allocator is out of scope here; this
//! module defines the trait the rest of the crate programs against and
//! ships an in-memory reference implementation, a "mock stands in for
//! unavailable hardware" shape also used by `MockTransport`.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::error::{OpenFamError, Result};

/// Opaque pointer to an opened KVS's root. Mintable by `create()`,
/// embeddable in other persistent metadata (e.g. `RegionMeta`), and
/// re-openable by `open()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KvsHandle(pub u64);

pub trait PersistentKvs: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()>;
    /// Returns `true` if the key existed and was removed.
    fn del(&self, key: &[u8]) -> Result<bool>;
    /// Atomically inserts `key -> value` iff absent. Returns `Ok(None)` on
    /// success, `Ok(Some(existing))` if the key was already present — the
    /// sole atomic primitive the metadata service relies on for uniqueness.
    fn find_or_create(&self, key: &[u8], value: Vec<u8>) -> Result<Option<Vec<u8>>>;
    fn max_key_len(&self) -> usize;
}

/// Process-wide store backing every [`KvsHandle`] opened against it. A
/// single store can host arbitrarily many logically-independent KVSs
/// (the two top-level directories plus one pair per region) — each KVS
/// is a view into the shared persistent heap, not a resource of its own.
pub struct InMemoryKvsStore {
    next_handle: AtomicU64,
    trees: DashMap<KvsHandle, Arc<DashMap<Vec<u8>, Vec<u8>>>>,
    max_key_len: usize,
}

impl InMemoryKvsStore {
    pub fn new(max_key_len: usize) -> Arc<Self> {
        Arc::new(Self {
            next_handle: AtomicU64::new(1),
            trees: DashMap::new(),
            max_key_len,
        })
    }

    /// Creates a brand new, empty KVS and returns its root pointer.
    pub fn create(self: &Arc<Self>) -> KvsHandle {
        let handle = KvsHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.trees.insert(handle, Arc::new(DashMap::new()));
        handle
    }

    /// Opens a previously-created KVS by its root pointer.
    pub fn open(self: &Arc<Self>, handle: KvsHandle) -> Result<InMemoryKvs> {
        let tree = self
            .trees
            .get(&handle)
            .ok_or_else(|| OpenFamError::MetadataError(format!("no such kvs root {:?}", handle)))?
            .clone();
        Ok(InMemoryKvs {
            tree,
            max_key_len: self.max_key_len,
        })
    }

    /// Destroys the KVS, freeing all entries. Mirrors the heap-destroy
    /// step in `destroy_region`: only ever called after both directory
    /// keys referencing it are already gone.
    pub fn destroy(self: &Arc<Self>, handle: KvsHandle) {
        self.trees.remove(&handle);
    }
}

/// Handle to one opened KVS tree.
#[derive(Clone)]
pub struct InMemoryKvs {
    tree: Arc<DashMap<Vec<u8>, Vec<u8>>>,
    max_key_len: usize,
}

impl PersistentKvs for InMemoryKvs {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.tree.get(key).map(|v| v.clone()))
    }

    fn put(&self, key: &[u8], value: Vec<u8>) -> Result<()> {
        self.tree.insert(key.to_vec(), value);
        Ok(())
    }

    fn del(&self, key: &[u8]) -> Result<bool> {
        Ok(self.tree.remove(key).is_some())
    }

    fn find_or_create(&self, key: &[u8], value: Vec<u8>) -> Result<Option<Vec<u8>>> {
        match self.tree.entry(key.to_vec()) {
            dashmap::mapref::entry::Entry::Occupied(e) => Ok(Some(e.get().clone())),
            dashmap::mapref::entry::Entry::Vacant(e) => {
                e.insert(value);
                Ok(None)
            }
        }
    }

    fn max_key_len(&self) -> usize {
        self.max_key_len
    }
}
