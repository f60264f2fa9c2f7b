//! Name directory: the two always-open top-level KVSs, `name -> regionId`
//! and `regionId -> RegionMeta`, plus the `RegionMeta` and `DataItemMeta`
//! record types.

use serde::{Deserialize, Serialize};

use crate::error::{OpenFamError, Result};
use crate::kvs::{KvsHandle, PersistentKvs};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemoryType {
    Volatile,
    Persistent,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionLevel {
    /// Individual dataitem permissions are checked.
    DataItem,
    /// The region's permission is authoritative for all its items.
    Region,
}

impl Default for PermissionLevel {
    fn default() -> Self {
        PermissionLevel::Region
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegionMeta {
    pub region_id: u64,
    pub name: String,
    pub size: u64,
    pub uid: u32,
    pub gid: u32,
    pub perm: u32,
    pub redundancy_level: u32,
    pub memory_type: MemoryType,
    pub interleave_enable: bool,
    pub interleave_size: u64,
    pub permission_level: PermissionLevel,
    pub used_memserver_count: u32,
    pub mem_server_ids: Vec<u64>,
    /// Persistent pointers to the region's private dataitem KVSs. Never
    /// rewritten after region creation.
    pub dataitem_id_root: KvsHandle,
    pub dataitem_name_root: KvsHandle,
    /// Whether the metadata service created the backing heap used by
    /// those KVSs (vs. reusing a shared metadata heap).
    pub is_heap_created: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataItemMeta {
    pub region_id: u64,
    pub item_id: u64,
    /// One offset per server in the dataitem's stripe set.
    pub offsets: Vec<u64>,
    pub name: Option<String>,
    pub size: u64,
    pub uid: u32,
    pub gid: u32,
    pub perm: u32,
    pub interleave_size: u64,
    pub permission_level: PermissionLevel,
    pub used_memserver_count: u32,
    pub memory_server_ids: Vec<u64>,
}

impl DataItemMeta {
    /// offsets/server-ids/count must agree.
    pub fn is_well_formed(&self) -> bool {
        self.offsets.len() == self.memory_server_ids.len()
            && self.offsets.len() == self.used_memserver_count as usize
    }
}

impl serde::Serialize for KvsHandle {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for KvsHandle {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        Ok(KvsHandle(u64::deserialize(deserializer)?))
    }
}

pub(crate) fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    bincode::serialize(value).map_err(|e| OpenFamError::MetadataError(e.to_string()))
}

pub(crate) fn decode<T: for<'de> Deserialize<'de>>(bytes: &[u8]) -> Result<T> {
    bincode::deserialize(bytes).map_err(|e| OpenFamError::MetadataError(e.to_string()))
}

/// Either lookup key a region or dataitem can be addressed by.
pub enum Key<'a> {
    Id(u64),
    Name(&'a str),
}

/// Wraps the two top-level KVSs with typed insert/find/delete: name-KVS
/// first on insert (so duplicate names fail fast via `find_or_create`),
/// id-KVS second, with rollback of the name entry on id-KVS failure;
/// reverse order on delete.
pub struct NameDirectory<K: PersistentKvs> {
    pub region_name_kvs: K,
    pub region_id_kvs: K,
}

impl<K: PersistentKvs> NameDirectory<K> {
    pub fn new(region_name_kvs: K, region_id_kvs: K) -> Self {
        Self {
            region_name_kvs,
            region_id_kvs,
        }
    }

    pub fn max_key_len(&self) -> usize {
        self.region_name_kvs.max_key_len()
    }

    /// Reserves `name` in the name KVS. Returns `Err(RegionExist)` if it
    /// is already taken; does not touch the id KVS.
    pub fn claim_name(&self, name: &str, region_id: u64) -> Result<()> {
        let existing = self
            .region_name_kvs
            .find_or_create(name.as_bytes(), region_id.to_string().into_bytes())?;
        if existing.is_some() {
            return Err(OpenFamError::RegionExist);
        }
        Ok(())
    }

    pub fn insert(&self, meta: &RegionMeta) -> Result<()> {
        match self.claim_name(&meta.name, meta.region_id) {
            Ok(()) => {}
            Err(e) => return Err(e),
        }
        let id_key = meta.region_id.to_string();
        if let Err(e) = self.region_id_kvs.put(id_key.as_bytes(), encode(meta)?) {
            // Roll back the name entry; the id KVS never saw a partial write.
            let _ = self.region_name_kvs.del(meta.name.as_bytes());
            return Err(e);
        }
        Ok(())
    }

    pub fn find(&self, key: Key<'_>) -> Result<Option<RegionMeta>> {
        let region_id = match key {
            Key::Id(id) => id,
            Key::Name(name) => {
                let Some(bytes) = self.region_name_kvs.get(name.as_bytes())? else {
                    return Ok(None);
                };
                String::from_utf8_lossy(&bytes)
                    .parse()
                    .map_err(|_| OpenFamError::MetadataError("corrupt region id entry".into()))?
            }
        };
        let Some(bytes) = self
            .region_id_kvs
            .get(region_id.to_string().as_bytes())?
        else {
            return Ok(None);
        };
        Ok(Some(decode(&bytes)?))
    }

    pub fn modify(&self, region_id: u64, meta: &RegionMeta) -> Result<()> {
        self.region_id_kvs
            .put(region_id.to_string().as_bytes(), encode(meta)?)
    }

    /// Removes both directory entries. Reversed order from insert:
    /// id-KVS first, then name-KVS.
    pub fn delete(&self, region_id: u64, name: &str) -> Result<()> {
        let removed = self.region_id_kvs.del(region_id.to_string().as_bytes())?;
        self.region_name_kvs.del(name.as_bytes())?;
        if !removed {
            return Err(OpenFamError::RegionNotFound);
        }
        Ok(())
    }
}
