// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::multihash::Code;
use cid::Cid;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::hash_bits::HashBits;
use super::node::Node;
use super::{hash_key, BytesKey, Error, DEFAULT_BIT_WIDTH};
use crate::blockstore::BlockStore;

/// Implementation of the HAMT data structure for IPLD. Mirrors a map from
/// raw byte keys to serde values, sharded and addressable by Cid.
#[derive(Debug)]
pub struct Hamt<BS, V, K = BytesKey> {
    root: Node<K, V>,
    store: BS,
    bit_width: u32,
    /// Remember the last flushed CID until the tree changes.
    flushed_cid: Option<Cid>,
}

impl<BS, V, K> Hamt<BS, V, K>
where
    K: Eq + Ord + AsRef<[u8]> + Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
    BS: BlockStore,
{
    pub fn new(store: BS) -> Self {
        Self::new_with_bit_width(store, DEFAULT_BIT_WIDTH)
    }

    /// Construct a HAMT with a custom bit width.
    pub fn new_with_bit_width(store: BS, bit_width: u32) -> Self {
        Self {
            root: Node::default(),
            store,
            bit_width,
            flushed_cid: None,
        }
    }

    /// Lazily instantiate a HAMT from this root Cid.
    pub fn load(cid: &Cid, store: BS) -> Result<Self, Error> {
        Self::load_with_bit_width(cid, store, DEFAULT_BIT_WIDTH)
    }

    /// Lazily instantiate a HAMT from this root Cid with a custom bit width.
    pub fn load_with_bit_width(cid: &Cid, store: BS, bit_width: u32) -> Result<Self, Error> {
        let root: Node<K, V> = store
            .get(cid)?
            .ok_or_else(|| Error::CidNotFound(cid.to_string()))?;

        Ok(Self {
            root,
            store,
            bit_width,
            flushed_cid: Some(*cid),
        })
    }

    pub fn bit_width(&self) -> u32 {
        self.bit_width
    }

    /// Inserts a key-value pair into the HAMT. If the key was present, the
    /// previous value is returned.
    pub fn set(&mut self, key: K, value: V) -> Result<Option<V>, Error> {
        let hash = hash_key(key.as_ref());
        let prev = self.root.modify_value(
            &mut HashBits::new(&hash),
            self.bit_width,
            key,
            value,
            &self.store,
        )?;
        self.flushed_cid = None;
        Ok(prev)
    }

    /// Returns a reference to the value corresponding to the key, lazily
    /// fetching nodes on the search path.
    pub fn get(&self, key: &K) -> Result<Option<&V>, Error> {
        let hash = hash_key(key.as_ref());
        Ok(self
            .root
            .get_value(&mut HashBits::new(&hash), self.bit_width, key, &self.store)?
            .map(|kv| kv.value()))
    }

    /// Returns true if the key is present in the map.
    pub fn contains_key(&self, key: &K) -> Result<bool, Error> {
        Ok(self.get(key)?.is_some())
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_empty()
    }

    /// Flush the root and return the Cid for the HAMT.
    pub fn flush(&mut self) -> Result<Cid, Error> {
        if let Some(cid) = self.flushed_cid {
            return Ok(cid);
        }
        self.root.flush(&self.store)?;
        let cid = self.store.put(&self.root, Code::Blake2b256)?;
        self.flushed_cid = Some(cid);
        Ok(cid)
    }

    /// Iterates over all key-value pairs in the map.
    pub fn for_each<F>(&self, mut f: F) -> Result<(), Error>
    where
        F: FnMut(&K, &V) -> anyhow::Result<()>,
    {
        self.root.for_each(&self.store, &mut f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockstore::MemoryDB;

    #[test]
    fn set_get_roundtrip() {
        let store = MemoryDB::default();
        let mut map: Hamt<_, u64> = Hamt::new(&store);
        for i in 0u64..200 {
            let key = BytesKey(i.to_be_bytes().to_vec());
            assert_eq!(map.set(key, i).unwrap(), None);
        }
        for i in 0u64..200 {
            let key = BytesKey(i.to_be_bytes().to_vec());
            assert_eq!(map.get(&key).unwrap(), Some(&i));
        }
        let missing = BytesKey(1000u64.to_be_bytes().to_vec());
        assert_eq!(map.get(&missing).unwrap(), None);
    }

    #[test]
    fn overwrite_returns_previous() {
        let store = MemoryDB::default();
        let mut map: Hamt<_, String> = Hamt::new(&store);
        let key = BytesKey(b"k".to_vec());
        assert_eq!(map.set(key.clone(), "one".into()).unwrap(), None);
        assert_eq!(
            map.set(key.clone(), "two".into()).unwrap(),
            Some("one".into())
        );
        assert_eq!(map.get(&key).unwrap(), Some(&"two".to_string()));
    }

    #[test]
    fn flush_and_reload() {
        let store = MemoryDB::default();
        let mut map: Hamt<_, u64> = Hamt::new(&store);
        for i in 0u64..50 {
            map.set(BytesKey(i.to_be_bytes().to_vec()), i * 2).unwrap();
        }
        let cid = map.flush().unwrap();

        let loaded: Hamt<_, u64> = Hamt::load(&cid, &store).unwrap();
        for i in 0u64..50 {
            let key = BytesKey(i.to_be_bytes().to_vec());
            assert_eq!(loaded.get(&key).unwrap(), Some(&(i * 2)));
        }

        let mut count = 0;
        loaded
            .for_each(|_, _| {
                count += 1;
                Ok(())
            })
            .unwrap();
        assert_eq!(count, 50);
    }
}
