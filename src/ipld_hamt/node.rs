// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

use cid::multihash::Code;
use once_cell::unsync::OnceCell;
use serde::de::DeserializeOwned;
use serde::{de, ser, Deserialize, Serialize};

use super::bitfield::Bitfield;
use super::hash_bits::HashBits;
use super::pointer::Pointer;
use super::{hash_key, Error, KeyValuePair, MAX_ARRAY_WIDTH};
use crate::blockstore::BlockStore;

/// Node in the HAMT tree: a bitfield over the slots plus the compacted
/// pointer list.
#[derive(Debug, Default)]
pub(crate) struct Node<K, V> {
    pub(crate) bitfield: Bitfield,
    pub(crate) pointers: Vec<Pointer<K, V>>,
}

impl<K: PartialEq, V: PartialEq> PartialEq for Node<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.bitfield == other.bitfield && self.pointers == other.pointers
    }
}

impl<K, V> Serialize for Node<K, V>
where
    K: Serialize,
    V: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        (&self.bitfield, &self.pointers).serialize(serializer)
    }
}

impl<'de, K, V> Deserialize<'de> for Node<K, V>
where
    K: DeserializeOwned,
    V: DeserializeOwned,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        let (bitfield, pointers): (Bitfield, Vec<Pointer<K, V>>) =
            Deserialize::deserialize(deserializer)?;
        if bitfield.count_ones() != pointers.len() {
            return Err(de::Error::custom(Error::PointerCount));
        }
        Ok(Node { bitfield, pointers })
    }
}

impl<K, V> Node<K, V>
where
    K: Eq + Ord + AsRef<[u8]> + Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    /// Search for a key, consuming `bit_width` bits of the hashed key per
    /// level. At most one block fetch per level.
    pub fn get_value<S: BlockStore>(
        &self,
        hashed_key: &mut HashBits,
        bit_width: u32,
        key: &K,
        store: &S,
    ) -> Result<Option<&KeyValuePair<K, V>>, Error> {
        let idx = hashed_key.next(bit_width)?;

        if !self.bitfield.test_bit(idx) {
            return Ok(None);
        }

        let cindex = self.index_for_bit_pos(idx);
        match self.get_child(cindex) {
            Pointer::Link { cid, cache } => {
                let cached_node = cache.get_or_try_init(|| {
                    store
                        .get::<Node<K, V>>(cid)?
                        .ok_or_else(|| Error::CidNotFound(cid.to_string()))
                        .map(Box::new)
                })?;
                cached_node.get_value(hashed_key, bit_width, key, store)
            }
            Pointer::Dirty(n) => n.get_value(hashed_key, bit_width, key, store),
            Pointer::Values(vals) => Ok(vals.iter().find(|kv| key.eq(kv.key()))),
        }
    }

    /// Internal method to modify values. Returns the previous value when the
    /// key is overwritten.
    pub fn modify_value<S: BlockStore>(
        &mut self,
        hashed_key: &mut HashBits,
        bit_width: u32,
        key: K,
        value: V,
        store: &S,
    ) -> Result<Option<V>, Error> {
        let idx = hashed_key.next(bit_width)?;

        // No existing values at this slot.
        if !self.bitfield.test_bit(idx) {
            self.insert_child(idx, key, value);
            return Ok(None);
        }

        let cindex = self.index_for_bit_pos(idx);
        let child = self.get_child_mut(cindex);

        match child {
            Pointer::Link { cid, cache } => {
                cache.get_or_try_init(|| {
                    store
                        .get::<Node<K, V>>(cid)?
                        .ok_or_else(|| Error::CidNotFound(cid.to_string()))
                        .map(Box::new)
                })?;
                let child_node = cache.get_mut().expect("filled line above");

                let v = child_node.modify_value(hashed_key, bit_width, key, value, store)?;
                // The modified subtree is detached from its persisted form.
                *child = Pointer::Dirty(std::mem::replace(child_node, Box::new(Node::default())));
                Ok(v)
            }
            Pointer::Dirty(n) => n.modify_value(hashed_key, bit_width, key, value, store),
            Pointer::Values(vals) => {
                // Update, if the key already exists.
                if let Some(i) = vals.iter().position(|p| p.key() == &key) {
                    let old = std::mem::replace(vals.get_mut(i).expect("position valid"), {
                        KeyValuePair::new(key, value)
                    });
                    return Ok(Some(old.into_parts().1));
                }

                // If the bucket is full, create a subshard and push
                // everything down one level.
                if vals.len() >= MAX_ARRAY_WIDTH {
                    let mut sub = Node::<K, V>::default();
                    let consumed = hashed_key.consumed;
                    sub.modify_value(hashed_key, bit_width, key, value, store)?;
                    let kvs = std::mem::take(vals);
                    for p in kvs.into_iter() {
                        let (k, v) = p.into_parts();
                        let hash = hash_key(k.as_ref());
                        let mut hb = HashBits::new_at_index(&hash, consumed);
                        sub.modify_value(&mut hb, bit_width, k, v, store)?;
                    }

                    *child = Pointer::Dirty(Box::new(sub));
                    return Ok(None);
                }

                // Otherwise insert the element into the bucket in key order.
                let max = vals.len();
                let idx = vals
                    .iter()
                    .position(|c| c.key() > &key)
                    .unwrap_or(max);
                vals.insert(idx, KeyValuePair::new(key, value));
                Ok(None)
            }
        }
    }

    /// Flushes the cache for the node, persisting dirty children and
    /// replacing them with links.
    pub fn flush<S: BlockStore>(&mut self, store: &S) -> Result<(), Error> {
        for pointer in self.pointers.iter_mut() {
            if let Pointer::Dirty(node) = pointer {
                node.flush(store)?;

                let cid = store.put(node.as_ref(), Code::Blake2b256)?;

                let existing = std::mem::replace(node, Box::new(Node::default()));
                let cache = OnceCell::from(existing);
                *pointer = Pointer::Link { cid, cache };
            }
        }

        Ok(())
    }

    /// Walks the subtree invoking the callback on every key-value pair.
    pub fn for_each<S, F>(&self, store: &S, f: &mut F) -> Result<(), Error>
    where
        F: FnMut(&K, &V) -> anyhow::Result<()>,
        S: BlockStore,
    {
        for p in &self.pointers {
            match p {
                Pointer::Link { cid, cache } => {
                    let cached_node = cache.get_or_try_init(|| {
                        store
                            .get::<Node<K, V>>(cid)?
                            .ok_or_else(|| Error::CidNotFound(cid.to_string()))
                            .map(Box::new)
                    })?;
                    cached_node.for_each(store, f)?;
                }
                Pointer::Dirty(n) => n.for_each(store, f)?,
                Pointer::Values(kvs) => {
                    for kv in kvs {
                        f(kv.key(), kv.value())?;
                    }
                }
            }
        }
        Ok(())
    }

    fn insert_child(&mut self, idx: u32, key: K, value: V) {
        let i = self.index_for_bit_pos(idx);
        self.bitfield.set_bit(idx);
        self.pointers.insert(i, Pointer::from_key_value(key, value))
    }

    fn index_for_bit_pos(&self, bp: u32) -> usize {
        self.bitfield.count_ones_below(bp)
    }

    fn get_child_mut(&mut self, i: usize) -> &mut Pointer<K, V> {
        &mut self.pointers[i]
    }

    fn get_child(&self, i: usize) -> &Pointer<K, V> {
        &self.pointers[i]
    }
}
