// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Hash-array mapped trie used as the on-chain state map.
//!
//! Data structure reference:
//! <https://github.com/ipld/specs/blob/51fab05b4fe4930d3d851d50cc1e5f1a02092deb/data-structures/hashmap.md>
//!
//! Nodes follow the v3 wire format: `(bitfield, [pointer])` where a pointer
//! is either a link to a child node or an inline bucket of key-value pairs.
//! Keys are hashed with sha-256 and consumed `bit_width` bits per level.

mod bitfield;
mod error;
mod hamt;
mod hash_bits;
mod node;
mod pointer;

pub use self::bitfield::Bitfield;
pub use self::error::Error;
pub use self::hamt::Hamt;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::blockstore::BlockStore;
use crate::ipld::Ipld;

/// Default bits of the hashed key consumed at each level.
pub const DEFAULT_BIT_WIDTH: u32 = 5;

/// Maximum number of key-value pairs in a bucket before it is pushed down.
const MAX_ARRAY_WIDTH: usize = 3;

type HashedKey = [u8; 32];

/// Hashes a raw key into the fixed-size digest the trie consumes.
fn hash_key(key: &[u8]) -> HashedKey {
    let mut hasher = Sha256::new();
    hasher.update(key);
    hasher.finalize().into()
}

/// Raw byte key into the trie; the state tree keys by wire-form address
/// bytes.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct BytesKey(#[serde(with = "serde_bytes")] pub Vec<u8>);

impl AsRef<[u8]> for BytesKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for BytesKey {
    fn from(bz: Vec<u8>) -> Self {
        BytesKey(bz)
    }
}

impl From<&[u8]> for BytesKey {
    fn from(s: &[u8]) -> Self {
        Self(s.to_vec())
    }
}

/// Looks up a key in a trie whose root node has already been decoded to a
/// raw value, fetching only the nodes on the search path. This is the
/// descent a reified trie view performs on field access.
pub fn hamt_node_lookup<BS: BlockStore>(
    raw_root: Ipld,
    store: &BS,
    bit_width: u32,
    key: &BytesKey,
) -> anyhow::Result<Option<Ipld>> {
    let root: node::Node<BytesKey, Ipld> = crate::ipld::from_ipld(raw_root)
        .map_err(|e| anyhow!("raw node does not match the trie schema: {}", e))?;
    let hash = hash_key(key.as_ref());
    let found = root.get_value(
        &mut hash_bits::HashBits::new(&hash),
        bit_width,
        key,
        store,
    )?;
    Ok(found.map(|kv| kv.value().clone()))
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub(crate) struct KeyValuePair<K, V>(K, V);

impl<K, V> KeyValuePair<K, V> {
    pub fn key(&self) -> &K {
        &self.0
    }
    pub fn value(&self) -> &V {
        &self.1
    }
    pub fn new(key: K, value: V) -> Self {
        KeyValuePair(key, value)
    }
    pub fn into_parts(self) -> (K, V) {
        (self.0, self.1)
    }
}
