// Copyright 2022-2023 Lantern Contributors
// SPDX-License-Identifier: Apache-2.0, MIT

//! Name-registered transformations that promote raw decoded nodes into
//! structured views for the traversal engine.

use std::collections::HashMap;

use anyhow::anyhow;

use super::{from_ipld, Ipld};
use crate::blockstore::BlockStore;
use crate::ipld_hamt::{hamt_node_lookup, BytesKey, DEFAULT_BIT_WIDTH};

/// Name the state-trie reifier is registered under.
pub const HAMT_REIFIER: &str = "lantern-filecoin-hamt";

/// A structured view produced by a reifier; field access resolves through
/// on-demand block fetches.
pub trait ReifiedNode<BS> {
    /// Looks up a raw-byte field in the view, fetching only the blocks on
    /// the search path.
    fn lookup_field(&self, store: &BS, key: &[u8]) -> anyhow::Result<Option<Ipld>>;
}

type ReifyFn<BS> = fn(Ipld) -> anyhow::Result<Box<dyn ReifiedNode<BS>>>;

/// Table of known reifiers, keyed by name. The walk engine consults it when
/// a selector carries a reify-as guard.
pub struct ReifierRegistry<BS> {
    reifiers: HashMap<String, ReifyFn<BS>>,
}

impl<BS: BlockStore> Default for ReifierRegistry<BS> {
    /// A registry with the state-trie reifier pre-registered.
    fn default() -> Self {
        let mut registry = Self {
            reifiers: HashMap::new(),
        };
        registry.register(HAMT_REIFIER, reify_hamt::<BS>);
        registry
    }
}

impl<BS: BlockStore> ReifierRegistry<BS> {
    pub fn register(&mut self, name: &str, f: ReifyFn<BS>) {
        self.reifiers.insert(name.to_string(), f);
    }

    pub fn get(&self, name: &str) -> Option<&ReifyFn<BS>> {
        self.reifiers.get(name)
    }
}

/// Wraps a raw decoded trie root in a map view whose field access performs
/// the bit-consuming descent with on-demand fetches.
fn reify_hamt<BS: BlockStore>(raw_root: Ipld) -> anyhow::Result<Box<dyn ReifiedNode<BS>>> {
    // Validate the root against the trie node shape up front; a malformed
    // root fails reification rather than the first lookup.
    from_ipld::<(serde_bytes::ByteBuf, Vec<Ipld>)>(raw_root.clone())
        .map_err(|e| anyhow!("node does not match the trie schema: {}", e))?;

    Ok(Box::new(HamtView {
        root: raw_root,
        bit_width: DEFAULT_BIT_WIDTH,
    }))
}

struct HamtView {
    root: Ipld,
    bit_width: u32,
}

impl<BS: BlockStore> ReifiedNode<BS> for HamtView {
    fn lookup_field(&self, store: &BS, key: &[u8]) -> anyhow::Result<Option<Ipld>> {
        hamt_node_lookup(
            self.root.clone(),
            store,
            self.bit_width,
            &BytesKey(key.to_vec()),
        )
    }
}
